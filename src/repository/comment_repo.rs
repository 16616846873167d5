//! Comment Repository
//!
//! Review comments per asset, oldest first.

use async_trait::async_trait;
use rusqlite::{params, Row};

use crate::domain::{Comment, DomainError, DomainResult};
use super::db::{require, SharedConnection};
use super::traits::Repository;

#[derive(Clone)]
pub struct CommentRepository {
    conn: SharedConnection,
}

impl CommentRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    pub async fn list_for_asset(&self, asset_id: u32) -> DomainResult<Vec<Comment>> {
        let guard = self.conn.lock().await;
        let conn = require(&guard)?;

        let mut stmt = conn
            .prepare(
                "SELECT id, asset_id, author, body, created_at FROM comments
                 WHERE asset_id = ? ORDER BY created_at ASC, id ASC",
            )
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        let mut rows = stmt
            .query(params![asset_id])
            .map_err(|e| DomainError::Storage(e.to_string()))?;

        let mut comments = Vec::new();
        while let Some(row) = rows.next().map_err(|e| DomainError::Storage(e.to_string()))? {
            comments.push(row_to_comment(row)?);
        }
        Ok(comments)
    }
}

fn row_to_comment(row: &Row<'_>) -> DomainResult<Comment> {
    let map = |e: rusqlite::Error| DomainError::Storage(e.to_string());
    Ok(Comment {
        id: row.get(0).map_err(map)?,
        asset_id: row.get(1).map_err(map)?,
        author: row.get(2).map_err(map)?,
        body: row.get(3).map_err(map)?,
        created_at: row.get(4).map_err(map)?,
    })
}

#[async_trait]
impl Repository<Comment> for CommentRepository {
    async fn create(&self, entity: &Comment) -> DomainResult<Comment> {
        entity.validate()?;

        let guard = self.conn.lock().await;
        let conn = require(&guard)?;

        conn.execute(
            "INSERT INTO comments (asset_id, author, body, created_at) VALUES (?, ?, ?, ?)",
            params![entity.asset_id, entity.author, entity.body, entity.created_at],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                DomainError::NotFound(format!("Asset {} not found", entity.asset_id))
            }
            other => DomainError::Storage(other.to_string()),
        })?;

        let mut comment = entity.clone();
        comment.id = conn.last_insert_rowid() as u32;
        Ok(comment)
    }

    async fn find_by_id(&self, id: u32) -> DomainResult<Option<Comment>> {
        let guard = self.conn.lock().await;
        let conn = require(&guard)?;

        let mut stmt = conn
            .prepare("SELECT id, asset_id, author, body, created_at FROM comments WHERE id = ?")
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        let mut rows = stmt
            .query(params![id])
            .map_err(|e| DomainError::Storage(e.to_string()))?;

        match rows.next().map_err(|e| DomainError::Storage(e.to_string()))? {
            Some(row) => Ok(Some(row_to_comment(row)?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> DomainResult<Vec<Comment>> {
        let guard = self.conn.lock().await;
        let conn = require(&guard)?;

        let mut stmt = conn
            .prepare("SELECT id, asset_id, author, body, created_at FROM comments ORDER BY created_at ASC, id ASC")
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        let mut rows = stmt
            .query([])
            .map_err(|e| DomainError::Storage(e.to_string()))?;

        let mut comments = Vec::new();
        while let Some(row) = rows.next().map_err(|e| DomainError::Storage(e.to_string()))? {
            comments.push(row_to_comment(row)?);
        }
        Ok(comments)
    }

    async fn update(&self, entity: &Comment) -> DomainResult<Comment> {
        entity.validate()?;

        let guard = self.conn.lock().await;
        let conn = require(&guard)?;

        let changed = conn
            .execute(
                "UPDATE comments SET body = ? WHERE id = ?",
                params![entity.body, entity.id],
            )
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        if changed == 0 {
            return Err(DomainError::NotFound(format!("Comment {} not found", entity.id)));
        }
        Ok(entity.clone())
    }

    async fn delete(&self, id: u32) -> DomainResult<()> {
        let guard = self.conn.lock().await;
        let conn = require(&guard)?;

        conn.execute("DELETE FROM comments WHERE id = ?", params![id])
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        Ok(())
    }
}
