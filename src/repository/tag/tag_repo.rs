//! Tag Repository - Core CRUD Operations
//!
//! SQLite-backed implementation for Tag CRUD operations.

use async_trait::async_trait;
use rusqlite::{params, Row};

use crate::domain::{DomainError, DomainResult, Tag};
use super::super::db::{now_ms, require, SharedConnection};
use super::super::traits::Repository;

/// SQLite implementation of Tag repository
#[derive(Clone)]
pub struct TagRepository {
    pub(super) conn: SharedConnection,
}

impl TagRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

pub(super) fn row_to_tag(row: &Row<'_>) -> DomainResult<Tag> {
    let map = |e: rusqlite::Error| DomainError::Storage(e.to_string());
    Ok(Tag {
        id: row.get(0).map_err(map)?,
        name: row.get(1).map_err(map)?,
        color: row.get(2).map_err(map)?,
    })
}

fn map_write_error(e: rusqlite::Error, name: &str) -> DomainError {
    match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            DomainError::Conflict(format!("Tag '{}' already exists", name))
        }
        other => DomainError::Storage(other.to_string()),
    }
}

#[async_trait]
impl Repository<Tag> for TagRepository {
    async fn create(&self, entity: &Tag) -> DomainResult<Tag> {
        entity.validate()?;

        let guard = self.conn.lock().await;
        let conn = require(&guard)?;

        let name = entity.name.trim().to_string();
        conn.execute(
            "INSERT INTO tags (name, color, updated_at) VALUES (?, ?, ?)",
            params![name, entity.color, now_ms()],
        )
        .map_err(|e| map_write_error(e, &name))?;

        let mut tag = entity.clone();
        tag.id = conn.last_insert_rowid() as u32;
        tag.name = name;
        Ok(tag)
    }

    async fn find_by_id(&self, id: u32) -> DomainResult<Option<Tag>> {
        let guard = self.conn.lock().await;
        let conn = require(&guard)?;

        let mut stmt = conn
            .prepare("SELECT id, name, color FROM tags WHERE id = ?")
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        let mut rows = stmt
            .query(params![id])
            .map_err(|e| DomainError::Storage(e.to_string()))?;

        match rows.next().map_err(|e| DomainError::Storage(e.to_string()))? {
            Some(row) => Ok(Some(row_to_tag(row)?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> DomainResult<Vec<Tag>> {
        let guard = self.conn.lock().await;
        let conn = require(&guard)?;

        let mut stmt = conn
            .prepare("SELECT id, name, color FROM tags ORDER BY name COLLATE NOCASE, id")
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        let mut rows = stmt
            .query([])
            .map_err(|e| DomainError::Storage(e.to_string()))?;

        let mut tags = Vec::new();
        while let Some(row) = rows.next().map_err(|e| DomainError::Storage(e.to_string()))? {
            tags.push(row_to_tag(row)?);
        }
        Ok(tags)
    }

    async fn update(&self, entity: &Tag) -> DomainResult<Tag> {
        entity.validate()?;

        let guard = self.conn.lock().await;
        let conn = require(&guard)?;

        let name = entity.name.trim().to_string();
        let changed = conn
            .execute(
                "UPDATE tags SET name = ?, color = ?, updated_at = ? WHERE id = ?",
                params![name, entity.color, now_ms(), entity.id],
            )
            .map_err(|e| map_write_error(e, &name))?;

        if changed == 0 {
            return Err(DomainError::NotFound(format!("Tag {} not found", entity.id)));
        }

        let mut tag = entity.clone();
        tag.name = name;
        Ok(tag)
    }

    async fn delete(&self, id: u32) -> DomainResult<()> {
        let guard = self.conn.lock().await;
        let conn = require(&guard)?;

        // asset_tags rows go with it (ON DELETE CASCADE)
        conn.execute("DELETE FROM tags WHERE id = ?", params![id])
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        Ok(())
    }
}
