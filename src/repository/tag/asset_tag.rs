//! Asset-Tag Relationship Operations
//!
//! Operations for managing the many-to-many relationship between assets and tags.

use async_trait::async_trait;
use rusqlite::params;

use crate::domain::{DomainError, DomainResult, Tag};
use super::super::db::require;

/// Trait for asset-tag relationship operations
#[async_trait]
pub trait AssetTagOperations {
    /// Add a tag to an asset (no-op if already attached)
    async fn add_tag_to_asset(&self, asset_id: u32, tag_id: u32) -> DomainResult<()>;

    /// Remove a tag from an asset
    async fn remove_tag_from_asset(&self, asset_id: u32, tag_id: u32) -> DomainResult<()>;

    /// Get all tags for an asset, sorted by name
    async fn get_tags_for_asset(&self, asset_id: u32) -> DomainResult<Vec<Tag>>;

    /// Get all asset ids with a specific tag
    async fn get_assets_with_tag(&self, tag_id: u32) -> DomainResult<Vec<u32>>;
}

#[async_trait]
impl AssetTagOperations for super::tag_repo::TagRepository {
    async fn add_tag_to_asset(&self, asset_id: u32, tag_id: u32) -> DomainResult<()> {
        let guard = self.conn.lock().await;
        let conn = require(&guard)?;

        conn.execute(
            "INSERT OR IGNORE INTO asset_tags (asset_id, tag_id) VALUES (?, ?)",
            params![asset_id, tag_id],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                DomainError::NotFound(format!("Asset {} or tag {} not found", asset_id, tag_id))
            }
            other => DomainError::Storage(other.to_string()),
        })?;

        Ok(())
    }

    async fn remove_tag_from_asset(&self, asset_id: u32, tag_id: u32) -> DomainResult<()> {
        let guard = self.conn.lock().await;
        let conn = require(&guard)?;

        conn.execute(
            "DELETE FROM asset_tags WHERE asset_id = ? AND tag_id = ?",
            params![asset_id, tag_id],
        )
        .map_err(|e| DomainError::Storage(e.to_string()))?;

        Ok(())
    }

    async fn get_tags_for_asset(&self, asset_id: u32) -> DomainResult<Vec<Tag>> {
        let guard = self.conn.lock().await;
        let conn = require(&guard)?;

        let mut stmt = conn
            .prepare(
                "SELECT t.id, t.name, t.color FROM tags t
                 JOIN asset_tags at ON t.id = at.tag_id
                 WHERE at.asset_id = ?
                 ORDER BY t.name COLLATE NOCASE, t.id",
            )
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        let mut rows = stmt
            .query(params![asset_id])
            .map_err(|e| DomainError::Storage(e.to_string()))?;

        let mut tags = Vec::new();
        while let Some(row) = rows.next().map_err(|e| DomainError::Storage(e.to_string()))? {
            tags.push(super::tag_repo::row_to_tag(row)?);
        }
        Ok(tags)
    }

    async fn get_assets_with_tag(&self, tag_id: u32) -> DomainResult<Vec<u32>> {
        let guard = self.conn.lock().await;
        let conn = require(&guard)?;

        let mut stmt = conn
            .prepare("SELECT asset_id FROM asset_tags WHERE tag_id = ? ORDER BY asset_id")
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        let mut rows = stmt
            .query(params![tag_id])
            .map_err(|e| DomainError::Storage(e.to_string()))?;

        let mut ids = Vec::new();
        while let Some(row) = rows.next().map_err(|e| DomainError::Storage(e.to_string()))? {
            ids.push(row.get(0).map_err(|e| DomainError::Storage(e.to_string()))?);
        }
        Ok(ids)
    }
}
