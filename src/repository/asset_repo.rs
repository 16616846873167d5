//! Asset Repository
//!
//! SQLite-backed implementation of the gallery store.
//! Reorders run inside one transaction, so a failed reassignment leaves
//! every row untouched.

use async_trait::async_trait;
use rusqlite::{params, Row};

use crate::domain::{
    ordering, Asset, DomainError, DomainResult, FieldUpdate, NewAsset, PositionUpdate, SortMode,
};
use super::db::{now_ms, require, require_mut, SharedConnection};
use super::traits::GalleryStore;

const ASSET_COLUMNS: &str = "id, title, description, file_url, thumbnail_url, mime_type, display_order, pinned, rating, created_at, updated_at";

/// SQLite implementation of the gallery store
#[derive(Clone)]
pub struct AssetRepository {
    conn: SharedConnection,
}

impl AssetRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    pub async fn find_by_id(&self, id: u32) -> DomainResult<Option<Asset>> {
        let guard = self.conn.lock().await;
        let conn = require(&guard)?;

        let mut stmt = conn
            .prepare(&format!("SELECT {} FROM assets WHERE id = ?", ASSET_COLUMNS))
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        let mut rows = stmt
            .query(params![id])
            .map_err(|e| DomainError::Storage(e.to_string()))?;

        match rows.next().map_err(|e| DomainError::Storage(e.to_string()))? {
            Some(row) => Ok(Some(row_to_asset(row)?)),
            None => Ok(None),
        }
    }

    /// Get next display order (used in create)
    fn next_display_order(conn: &rusqlite::Connection) -> DomainResult<i32> {
        conn.query_row(
            "SELECT COALESCE(MAX(display_order), -1) + 1 FROM assets",
            [],
            |row| row.get::<_, i32>(0),
        )
        .map_err(|e| DomainError::Storage(e.to_string()))
    }

    /// Renumber every asset to a dense 0..N-1 sequence in manual render order.
    /// Returns the assignment that was written.
    pub async fn reindex_assets(&self) -> DomainResult<Vec<PositionUpdate>> {
        let mut assets = self.list_assets().await?;
        ordering::sort_assets(&mut assets, SortMode::Manual);
        let updates = ordering::dense_positions(&assets);
        self.persist_reorder(&updates).await?;
        Ok(updates)
    }
}

pub(crate) fn row_to_asset(row: &Row<'_>) -> DomainResult<Asset> {
    let map = |e: rusqlite::Error| DomainError::Storage(e.to_string());
    Ok(Asset {
        id: row.get(0).map_err(map)?,
        title: row.get(1).map_err(map)?,
        description: row.get(2).map_err(map)?,
        file_url: row.get(3).map_err(map)?,
        thumbnail_url: row.get(4).map_err(map)?,
        mime_type: row.get(5).map_err(map)?,
        display_order: row.get(6).map_err(map)?,
        pinned: row.get(7).map_err(map)?,
        rating: row.get(8).map_err(map)?,
        created_at: row.get(9).map_err(map)?,
        updated_at: row.get(10).map_err(map)?,
    })
}

#[async_trait]
impl GalleryStore for AssetRepository {
    async fn list_assets(&self) -> DomainResult<Vec<Asset>> {
        let guard = self.conn.lock().await;
        let conn = require(&guard)?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM assets ORDER BY display_order ASC, id ASC",
                ASSET_COLUMNS
            ))
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        let mut rows = stmt
            .query([])
            .map_err(|e| DomainError::Storage(e.to_string()))?;

        let mut assets = Vec::new();
        while let Some(row) = rows.next().map_err(|e| DomainError::Storage(e.to_string()))? {
            assets.push(row_to_asset(row)?);
        }
        Ok(assets)
    }

    async fn persist_reorder(&self, updates: &[PositionUpdate]) -> DomainResult<()> {
        let mut guard = self.conn.lock().await;
        let conn = require_mut(&mut guard)?;

        let tx = conn
            .transaction()
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        let now = now_ms();
        {
            let mut stmt = tx
                .prepare("UPDATE assets SET display_order = ?, updated_at = ? WHERE id = ?")
                .map_err(|e| DomainError::Storage(e.to_string()))?;
            for update in updates {
                let changed = stmt
                    .execute(params![update.display_order, now, update.id])
                    .map_err(|e| DomainError::Storage(e.to_string()))?;
                if changed == 0 {
                    // tx drops here and rolls back
                    return Err(DomainError::NotFound(format!("Asset {} not found", update.id)));
                }
            }
        }
        tx.commit().map_err(|e| DomainError::Storage(e.to_string()))?;

        log::debug!("Persisted reorder of {} assets", updates.len());
        Ok(())
    }

    async fn persist_field_value(&self, id: u32, update: &FieldUpdate) -> DomainResult<()> {
        update.validate()?;

        let guard = self.conn.lock().await;
        let conn = require(&guard)?;
        let now = now_ms();

        let sql = format!("UPDATE assets SET {} = ?, updated_at = ? WHERE id = ?", update.column());
        let changed = match update {
            FieldUpdate::Title(title) => conn.execute(&sql, params![title, now, id]),
            FieldUpdate::Description(text) => {
                let text = if text.is_empty() { None } else { Some(text.as_str()) };
                conn.execute(&sql, params![text, now, id])
            }
            FieldUpdate::Pinned(pinned) => conn.execute(&sql, params![pinned, now, id]),
            FieldUpdate::Rating(rating) => conn.execute(&sql, params![rating, now, id]),
        }
        .map_err(|e| DomainError::Storage(e.to_string()))?;

        if changed == 0 {
            return Err(DomainError::NotFound(format!("Asset {} not found", id)));
        }
        Ok(())
    }

    async fn create_asset(&self, asset: &NewAsset) -> DomainResult<Asset> {
        FieldUpdate::Title(asset.title.clone()).validate()?;

        let guard = self.conn.lock().await;
        let conn = require(&guard)?;

        let display_order = Self::next_display_order(conn)?;
        let created_at = now_ms();

        conn.execute(
            "INSERT INTO assets (title, file_url, thumbnail_url, mime_type, display_order, pinned, created_at)
             VALUES (?, ?, ?, ?, ?, 0, ?)",
            params![
                asset.title,
                asset.file_url,
                asset.thumbnail_url,
                asset.mime_type,
                display_order,
                created_at
            ],
        )
        .map_err(|e| DomainError::Storage(e.to_string()))?;

        Ok(Asset {
            id: conn.last_insert_rowid() as u32,
            title: asset.title.clone(),
            description: None,
            file_url: asset.file_url.clone(),
            thumbnail_url: asset.thumbnail_url.clone(),
            mime_type: asset.mime_type.clone(),
            display_order,
            pinned: false,
            rating: None,
            created_at,
            updated_at: None,
        })
    }

    async fn delete_asset(&self, id: u32) -> DomainResult<()> {
        let guard = self.conn.lock().await;
        let conn = require(&guard)?;

        let changed = conn
            .execute("DELETE FROM assets WHERE id = ?", params![id])
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        if changed == 0 {
            return Err(DomainError::NotFound(format!("Asset {} not found", id)));
        }
        Ok(())
    }
}
