//! Commands for Tag operations
//!
//! Tag CRUD and asset-tag relationships.

use crate::domain::Tag;
use crate::repository::{AssetTagOperations, Repository};
use crate::AppState;

/// Create a new tag
pub async fn create_tag(
    state: &AppState,
    name: String,
    color: Option<String>,
) -> Result<Tag, String> {
    let tag = match color {
        Some(c) => Tag::with_color(0, name, c),
        None => Tag::new(0, name),
    };
    state.tags.create(&tag).await.map_err(|e| e.to_string())
}

/// List all tags
pub async fn list_tags(state: &AppState) -> Result<Vec<Tag>, String> {
    state.tags.list().await.map_err(|e| e.to_string())
}

/// Update tag
pub async fn update_tag(
    state: &AppState,
    id: u32,
    name: Option<String>,
    color: Option<String>,
) -> Result<Tag, String> {
    let existing = state
        .tags
        .find_by_id(id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("Tag {} not found", id))?;

    let updated = Tag {
        id: existing.id,
        name: name.unwrap_or(existing.name),
        color: color.or(existing.color),
    };
    state.tags.update(&updated).await.map_err(|e| e.to_string())
}

/// Delete tag
pub async fn delete_tag(state: &AppState, id: u32) -> Result<(), String> {
    state.tags.delete(id).await.map_err(|e| e.to_string())
}

// ========================
// Asset-Tag Relationships
// ========================

pub async fn add_asset_tag(state: &AppState, asset_id: u32, tag_id: u32) -> Result<(), String> {
    state
        .tags
        .add_tag_to_asset(asset_id, tag_id)
        .await
        .map_err(|e| e.to_string())
}

pub async fn remove_asset_tag(state: &AppState, asset_id: u32, tag_id: u32) -> Result<(), String> {
    state
        .tags
        .remove_tag_from_asset(asset_id, tag_id)
        .await
        .map_err(|e| e.to_string())
}

pub async fn get_asset_tags(state: &AppState, asset_id: u32) -> Result<Vec<Tag>, String> {
    state
        .tags
        .get_tags_for_asset(asset_id)
        .await
        .map_err(|e| e.to_string())
}

/// Asset ids carrying the tag
pub async fn get_assets_by_tag(state: &AppState, tag_id: u32) -> Result<Vec<u32>, String> {
    state
        .tags
        .get_assets_with_tag(tag_id)
        .await
        .map_err(|e| e.to_string())
}
