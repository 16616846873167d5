//! Commands for asset operations
//!
//! Upload/delete touch three collaborators (blob store, thumbnail pool,
//! asset rows); gallery and detail-panel gestures go through the state layer.

use std::path::Path;

use crate::domain::{Asset, DomainError, NewAsset, SortMode, TextField};
use crate::repository::blob_store::{content_key, content_type_for};
use crate::repository::GalleryStore;
use crate::state::{AutosaveOutcome, FieldKey, ReorderOutcome};
use crate::AppState;

/// Fetch assets and adopt them unless a gallery change is pending
pub async fn load_gallery(state: &AppState) -> Result<Vec<Asset>, String> {
    state.gallery.load().await.map_err(|e| e.to_string())?;
    Ok(state.gallery.items())
}

/// Get asset by ID
pub async fn get_asset(state: &AppState, id: u32) -> Result<Option<Asset>, String> {
    state.assets.find_by_id(id).await.map_err(|e| e.to_string())
}

/// Store the file, render a thumbnail for images, insert the row
pub async fn upload_asset(
    state: &AppState,
    filename: &str,
    bytes: Vec<u8>,
    title: Option<String>,
) -> Result<Asset, String> {
    let content_type = content_type_for(filename);
    let file_key = content_key("assets", filename, &bytes);
    let file_url = state
        .blobs
        .upload(&file_key, &bytes, &content_type)
        .await
        .map_err(|e| e.to_string())?;

    let thumbnail_url = if content_type.starts_with("image/") {
        upload_thumbnail(state, bytes).await
    } else {
        None
    };

    let title = title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| title_from_filename(filename));
    let new_asset = NewAsset {
        title,
        file_url,
        thumbnail_url,
        mime_type: content_type,
    };

    match state.assets.create_asset(&new_asset).await {
        Ok(asset) => {
            state.notifier.success(format!("Uploaded {}", asset.title));
            if let Err(e) = state.gallery.load().await {
                log::warn!("Gallery reload after upload failed: {}", e);
            }
            Ok(asset)
        }
        Err(e) => {
            // Row never existed, so the stored files are orphans
            delete_blob_for_url(state, &new_asset.file_url).await;
            if let Some(url) = &new_asset.thumbnail_url {
                delete_blob_for_url(state, url).await;
            }
            state.notifier.error(format!("Upload failed: {}", e));
            Err(e.to_string())
        }
    }
}

/// Thumbnail of a file the user picked but has not uploaded yet
pub async fn preview_upload(state: &AppState, bytes: Vec<u8>) -> Result<String, String> {
    state
        .thumbnails
        .render(bytes)
        .await
        .map(|thumb| thumb.to_data_url())
        .map_err(|e| e.to_string())
}

/// A missing thumbnail never fails the upload
async fn upload_thumbnail(state: &AppState, bytes: Vec<u8>) -> Option<String> {
    let thumb = match state.thumbnails.render(bytes).await {
        Ok(thumb) => thumb,
        Err(e) => {
            log::warn!("No thumbnail: {}", e);
            return None;
        }
    };

    let key = content_key("thumbnails", "thumb.png", &thumb.png);
    match state.blobs.upload(&key, &thumb.png, "image/png").await {
        Ok(url) => Some(url),
        Err(e) => {
            log::warn!("Thumbnail upload failed: {}", e);
            None
        }
    }
}

fn title_from_filename(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("Untitled")
        .to_string()
}

async fn delete_blob_for_url(state: &AppState, url: &str) {
    let Some(key) = state.blobs.key_for_url(url) else {
        log::debug!("Not deleting foreign blob {}", url);
        return;
    };
    if let Err(e) = state.blobs.delete(&key).await {
        log::warn!("Failed to delete blob {}: {}", key, e);
    }
}

/// Delete the row, then its files
pub async fn delete_asset(state: &AppState, id: u32) -> Result<(), String> {
    let asset = state
        .assets
        .find_by_id(id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("Asset {} not found", id))?;

    state.assets.delete_asset(id).await.map_err(|e| e.to_string())?;

    delete_blob_for_url(state, &asset.file_url).await;
    if let Some(url) = &asset.thumbnail_url {
        delete_blob_for_url(state, url).await;
    }
    for field in [TextField::Title, TextField::Description] {
        state.autosave.untrack(FieldKey::new(id, field));
    }

    state.notifier.success(format!("Deleted {}", asset.title));
    if let Err(e) = state.gallery.load().await {
        log::warn!("Gallery reload after delete failed: {}", e);
    }
    Ok(())
}

// ========================
// Gallery gestures
// ========================

pub async fn reorder_assets(state: &AppState, dragged: u32, target: u32) -> ReorderOutcome {
    state.gallery.reorder(dragged, target).await
}

pub async fn toggle_asset_pin(state: &AppState, id: u32) -> ReorderOutcome {
    state.gallery.toggle_pin(id).await
}

pub async fn rate_asset(state: &AppState, id: u32, rating: Option<u8>) -> ReorderOutcome {
    state.gallery.set_rating(id, rating).await
}

pub fn set_sort_mode(state: &AppState, mode: &str) -> Result<SortMode, String> {
    let mode: SortMode = mode.parse().map_err(|e: DomainError| e.to_string())?;
    state.gallery.set_sort_mode(mode);
    Ok(mode)
}

// ========================
// Detail panel fields
// ========================

/// Start tracking the editable fields of an asset
pub async fn open_asset_detail(state: &AppState, id: u32) -> Result<Asset, String> {
    let asset = get_asset(state, id)
        .await?
        .ok_or_else(|| format!("Asset {} not found", id))?;
    for field in [TextField::Title, TextField::Description] {
        state
            .autosave
            .track(FieldKey::new(id, field), &asset.text_field(field));
    }
    Ok(asset)
}

pub fn edit_asset_field(state: &AppState, id: u32, field: TextField, value: &str) {
    state.autosave.on_change(FieldKey::new(id, field), value);
}

pub async fn commit_asset_field(state: &AppState, id: u32, field: TextField) -> AutosaveOutcome {
    state.autosave.commit_now(FieldKey::new(id, field)).await
}

pub fn cancel_asset_field(state: &AppState, id: u32, field: TextField) -> Option<String> {
    let key = FieldKey::new(id, field);
    state.autosave.cancel(key);
    state.autosave.displayed(key)
}
