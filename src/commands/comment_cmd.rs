//! Commands for review comments

use crate::domain::Comment;
use crate::repository::Repository;
use crate::AppState;

pub async fn add_comment(
    state: &AppState,
    asset_id: u32,
    author: String,
    body: String,
) -> Result<Comment, String> {
    let comment = Comment::new(asset_id, author, body);
    state.comments.create(&comment).await.map_err(|e| e.to_string())
}

/// Comments for one asset, oldest first
pub async fn list_comments(state: &AppState, asset_id: u32) -> Result<Vec<Comment>, String> {
    state
        .comments
        .list_for_asset(asset_id)
        .await
        .map_err(|e| e.to_string())
}

pub async fn edit_comment(state: &AppState, id: u32, body: String) -> Result<Comment, String> {
    let existing = state
        .comments
        .find_by_id(id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("Comment {} not found", id))?;

    let updated = Comment { body, ..existing };
    state.comments.update(&updated).await.map_err(|e| e.to_string())
}

pub async fn delete_comment(state: &AppState, id: u32) -> Result<(), String> {
    state.comments.delete(id).await.map_err(|e| e.to_string())
}
