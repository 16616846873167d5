//! Gallery Ordering
//!
//! Render order, splice-move and dense re-numbering of `display_order`.
//!
//! Total order used everywhere:
//! 1. pinned before non-pinned
//! 2. pinned among themselves: `display_order` ascending
//! 3. non-pinned: the active `SortMode` key
//! 4. `created_at` descending
//! 5. `id` ascending

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use super::asset::Asset;
use super::entity::DomainError;

/// Caller-selected sort for non-pinned assets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Manual drag-and-drop order
    #[default]
    Manual,
    /// Highest rated first, unrated last
    Rating,
    /// Newest upload first
    Newest,
}

impl SortMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::Manual => "manual",
            SortMode::Rating => "rating",
            SortMode::Newest => "newest",
        }
    }
}

impl FromStr for SortMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(SortMode::Manual),
            "rating" => Ok(SortMode::Rating),
            "newest" => Ok(SortMode::Newest),
            other => Err(DomainError::InvalidInput(format!("Unknown sort mode: {}", other))),
        }
    }
}

/// One row of a positional reassignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub id: u32,
    pub display_order: i32,
}

pub fn compare_assets(a: &Asset, b: &Asset, mode: SortMode) -> Ordering {
    b.pinned
        .cmp(&a.pinned)
        .then_with(|| {
            if a.pinned && b.pinned {
                a.display_order.cmp(&b.display_order)
            } else {
                mode_key(a, b, mode)
            }
        })
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

fn mode_key(a: &Asset, b: &Asset, mode: SortMode) -> Ordering {
    match mode {
        SortMode::Manual => a.display_order.cmp(&b.display_order),
        // Some(_) > None, so reversing puts unrated last
        SortMode::Rating => b.rating.cmp(&a.rating),
        SortMode::Newest => Ordering::Equal,
    }
}

/// Sort in render order
pub fn sort_assets(assets: &mut [Asset], mode: SortMode) {
    assets.sort_by(|a, b| compare_assets(a, b, mode));
}

/// Splice-move: remove at `from`, re-insert at `to`.
/// The moved element ends up at the pre-move `to` index.
pub fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) {
    if from == to || from >= items.len() || to >= items.len() {
        return;
    }
    let moved = items.remove(from);
    items.insert(to, moved);
}

/// Target index for a drop into the gap before `zone`
/// (`zone == len` means after the last item).
pub fn zone_to_index(from: usize, zone: usize, len: usize) -> usize {
    let zone = zone.min(len);
    if zone > from {
        zone - 1
    } else {
        zone
    }
}

/// Dense 0..N-1 positions for every asset, in slice order
pub fn dense_positions(assets: &[Asset]) -> Vec<PositionUpdate> {
    assets
        .iter()
        .enumerate()
        .map(|(i, a)| PositionUpdate {
            id: a.id,
            display_order: i as i32,
        })
        .collect()
}

/// Write dense positions back into the assets
pub fn renumber(assets: &mut [Asset]) {
    for (i, asset) in assets.iter_mut().enumerate() {
        asset.display_order = i as i32;
    }
}
