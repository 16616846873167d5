//! Asset Entity
//!
//! A design asset shown in the review gallery.

use serde::{Deserialize, Serialize};
use super::entity::{DomainError, DomainResult, Entity};

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_RATING: u8 = 5;

/// A reviewed design asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Unique identifier
    pub id: u32,
    pub title: String,
    pub description: Option<String>,
    /// Public URL of the original upload
    pub file_url: String,
    pub thumbnail_url: Option<String>,
    pub mime_type: String,
    /// Manual render sequence (dense after any reorder)
    pub display_order: i32,
    /// Pinned assets render before all others
    pub pinned: bool,
    /// Reviewer rating, 1..=5
    pub rating: Option<u8>,
    /// Creation time (ms since epoch)
    pub created_at: i64,
    pub updated_at: Option<i64>,
}

impl Asset {
    pub fn new(id: u32, title: String, file_url: String, mime_type: String) -> Self {
        Self {
            id,
            title,
            description: None,
            file_url,
            thumbnail_url: None,
            mime_type,
            display_order: 0,
            pinned: false,
            rating: None,
            created_at: chrono::Utc::now().timestamp_millis(),
            updated_at: None,
        }
    }

    /// Current value of an editable text field
    pub fn text_field(&self, field: TextField) -> String {
        match field {
            TextField::Title => self.title.clone(),
            TextField::Description => self.description.clone().unwrap_or_default(),
        }
    }

    /// Apply a single-field update locally
    pub fn apply(&mut self, update: &FieldUpdate) {
        match update {
            FieldUpdate::Title(title) => self.title = title.clone(),
            FieldUpdate::Description(text) => {
                self.description = if text.is_empty() { None } else { Some(text.clone()) };
            }
            FieldUpdate::Pinned(pinned) => self.pinned = *pinned,
            FieldUpdate::Rating(rating) => self.rating = *rating,
        }
    }
}

impl Entity for Asset {
    type Id = u32;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Data needed to insert an asset row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAsset {
    pub title: String,
    pub file_url: String,
    pub thumbnail_url: Option<String>,
    pub mime_type: String,
}

/// Text fields editable in the detail panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextField {
    Title,
    Description,
}

impl TextField {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextField::Title => "title",
            TextField::Description => "description",
        }
    }

    pub fn update(&self, value: String) -> FieldUpdate {
        match self {
            TextField::Title => FieldUpdate::Title(value),
            TextField::Description => FieldUpdate::Description(value),
        }
    }
}

/// A single-row, single-column change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "lowercase")]
pub enum FieldUpdate {
    Title(String),
    Description(String),
    Pinned(bool),
    Rating(Option<u8>),
}

impl FieldUpdate {
    pub fn column(&self) -> &'static str {
        match self {
            FieldUpdate::Title(_) => "title",
            FieldUpdate::Description(_) => "description",
            FieldUpdate::Pinned(_) => "pinned",
            FieldUpdate::Rating(_) => "rating",
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        match self {
            FieldUpdate::Title(title) => {
                if title.trim().is_empty() {
                    return Err(DomainError::InvalidInput("Title cannot be empty".to_string()));
                }
                if title.chars().count() > MAX_TITLE_LEN {
                    return Err(DomainError::InvalidInput(format!(
                        "Title longer than {} characters",
                        MAX_TITLE_LEN
                    )));
                }
                Ok(())
            }
            FieldUpdate::Rating(Some(r)) if *r == 0 || *r > MAX_RATING => Err(
                DomainError::InvalidInput(format!("Rating {} outside 1..={}", r, MAX_RATING)),
            ),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_creation() {
        let asset = Asset::new(1, "Hero".to_string(), "https://cdn/hero.png".to_string(), "image/png".to_string());
        assert_eq!(asset.id(), 1);
        assert!(!asset.pinned);
        assert!(asset.rating.is_none());
        assert!(asset.created_at > 0);
    }

    #[test]
    fn test_apply_updates() {
        let mut asset = Asset::new(1, "Hero".to_string(), String::new(), "image/png".to_string());
        asset.apply(&FieldUpdate::Pinned(true));
        asset.apply(&FieldUpdate::Rating(Some(4)));
        asset.apply(&FieldUpdate::Description(String::new()));
        assert!(asset.pinned);
        assert_eq!(asset.rating, Some(4));
        assert_eq!(asset.description, None);
        assert_eq!(asset.text_field(TextField::Description), "");
    }

    #[test]
    fn test_validation() {
        assert!(FieldUpdate::Title("  ".to_string()).validate().is_err());
        assert!(FieldUpdate::Title("x".repeat(MAX_TITLE_LEN + 1)).validate().is_err());
        assert!(FieldUpdate::Rating(Some(0)).validate().is_err());
        assert!(FieldUpdate::Rating(Some(6)).validate().is_err());
        assert!(FieldUpdate::Rating(None).validate().is_ok());
        assert!(FieldUpdate::Title("Logo v2".to_string()).validate().is_ok());
    }
}
