//! Tag Entity
//!
//! Tags can be attached to assets for categorization and filtering.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use super::entity::{DomainError, DomainResult, Entity};

/// A tag for categorizing assets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    /// Unique identifier
    pub id: u32,
    /// Tag name
    pub name: String,
    /// Color (hex, e.g., "#FF5733")
    pub color: Option<String>,
}

impl Tag {
    pub fn new(id: u32, name: String) -> Self {
        Self {
            id,
            name,
            color: None,
        }
    }

    pub fn with_color(id: u32, name: String, color: String) -> Self {
        Self {
            id,
            name,
            color: Some(color),
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::InvalidInput("Tag name cannot be empty".to_string()));
        }
        if let Some(color) = &self.color {
            if !hex_color().is_match(color) {
                return Err(DomainError::InvalidInput(format!("Invalid tag color: {}", color)));
            }
        }
        Ok(())
    }
}

fn hex_color() -> &'static Regex {
    static HEX: OnceLock<Regex> = OnceLock::new();
    HEX.get_or_init(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("static regex"))
}

impl Entity for Tag {
    type Id = u32;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Join table entry for asset-tag relationship
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetTag {
    pub asset_id: u32,
    pub tag_id: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_creation() {
        let tag = Tag::new(1, "Work".to_string());
        assert_eq!(tag.id(), 1);
        assert_eq!(tag.name, "Work");
        assert!(tag.color.is_none());
    }

    #[test]
    fn test_tag_with_color() {
        let tag = Tag::with_color(2, "Urgent".to_string(), "#FF0000".to_string());
        assert_eq!(tag.color, Some("#FF0000".to_string()));
        assert!(tag.validate().is_ok());
    }

    #[test]
    fn test_tag_validation() {
        assert!(Tag::new(0, " ".to_string()).validate().is_err());
        assert!(Tag::with_color(0, "x".to_string(), "red".to_string()).validate().is_err());
        assert!(Tag::with_color(0, "x".to_string(), "#abc".to_string()).validate().is_ok());
    }
}
