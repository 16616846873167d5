//! Comment Entity
//!
//! Review comments left on an asset.

use serde::{Deserialize, Serialize};
use super::entity::{DomainError, DomainResult, Entity};

pub const MAX_COMMENT_LEN: usize = 4000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u32,
    pub asset_id: u32,
    pub author: String,
    pub body: String,
    /// ms since epoch
    pub created_at: i64,
}

impl Comment {
    pub fn new(asset_id: u32, author: String, body: String) -> Self {
        Self {
            id: 0,
            asset_id,
            author,
            body,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.body.trim().is_empty() {
            return Err(DomainError::InvalidInput("Comment cannot be empty".to_string()));
        }
        if self.body.chars().count() > MAX_COMMENT_LEN {
            return Err(DomainError::InvalidInput("Comment too long".to_string()));
        }
        Ok(())
    }
}

impl Entity for Comment {
    type Id = u32;

    fn id(&self) -> Self::Id {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_validation() {
        assert!(Comment::new(1, "ana".to_string(), "Looks good".to_string()).validate().is_ok());
        assert!(Comment::new(1, "ana".to_string(), "\n".to_string()).validate().is_err());
    }
}
