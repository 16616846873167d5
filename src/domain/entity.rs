//! Shared identity and error types
//!
//! Assets, tags, comments and survey responses are all keyed by SQLite
//! row ids. Everything crossing into the state layer or a spawned task has
//! to be `Send + Sync`.

use serde::{Deserialize, Serialize};

/// A stored record with a stable id
pub trait Entity: Sized + Send + Sync + Clone {
    type Id: Copy + Eq + std::hash::Hash + Send + Sync;

    fn id(&self) -> Self::Id;
}

pub type DomainResult<T> = Result<T, DomainError>;

/// Errors shared by repositories, commands and the state layer.
/// Commands flatten them to strings with `Display`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DomainError {
    NotFound(String),
    /// Failed validation (title length, rating range, survey answers, config)
    InvalidInput(String),
    /// Duplicate tag name
    Conflict(String),
    /// The database or blob store rejected the call
    Storage(String),
    Internal(String),
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainError::NotFound(msg) => write!(f, "Not found: {}", msg),
            DomainError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            DomainError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            DomainError::Storage(msg) => write!(f, "Storage error: {}", msg),
            DomainError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}
