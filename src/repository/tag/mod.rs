//! Tag Repository Module
//!
//! This module provides tag repository functionality split into specialized sub-modules:
//! - tag_repo: Core CRUD operations
//! - asset_tag: Asset-Tag relationship operations

mod tag_repo;
mod asset_tag;

pub use tag_repo::TagRepository;

// Re-export operation traits so they can be used by importing TagRepository
pub use asset_tag::AssetTagOperations;
