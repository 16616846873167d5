//! Repository Layer
//!
//! Data access abstractions ("the database", "the blob store") and their
//! SQLite / filesystem implementations.

mod traits;
pub mod db;
mod asset_repo;
mod tag;
mod comment_repo;
mod survey_repo;
pub mod blob_store;

#[cfg(test)]
mod tests;

pub use traits::{BlobStore, GalleryStore, Repository};
pub use db::{init_db, DbState, SharedConnection};
pub use asset_repo::AssetRepository;
pub use tag::{AssetTagOperations, TagRepository};
pub use comment_repo::CommentRepository;
pub use survey_repo::SurveyRepository;
pub use blob_store::FsBlobStore;
