//! Repository Layer - Core Traits
//!
//! Defines the abstract interfaces for data access.
//! The state core only sees these traits, so tests can swap in fakes.

use async_trait::async_trait;
use crate::domain::{Asset, DomainResult, Entity, FieldUpdate, NewAsset, PositionUpdate};

/// Core repository trait for CRUD operations
///
/// Generic over any Entity type.
/// All operations are async to support various backends.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Create a new entity
    async fn create(&self, entity: &T) -> DomainResult<T>;

    /// Find entity by ID
    async fn find_by_id(&self, id: T::Id) -> DomainResult<Option<T>>;

    /// List all entities
    async fn list(&self) -> DomainResult<Vec<T>>;

    /// Update an existing entity
    async fn update(&self, entity: &T) -> DomainResult<T>;

    /// Delete entity by ID
    async fn delete(&self, id: T::Id) -> DomainResult<()>;
}

/// "The database" as seen by the gallery core
#[async_trait]
pub trait GalleryStore: Send + Sync {
    /// All assets, unsorted
    async fn list_assets(&self) -> DomainResult<Vec<Asset>>;

    /// Apply a full positional reassignment as one unit.
    /// Either every row is updated or none is.
    async fn persist_reorder(&self, updates: &[PositionUpdate]) -> DomainResult<()>;

    /// Single-row, single-field update
    async fn persist_field_value(&self, id: u32, update: &FieldUpdate) -> DomainResult<()>;

    /// Insert at the end of the manual order
    async fn create_asset(&self, asset: &NewAsset) -> DomainResult<Asset>;

    async fn delete_asset(&self, id: u32) -> DomainResult<()>;
}

/// "The blob store": binary payload in, public URL out
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, key: &str, bytes: &[u8], content_type: &str) -> DomainResult<String>;

    async fn delete(&self, key: &str) -> DomainResult<()>;

    /// Reverse of the URL returned by `upload`, if it belongs to this store
    fn key_for_url(&self, url: &str) -> Option<String>;
}
