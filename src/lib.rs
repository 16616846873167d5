//! Fracht Console Backend
//!
//! Layered architecture:
//! - domain: Core entities and business rules
//! - repository: Data access abstractions and implementations
//! - state: Optimistic gallery order, debounced autosave, notices
//! - thumbnail: Background thumbnail worker pool
//! - commands: Operations invoked by the UI

use std::sync::Arc;

pub mod config;
pub mod domain;
pub mod repository;
pub mod state;
pub mod thumbnail;
pub mod commands;

use config::AppConfig;
use domain::DomainResult;
use repository::{
    init_db, AssetRepository, BlobStore, CommentRepository, DbState, FsBlobStore,
    GalleryStore, SurveyRepository, TagRepository,
};
use state::{notice_channel, AutosaveController, GalleryState, NoticeReceiver, Notifier};
use thumbnail::ThumbnailPool;

/// Application state shared across commands
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db_state: DbState,
    pub assets: AssetRepository,
    pub tags: TagRepository,
    pub comments: CommentRepository,
    pub surveys: SurveyRepository,
    pub blobs: Arc<dyn BlobStore>,
    pub thumbnails: ThumbnailPool,
    pub gallery: GalleryState,
    pub autosave: AutosaveController,
    pub notifier: Notifier,
}

impl AppState {
    /// Open storage and start background workers.
    /// Must be called from within a tokio runtime.
    pub async fn open(config: AppConfig) -> DomainResult<(Self, NoticeReceiver)> {
        let db_state = init_db(&config.storage.db_path).await?;
        let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(
            config.storage.blob_dir.clone(),
            &config.storage.public_base_url,
        ));
        Ok(Self::with_blob_store(config, db_state, blobs))
    }

    pub fn with_blob_store(
        config: AppConfig,
        db_state: DbState,
        blobs: Arc<dyn BlobStore>,
    ) -> (Self, NoticeReceiver) {
        let (notifier, notices) = notice_channel();

        let assets = AssetRepository::new(db_state.conn.clone());
        let store: Arc<dyn GalleryStore> = Arc::new(assets.clone());
        let gallery = GalleryState::new(store.clone(), notifier.clone());
        let autosave =
            AutosaveController::with_debounce(store, notifier.clone(), config.autosave.debounce())
                .mirror_to(gallery.clone());
        let thumbnails = ThumbnailPool::with_image_renderer(config.thumbnails.pool_config());

        let state = Self {
            tags: TagRepository::new(db_state.conn.clone()),
            comments: CommentRepository::new(db_state.conn.clone()),
            surveys: SurveyRepository::new(db_state.conn.clone()),
            assets,
            blobs,
            thumbnails,
            gallery,
            autosave,
            notifier,
            db_state,
            config,
        };
        log::info!("App state ready (db: {})", state.db_state.path.display());
        (state, notices)
    }
}
