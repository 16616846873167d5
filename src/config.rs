//! Application configuration
//!
//! Read from a TOML file; every key is optional and falls back to the
//! default below. A missing file means "all defaults".
//!
//! ```toml
//! [storage]
//! db_path = "data/fracht.db"
//! blob_dir = "data/blobs"
//! public_base_url = "http://localhost:8080/files"
//!
//! [autosave]
//! debounce_ms = 800
//!
//! [thumbnails]
//! workers = 2
//! queue_depth = 16
//! timeout_ms = 10000
//! max_edge = 320
//!
//! [logging]
//! dir = "logs"
//! app_name = "fracht-console"
//! max_bytes = 2097152
//! max_files = 3
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use rolling_logger::LoggerConfig;
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, DomainResult};
use crate::thumbnail::PoolConfig;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub autosave: AutosaveConfig,
    pub thumbnails: ThumbnailConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: PathBuf,
    pub blob_dir: PathBuf,
    pub public_base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/fracht.db"),
            blob_dir: PathBuf::from("data/blobs"),
            public_base_url: "http://localhost:8080/files".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveConfig {
    pub debounce_ms: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self { debounce_ms: 800 }
    }
}

impl AutosaveConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    pub workers: usize,
    pub queue_depth: usize,
    pub timeout_ms: u64,
    pub max_edge: u32,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        let pool = PoolConfig::default();
        Self {
            workers: pool.workers,
            queue_depth: pool.queue_depth,
            timeout_ms: pool.timeout.as_millis() as u64,
            max_edge: pool.max_edge,
        }
    }
}

impl ThumbnailConfig {
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            workers: self.workers,
            queue_depth: self.queue_depth,
            timeout: Duration::from_millis(self.timeout_ms),
            max_edge: self.max_edge,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
    pub app_name: String,
    pub max_bytes: u64,
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let logger = LoggerConfig::default();
        Self {
            dir: PathBuf::from("logs"),
            app_name: "fracht-console".to_string(),
            max_bytes: logger.max_bytes,
            max_files: logger.max_files,
        }
    }
}

impl LoggingConfig {
    pub fn logger_config(&self) -> LoggerConfig {
        LoggerConfig {
            max_bytes: self.max_bytes,
            max_files: self.max_files,
            ..LoggerConfig::default()
        }
    }
}

impl AppConfig {
    /// Load from `path`; defaults when the file does not exist
    pub fn load(path: &Path) -> DomainResult<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(DomainError::InvalidInput(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        Self::parse(&text).map_err(|e| {
            DomainError::InvalidInput(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    pub fn parse(text: &str) -> DomainResult<Self> {
        let config: AppConfig =
            toml::from_str(text).map_err(|e| DomainError::InvalidInput(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> DomainResult<()> {
        if self.thumbnails.workers == 0 {
            return Err(DomainError::InvalidInput(
                "thumbnails.workers must be at least 1".to_string(),
            ));
        }
        if self.thumbnails.max_edge == 0 {
            return Err(DomainError::InvalidInput(
                "thumbnails.max_edge must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve relative paths against `base` (usually the config file's directory)
    pub fn rooted_at(mut self, base: &Path) -> Self {
        for path in [
            &mut self.storage.db_path,
            &mut self.storage.blob_dir,
            &mut self.logging.dir,
        ] {
            if path.is_relative() && path.as_os_str() != ":memory:" {
                *path = base.join(&*path);
            }
        }
        self
    }
}
