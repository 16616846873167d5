//! Database Connection and Setup
//!
//! Manages SQLite database connection and migrations.

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::{DomainError, DomainResult};

/// Shared connection handle used by every repository
pub type SharedConnection = Arc<Mutex<Option<Connection>>>;

/// Database state wrapper
#[derive(Clone)]
pub struct DbState {
    pub conn: SharedConnection,
    pub path: PathBuf,
}

impl DbState {
    pub fn new(path: PathBuf) -> Self {
        Self {
            conn: Arc::new(Mutex::new(None)),
            path,
        }
    }

    pub async fn is_initialized(&self) -> bool {
        self.conn.lock().await.is_some()
    }

    pub async fn close(&self) {
        let mut guard = self.conn.lock().await;
        *guard = None;
    }
}

/// Initialize database with path (`:memory:` for an in-memory database)
pub async fn init_db(db_path: &Path) -> DomainResult<DbState> {
    let conn = if db_path == Path::new(":memory:") {
        Connection::open_in_memory()
    } else {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DomainError::Storage(format!("Failed to create db dir: {}", e)))?;
            }
        }
        Connection::open(db_path)
    }
    .map_err(|e| DomainError::Storage(format!("Failed to open db: {}", e)))?;

    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(|e| DomainError::Storage(e.to_string()))?;

    run_migrations(&conn)?;

    let state = DbState::new(db_path.to_path_buf());
    *state.conn.lock().await = Some(conn);

    log::info!("Database ready at {}", db_path.display());
    Ok(state)
}

/// Check if a column exists in a table
fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
    let query = format!("PRAGMA table_info({})", table);
    let Ok(mut stmt) = conn.prepare(&query) else {
        return false;
    };
    let Ok(mut rows) = stmt.query([]) else {
        return false;
    };
    while let Ok(Some(row)) = rows.next() {
        if let Ok(name) = row.get::<_, String>(1) {
            if name == column {
                return true;
            }
        }
    }
    false
}

/// Run database migrations
fn run_migrations(conn: &Connection) -> DomainResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS assets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            file_url TEXT NOT NULL,
            thumbnail_url TEXT,
            mime_type TEXT NOT NULL DEFAULT 'application/octet-stream',
            display_order INTEGER NOT NULL DEFAULT 0,
            pinned INTEGER NOT NULL DEFAULT 0,
            rating INTEGER,
            created_at INTEGER NOT NULL,
            updated_at INTEGER
        );

        CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            color TEXT,
            updated_at INTEGER
        );

        CREATE TABLE IF NOT EXISTS asset_tags (
            asset_id INTEGER NOT NULL REFERENCES assets(id) ON DELETE CASCADE,
            tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
            PRIMARY KEY (asset_id, tag_id)
        );

        CREATE TABLE IF NOT EXISTS comments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            asset_id INTEGER NOT NULL REFERENCES assets(id) ON DELETE CASCADE,
            author TEXT NOT NULL,
            body TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS survey_responses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            survey_id TEXT NOT NULL,
            answers TEXT NOT NULL,
            submitted_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_comments_asset ON comments(asset_id);
        CREATE INDEX IF NOT EXISTS idx_survey_responses_survey ON survey_responses(survey_id);",
    )
    .map_err(|e| DomainError::Storage(format!("Migration failed: {}", e)))?;

    // Columns added after the first release
    if !column_exists(conn, "assets", "description") {
        conn.execute("ALTER TABLE assets ADD COLUMN description TEXT", [])
            .map_err(|e| DomainError::Storage(format!("Failed to add description: {}", e)))?;
    }

    Ok(())
}

/// Borrow the open connection or fail with a storage error
pub(crate) fn require(conn: &Option<Connection>) -> DomainResult<&Connection> {
    conn.as_ref()
        .ok_or_else(|| DomainError::Storage("Database not initialized".to_string()))
}

pub(crate) fn require_mut(conn: &mut Option<Connection>) -> DomainResult<&mut Connection> {
    conn.as_mut()
        .ok_or_else(|| DomainError::Storage("Database not initialized".to_string()))
}

pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_in_memory_and_close() {
        let state = init_db(Path::new(":memory:")).await.unwrap();
        assert!(state.is_initialized().await);
        {
            let guard = state.conn.lock().await;
            let conn = require(&guard).unwrap();
            assert!(column_exists(conn, "assets", "description"));
            assert!(!column_exists(conn, "assets", "nope"));
        }
        state.close().await;
        assert!(!state.is_initialized().await);
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("fracht.db");
        let first = init_db(&path).await.unwrap();
        first.close().await;
        let second = init_db(&path).await.unwrap();
        assert!(second.is_initialized().await);
    }
}
