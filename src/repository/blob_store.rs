//! Filesystem Blob Store
//!
//! Stores uploads under a root directory and serves them from a public base URL.
//! Keys are content-addressed (`blake3`) so re-uploading the same bytes is idempotent.

use async_trait::async_trait;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::path::{Component, Path, PathBuf};

use crate::domain::{DomainError, DomainResult};
use super::traits::BlobStore;

/// Characters escaped in URL path segments
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

pub struct FsBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to a path under the root, rejecting escapes
    fn path_for(&self, key: &str) -> DomainResult<PathBuf> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(DomainError::InvalidInput(format!("Invalid blob key: {}", key)));
        }
        Ok(self.root.join(relative))
    }

    fn url_for(&self, key: &str) -> String {
        let encoded: Vec<String> = key
            .split('/')
            .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
            .collect();
        format!("{}/{}", self.public_base_url, encoded.join("/"))
    }
}

/// Content-addressed key: `<prefix>/<blake3 hex 16>.<ext>`
pub fn content_key(prefix: &str, filename: &str, bytes: &[u8]) -> String {
    let hash = blake3::hash(bytes).to_hex();
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| "bin".to_string());
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{}.{}", &hash[..16], ext)
    } else {
        format!("{}/{}.{}", prefix, &hash[..16], ext)
    }
}

/// Content type guessed from the file name
pub fn content_type_for(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(&self, key: &str, bytes: &[u8], content_type: &str) -> DomainResult<String> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DomainError::Storage(format!("Failed to create blob dir: {}", e)))?;
        }

        // Write then rename so readers never see a partial file
        let tmp = path.with_extension("part");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| DomainError::Storage(format!("Failed to write blob: {}", e)))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| DomainError::Storage(format!("Failed to store blob: {}", e)))?;

        log::info!("Stored blob {} ({} bytes, {})", key, bytes.len(), content_type);
        Ok(self.url_for(key))
    }

    async fn delete(&self, key: &str) -> DomainResult<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DomainError::Storage(format!("Failed to delete blob: {}", e))),
        }
    }

    fn key_for_url(&self, url: &str) -> Option<String> {
        let rest = url.strip_prefix(&self.public_base_url)?.strip_prefix('/')?;
        Some(percent_decode_str(rest).decode_utf8_lossy().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_key_is_stable() {
        let a = content_key("assets", "Hero.PNG", b"abc");
        let b = content_key("/assets/", "other.png", b"abc");
        assert_eq!(a, b);
        assert!(a.starts_with("assets/"));
        assert!(a.ends_with(".png"));
        assert_eq!(content_key("", "noext", b"abc").len(), 16 + ".bin".len());
    }

    #[test]
    fn test_content_type_guess() {
        assert_eq!(content_type_for("a.png"), "image/png");
        assert_eq!(content_type_for("a.unknownext"), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_upload_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path(), "https://cdn.example/files/");

        let url = store
            .upload("assets/my file.png", b"bytes", "image/png")
            .await
            .unwrap();
        assert_eq!(url, "https://cdn.example/files/assets/my%20file.png");
        assert_eq!(
            std::fs::read(dir.path().join("assets/my file.png")).unwrap(),
            b"bytes"
        );
        assert_eq!(store.key_for_url(&url).as_deref(), Some("assets/my file.png"));
        assert_eq!(store.key_for_url("https://elsewhere/x.png"), None);

        store.delete("assets/my file.png").await.unwrap();
        assert!(!dir.path().join("assets/my file.png").exists());
        // deleting twice is fine
        store.delete("assets/my file.png").await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path(), "https://cdn.example");
        assert!(store.upload("../evil", b"x", "text/plain").await.is_err());
        assert!(store.upload("/etc/passwd", b"x", "text/plain").await.is_err());
        assert!(store.upload("", b"x", "text/plain").await.is_err());
    }
}
