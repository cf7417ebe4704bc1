//! # Local media store
//!
//! Listing images on the local filesystem, served back under a URL prefix.
//! Files get random names sharded by their first two characters
//! (`ab/ab12…ef.png`), so two listings never share a file and deleting one
//! listing's images cannot touch another's.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use mime::Mime;
use tokio::fs;
use tracing::{debug, instrument};
use uuid::Uuid;

use domains::{DomainError, MediaStore, Result};

pub struct LocalMediaStore {
    /// Root directory for all uploads (e.g., "./uploads")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/uploads")
    url_prefix: String,
}

impl LocalMediaStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            root_path: root.into(),
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_path
    }

    /// Maps a public URL back to a path under the root, refusing anything
    /// that is not one of ours or that tries to climb out of the root.
    fn path_for_url(&self, url: &str) -> Option<PathBuf> {
        let relative = url.strip_prefix(&self.url_prefix)?.strip_prefix('/')?;
        let relative = Path::new(relative);
        if relative.as_os_str().is_empty()
            || !relative.components().all(|c| matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root_path.join(relative))
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    #[instrument(skip(self, data), fields(size = data.len()))]
    async fn save_image(&self, data: Bytes, content_type: &Mime) -> Result<String> {
        // Trust the bytes, not the declared type.
        let format = image::guess_format(&data)
            .map_err(|_| DomainError::validation("uploaded file is not a supported image"))?;
        let extension = format.extensions_str().first().copied().unwrap_or("img");

        let name = Uuid::new_v4().simple().to_string();
        let shard = &name[0..2];
        let file_name = format!("{name}.{extension}");

        let dir = self.root_path.join(shard);
        fs::create_dir_all(&dir).await.map_err(DomainError::persistence)?;
        fs::write(dir.join(&file_name), &data)
            .await
            .map_err(DomainError::persistence)?;

        debug!(declared = %content_type, detected = ?format, "image stored");
        Ok(format!("{}/{}/{}", self.url_prefix, shard, file_name))
    }

    async fn delete(&self, url: &str) -> Result<()> {
        let Some(path) = self.path_for_url(url) else {
            return Err(DomainError::validation(format!("not a local media URL: {url}")));
        };
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DomainError::persistence(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn store() -> LocalMediaStore {
        let root = std::env::temp_dir().join(format!("estate-media-{}", Uuid::new_v4()));
        LocalMediaStore::new(root, "/uploads/")
    }

    #[tokio::test]
    async fn test_save_then_delete_image() {
        let store = store();
        let url = store
            .save_image(Bytes::from_static(PNG_MAGIC), &mime::IMAGE_PNG)
            .await
            .unwrap();

        assert!(url.starts_with("/uploads/"));
        assert!(url.ends_with(".png"));
        let path = store.path_for_url(&url).unwrap();
        assert!(path.exists());

        store.delete(&url).await.unwrap();
        assert!(!path.exists());
        // Deleting twice is fine.
        store.delete(&url).await.unwrap();
    }

    #[tokio::test]
    async fn test_same_bytes_get_distinct_files() {
        let store = store();
        let a = store.save_image(Bytes::from_static(PNG_MAGIC), &mime::IMAGE_PNG).await.unwrap();
        let b = store.save_image(Bytes::from_static(PNG_MAGIC), &mime::IMAGE_PNG).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_rejects_non_image_bytes() {
        let store = store();
        let err = store
            .save_image(Bytes::from_static(b"hello world"), &mime::IMAGE_PNG)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn test_url_mapping_refuses_traversal() {
        let store = store();
        assert!(store.path_for_url("/uploads/../etc/passwd").is_none());
        assert!(store.path_for_url("/elsewhere/ab/file.png").is_none());
        assert!(store.path_for_url("/uploadsX/ab/file.png").is_none());
        assert!(store.path_for_url("/uploads//etc/passwd").is_none());
        assert!(store.path_for_url("/uploads/").is_none());
        assert_eq!(
            store.path_for_url("/uploads/ab/ab12.png").unwrap(),
            store.root().join("ab/ab12.png")
        );
    }
}
