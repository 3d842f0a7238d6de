//! Directory-backed picture storage.
//!
//! Objects are plain files under a root directory and are served from a
//! public base URL; by default that is the `file://` URL of the root itself.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::ports::{ObjectStore, UploadOptions};

const SERVICE: &str = "object store";

/// [`ObjectStore`] over a local directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    base_url: String,
}

impl LocalObjectStore {
    /// Create a store rooted at `root`, publishing under `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DirectoryCreate`] if the root cannot be created.
    pub fn open(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| Error::DirectoryCreate {
            path: root.clone(),
            source,
        })?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        info!(root = %root.display(), %base_url, "object store ready");
        Ok(Self { root, base_url })
    }

    /// The directory objects are written to.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an object path inside the root, refusing anything that would
    /// escape it.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let safe = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if safe {
            Ok(self.root.join(relative))
        } else {
            Err(Error::collaborator(SERVICE, format!("Invalid object path: {path}")))
        }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload(&self, path: &str, bytes: &[u8], options: &UploadOptions) -> Result<()> {
        let target = self.resolve(path)?;
        if !options.upsert && tokio::fs::try_exists(&target).await? {
            return Err(Error::collaborator(SERVICE, "The resource already exists"));
        }
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(&target, bytes).await?;
        debug!(
            path = %target.display(),
            size = bytes.len(),
            content_type = %options.content_type,
            "object stored"
        );
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let path = url
            .strip_prefix(&self.base_url)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| Error::collaborator(SERVICE, format!("Not a URL of this store: {url}")))?;
        let target = self.resolve(path)?;
        match tokio::fs::read(&target).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::collaborator(SERVICE, "Object not found"))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn options(upsert: bool) -> UploadOptions {
        UploadOptions {
            content_type: "image/jpeg".to_string(),
            upsert,
        }
    }

    fn store(temp: &TempDir) -> LocalObjectStore {
        LocalObjectStore::open(temp.path().join("pictures"), "https://cdn.test/pictures/").unwrap()
    }

    #[tokio::test]
    async fn test_upload_then_fetch_by_public_url() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);

        store
            .upload("user-1/1700000000000.jpg", b"jpeg", &options(true))
            .await
            .unwrap();
        let url = store.public_url("user-1/1700000000000.jpg");

        assert_eq!(url, "https://cdn.test/pictures/user-1/1700000000000.jpg");
        assert_eq!(store.fetch(&url).await.unwrap(), b"jpeg");
        assert!(store.root().join("user-1/1700000000000.jpg").exists());
    }

    #[tokio::test]
    async fn test_upsert_controls_overwrite() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);

        store.upload("a/b.jpg", b"one", &options(false)).await.unwrap();
        let err = store.upload("a/b.jpg", b"two", &options(false)).await.unwrap_err();
        assert_eq!(err.to_string(), "The resource already exists");

        store.upload("a/b.jpg", b"two", &options(true)).await.unwrap();
        let url = store.public_url("a/b.jpg");
        assert_eq!(store.fetch(&url).await.unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);

        for path in ["../x.jpg", "/etc/passwd", "a/../../x.jpg", ""] {
            let err = store.upload(path, b"x", &options(true)).await.unwrap_err();
            assert!(err.is_collaborator(), "{path} should be rejected");
        }
    }

    #[tokio::test]
    async fn test_fetch_foreign_or_missing_url() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);

        let err = store.fetch("https://elsewhere.test/a.jpg").await.unwrap_err();
        assert!(err.is_collaborator());

        let err = store
            .fetch("https://cdn.test/pictures/nope.jpg")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Object not found");
    }
}
