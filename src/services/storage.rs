use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

#[derive(Debug, Error)]
pub enum StorageFault {
    #[error("failed to prepare storage directory {path:?}: {source}")]
    Prepare {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid storage key '{0}'")]
    InvalidKey(String),
}

#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the backing location if absent. Safe to call repeatedly.
    async fn ensure_ready(&self) -> Result<(), StorageFault>;

    /// Writes `data` under `key`, returning the absolute path written.
    /// Never overwrites an existing object.
    async fn upload_file(&self, key: &str, data: &[u8]) -> Result<PathBuf, StorageFault>;

    async fn health_check(&self) -> bool;

    fn root(&self) -> &Path;
}

/// Flat directory of photos on the local filesystem
pub struct LocalStorageService {
    root: PathBuf,
}

impl LocalStorageService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);
        Self { root }
    }

    /// Keys are single path components; anything that could escape the root is refused.
    fn resolve(&self, key: &str) -> Result<PathBuf, StorageFault> {
        let valid = !key.is_empty()
            && key != "."
            && key != ".."
            && !key.contains(['/', '\\', '\0']);

        if !valid {
            return Err(StorageFault::InvalidKey(key.to_string()));
        }

        Ok(self.root.join(key))
    }
}

#[async_trait]
impl StorageService for LocalStorageService {
    async fn ensure_ready(&self) -> Result<(), StorageFault> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| StorageFault::Prepare {
                path: self.root.clone(),
                source,
            })
    }

    async fn upload_file(&self, key: &str, data: &[u8]) -> Result<PathBuf, StorageFault> {
        let path = self.resolve(key)?;

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|source| StorageFault::Write {
                path: path.clone(),
                source,
            })?;

        write_or_discard(&path, &mut file, data).await?;

        if let Err(source) = file.sync_all().await {
            drop(file);
            discard_partial(&path).await;
            return Err(StorageFault::Write { path, source });
        }

        Ok(path)
    }

    async fn health_check(&self) -> bool {
        match tokio::fs::metadata(&self.root).await {
            Ok(meta) => meta.is_dir() && !meta.permissions().readonly(),
            Err(_) => false,
        }
    }

    fn root(&self) -> &Path {
        &self.root
    }
}

/// Writes all of `data`, removing whatever reached `path` if that fails
async fn write_or_discard<W>(path: &Path, writer: &mut W, data: &[u8]) -> Result<(), StorageFault>
where
    W: AsyncWrite + Unpin,
{
    let written = async {
        writer.write_all(data).await?;
        writer.flush().await
    }
    .await;

    if let Err(source) = written {
        discard_partial(path).await;
        return Err(StorageFault::Write {
            path: path.to_path_buf(),
            source,
        });
    }

    Ok(())
}

async fn discard_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!("Failed to clean up partial file {:?}: {}", path, e);
    }
}
