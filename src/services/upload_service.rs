use crate::config::AppConfig;
use crate::models::{StoredImage, UploadedFile};
use crate::services::storage::{StorageFault, StorageService};
use crate::utils::filename::generate_photo_filename;
use crate::utils::validation::{ValidationError, validate_image_upload};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageFault),
}

pub struct UploadService {
    storage: Arc<dyn StorageService>,
    config: AppConfig,
}

impl UploadService {
    pub fn new(storage: Arc<dyn StorageService>, config: AppConfig) -> Self {
        Self { storage, config }
    }

    /// Validates, names and persists one photo.
    /// Nothing touches the filesystem unless validation passes.
    pub async fn store_image(&self, file: &UploadedFile) -> Result<StoredImage, UploadError> {
        let detected = validate_image_upload(file.content_type.as_deref(), &file.data)?;

        let filename = generate_photo_filename(&file.file_name, &detected);
        let path = self.storage.upload_file(&filename, &file.data).await?;

        Ok(StoredImage {
            url: self.config.public_url_for(&filename),
            filename,
            path,
            mime_type: detected.mime_type.to_string(),
            size: file.data.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::storage::LocalStorageService;
    use bytes::Bytes;

    const PNG_BYTES: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3, 4];

    async fn service(dir: &std::path::Path) -> UploadService {
        let storage = Arc::new(LocalStorageService::new(dir));
        storage.ensure_ready().await.unwrap();
        UploadService::new(storage, AppConfig::development(dir))
    }

    fn upload(content_type: Option<&str>, file_name: &str, data: &'static [u8]) -> UploadedFile {
        UploadedFile {
            data: Bytes::from_static(data),
            content_type: content_type.map(str::to_string),
            file_name: file_name.to_string(),
        }
    }

    fn entries(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_store_image() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path()).await;

        let stored = service
            .store_image(&upload(Some("image/png"), "booth.png", PNG_BYTES))
            .await
            .unwrap();

        assert!(stored.filename.starts_with("photo-"));
        assert!(stored.filename.ends_with(".png"));
        assert_eq!(stored.mime_type, "image/png");
        assert_eq!(stored.size, PNG_BYTES.len() as u64);
        assert_eq!(
            stored.url,
            format!("http://localhost:8000/uploads/{}", stored.filename)
        );
        assert_eq!(std::fs::read(&stored.path).unwrap(), PNG_BYTES);
    }

    #[tokio::test]
    async fn test_rejected_upload_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path()).await;

        let cases = [
            upload(Some("text/plain"), "notes.txt", b"hello"),
            upload(Some("application/pdf"), "doc.pdf", b"%PDF-1.5"),
            upload(None, "photo.png", PNG_BYTES),
            upload(Some("image/png"), "fake.png", b"<?php echo 1; ?>"),
            upload(Some("image/png"), "empty.png", b""),
        ];

        for case in &cases {
            let err = service.store_image(case).await.unwrap_err();
            assert!(matches!(err, UploadError::Validation(_)));
        }
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_identical_concurrent_uploads_get_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path()).await;
        let file = upload(Some("image/png"), "same.png", PNG_BYTES);

        let (a, b) = tokio::join!(service.store_image(&file), service.store_image(&file));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.filename, b.filename);
        assert_ne!(a.url, b.url);
        assert_eq!(entries(dir.path()), 2);
    }

    #[tokio::test]
    async fn test_missing_extension_defaults_to_png() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path()).await;

        let stored = service
            .store_image(&upload(Some("image/png"), "blob", PNG_BYTES))
            .await
            .unwrap();
        assert!(stored.filename.ends_with(".png"));
    }

    #[tokio::test]
    async fn test_storage_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(LocalStorageService::new(dir.path().join("missing")));
        let service = UploadService::new(storage, AppConfig::development(dir.path()));

        let err = service
            .store_image(&upload(Some("image/png"), "a.png", PNG_BYTES))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Storage(_)));
    }
}
