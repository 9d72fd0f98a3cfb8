use crate::config::AppConfig;
use crate::services::storage::{LocalStorageService, StorageFault, StorageService};
use std::sync::Arc;
use tracing::info;

pub async fn setup_storage(config: &AppConfig) -> Result<Arc<LocalStorageService>, StorageFault> {
    let storage = LocalStorageService::new(&config.storage_dir);

    info!("📂 Photo storage: {}", storage.root().display());

    // Ensure directory exists
    storage.ensure_ready().await?;
    info!("✅ Storage directory is ready");

    Ok(Arc::new(storage))
}
