use crate::config::AppConfig;
use crate::services::segmentation::{Segmenter, create_segmenter};
use std::sync::Arc;
use tracing::info;

pub async fn setup_segmenter(config: &AppConfig) -> Arc<dyn Segmenter> {
    let segmenter = create_segmenter(config);

    // Warm up the backend connection
    if segmenter.health_check().await {
        info!("✂️  Segmenter '{}' ready", segmenter.name());
    } else {
        tracing::warn!(
            "⚠️  Segmenter '{}' unreachable at {}! /remove-bg will fail until it comes up.",
            segmenter.name(),
            config.rembg_url
        );
    }

    segmenter.into()
}
