use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for the photo booth service
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory uploaded photos are written to (default: "uploads")
    pub storage_dir: PathBuf,

    /// Public origin used to build photo URLs (default: "http://localhost:8000")
    pub public_base_url: String,

    /// Allowed CORS Origins (comma separated)
    pub allowed_origins: Vec<String>,

    /// Maximum request body size in bytes (default: 20 MB)
    pub max_file_size: usize,

    /// Segmentation backend: "builtin" or "rembg" (default: "builtin")
    pub segmenter_type: String,

    /// rembg server endpoint (default: "http://127.0.0.1:7000/api/remove")
    pub rembg_url: String,

    /// Timeout for a single rembg call in seconds (default: 60)
    pub rembg_timeout_secs: u64,

    /// Colour distance under which a pixel counts as background (default: 32)
    pub segment_tolerance: u8,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("uploads"),
            public_base_url: "http://localhost:8000".to_string(),
            allowed_origins: vec!["http://localhost:5174".to_string()],
            max_file_size: 20 * 1024 * 1024, // 20 MB
            segmenter_type: "builtin".to_string(),
            rembg_url: "http://127.0.0.1:7000/api/remove".to_string(),
            rembg_timeout_secs: 60,
            segment_tolerance: 32,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            storage_dir: env::var("STORAGE_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(default.storage_dir),

            public_base_url: env::var("PUBLIC_BASE_URL")
                .ok()
                .filter(|v| url::Url::parse(v).is_ok())
                .unwrap_or(default.public_base_url),

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(default.allowed_origins),

            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            segmenter_type: env::var("SEGMENTER").unwrap_or(default.segmenter_type),

            rembg_url: env::var("REMBG_URL").unwrap_or(default.rembg_url),

            rembg_timeout_secs: env::var("REMBG_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.rembg_timeout_secs),

            segment_tolerance: env::var("SEGMENT_TOLERANCE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.segment_tolerance),
        }
    }

    /// Config for tests and local runs: builtin segmenter, given storage directory
    pub fn development(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            ..Self::default()
        }
    }

    pub fn rembg_timeout(&self) -> Duration {
        Duration::from_secs(self.rembg_timeout_secs)
    }

    /// Public URL of a stored photo, never doubling the slash after the origin
    pub fn public_url_for(&self, filename: &str) -> String {
        format!(
            "{}/uploads/{}",
            self.public_base_url.trim_end_matches('/'),
            filename
        )
    }
}
