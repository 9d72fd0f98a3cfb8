use bytes::Bytes;
use std::path::PathBuf;

/// One `file` field pulled out of a multipart request
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub data: Bytes,
    pub content_type: Option<String>,
    /// Client supplied, untrusted, possibly empty
    pub file_name: String,
}

/// A photo persisted in the storage directory
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub filename: String,
    pub path: PathBuf,
    pub url: String,
    pub mime_type: String,
    pub size: u64,
}
