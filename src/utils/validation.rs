use std::path::Path;

/// Extra spellings accepted for a sniffed format besides `infer`'s own extension
const EXTENSION_ALIASES: &[(&str, &[&str])] = &[
    ("image/jpeg", &["jpeg", "jpe", "jfif"]),
    ("image/tiff", &["tiff"]),
    ("image/heif", &["heic"]),
];

/// Client-facing message for every rejected upload
pub const INVALID_FILE_TYPE: &str = "Invalid file type";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Image format recognised from the leading bytes of a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectedImage {
    pub mime_type: &'static str,
    pub extension: &'static str,
}

/// Strips parameters and normalizes case: `Image/PNG; q=1` -> `image/png`
pub fn normalize_media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase()
}

/// Checks the client-declared media type is in the `image/` family
pub fn validate_declared_type(content_type: Option<&str>) -> Result<(), ValidationError> {
    let declared = content_type.map(normalize_media_type).unwrap_or_default();

    if declared.starts_with("image/") {
        return Ok(());
    }

    Err(ValidationError {
        code: "INVALID_MIME_TYPE",
        message: format!("declared media type '{}' is not an image", declared),
    })
}

/// Sniffs magic bytes; only content `infer` classifies as an image passes
pub fn sniff_image(bytes: &[u8]) -> Result<DetectedImage, ValidationError> {
    if bytes.is_empty() {
        return Err(ValidationError {
            code: "EMPTY_FILE",
            message: "File appears to be empty".to_string(),
        });
    }

    match infer::get(bytes) {
        Some(kind) if kind.matcher_type() == infer::MatcherType::Image => Ok(DetectedImage {
            mime_type: kind.mime_type(),
            extension: kind.extension(),
        }),
        Some(kind) => Err(ValidationError {
            code: "CONTENT_MISMATCH",
            message: format!("content detected as '{}', not an image", kind.mime_type()),
        }),
        None => Err(ValidationError {
            code: "CONTENT_MISMATCH",
            message: "content type could not be recognised".to_string(),
        }),
    }
}

/// Full validation pipeline for photo uploads
pub fn validate_image_upload(
    content_type: Option<&str>,
    bytes: &[u8],
) -> Result<DetectedImage, ValidationError> {
    // 1. Declared type
    validate_declared_type(content_type)?;

    // 2. Actual content
    let detected = sniff_image(bytes)?;

    if let Some(declared) = content_type.map(normalize_media_type)
        && declared != detected.mime_type
    {
        tracing::debug!(
            "Declared media type '{}' differs from sniffed '{}', trusting content",
            declared,
            detected.mime_type
        );
    }

    Ok(detected)
}

/// Text after the last '.' of the final path component, if any
pub fn file_extension(filename: &str) -> Option<&str> {
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    match name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => Some(ext),
        _ => None,
    }
}

/// True when `ext` (any case) names the format the content was sniffed as
pub fn extension_matches(ext: &str, detected: &DetectedImage) -> bool {
    let ext = ext.to_ascii_lowercase();
    if ext == detected.extension {
        return true;
    }

    EXTENSION_ALIASES
        .iter()
        .filter(|(mime, _)| *mime == detected.mime_type)
        .any(|(_, aliases)| aliases.contains(&ext.as_str()))
}
