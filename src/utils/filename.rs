use crate::utils::validation::{DetectedImage, extension_matches, file_extension};
use rand::RngCore;
use rand::rngs::OsRng;

pub const FILENAME_PREFIX: &str = "photo-";
pub const DEFAULT_EXTENSION: &str = "png";

/// 128 random bits from the OS CSPRNG, hex encoded (32 chars)
pub fn random_token() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Picks the stored extension: the client's when it names the sniffed format,
/// `.png` when the client sent none, the sniffed format's otherwise
pub fn resolve_extension(original_filename: &str, detected: &DetectedImage) -> String {
    match file_extension(original_filename) {
        None => DEFAULT_EXTENSION.to_string(),
        Some(ext) if extension_matches(ext, detected) => ext.to_ascii_lowercase(),
        Some(ext) => {
            tracing::warn!(
                "Extension '{}' does not match content, using sniffed '{}'",
                ext,
                detected.extension
            );
            detected.extension.to_string()
        }
    }
}

/// `photo-<32 hex chars>.<ext>`
pub fn generate_photo_filename(original_filename: &str, detected: &DetectedImage) -> String {
    format!(
        "{}{}.{}",
        FILENAME_PREFIX,
        random_token(),
        resolve_extension(original_filename, detected)
    )
}
