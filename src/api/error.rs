use crate::services::segmentation::ProcessingFault;
use crate::services::storage::StorageFault;
use crate::services::upload_service::UploadError;
use crate::utils::validation::{INVALID_FILE_TYPE, ValidationError};
use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid file type: {0}")]
    InvalidFileType(#[from] ValidationError),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    #[error("Processing error: {0}")]
    Processing(#[from] ProcessingFault),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageFault),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Validation(e) => AppError::InvalidFileType(e),
            UploadError::Storage(e) => AppError::Storage(e),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        let status = err.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge("Uploaded file is too large".to_string())
        } else {
            AppError::BadRequest(format!("Malformed multipart body: {}", err.body_text()))
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InvalidFileType(e) => {
                tracing::info!("Rejected upload: {}", e);
                (StatusCode::BAD_REQUEST, INVALID_FILE_TYPE.to_string())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            AppError::Processing(ProcessingFault::UnsupportedImage(detail)) => {
                tracing::warn!("Undecodable image: {}", detail);
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "Unsupported or corrupted image".to_string(),
                )
            }
            AppError::Processing(ProcessingFault::Backend(detail)) => {
                tracing::error!("Segmentation backend error: {}", detail);
                (
                    StatusCode::BAD_GATEWAY,
                    "Background removal failed".to_string(),
                )
            }
            AppError::Storage(e) => {
                tracing::error!("Storage error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
