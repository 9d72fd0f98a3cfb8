pub mod health;
pub mod remove_bg;
pub mod upload;

use crate::api::error::AppError;
use crate::models::UploadedFile;
use axum::extract::Multipart;
use serde::Serialize;
use utoipa::ToSchema;

/// Form field every endpoint reads the image from
pub const FILE_FIELD: &str = "file";

/// Multipart body accepted by `/upload` and `/remove-bg`
#[derive(ToSchema)]
pub struct ImageForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

/// Body of every non-2xx JSON response
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Pulls the first `file` field out of the request, skipping anything else
pub async fn read_file_field(multipart: &mut Multipart) -> Result<UploadedFile, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(|s| s.to_string());
        let data = field.bytes().await?;

        return Ok(UploadedFile {
            data,
            content_type,
            file_name,
        });
    }

    Err(AppError::BadRequest("No file provided".to_string()))
}
