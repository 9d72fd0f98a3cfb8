use crate::AppState;
use crate::api::error::AppError;
use crate::api::handlers::{ErrorResponse, ImageForm, read_file_field};
use axum::{
    Json,
    extract::{Multipart, State},
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    pub success: bool,
    pub url: String,
}

#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = ImageForm, content_type = "multipart/form-data", description = "Photo to store"),
    responses(
        (status = 200, description = "Photo stored", body = UploadResponse),
        (status = 400, description = "Invalid file type", body = ErrorResponse),
        (status = 413, description = "Payload too large", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    tag = "photos"
)]
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let file = read_file_field(&mut multipart).await?;
    let stored = state.upload_service.store_image(&file).await?;

    tracing::info!(
        "Stored photo {} ({}, {} bytes) at {:?}",
        stored.filename,
        stored.mime_type,
        stored.size,
        stored.path
    );

    Ok(Json(UploadResponse {
        success: true,
        url: stored.url,
    }))
}
