use crate::AppState;
use crate::api::error::AppError;
use crate::api::handlers::{ErrorResponse, ImageForm, read_file_field};
use axum::{
    extract::{Multipart, State},
    http::header,
    response::IntoResponse,
};
use std::time::Instant;

#[utoipa::path(
    post,
    path = "/remove-bg",
    request_body(content = ImageForm, content_type = "multipart/form-data", description = "Photo to cut out"),
    responses(
        (status = 200, description = "PNG with transparent background", body = [u8], content_type = "image/png"),
        (status = 400, description = "No file provided", body = ErrorResponse),
        (status = 413, description = "Payload too large", body = ErrorResponse),
        (status = 422, description = "Unsupported or corrupted image", body = ErrorResponse),
        (status = 502, description = "Segmentation backend failed", body = ErrorResponse)
    ),
    tag = "photos"
)]
pub async fn remove_background(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let file = read_file_field(&mut multipart).await?;

    let start = Instant::now();
    let png = state.segmenter.segment(&file.data).await?;
    tracing::info!(
        "Removed background with {} in {:?} ({} -> {} bytes)",
        state.segmenter.name(),
        start.elapsed(),
        file.data.len(),
        png.len()
    );

    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}
