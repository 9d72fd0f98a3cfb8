use axum::{
    Router,
    body::Body,
    extract::Multipart,
    http::{Request, StatusCode, header},
    response::IntoResponse,
    routing::post,
};
use http_body_util::BodyExt;
use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
use photobooth_backend::config::AppConfig;
use photobooth_backend::services::segmentation::{
    ProcessingFault, RembgSegmenter, Segmenter, remove_background,
};
use photobooth_backend::services::storage::{LocalStorageService, StorageService};
use photobooth_backend::{AppState, create_app};
use serde_json::Value;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// Mimics `rembg s`: reads the `file` field, answers with a PNG cut-out or 400
async fn fake_remove(mut multipart: Multipart) -> impl IntoResponse {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }
        let data = match field.bytes().await {
            Ok(data) => data,
            Err(_) => return StatusCode::BAD_REQUEST.into_response(),
        };
        return match remove_background(&data, 32) {
            Ok(png) => ([(header::CONTENT_TYPE, "image/png")], png).into_response(),
            Err(_) => StatusCode::BAD_REQUEST.into_response(),
        };
    }
    StatusCode::BAD_REQUEST.into_response()
}

async fn spawn_fake_rembg() -> SocketAddr {
    let app = Router::new()
        .route("/api/remove", post(fake_remove))
        .route(
            "/api/broken",
            post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        )
        .route("/api/text", post(|| async { "this is not a png" }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Port nothing listens on: bind, read the port, drop the listener
async fn closed_port() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

fn sample_png() -> Vec<u8> {
    let mut img = RgbaImage::from_pixel(24, 24, Rgba([0, 255, 0, 255]));
    for y in 6..18 {
        for x in 6..18 {
            img.put_pixel(x, y, Rgba([240, 200, 160, 255]));
        }
    }
    let mut out = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut out), ImageOutputFormat::Png)
        .unwrap();
    out
}

fn segmenter(addr: SocketAddr, path: &str) -> RembgSegmenter {
    RembgSegmenter::new(format!("http://{}{}", addr, path), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_rembg_segmenter_returns_png() {
    let addr = spawn_fake_rembg().await;
    let rembg = segmenter(addr, "/api/remove");

    assert_eq!(rembg.name(), "rembg");
    assert!(rembg.health_check().await);

    let out = rembg.segment(&sample_png()).await.unwrap();
    let cutout = image::load_from_memory(&out).unwrap().to_rgba8();
    assert_eq!(cutout.get_pixel(0, 0)[3], 0);
    assert_eq!(cutout.get_pixel(12, 12)[3], 255);
}

#[tokio::test]
async fn test_rembg_rejection_is_unsupported_image() {
    let addr = spawn_fake_rembg().await;
    let rembg = segmenter(addr, "/api/remove");

    let err = rembg.segment(b"garbage").await.unwrap_err();
    assert!(matches!(err, ProcessingFault::UnsupportedImage(_)));
}

#[tokio::test]
async fn test_rembg_server_errors_are_backend_faults() {
    let addr = spawn_fake_rembg().await;

    let err = segmenter(addr, "/api/broken")
        .segment(&sample_png())
        .await
        .unwrap_err();
    assert!(matches!(err, ProcessingFault::Backend(_)));

    let err = segmenter(addr, "/api/text")
        .segment(&sample_png())
        .await
        .unwrap_err();
    assert!(matches!(err, ProcessingFault::Backend(_)));
}

#[tokio::test]
async fn test_rembg_unreachable() {
    let addr = closed_port().await;
    let rembg = segmenter(addr, "/api/remove");

    assert!(!rembg.health_check().await);
    let err = rembg.segment(&sample_png()).await.unwrap_err();
    assert!(matches!(err, ProcessingFault::Backend(_)));
}

#[tokio::test]
async fn test_remove_bg_endpoint_masks_backend_failure() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::development(dir.path());
    let storage = Arc::new(LocalStorageService::new(dir.path()));
    storage.ensure_ready().await.unwrap();
    let rembg = Arc::new(segmenter(closed_port().await, "/api/remove"));
    let app = create_app(AppState::new(storage, rembg, config));

    let boundary = "XBOUNDARYX";
    let mut body = format!(
        "--{boundary}\r\n\
        Content-Disposition: form-data; name=\"file\"; filename=\"me.png\"\r\n\
        Content-Type: image/png\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(&sample_png());
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/remove-bg")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["error"], "Background removal failed");
    assert!(!bytes.windows(9).any(|w| w == b"127.0.0.1"));
}
