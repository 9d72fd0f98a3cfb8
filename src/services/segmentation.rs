use crate::config::AppConfig;
use async_trait::async_trait;
use image::{ImageFormat, RgbaImage};
use std::collections::VecDeque;
use std::io::Cursor;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessingFault {
    /// The payload could not be decoded as a supported raster image
    #[error("unsupported or corrupted image: {0}")]
    UnsupportedImage(String),

    /// The segmentation backend itself failed
    #[error("segmentation backend failed: {0}")]
    Backend(String),
}

/// Separates a photo's subject from its background
#[async_trait]
pub trait Segmenter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns PNG bytes with background pixels made transparent
    async fn segment(&self, image: &[u8]) -> Result<Vec<u8>, ProcessingFault>;

    /// Check if the backend is available/healthy
    async fn health_check(&self) -> bool;
}

/// In-process segmenter keyed on the colour found along the image border.
///
/// Pixels connected to the border whose colour lies within `tolerance` of the
/// estimated background are cleared. Foreground pixels touching the cleared
/// region fade in over a second `tolerance` band so edges are not jagged.
pub struct BorderKeySegmenter {
    tolerance: u8,
}

impl BorderKeySegmenter {
    pub fn new(tolerance: u8) -> Self {
        Self { tolerance }
    }
}

#[async_trait]
impl Segmenter for BorderKeySegmenter {
    fn name(&self) -> &'static str {
        "builtin"
    }

    async fn segment(&self, image: &[u8]) -> Result<Vec<u8>, ProcessingFault> {
        let data = image.to_vec();
        let tolerance = self.tolerance;

        tokio::task::spawn_blocking(move || remove_background(&data, tolerance))
            .await
            .map_err(|e| ProcessingFault::Backend(format!("segmentation task failed: {}", e)))?
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Decodes, keys out the border-connected background and re-encodes as PNG
pub fn remove_background(data: &[u8], tolerance: u8) -> Result<Vec<u8>, ProcessingFault> {
    let img = image::load_from_memory(data)
        .map_err(|e| ProcessingFault::UnsupportedImage(e.to_string()))?;

    let mut rgba = img.to_rgba8();
    if rgba.width() == 0 || rgba.height() == 0 {
        return Err(ProcessingFault::UnsupportedImage(
            "image has no pixels".to_string(),
        ));
    }

    let key = estimate_background(&rgba);
    let background = flood_background(&rgba, key, tolerance as f32);
    apply_matte(&mut rgba, &background, key, tolerance as f32);

    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(rgba)
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .map_err(|e| ProcessingFault::Backend(format!("failed to encode PNG: {}", e)))?;
    Ok(out)
}

fn border_coords(width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
    let top_bottom = (0..width).flat_map(move |x| [(x, 0), (x, height - 1)]);
    let sides = (1..height.saturating_sub(1)).flat_map(move |y| [(0, y), (width - 1, y)]);
    top_bottom.chain(sides)
}

/// Per-channel median of the opaque border pixels
fn estimate_background(img: &RgbaImage) -> [u8; 3] {
    let mut channels: [Vec<u8>; 3] = [Vec::new(), Vec::new(), Vec::new()];

    for (x, y) in border_coords(img.width(), img.height()) {
        let px = img.get_pixel(x, y);
        if px[3] == 0 {
            continue;
        }
        for (c, values) in channels.iter_mut().enumerate() {
            values.push(px[c]);
        }
    }

    let mut key = [255u8; 3];
    for (c, values) in channels.iter_mut().enumerate() {
        if values.is_empty() {
            continue;
        }
        values.sort_unstable();
        key[c] = values[values.len() / 2];
    }
    key
}

fn colour_distance(px: &image::Rgba<u8>, key: [u8; 3]) -> f32 {
    if px[3] == 0 {
        return 0.0;
    }
    let sq: i32 = (0..3)
        .map(|c| {
            let d = px[c] as i32 - key[c] as i32;
            d * d
        })
        .sum();
    (sq as f32).sqrt()
}

/// Breadth-first fill from every border pixel close to the key colour
fn flood_background(img: &RgbaImage, key: [u8; 3], tolerance: f32) -> Vec<bool> {
    let (width, height) = img.dimensions();
    let idx = |x: u32, y: u32| (y as usize) * (width as usize) + x as usize;

    let mut background = vec![false; (width as usize) * (height as usize)];
    let mut queue = VecDeque::new();

    for (x, y) in border_coords(width, height) {
        if !background[idx(x, y)] && colour_distance(img.get_pixel(x, y), key) <= tolerance {
            background[idx(x, y)] = true;
            queue.push_back((x, y));
        }
    }

    while let Some((x, y)) = queue.pop_front() {
        let neighbours = [
            (x.wrapping_sub(1), y),
            (x + 1, y),
            (x, y.wrapping_sub(1)),
            (x, y + 1),
        ];
        for (nx, ny) in neighbours {
            if nx >= width || ny >= height || background[idx(nx, ny)] {
                continue;
            }
            if colour_distance(img.get_pixel(nx, ny), key) <= tolerance {
                background[idx(nx, ny)] = true;
                queue.push_back((nx, ny));
            }
        }
    }

    background
}

fn apply_matte(img: &mut RgbaImage, background: &[bool], key: [u8; 3], tolerance: f32) {
    let (width, height) = img.dimensions();
    let idx = |x: u32, y: u32| (y as usize) * (width as usize) + x as usize;
    let band = tolerance.max(1.0);

    for y in 0..height {
        for x in 0..width {
            if background[idx(x, y)] {
                img.get_pixel_mut(x, y)[3] = 0;
                continue;
            }

            let touches_background = (x > 0 && background[idx(x - 1, y)])
                || (x + 1 < width && background[idx(x + 1, y)])
                || (y > 0 && background[idx(x, y - 1)])
                || (y + 1 < height && background[idx(x, y + 1)]);
            if !touches_background {
                continue;
            }

            let px = img.get_pixel_mut(x, y);
            let distance = colour_distance(px, key);
            if distance < tolerance + band {
                let coverage = ((distance - tolerance) / band).clamp(0.0, 1.0);
                px[3] = (px[3] as f32 * coverage).round() as u8;
            }
        }
    }
}

/// Delegates to a rembg HTTP server (`rembg s`), posting the image as the `file` form field
pub struct RembgSegmenter {
    client: reqwest::Client,
    url: String,
}

impl RembgSegmenter {
    pub fn new(url: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl Segmenter for RembgSegmenter {
    fn name(&self) -> &'static str {
        "rembg"
    }

    async fn segment(&self, image: &[u8]) -> Result<Vec<u8>, ProcessingFault> {
        let part = reqwest::multipart::Part::bytes(image.to_vec())
            .file_name("image")
            .mime_str("application/octet-stream")
            .map_err(|e| ProcessingFault::Backend(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ProcessingFault::Backend(format!("rembg unreachable: {}", e)))?;

        let status = response.status();
        match status.as_u16() {
            400 | 415 | 422 => {
                return Err(ProcessingFault::UnsupportedImage(format!(
                    "rembg rejected image with status {}",
                    status
                )));
            }
            _ if !status.is_success() => {
                return Err(ProcessingFault::Backend(format!(
                    "rembg responded with status {}",
                    status
                )));
            }
            _ => {}
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ProcessingFault::Backend(format!("failed to read rembg body: {}", e)))?;

        if infer::get(&body).map(|k| k.mime_type()) != Some("image/png") {
            return Err(ProcessingFault::Backend(
                "rembg returned a non-PNG body".to_string(),
            ));
        }

        Ok(body.to_vec())
    }

    async fn health_check(&self) -> bool {
        // Any HTTP answer means the server is up; only transport errors count as down.
        self.client.get(&self.url).send().await.is_ok()
    }
}

/// Factory function to create the configured segmentation backend
pub fn create_segmenter(config: &AppConfig) -> Box<dyn Segmenter> {
    match config.segmenter_type.to_lowercase().as_str() {
        "builtin" | "border-key" => Box::new(BorderKeySegmenter::new(config.segment_tolerance)),
        "rembg" => match RembgSegmenter::new(config.rembg_url.clone(), config.rembg_timeout()) {
            Ok(segmenter) => Box::new(segmenter),
            Err(e) => {
                tracing::error!("Failed to build rembg client ({}), using builtin", e);
                Box::new(BorderKeySegmenter::new(config.segment_tolerance))
            }
        },
        other => {
            tracing::warn!("Unknown segmenter type '{}', using builtin", other);
            Box::new(BorderKeySegmenter::new(config.segment_tolerance))
        }
    }
}
