use crate::error::AppError;
use crate::index_store::sibling_path;
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, RgbImage};
use reqwest::Client;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Turns a candidate URL into a stored image and reports its final size.
#[async_trait]
pub trait ImageSink: Send + Sync {
    async fn process_and_store(
        &self,
        url: &str,
        destination: &Path,
        max_width: u32,
    ) -> Result<(u32, u32), AppError>;
}

pub struct HttpImageProcessor {
    client: Client,
    timeout: Duration,
    jpeg_quality: u8,
}

impl HttpImageProcessor {
    pub fn new(client: Client, timeout: Duration, jpeg_quality: u8) -> Self {
        Self {
            client,
            timeout,
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, AppError> {
        log::debug!("Downloading {}", url);
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::download(url, "request timed out")
                } else {
                    AppError::download(url, e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::download(url, format!("HTTP status {}", status)));
        }

        let bytes = response.bytes().await.map_err(|e| AppError::download(url, e))?;
        log::trace!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ImageSink for HttpImageProcessor {
    async fn process_and_store(
        &self,
        url: &str,
        destination: &Path,
        max_width: u32,
    ) -> Result<(u32, u32), AppError> {
        let bytes = self.download(url).await?;

        let url = url.to_string();
        let destination: PathBuf = destination.to_path_buf();
        let quality = self.jpeg_quality;
        tokio::task::spawn_blocking(move || {
            store_image_bytes(&url, &bytes, &destination, max_width, quality)
        })
        .await?
    }
}

/// Final size for an image of `width` x `height` limited to `max_width`,
/// keeping the aspect ratio.
pub fn target_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if max_width == 0 || width <= max_width {
        return (width, height);
    }
    let scaled = (f64::from(max_width) * f64::from(height) / f64::from(width)).round() as u32;
    (max_width, scaled.max(1))
}

/// Decodes `bytes`, converts to RGB, downscales to `max_width` if wider and
/// writes a JPEG to `destination`.
pub fn store_image_bytes(
    url: &str,
    bytes: &[u8],
    destination: &Path,
    max_width: u32,
    jpeg_quality: u8,
) -> Result<(u32, u32), AppError> {
    let decoded = image::load_from_memory(bytes).map_err(|source| AppError::Decode {
        url: url.to_string(),
        source,
    })?;
    let mut rgb = decoded.to_rgb8();
    log::debug!("Decoded {} as {}x{}", url, rgb.width(), rgb.height());

    let (width, height) = target_dimensions(rgb.width(), rgb.height(), max_width);
    if (width, height) != rgb.dimensions() {
        log::trace!("Resizing {} to {}x{}", url, width, height);
        rgb = image::imageops::resize(&rgb, width, height, FilterType::Lanczos3);
    }

    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
            log::debug!("Created image directory: {:?}", parent);
        }
    }

    let partial = sibling_path(destination, ".part");
    let written = write_jpeg(&partial, &rgb, jpeg_quality)
        .and_then(|_| fs::rename(&partial, destination).map_err(AppError::from));
    if let Err(e) = written {
        let _ = fs::remove_file(&partial);
        return Err(e);
    }
    log::debug!("Image saved to: {:?}", destination);

    Ok((width, height))
}

fn write_jpeg(path: &Path, rgb: &RgbImage, jpeg_quality: u8) -> Result<(), AppError> {
    let mut writer = BufWriter::new(File::create(path)?);
    JpegEncoder::new_with_quality(&mut writer, jpeg_quality).encode(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ColorType::Rgb8,
    )?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::test_support::{local_client, serve_once, CannedResponse};
    use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
    use std::io::Cursor;
    use tempfile::TempDir;

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([30, 120, 200, 128]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn narrow_images_keep_their_size() {
        assert_eq!(target_dimensions(800, 600, 1080), (800, 600));
        assert_eq!(target_dimensions(1080, 600, 1080), (1080, 600));
    }

    #[test]
    fn wide_images_are_scaled_with_rounding() {
        assert_eq!(target_dimensions(4000, 3000, 1080), (1080, 810));
        assert_eq!(target_dimensions(3000, 2001, 1000), (1000, 667));
        assert_eq!(target_dimensions(5000, 1, 100), (100, 1));
    }

    #[test]
    fn downscales_and_writes_jpeg() {
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("mobile").join("bird.jpg");

        let (width, height) =
            store_image_bytes("https://example.com/a.png", &png_bytes(640, 427), &destination, 300, 85).unwrap();

        assert!(width <= 300);
        let expected = 300.0 * 427.0 / 640.0;
        assert!((f64::from(height) - expected).abs() <= 1.0);

        let written = image::open(&destination).unwrap();
        assert_eq!((written.width(), written.height()), (width, height));
        assert_eq!(written.color(), ColorType::Rgb8);
    }

    #[test]
    fn undecodable_bytes_are_a_decode_error() {
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("bird.jpg");
        let err = store_image_bytes("https://example.com/x", b"<html>nope</html>", &destination, 300, 85)
            .unwrap_err();
        assert!(matches!(err, AppError::Decode { ref url, .. } if url == "https://example.com/x"));
        assert!(!err.is_fatal());
        assert!(!destination.exists());
    }

    #[test]
    fn failed_write_leaves_no_partial_file() {
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("taken.jpg");
        fs::create_dir_all(destination.join("occupied")).unwrap();

        let result = store_image_bytes("https://example.com/a.png", &png_bytes(10, 10), &destination, 300, 85);

        assert!(result.is_err());
        assert!(!dir.path().join("taken.jpg.part").exists());
        assert!(destination.is_dir());
    }

    fn processor(timeout: Duration) -> HttpImageProcessor {
        HttpImageProcessor::new(local_client(), timeout, 85)
    }

    #[tokio::test]
    async fn downloads_and_stores_from_http() {
        let url = serve_once(CannedResponse::bytes("200 OK", "image/png", png_bytes(640, 480))).await;
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("tablet").join("bird.jpg");

        let size = processor(Duration::from_secs(5))
            .process_and_store(&url, &destination, 320)
            .await
            .unwrap();

        assert_eq!(size, (320, 240));
        assert!(destination.exists());
    }

    #[tokio::test]
    async fn non_success_status_is_a_download_error() {
        let url = serve_once(CannedResponse::bytes("404 Not Found", "text/plain", b"gone".to_vec())).await;
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("bird.jpg");

        let err = processor(Duration::from_secs(5))
            .process_and_store(&url, &destination, 320)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Download { ref reason, .. } if reason.contains("404")));
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn slow_download_times_out() {
        let response = CannedResponse::bytes("200 OK", "image/png", png_bytes(8, 8)).after(Duration::from_secs(3));
        let url = serve_once(response).await;
        let dir = TempDir::new().unwrap();

        let err = processor(Duration::from_millis(200))
            .process_and_store(&url, &dir.path().join("bird.jpg"), 320)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Download { ref reason, .. } if reason.contains("timed out")));
    }

    #[tokio::test]
    async fn html_instead_of_an_image_is_a_decode_error() {
        let url = serve_once(CannedResponse::bytes("200 OK", "text/html", b"<html></html>".to_vec())).await;
        let dir = TempDir::new().unwrap();

        let err = processor(Duration::from_secs(5))
            .process_and_store(&url, &dir.path().join("bird.jpg"), 320)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Decode { .. }));
    }
}
