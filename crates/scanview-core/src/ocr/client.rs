//! OCR endpoint client
//!
//! Sends a compressed JPEG to the configured endpoint and returns the
//! recognized text. There is no retry; failures surface to the caller.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use super::types::{OcrError, OcrRequest, OcrResponse, JPEG_DATA_URL_PREFIX};
use crate::config::Config;
use crate::imaging::{uri_to_path, ImageAction, ImageError, ImageManipulator, SaveOptions};

/// Largest payload, in KB, sent without a second compression pass
pub const MAX_PAYLOAD_KB: usize = 850;

/// First compression pass: width and quality
const FIRST_PASS: (u32, f32) = (600, 0.3);

/// Second pass when the first is still over `MAX_PAYLOAD_KB`
const SECOND_PASS: (u32, f32) = (450, 0.2);

/// Client for the OCR endpoint
///
/// Constructed once from `Config` and handed to whoever needs OCR.
#[derive(Debug, Clone)]
pub struct OcrClient {
    http: reqwest::Client,
    endpoint: Option<String>,
    api_key: Option<String>,
}

impl OcrClient {
    /// Build a client from configuration
    pub fn from_config(config: &Config) -> Result<Self, OcrError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.ocr_timeout_secs))
            .user_agent(concat!("scanview/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.ocr_endpoint(),
            api_key: config.ocr_api_key.clone(),
        })
    }

    /// Whether an endpoint and key are configured
    pub fn is_available(&self) -> bool {
        self.endpoint.is_some() && self.api_key.is_some()
    }

    /// Send JPEG bytes and return the parsed response
    pub async fn recognize(&self, jpeg: &[u8]) -> Result<OcrResponse, OcrError> {
        let (Some(endpoint), Some(api_key)) = (&self.endpoint, &self.api_key) else {
            return Err(OcrError::NotConfigured);
        };

        debug!("Sending {}KB to OCR endpoint", size_kb(jpeg.len()));
        let response = self
            .http
            .post(endpoint)
            .bearer_auth(api_key)
            .json(&build_request(jpeg))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let parsed = interpret_response(status, &body)?;

        info!("OCR complete: {} chars", parsed.text.len());
        Ok(parsed)
    }

    /// Send JPEG bytes and return the recognized text
    pub async fn extract_text(&self, jpeg: &[u8]) -> Result<String, OcrError> {
        Ok(self.recognize(jpeg).await?.display_text())
    }

    /// Compress an image through `manipulator` and run OCR on it
    pub async fn extract_text_from_image<M>(
        &self,
        manipulator: &M,
        uri: &str,
    ) -> Result<String, OcrError>
    where
        M: ImageManipulator + Clone + 'static,
    {
        if !self.is_available() {
            return Err(OcrError::NotConfigured);
        }

        let jpeg = prepare_image(manipulator, uri).await?;
        self.extract_text(&jpeg).await
    }
}

/// Build the request body for JPEG bytes
pub fn build_request(jpeg: &[u8]) -> OcrRequest {
    OcrRequest {
        image: format!("{}{}", JPEG_DATA_URL_PREFIX, STANDARD.encode(jpeg)),
    }
}

/// Map an HTTP status and body to a response or an error
///
/// Non-success statuses and responses carrying an `error` field fail.
pub fn interpret_response(status: StatusCode, body: &str) -> Result<OcrResponse, OcrError> {
    if !status.is_success() {
        return Err(OcrError::Http {
            status: status.as_u16(),
            body: body.to_string(),
        });
    }

    let parsed: OcrResponse =
        serde_json::from_str(body).map_err(|e| OcrError::InvalidResponse(e.to_string()))?;

    if let Some(message) = parsed.error {
        return Err(OcrError::Endpoint(message));
    }

    Ok(parsed)
}

/// Compress an image to a JPEG small enough to send
///
/// Resizes to width 600 at quality 0.3; if that is still over the payload
/// limit, resizes again to width 450 at quality 0.2.
pub async fn prepare_image<M>(manipulator: &M, uri: &str) -> Result<Vec<u8>, OcrError>
where
    M: ImageManipulator + Clone + 'static,
{
    let first = compress(manipulator, uri, FIRST_PASS).await?;
    let bytes = read_image(&first).await?;

    if !exceeds_payload_limit(bytes.len()) {
        return Ok(bytes);
    }

    warn!(
        "Image still {}KB after compression, compressing more",
        size_kb(bytes.len())
    );
    let second = compress(manipulator, &first, SECOND_PASS).await?;
    read_image(&second).await
}

/// Size in KB, rounded to the nearest KB
fn size_kb(len: usize) -> usize {
    (len as f64 / 1024.0).round() as usize
}

/// Whether a payload needs the second compression pass
fn exceeds_payload_limit(len: usize) -> bool {
    size_kb(len) > MAX_PAYLOAD_KB
}

async fn compress<M>(manipulator: &M, uri: &str, (width, quality): (u32, f32)) -> Result<String, OcrError>
where
    M: ImageManipulator + Clone + 'static,
{
    let manipulator = manipulator.clone();
    let uri = uri.to_string();
    tokio::task::spawn_blocking(move || {
        manipulator.manipulate(
            &uri,
            &[ImageAction::Resize {
                width: Some(width),
                height: None,
            }],
            SaveOptions::jpeg(quality),
        )
    })
    .await
    .map_err(|e| OcrError::Task(e.to_string()))?
    .map_err(OcrError::from)
}

async fn read_image(uri: &str) -> Result<Vec<u8>, OcrError> {
    let path = uri_to_path(uri);
    tokio::fs::read(&path)
        .await
        .map_err(|source| OcrError::Image(ImageError::Io { path, source }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{path_to_uri, LocalImageManipulator};
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    #[test]
    fn test_build_request() {
        let req = build_request(b"abc");
        assert_eq!(req.image, "data:image/jpeg;base64,YWJj");

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({ "image": "data:image/jpeg;base64,YWJj" }));
    }

    #[test]
    fn test_interpret_success() {
        let body = r#"{"text":"Total: $42","confidence":0.9,"processingTime":120}"#;
        let resp = interpret_response(StatusCode::OK, body).unwrap();
        assert_eq!(resp.text, "Total: $42");
    }

    #[test]
    fn test_interpret_http_failure() {
        let err = interpret_response(StatusCode::UNAUTHORIZED, "Invalid JWT").unwrap_err();
        match err {
            OcrError::Http { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "Invalid JWT");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_interpret_endpoint_error_field() {
        let body = r#"{"text":"","confidence":0,"processingTime":3,"error":"Image too large"}"#;
        let err = interpret_response(StatusCode::OK, body).unwrap_err();
        assert!(matches!(err, OcrError::Endpoint(ref m) if m == "Image too large"));
    }

    #[test]
    fn test_interpret_malformed_body() {
        let err = interpret_response(StatusCode::OK, "<html>").unwrap_err();
        assert!(matches!(err, OcrError::InvalidResponse(_)));
    }

    #[test]
    fn test_payload_limit_rounds_to_nearest_kb() {
        assert!(!exceeds_payload_limit(850 * 1024));
        assert!(!exceeds_payload_limit(850 * 1024 + 511));
        // 850.5KB rounds up to 851
        assert!(exceeds_payload_limit(850 * 1024 + 512));
        assert!(exceeds_payload_limit(900 * 1024));
    }

    #[test]
    fn test_availability() {
        let mut config = Config::with_data_dir("/tmp/scanview");
        assert!(!OcrClient::from_config(&config).unwrap().is_available());

        config.ocr_url = Some("https://ocr.example.com".to_string());
        assert!(!OcrClient::from_config(&config).unwrap().is_available());

        config.ocr_api_key = Some("key".to_string());
        assert!(OcrClient::from_config(&config).unwrap().is_available());
    }

    #[tokio::test]
    async fn test_unconfigured_client_fails_fast() {
        let client = OcrClient::from_config(&Config::with_data_dir("/tmp/scanview")).unwrap();
        let err = client.extract_text(b"jpeg").await.unwrap_err();
        assert!(matches!(err, OcrError::NotConfigured));
    }

    #[tokio::test]
    async fn test_prepare_image_compresses_to_jpeg() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("scan.png");
        RgbImage::from_pixel(1200, 800, Rgb([240, 240, 240]))
            .save(&path)
            .unwrap();

        let manipulator = LocalImageManipulator::new(temp_dir.path().join("out"));
        let jpeg = prepare_image(&manipulator, &path_to_uri(&path)).await.unwrap();

        assert!(!exceeds_payload_limit(jpeg.len()));
        let img = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(img.width(), 600);
        assert_eq!(img.height(), 400);
    }
}
