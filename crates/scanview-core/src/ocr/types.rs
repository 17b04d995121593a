//! OCR Types
//!
//! Wire types for the OCR endpoint and the errors raised while calling it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::imaging::ImageError;

/// Text returned when the endpoint recognizes nothing
pub const NO_TEXT_FOUND: &str = "No text found";

/// Prefix of the data URL sent to the endpoint
pub const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// Request body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OcrRequest {
    /// Base64 JPEG as a data URL
    pub image: String,
}

/// Response body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OcrResponse {
    #[serde(default)]
    pub text: String,
    /// Informational only
    #[serde(default)]
    pub confidence: f64,
    /// Milliseconds spent by the endpoint; informational only
    #[serde(default)]
    pub processing_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OcrResponse {
    /// Trimmed text, or the placeholder when nothing was recognized
    pub fn display_text(&self) -> String {
        let text = self.text.trim();
        if text.is_empty() {
            NO_TEXT_FOUND.to_string()
        } else {
            text.to_string()
        }
    }
}

/// Errors that can occur during OCR
#[derive(Error, Debug)]
pub enum OcrError {
    #[error("OCR is not configured: set ocr_url and ocr_api_key")]
    NotConfigured,

    #[error("OCR request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("OCR failed: {status} - {body}")]
    Http { status: u16, body: String },

    #[error("{0}")]
    Endpoint(String),

    #[error("Invalid OCR response: {0}")]
    InvalidResponse(String),

    #[error("Failed to prepare image for OCR: {0}")]
    Image(#[from] ImageError),

    #[error("Image preparation task failed: {0}")]
    Task(String),
}
