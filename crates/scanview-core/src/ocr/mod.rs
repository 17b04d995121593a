//! OCR
//!
//! Text extraction through a hosted OCR endpoint.
//!
//! ## Protocol
//!
//! 1. Compress the image to a JPEG under ~850KB
//! 2. POST `{ "image": "data:image/jpeg;base64,..." }` with a bearer token
//! 3. Read `{ text, confidence, processingTime, error? }`
//!
//! A non-2xx status or an `error` field is a failure.

mod client;
mod types;

pub use client::{build_request, interpret_response, prepare_image, OcrClient, MAX_PAYLOAD_KB};
pub use types::{OcrError, OcrRequest, OcrResponse, NO_TEXT_FOUND};
