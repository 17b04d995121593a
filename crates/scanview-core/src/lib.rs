//! Scanview Core Library
//!
//! This crate provides the document store behind Scanview, a document
//! scanner that keeps scanned pages and their recognized text on the device.
//!
//! # Architecture
//!
//! - **JSON file**: The whole collection lives in one `documents.json`
//! - **In-memory collection**: Source of truth while the process runs;
//!   every mutation rewrites the file from a snapshot
//!
//! All queries are served from memory. Concurrent writers follow
//! last-write-wins at the file level.
//!
//! # Quick Start
//!
//! ```text
//! let store = DocumentStore::open(Config::load()?).await;
//!
//! // Add a document
//! let page = Page::new("file:///scans/receipt.jpg");
//! store.create("Receipt", vec![page], Some("Total: $42".into())).await?;
//!
//! // Query documents
//! let hits = store.search("receipt");
//! ```
//!
//! # Modules
//!
//! - `store`: Document collection (main entry point)
//! - `models`: Documents, pages and patches
//! - `search`: Case-insensitive substring search
//! - `compose`: Merging documents, batch capture, name suggestions
//! - `storage`: JSON persistence
//! - `ocr`: Text extraction via the OCR endpoint
//! - `imaging`: Image manipulation seam
//! - `config`: Application configuration

pub mod compose;
pub mod config;
pub mod id;
pub mod imaging;
pub mod models;
pub mod ocr;
pub mod search;
pub mod storage;
pub mod store;

pub use compose::{ComposeError, NewDocument};
pub use config::Config;
pub use imaging::{ImageAction, ImageError, ImageManipulator, LocalImageManipulator, SaveOptions};
pub use models::{Document, DocumentPatch, Page, PageFilter};
pub use ocr::{OcrClient, OcrError, OcrResponse};
pub use storage::{JsonPersistence, StorageError, StorageResult};
pub use store::{DocumentStore, LoadStatus, StoreError};
