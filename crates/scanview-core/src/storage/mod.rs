//! Storage layer
//!
//! Handles persistence of the document collection.
//!
//! ## Architecture
//!
//! - **documents.json**: Single source of truth, a JSON array rewritten in
//!   full after every mutation
//!
//! There is no index, schema version, or per-document file. Every save
//! rewrites the entire collection, which bounds practical collection size.

pub mod error;
pub mod persistence;

pub use error::{StorageError, StorageResult};
pub use persistence::JsonPersistence;
