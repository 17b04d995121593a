//! Document store
//!
//! The `DocumentStore` is the sole authority over the persisted collection.
//! It keeps an ordered in-memory copy (most recently created first) and
//! mirrors it to `documents.json` after every mutation.
//!
//! ## Consistency model
//!
//! Mutations update memory first, then rewrite the whole file. There is no
//! transaction or writer lock: overlapping mutations each write their own
//! snapshot and the last completed write wins on disk. If a write fails the
//! error is returned, but memory already reflects the mutation until the
//! next successful save or reload.
//!
//! ## Usage
//!
//! ```ignore
//! let store = DocumentStore::open(config).await;
//!
//! let doc = store.create("Receipt", vec![Page::new(uri)], None).await?;
//! store.update(&doc.id, DocumentPatch::new().name("Groceries")).await?;
//!
//! let hits = store.search("groceries");
//! ```

use std::sync::{Mutex, MutexGuard};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::compose::{self, ComposeError, NewDocument};
use crate::config::Config;
use crate::models::{Document, DocumentPatch, Page};
use crate::search;
use crate::storage::{JsonPersistence, StorageError};

/// Errors returned by store mutations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Compose(#[from] ComposeError),
}

/// Outcome of the most recent load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// No load has completed yet
    NotLoaded,
    /// No backing file; the collection starts empty
    Missing,
    /// Backing file parsed successfully
    Loaded { count: usize },
    /// Backing file exists but could not be parsed; the collection is empty
    Corrupt { details: String },
    /// Backing file could not be read; the collection is empty
    Unreadable { details: String },
}

impl LoadStatus {
    /// True when the in-memory collection may be hiding data that exists on disk
    ///
    /// The next successful save overwrites the backing file, losing whatever
    /// it contained.
    pub fn is_data_loss_risk(&self) -> bool {
        matches!(self, LoadStatus::Corrupt { .. } | LoadStatus::Unreadable { .. })
    }
}

struct State {
    documents: Vec<Document>,
    status: LoadStatus,
}

/// Local document store backed by a single JSON file
pub struct DocumentStore {
    persistence: JsonPersistence,
    state: Mutex<State>,
}

impl DocumentStore {
    /// Create a store without touching the filesystem
    ///
    /// The collection is empty and `is_loading()` is true until `load()`.
    pub fn new(config: Config) -> Self {
        Self {
            persistence: JsonPersistence::new(config),
            state: Mutex::new(State {
                documents: Vec::new(),
                status: LoadStatus::NotLoaded,
            }),
        }
    }

    /// Create a store, prepare its directory and load the collection
    pub async fn open(config: Config) -> Self {
        let store = Self::new(config);
        store.initialize().await;
        store.load().await;
        store
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        self.persistence.config()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ==================== Lifecycle ====================

    /// Ensure the backing directory exists
    ///
    /// Failures are logged and otherwise ignored; later writes will fail.
    pub async fn initialize(&self) {
        debug!("Initializing storage at {:?}", self.config().data_dir);
        if let Err(e) = self.persistence.ensure_dirs().await {
            error!("Error initializing storage: {}", e);
        }
    }

    /// Replace the in-memory collection with the backing file's contents
    ///
    /// Never fails. A missing file yields an empty collection; an unreadable
    /// or unparsable file also yields an empty collection, recorded in the
    /// returned status.
    pub async fn load(&self) -> LoadStatus {
        debug!("Loading documents from {:?}", self.persistence.path());

        let (documents, status) = match self.persistence.load().await {
            Ok(Some(docs)) => {
                let count = docs.len();
                debug!("Loaded {} documents", count);
                (docs, LoadStatus::Loaded { count })
            }
            Ok(None) => {
                debug!("No documents file found, starting fresh");
                (Vec::new(), LoadStatus::Missing)
            }
            Err(e @ StorageError::InvalidFormat { .. }) => {
                warn!("Documents file is corrupt, continuing with an empty collection: {}", e);
                (
                    Vec::new(),
                    LoadStatus::Corrupt {
                        details: e.to_string(),
                    },
                )
            }
            Err(e) => {
                warn!("Documents file is unreadable, continuing with an empty collection: {}", e);
                (
                    Vec::new(),
                    LoadStatus::Unreadable {
                        details: e.to_string(),
                    },
                )
            }
        };

        let mut state = self.state();
        state.documents = documents;
        state.status = status.clone();
        status
    }

    /// Reload from disk, e.g. when a screen regains focus
    pub async fn refresh(&self) -> LoadStatus {
        self.load().await
    }

    /// True until the first load completes
    pub fn is_loading(&self) -> bool {
        self.state().status == LoadStatus::NotLoaded
    }

    /// Status of the most recent load
    pub fn load_status(&self) -> LoadStatus {
        self.state().status.clone()
    }

    // ==================== Queries ====================

    /// Snapshot of the collection, most recently created first
    pub fn documents(&self) -> Vec<Document> {
        self.state().documents.clone()
    }

    /// Get a document by ID
    pub fn get(&self, id: &str) -> Option<Document> {
        self.state().documents.iter().find(|d| d.id == id).cloned()
    }

    /// Number of documents
    pub fn len(&self) -> usize {
        self.state().documents.len()
    }

    /// True when the collection is empty
    pub fn is_empty(&self) -> bool {
        self.state().documents.is_empty()
    }

    /// Documents whose name or extracted text contains `query`, ignoring case
    ///
    /// Blank queries return the full collection.
    pub fn search(&self, query: &str) -> Vec<Document> {
        let state = self.state();
        search::filter(&state.documents, query)
            .into_iter()
            .cloned()
            .collect()
    }

    // ==================== Mutations ====================

    /// Create a document and prepend it to the collection
    pub async fn create(
        &self,
        name: impl Into<String>,
        pages: Vec<Page>,
        extracted_text: Option<String>,
    ) -> Result<Document, StoreError> {
        let doc = Document::new(name, pages, extracted_text);
        info!(
            "Creating document {} ({} pages)",
            doc.id,
            doc.pages.len()
        );

        let snapshot = {
            let mut state = self.state();
            state.documents.insert(0, doc.clone());
            state.documents.clone()
        };

        self.persist(&snapshot).await?;
        Ok(doc)
    }

    /// Shallow-merge `patch` into the document with `id`
    ///
    /// Returns the updated document, or `None` if no document matched. The
    /// collection is persisted either way.
    pub async fn update(
        &self,
        id: &str,
        patch: DocumentPatch,
    ) -> Result<Option<Document>, StoreError> {
        debug!("Updating document {}", id);

        let (updated, snapshot) = {
            let mut state = self.state();
            let updated = state.documents.iter_mut().find(|d| d.id == id).map(|doc| {
                doc.apply(patch);
                doc.clone()
            });
            (updated, state.documents.clone())
        };

        if updated.is_none() {
            debug!("No document with id {}, nothing to update", id);
        }

        self.persist(&snapshot).await?;
        Ok(updated)
    }

    /// Remove the document with `id`
    ///
    /// Returns whether a document was removed. Unknown ids are a no-op.
    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let (removed, snapshot) = {
            let mut state = self.state();
            let before = state.documents.len();
            state.documents.retain(|d| d.id != id);
            (state.documents.len() != before, state.documents.clone())
        };

        info!("Deleting document {} (found: {})", id, removed);
        self.persist(&snapshot).await?;
        Ok(removed)
    }

    /// Rename a document; blank names are ignored
    pub async fn rename(&self, id: &str, name: &str) -> Result<Option<Document>, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }
        self.update(id, DocumentPatch::new().name(name)).await
    }

    /// Append a page to a document
    pub async fn add_page(&self, id: &str, page: Page) -> Result<Option<Document>, StoreError> {
        let Some(mut pages) = self.get(id).map(|d| d.pages) else {
            return Ok(None);
        };
        pages.push(page);
        self.update(id, DocumentPatch::new().pages(pages)).await
    }

    /// Remove a page from a document
    ///
    /// The store does not stop the last page from being removed; callers
    /// check `Document::can_remove_page` first. The thumbnail is left as is.
    pub async fn remove_page(
        &self,
        id: &str,
        page_id: &str,
    ) -> Result<Option<Document>, StoreError> {
        let Some(doc) = self.get(id) else {
            return Ok(None);
        };
        let pages = doc.pages.into_iter().filter(|p| p.id != page_id).collect();
        self.update(id, DocumentPatch::new().pages(pages)).await
    }

    /// Merge existing documents into a new one
    ///
    /// Documents are taken in collection order; unknown ids are skipped.
    pub async fn merge(&self, ids: &[String], name: &str) -> Result<Document, StoreError> {
        let selected: Vec<Document> = self
            .state()
            .documents
            .iter()
            .filter(|d| ids.contains(&d.id))
            .cloned()
            .collect();
        let refs: Vec<&Document> = selected.iter().collect();

        let merged = compose::merge_documents(&refs, name)?;
        info!("Merging {} documents into {:?}", selected.len(), merged.name);
        self.create_from(merged).await
    }

    /// Create a document from a batch of captured images
    pub async fn create_batch<S: AsRef<str>>(
        &self,
        name: &str,
        uris: &[S],
    ) -> Result<Document, StoreError> {
        let new_doc = compose::batch_document(name, uris)?;
        self.create_from(new_doc).await
    }

    async fn create_from(&self, new_doc: NewDocument) -> Result<Document, StoreError> {
        self.create(new_doc.name, new_doc.pages, new_doc.extracted_text)
            .await
    }

    async fn persist(&self, snapshot: &[Document]) -> Result<(), StoreError> {
        self.persistence.save(snapshot).await.map_err(|e| {
            error!("Error saving documents: {}", e);
            StoreError::from(e)
        })
    }
}
