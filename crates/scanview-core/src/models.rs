//! Data models for ScanView
//!
//! Defines the core data structures: Document, Page and PageFilter, plus the
//! typed patch used for partial document updates.
//!
//! The serialized shape is the on-disk `documents.json` format: camelCase
//! keys, timestamps as epoch milliseconds, optional fields omitted.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::id;

/// Current time truncated to the millisecond precision that is persisted
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Cosmetic transform last applied to a page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PageFilter {
    #[default]
    Original,
    #[serde(alias = "bw")]
    BlackWhite,
    Grayscale,
    HighContrast,
    Magic,
}

impl PageFilter {
    /// All filters, in menu order
    pub const ALL: [PageFilter; 5] = [
        PageFilter::Original,
        PageFilter::BlackWhite,
        PageFilter::Grayscale,
        PageFilter::HighContrast,
        PageFilter::Magic,
    ];

    /// Wire name of the filter
    pub fn as_str(&self) -> &'static str {
        match self {
            PageFilter::Original => "original",
            PageFilter::BlackWhite => "blackWhite",
            PageFilter::Grayscale => "grayscale",
            PageFilter::HighContrast => "highContrast",
            PageFilter::Magic => "magic",
        }
    }
}

impl fmt::Display for PageFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "original" => Ok(PageFilter::Original),
            "blackwhite" | "bw" => Ok(PageFilter::BlackWhite),
            "grayscale" => Ok(PageFilter::Grayscale),
            "highcontrast" => Ok(PageFilter::HighContrast),
            "magic" => Ok(PageFilter::Magic),
            other => Err(format!("Unknown filter: {}", other)),
        }
    }
}

/// One scanned or imported image
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Unique identifier within its document
    pub id: String,
    /// Location of the image
    pub uri: String,
    /// Post-crop image location, preferred for display
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cropped_uri: Option<String>,
    /// Filter last applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<PageFilter>,
    /// When the page was captured; absent on some stored pages
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
    /// OCR output for this page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
}

impl Page {
    /// Create a page for an image with a fresh identifier
    pub fn new(uri: impl Into<String>) -> Self {
        Self::with_id(id::generate(), uri)
    }

    /// Create a page with a specific identifier
    pub fn with_id(id: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            uri: uri.into(),
            cropped_uri: None,
            filter: None,
            timestamp: Some(now()),
            extracted_text: None,
        }
    }

    /// Set the applied filter
    pub fn with_filter(mut self, filter: PageFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Set the OCR text; blank text is treated as absent
    pub fn with_text(mut self, text: Option<String>) -> Self {
        self.extracted_text = text.filter(|t| !t.is_empty());
        self
    }

    /// URI to show for this page (cropped image takes priority)
    pub fn display_uri(&self) -> &str {
        self.cropped_uri.as_deref().unwrap_or(&self.uri)
    }
}

/// A named, ordered collection of pages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Unique identifier within the collection
    pub id: String,
    /// User-facing title
    pub name: String,
    /// Pages in display order
    pub pages: Vec<Page>,
    /// When the document was created; never changes
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    /// When the document was last mutated
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
    /// URI of the first page at creation time. Not kept in sync afterwards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Searchable OCR text across pages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    /// Reserved; no operation reads these yet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl Document {
    /// Create a new document with a fresh identifier
    pub fn new(name: impl Into<String>, pages: Vec<Page>, extracted_text: Option<String>) -> Self {
        let now = now();
        let thumbnail = pages.first().map(|p| p.uri.clone());
        Self {
            id: id::generate(),
            name: name.into(),
            pages,
            created_at: now,
            updated_at: now,
            thumbnail,
            extracted_text: extracted_text.filter(|t| !t.is_empty()),
            tags: None,
        }
    }

    /// Apply a patch and refresh `updated_at`
    pub fn apply(&mut self, patch: DocumentPatch) {
        let DocumentPatch {
            name,
            pages,
            thumbnail,
            extracted_text,
            tags,
        } = patch;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(pages) = pages {
            self.pages = pages;
        }
        if let Some(thumbnail) = thumbnail {
            self.thumbnail = thumbnail;
        }
        if let Some(text) = extracted_text {
            self.extracted_text = text;
        }
        if let Some(tags) = tags {
            self.tags = tags;
        }

        // Clock skew must not push updated_at before created_at
        self.updated_at = now().max(self.created_at);
    }

    /// Number of pages
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Find a page by id
    pub fn page(&self, page_id: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == page_id)
    }

    /// Whether a page may be removed without leaving the document empty
    pub fn can_remove_page(&self) -> bool {
        self.pages.len() > 1
    }
}

/// Partial update for a document
///
/// `None` leaves a field untouched. For optional document fields,
/// `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentPatch {
    pub name: Option<String>,
    pub pages: Option<Vec<Page>>,
    pub thumbnail: Option<Option<String>>,
    pub extracted_text: Option<Option<String>>,
    pub tags: Option<Option<Vec<String>>>,
}

impl DocumentPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn pages(mut self, pages: Vec<Page>) -> Self {
        self.pages = Some(pages);
        self
    }

    pub fn thumbnail(mut self, thumbnail: Option<String>) -> Self {
        self.thumbnail = Some(thumbnail);
        self
    }

    pub fn extracted_text(mut self, text: Option<String>) -> Self {
        self.extracted_text = Some(text);
        self
    }

    pub fn tags(mut self, tags: Option<Vec<String>>) -> Self {
        self.tags = Some(tags);
        self
    }

    /// True when the patch changes nothing but `updated_at`
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
