//! Document composition helpers
//!
//! Builds the inputs for new documents out of existing ones (merge), out of
//! a list of captured images (batch), and derives default names from OCR
//! text.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::models::{now, Document, Page};

/// Maximum length of a name derived from OCR text, in characters
pub const MAX_DERIVED_NAME_LEN: usize = 50;

/// Name used when OCR text exists but its first line is blank
pub const FALLBACK_NAME: &str = "Scanned Document";

/// Separator placed between document texts when merging
pub const TEXT_SEPARATOR: &str = "\n\n";

/// Errors raised while composing a new document
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ComposeError {
    #[error("At least 2 documents are required to merge, got {0}")]
    TooFewDocuments(usize),

    #[error("Document name must not be blank")]
    BlankName,

    #[error("At least one page is required")]
    NoPages,
}

/// Inputs for creating a document
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    pub name: String,
    pub pages: Vec<Page>,
    pub extracted_text: Option<String>,
}

/// Combine documents into the inputs for a single merged document
///
/// Pages keep their order and are re-identified as `"{doc}-{page}"`.
/// Texts are joined with a blank line; documents without text are skipped.
pub fn merge_documents(docs: &[&Document], name: &str) -> Result<NewDocument, ComposeError> {
    if docs.len() < 2 {
        return Err(ComposeError::TooFewDocuments(docs.len()));
    }
    let name = non_blank(name)?;

    let pages = docs
        .iter()
        .enumerate()
        .flat_map(|(doc_index, doc)| {
            doc.pages.iter().enumerate().map(move |(page_index, page)| Page {
                id: format!("{}-{}", doc_index, page_index),
                ..page.clone()
            })
        })
        .collect();

    let texts: Vec<&str> = docs
        .iter()
        .filter_map(|doc| doc.extracted_text.as_deref())
        .filter(|text| !text.is_empty())
        .collect();
    let extracted_text = if texts.is_empty() {
        None
    } else {
        Some(texts.join(TEXT_SEPARATOR))
    };

    Ok(NewDocument {
        name,
        pages,
        extracted_text,
    })
}

/// Turn captured image URIs into pages numbered from zero
pub fn batch_pages<S: AsRef<str>>(uris: &[S]) -> Vec<Page> {
    let timestamp = now();
    uris.iter()
        .enumerate()
        .map(|(index, uri)| Page {
            timestamp: Some(timestamp),
            ..Page::with_id(index.to_string(), uri.as_ref())
        })
        .collect()
}

/// Validate the inputs of a batch scan
pub fn batch_document<S: AsRef<str>>(name: &str, uris: &[S]) -> Result<NewDocument, ComposeError> {
    if uris.is_empty() {
        return Err(ComposeError::NoPages);
    }
    Ok(NewDocument {
        name: non_blank(name)?,
        pages: batch_pages(uris),
        extracted_text: None,
    })
}

/// Derive a document name from OCR text, or from the capture time
///
/// With OCR text, the first line (trimmed, at most 50 characters) is used;
/// if that line is blank the generic fallback name applies. Without text,
/// the name is `"Scan <Mon D, HH:MM AM>"`.
pub fn suggest_name(extracted_text: Option<&str>, at: NaiveDateTime) -> String {
    match extracted_text {
        Some(text) if !text.trim().is_empty() => {
            let first_line = text.split('\n').next().unwrap_or("").trim();
            if first_line.is_empty() {
                FALLBACK_NAME.to_string()
            } else {
                first_line.chars().take(MAX_DERIVED_NAME_LEN).collect()
            }
        }
        _ => format!("Scan {}", at.format("%b %-d, %I:%M %p")),
    }
}

fn non_blank(name: &str) -> Result<String, ComposeError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Err(ComposeError::BlankName)
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn doc(name: &str, uris: &[&str], text: Option<&str>) -> Document {
        let pages = uris.iter().map(|u| Page::new(*u)).collect();
        Document::new(name, pages, text.map(String::from))
    }

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_merge_concatenates_pages_in_order() {
        let a = doc("A", &["a0.jpg", "a1.jpg"], None);
        let b = doc("B", &["b0.jpg"], None);

        let merged = merge_documents(&[&a, &b], "  Both  ").unwrap();
        assert_eq!(merged.name, "Both");

        let uris: Vec<_> = merged.pages.iter().map(|p| p.uri.as_str()).collect();
        assert_eq!(uris, vec!["a0.jpg", "a1.jpg", "b0.jpg"]);

        let ids: Vec<_> = merged.pages.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["0-0", "0-1", "1-0"]);
    }

    #[test]
    fn test_merge_joins_text_with_blank_line() {
        let a = doc("A", &["a.jpg"], Some("first"));
        let b = doc("B", &["b.jpg"], None);
        let c = doc("C", &["c.jpg"], Some("third"));

        let merged = merge_documents(&[&a, &b, &c], "All").unwrap();
        assert_eq!(merged.extracted_text.as_deref(), Some("first\n\nthird"));
    }

    #[test]
    fn test_merge_without_text() {
        let a = doc("A", &["a.jpg"], None);
        let b = doc("B", &["b.jpg"], None);
        let merged = merge_documents(&[&a, &b], "All").unwrap();
        assert!(merged.extracted_text.is_none());
    }

    #[test]
    fn test_merge_keeps_page_metadata() {
        let mut a = doc("A", &["a.jpg"], None);
        a.pages[0].extracted_text = Some("page text".to_string());
        a.pages[0].cropped_uri = Some("a-crop.jpg".to_string());
        let b = doc("B", &["b.jpg"], None);

        let merged = merge_documents(&[&a, &b], "All").unwrap();
        assert_eq!(merged.pages[0].extracted_text.as_deref(), Some("page text"));
        assert_eq!(merged.pages[0].cropped_uri.as_deref(), Some("a-crop.jpg"));
        assert_eq!(merged.pages[0].timestamp, a.pages[0].timestamp);
    }

    #[test]
    fn test_merge_rejects_bad_input() {
        let a = doc("A", &["a.jpg"], None);
        let b = doc("B", &["b.jpg"], None);

        assert_eq!(
            merge_documents(&[&a], "One"),
            Err(ComposeError::TooFewDocuments(1))
        );
        assert_eq!(merge_documents(&[&a, &b], "   "), Err(ComposeError::BlankName));
    }

    #[test]
    fn test_batch_pages() {
        let pages = batch_pages(&["x.jpg", "y.jpg", "z.jpg"]);
        let ids: Vec<_> = pages.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["0", "1", "2"]);
        assert_eq!(pages[2].uri, "z.jpg");
        assert!(pages[0].timestamp.is_some());
        assert!(pages.iter().all(|p| p.timestamp == pages[0].timestamp));
    }

    #[test]
    fn test_batch_document_validation() {
        let empty: [&str; 0] = [];
        assert_eq!(batch_document("Batch", &empty), Err(ComposeError::NoPages));
        assert_eq!(batch_document(" ", &["a.jpg"]), Err(ComposeError::BlankName));

        let new_doc = batch_document(" Batch ", &["a.jpg"]).unwrap();
        assert_eq!(new_doc.name, "Batch");
        assert_eq!(new_doc.pages.len(), 1);
    }

    #[test]
    fn test_suggest_name_from_text() {
        let name = suggest_name(Some("  ACME Invoice  \nTotal: $42"), at(9, 5));
        assert_eq!(name, "ACME Invoice");
    }

    #[test]
    fn test_suggest_name_truncates() {
        let text = "x".repeat(80);
        let name = suggest_name(Some(&text), at(9, 5));
        assert_eq!(name.chars().count(), MAX_DERIVED_NAME_LEN);
    }

    #[test]
    fn test_suggest_name_blank_first_line() {
        let name = suggest_name(Some("\nsecond line"), at(9, 5));
        assert_eq!(name, FALLBACK_NAME);
    }

    #[test]
    fn test_suggest_name_from_time() {
        assert_eq!(suggest_name(None, at(14, 30)), "Scan Mar 5, 02:30 PM");
        assert_eq!(suggest_name(Some("   "), at(9, 5)), "Scan Mar 5, 09:05 AM");
    }
}
