//! Document command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::warn;

use scanview_core::compose::{suggest_name, TEXT_SEPARATOR};
use scanview_core::imaging::{self, path_to_uri};
use scanview_core::ocr::NO_TEXT_FOUND;
use scanview_core::{
    Document, DocumentPatch, DocumentStore, LocalImageManipulator, OcrClient, Page, PageFilter,
};

use super::confirm;
use crate::output::Output;

/// Options for `create`
pub struct CreateOptions {
    pub images: Vec<PathBuf>,
    pub name: Option<String>,
    pub ocr: bool,
    pub filter: PageFilter,
    pub optimize: bool,
}

/// List all documents, most recent first
pub fn list(store: &DocumentStore, output: &Output) -> Result<()> {
    output.print_documents(&store.documents())
}

/// Show a single document
pub fn show(store: &DocumentStore, id: String, output: &Output) -> Result<()> {
    let doc = find_document(store, &id)?;
    output.print_document(&doc)
}

/// Search documents by name and extracted text
pub fn search(store: &DocumentStore, query: String, output: &Output) -> Result<()> {
    output.print_documents(&store.search(&query))
}

/// Create a document with one page per image
pub async fn create(store: &DocumentStore, opts: CreateOptions, output: &Output) -> Result<()> {
    if opts.images.is_empty() {
        bail!("At least one image is required");
    }

    let manipulator = LocalImageManipulator::from_config(store.config());
    let ocr = if opts.ocr {
        let client = OcrClient::from_config(store.config())?;
        if !client.is_available() {
            bail!("OCR is not configured. Set it with:\n  scanview config set ocr_url <url>\n  scanview config set ocr_api_key <key>");
        }
        Some(client)
    } else {
        None
    };

    let mut pages = Vec::with_capacity(opts.images.len());
    let mut texts = Vec::new();

    for image in &opts.images {
        let path = std::fs::canonicalize(image)
            .with_context(|| format!("Image not found: {}", image.display()))?;

        let mut uri = path_to_uri(&path);
        if opts.optimize {
            uri = imaging::resize_or_original(&manipulator, &uri);
        }
        let uri = imaging::apply_filter(&uri, opts.filter);

        let text = match ocr {
            Some(ref client) => extract_text(client, &manipulator, &uri, output).await,
            None => None,
        };
        if let Some(ref t) = text {
            texts.push(t.clone());
        }

        pages.push(Page::new(uri).with_filter(opts.filter).with_text(text));
    }

    let extracted_text = if texts.is_empty() {
        None
    } else {
        Some(texts.join(TEXT_SEPARATOR))
    };

    let name = match opts.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => suggest_name(
            extracted_text.as_deref(),
            chrono::Local::now().naive_local(),
        ),
    };

    let doc = store
        .create(name, pages, extracted_text)
        .await
        .context("Failed to save document")?;

    output.success(&format!("Created document: {}", doc.id));
    output.print_document(&doc)
}

/// OCR one page; failures are reported and the page is kept without text
async fn extract_text(
    client: &OcrClient,
    manipulator: &LocalImageManipulator,
    uri: &str,
    output: &Output,
) -> Option<String> {
    match client.extract_text_from_image(manipulator, uri).await {
        Ok(text) if text == NO_TEXT_FOUND => None,
        Ok(text) => Some(text),
        Err(e) => {
            warn!("OCR failed for {}: {}", uri, e);
            output.warn(&format!("OCR failed for {}: {}", uri, e));
            None
        }
    }
}

/// Rename a document
pub async fn rename(store: &DocumentStore, id: String, name: String, output: &Output) -> Result<()> {
    let doc = find_document(store, &id)?;
    if name.trim().is_empty() {
        bail!("Name cannot be empty");
    }

    let updated = store
        .rename(&doc.id, &name)
        .await
        .context("Failed to rename document")?
        .ok_or_else(|| anyhow::anyhow!("Document not found: {}", id))?;

    output.success(&format!("Renamed to: {}", updated.name));
    Ok(())
}

/// Delete a document
pub async fn delete(store: &DocumentStore, id: String, output: &Output) -> Result<()> {
    let doc = find_document(store, &id)?;

    if output.should_prompt() {
        println!("Delete document: {} - {}", doc.id, doc.name);
        if !confirm("Are you sure?")? {
            output.message("Cancelled.");
            return Ok(());
        }
    }

    store
        .delete(&doc.id)
        .await
        .context("Failed to delete document")?;

    output.success(&format!("Deleted document: {}", doc.id));
    Ok(())
}

/// Remove a page, refusing to remove the last one
pub async fn remove_page(
    store: &DocumentStore,
    id: String,
    page_id: String,
    output: &Output,
) -> Result<()> {
    let doc = find_document(store, &id)?;

    if doc.page(&page_id).is_none() {
        bail!("Page {} not found in document {}", page_id, doc.id);
    }
    if !doc.can_remove_page() {
        bail!("Cannot remove the only page of a document. Delete the document instead.");
    }

    store
        .remove_page(&doc.id, &page_id)
        .await
        .context("Failed to remove page")?;

    output.success(&format!("Removed page {} from {}", page_id, doc.id));
    Ok(())
}

/// Rotate a page image; the result becomes the page's display image
pub async fn rotate(
    store: &DocumentStore,
    id: String,
    page_id: String,
    degrees: i32,
    output: &Output,
) -> Result<()> {
    let doc = find_document(store, &id)?;
    let page = doc
        .page(&page_id)
        .ok_or_else(|| anyhow::anyhow!("Page {} not found in document {}", page_id, doc.id))?;

    let manipulator = LocalImageManipulator::from_config(store.config());
    let source = page.display_uri().to_string();
    let rotated = tokio::task::spawn_blocking(move || {
        imaging::rotate_or_original(&manipulator, &source, degrees)
    })
    .await
    .context("Rotate task failed")?;

    if rotated == page.display_uri() {
        output.warn("Image was not rotated");
        return Ok(());
    }

    let pages: Vec<Page> = doc
        .pages
        .iter()
        .cloned()
        .map(|mut p| {
            if p.id == page_id {
                p.cropped_uri = Some(rotated.clone());
            }
            p
        })
        .collect();

    store
        .update(&doc.id, DocumentPatch::new().pages(pages))
        .await
        .context("Failed to save rotated page")?;

    output.success(&format!("Rotated page {} by {}°", page_id, degrees));
    Ok(())
}

/// Merge documents into a new one
pub async fn merge(
    store: &DocumentStore,
    ids: Vec<String>,
    name: String,
    output: &Output,
) -> Result<()> {
    let docs = store.documents();
    let resolved = ids
        .iter()
        .map(|id| resolve_id(&docs, id))
        .collect::<Result<Vec<_>>>()?;

    let merged = store
        .merge(&resolved, &name)
        .await
        .context("Failed to merge documents")?;

    output.success(&format!(
        "Merged {} documents into {}",
        resolved.len(),
        merged.id
    ));
    output.print_document(&merged)
}

fn find_document(store: &DocumentStore, id: &str) -> Result<Document> {
    let resolved = resolve_id(&store.documents(), id)?;
    store
        .get(&resolved)
        .ok_or_else(|| anyhow::anyhow!("Document not found: {}", id))
}

/// Resolve a document ID (full ID or trailing digits)
fn resolve_id(docs: &[Document], id: &str) -> Result<String> {
    if id.trim().is_empty() {
        bail!("Document ID cannot be empty");
    }

    if docs.iter().any(|d| d.id == id) {
        return Ok(id.to_string());
    }

    let matches: Vec<_> = docs.iter().filter(|d| d.id.ends_with(id)).collect();

    match matches.len() {
        0 => bail!("No document found matching: {}", id),
        1 => Ok(matches[0].id.clone()),
        _ => {
            eprintln!("Multiple documents match '{}':", id);
            for doc in &matches {
                eprintln!("  {} - {}", doc.id, doc.name);
            }
            bail!("Ambiguous ID. Please provide more digits.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_id(id: &str, name: &str) -> Document {
        let mut doc = Document::new(name, vec![Page::new("file:///a.jpg")], None);
        doc.id = id.to_string();
        doc
    }

    #[test]
    fn test_resolve_exact_id() {
        let docs = vec![
            doc_with_id("1717171717001", "Receipt"),
            doc_with_id("1717171717002", "Invoice"),
        ];
        assert_eq!(resolve_id(&docs, "1717171717002").unwrap(), "1717171717002");
    }

    #[test]
    fn test_resolve_by_suffix() {
        let docs = vec![
            doc_with_id("1717171717001", "Receipt"),
            doc_with_id("1717171717052", "Invoice"),
        ];
        assert_eq!(resolve_id(&docs, "52").unwrap(), "1717171717052");
    }

    #[test]
    fn test_resolve_rejects_blank_id() {
        let docs = vec![doc_with_id("1717171717001", "Receipt")];
        assert!(resolve_id(&docs, "").is_err());
        assert!(resolve_id(&docs, "  ").is_err());
    }

    #[test]
    fn test_resolve_ambiguous_or_missing() {
        let docs = vec![
            doc_with_id("1717171717001", "Receipt"),
            doc_with_id("1717171717101", "Invoice"),
        ];
        assert!(resolve_id(&docs, "01").is_err());
        assert!(resolve_id(&docs, "999").is_err());
    }
}
