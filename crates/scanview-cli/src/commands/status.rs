//! Status command handler

use anyhow::Result;

use scanview_core::{DocumentStore, LoadStatus, OcrClient};

use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(store: &DocumentStore, output: &Output) -> Result<()> {
    let config = store.config();
    let status = store.load_status();
    let docs = store.documents();
    let page_count: usize = docs.iter().map(|d| d.page_count()).sum();
    let ocr_available = OcrClient::from_config(config)
        .map(|c| c.is_available())
        .unwrap_or(false);

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "documents_file": config.documents_path(),
                    "load_status": status_label(&status),
                    "load_details": status_details(&status),
                    "data_loss_risk": status.is_data_loss_risk(),
                    "ocr_available": ocr_available,
                    "counts": {
                        "documents": docs.len(),
                        "pages": page_count
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", docs.len());
        }
        OutputFormat::Human => {
            println!("Scanview Status");
            println!("===============");
            println!();
            println!("Storage:");
            println!("  Location: {}", config.data_dir.display());
            println!("  File:     {}", config.documents_path().display());
            println!("  Load:     {}", status_label(&status));
            if let Some(details) = status_details(&status) {
                println!("  Details:  {}", details);
            }
            if status.is_data_loss_risk() {
                println!();
                println!("⚠ The documents file could not be loaded.");
                println!("  Any change will overwrite it. Back it up first:");
                println!("  {}", config.documents_path().display());
            }
            println!();
            println!("OCR:");
            println!(
                "  Status: {}",
                if ocr_available {
                    "configured"
                } else {
                    "not configured"
                }
            );
            println!();
            println!("Contents:");
            println!("  Documents: {}", docs.len());
            println!("  Pages:     {}", page_count);
        }
    }

    Ok(())
}

fn status_label(status: &LoadStatus) -> &'static str {
    match status {
        LoadStatus::NotLoaded => "not loaded",
        LoadStatus::Missing => "no documents file",
        LoadStatus::Loaded { .. } => "loaded",
        LoadStatus::Corrupt { .. } => "corrupt",
        LoadStatus::Unreadable { .. } => "unreadable",
    }
}

fn status_details(status: &LoadStatus) -> Option<&str> {
    match status {
        LoadStatus::Corrupt { details } | LoadStatus::Unreadable { details } => {
            Some(details.as_str())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels() {
        assert_eq!(status_label(&LoadStatus::Loaded { count: 3 }), "loaded");
        assert_eq!(status_label(&LoadStatus::Missing), "no documents file");

        let corrupt = LoadStatus::Corrupt {
            details: "expected value at line 1".to_string(),
        };
        assert_eq!(status_label(&corrupt), "corrupt");
        assert_eq!(status_details(&corrupt), Some("expected value at line 1"));
        assert_eq!(status_details(&LoadStatus::Missing), None);
    }
}
