//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use anyhow::Result;
use serde::Serialize;

use scanview_core::Document;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Check if output is JSON
    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print a single document with its pages
    pub fn print_document(&self, doc: &Document) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("ID:       {}", doc.id);
                println!("Name:     {}", doc.name);
                println!("Pages:    {}", doc.page_count());
                if let Some(ref thumb) = doc.thumbnail {
                    println!("Thumb:    {}", thumb);
                }
                if let Some(ref tags) = doc.tags {
                    if !tags.is_empty() {
                        println!("Tags:     {}", tags.join(", "));
                    }
                }
                println!("Created:  {}", doc.created_at.format("%Y-%m-%d %H:%M"));
                println!("Updated:  {}", doc.updated_at.format("%Y-%m-%d %H:%M"));

                println!();
                println!("── Pages ({}) ──", doc.page_count());
                for (index, page) in doc.pages.iter().enumerate() {
                    let filter = page
                        .filter
                        .map(|f| format!(" [{}]", f))
                        .unwrap_or_default();
                    println!(
                        "{:>3}. {}{} {}",
                        index + 1,
                        page.id,
                        filter,
                        page.display_uri()
                    );
                }

                if let Some(ref text) = doc.extracted_text {
                    println!();
                    println!("── Text ──");
                    println!("{}", text);
                }
            }
            OutputFormat::Json => print_json(doc)?,
            OutputFormat::Quiet => {
                println!("{}", doc.id);
            }
        }
        Ok(())
    }

    /// Print a list of documents
    pub fn print_documents(&self, docs: &[Document]) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if docs.is_empty() {
                    println!("No documents found.");
                    return Ok(());
                }
                for doc in docs {
                    println!(
                        "{} | {} | {:>2}p | {}",
                        doc.id,
                        doc.updated_at.format("%Y-%m-%d %H:%M"),
                        doc.page_count(),
                        truncate(&doc.name, 40),
                    );
                    if let Some(ref text) = doc.extracted_text {
                        println!("    {}", truncate_line(text, 60));
                    }
                }
                println!("\n{} document(s)", docs.len());
            }
            OutputFormat::Json => print_json(&docs)?,
            OutputFormat::Quiet => {
                for doc in docs {
                    println!("{}", doc.id);
                }
            }
        }
        Ok(())
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning to stderr (suppressed in quiet mode)
    pub fn warn(&self, message: &str) {
        if !self.is_quiet() {
            eprintln!("⚠ {}", message);
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate("Überweisung März", 10), "Überwei...");
        assert_eq!(truncate("領収書", 10), "領収書");
    }

    #[test]
    fn test_truncate_line() {
        assert_eq!(truncate_line("INVOICE #2024-001\nAcme Corp", 30), "INVOICE #2024-001");
        assert_eq!(
            truncate_line("very long single line here", 10),
            "very lo..."
        );
    }

    #[test]
    fn test_prompt_only_for_humans() {
        assert!(Output::new(OutputFormat::Human).should_prompt());
        assert!(!Output::new(OutputFormat::Json).should_prompt());
        assert!(!Output::new(OutputFormat::Quiet).should_prompt());
    }
}
