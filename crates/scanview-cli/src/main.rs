//! Scanview CLI
//!
//! Command-line interface for Scanview - scanned document management.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use scanview_core::{Config, DocumentStore, PageFilter, StoreError};

mod commands;
mod output;

use commands::document::CreateOptions;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "scanview")]
#[command(about = "Scanview - Local scanned document store")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all documents
    #[command(alias = "ls")]
    List,
    /// Show document details and pages
    Show {
        /// Document ID (full ID or trailing digits)
        id: String,
    },
    /// Search documents by name and recognized text
    Search {
        /// Search query
        query: String,
    },
    /// Create a document from images, one page per image
    #[command(alias = "add")]
    Create {
        /// Image files, in page order
        #[arg(required = true)]
        images: Vec<PathBuf>,
        /// Document name (derived from OCR text or the time if omitted)
        #[arg(short, long)]
        name: Option<String>,
        /// Run OCR on each page
        #[arg(long)]
        ocr: bool,
        /// Filter to record on each page
        #[arg(short, long, default_value = "original")]
        filter: PageFilter,
        /// Re-encode images at 1080x1920 before storing
        #[arg(long)]
        optimize: bool,
    },
    /// Rename a document
    Rename {
        /// Document ID (full ID or trailing digits)
        id: String,
        /// New name
        name: String,
    },
    /// Delete a document
    #[command(alias = "rm")]
    Delete {
        /// Document ID (full ID or trailing digits)
        id: String,
    },
    /// Remove a page from a document
    RemovePage {
        /// Document ID (full ID or trailing digits)
        id: String,
        /// Page ID
        page_id: String,
    },
    /// Rotate a page image
    Rotate {
        /// Document ID (full ID or trailing digits)
        id: String,
        /// Page ID
        page_id: String,
        /// Clockwise degrees (multiple of 90)
        #[arg(short, long, default_value_t = 90, allow_hyphen_values = true)]
        degrees: i32,
    },
    /// Merge documents into a new one
    Merge {
        /// Document IDs, at least two
        #[arg(required = true, num_args = 2..)]
        ids: Vec<String>,
        /// Name of the merged document
        #[arg(short, long)]
        name: String,
    },
    /// Show status (storage location, load status, counts)
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, ocr_url, ocr_api_key, ocr_timeout_secs, log_level)
        key: String,
        /// Configuration value ("none" or "" clears optional values)
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands don't need the store
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), &output);
    }

    let config = Config::load().context("Failed to load configuration")?;
    init_logging(&config, &output);

    let store = DocumentStore::open(config).await;
    if store.load_status().is_data_loss_risk() && !output.is_json() {
        output.warn("Documents file could not be loaded; run `scanview status` for details");
    }

    let result = match cli.command {
        Commands::List => commands::document::list(&store, &output),
        Commands::Show { id } => commands::document::show(&store, id, &output),
        Commands::Search { query } => commands::document::search(&store, query, &output),
        Commands::Create {
            images,
            name,
            ocr,
            filter,
            optimize,
        } => {
            let opts = CreateOptions {
                images,
                name,
                ocr,
                filter,
                optimize,
            };
            commands::document::create(&store, opts, &output).await
        }
        Commands::Rename { id, name } => commands::document::rename(&store, id, name, &output).await,
        Commands::Delete { id } => commands::document::delete(&store, id, &output).await,
        Commands::RemovePage { id, page_id } => {
            commands::document::remove_page(&store, id, page_id, &output).await
        }
        Commands::Rotate {
            id,
            page_id,
            degrees,
        } => commands::document::rotate(&store, id, page_id, degrees, &output).await,
        Commands::Merge { ids, name } => commands::document::merge(&store, ids, name, &output).await,
        Commands::Status => commands::status::show(&store, &output),
        Commands::Config { .. } => unreachable!(), // Handled above
    };

    if let Err(ref e) = result {
        if let Some(StoreError::Storage(storage)) = e.downcast_ref::<StoreError>() {
            if let Some(hint) = storage.recovery_suggestion() {
                output.warn(hint);
            }
        }
    }

    result
}

fn handle_config_command(command: Option<ConfigCommands>, output: &Output) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(output),
        Some(ConfigCommands::Set { key, value }) => commands::config::set(key, value, output),
    }
}

/// Log to stderr; RUST_LOG overrides the configured level
fn init_logging(config: &Config, output: &Output) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "scanview_core={},scanview_cli={}",
            config.log_level, config.log_level
        ))
    });

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(output.format == OutputFormat::Human)
        .with_writer(std::io::stderr)
        .try_init();
}
