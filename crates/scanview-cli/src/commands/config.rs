//! Config command handlers

use anyhow::{Context, Result};

use scanview_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(output: &Output) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "ocr_url": config.ocr_url,
                    "ocr_api_key": config.ocr_api_key.as_deref().map(mask),
                    "ocr_timeout_secs": config.ocr_timeout_secs,
                    "log_level": config.log_level
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  data_dir:         {}", config.data_dir.display());
            println!(
                "  ocr_url:          {}",
                config.ocr_url.as_deref().unwrap_or("(not set)")
            );
            println!(
                "  ocr_api_key:      {}",
                config
                    .ocr_api_key
                    .as_deref()
                    .map(mask)
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!("  ocr_timeout_secs: {}", config.ocr_timeout_secs);
            println!("  log_level:        {}", config.log_level);
            println!();
            println!("Config file: {}", Config::config_file_path().display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(key: String, value: String, output: &Output) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;

    let value = if value == "none" { String::new() } else { value };
    config.set(&key, &value)?;
    config.save().context("Failed to save configuration")?;

    let shown = if key == "ocr_api_key" { mask(&value) } else { value };
    output.success(&format!("Set {} = {}", key, shown));

    Ok(())
}

/// Hide all but the last four characters of a secret
fn mask(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(count - 4), tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask() {
        assert_eq!(mask("abc"), "***");
        assert_eq!(mask("sk_live_1234"), "********1234");
        assert_eq!(mask(""), "");
    }
}
