//! `ragchat config` — Show the effective configuration or write a starter file.

use std::path::Path;

use ragchat_config::AppConfig;

pub fn run(init: bool, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    if init {
        init_at(&config_path, force)?;
        println!("  ✅ Wrote starter config to {}", config_path.display());
        return Ok(());
    }

    let config = super::load_config()?;
    println!("  # {}", config_path.display());
    println!("{}", render_redacted(&config)?);
    Ok(())
}

/// Write the default configuration, refusing to clobber an existing file.
fn init_at(path: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() && !force {
        return Err(format!("{} already exists (use --force to overwrite)", path.display()).into());
    }
    AppConfig::default().save_to(path)?;
    Ok(())
}

/// TOML of the effective config with secrets hidden.
fn render_redacted(config: &AppConfig) -> Result<String, toml::ser::Error> {
    let mut shown = config.clone();
    if shown.api_key.is_some() {
        shown.api_key = Some("[REDACTED]".into());
    }
    for provider in shown.providers.values_mut() {
        if provider.api_key.is_some() {
            provider.api_key = Some("[REDACTED]".into());
        }
    }
    shown.vector_store.connection_string = ragchat_config::redact_url(&shown.vector_store.connection_string);
    shown.document_store.url = ragchat_config::redact_url(&shown.document_store.url);
    toml::to_string_pretty(&shown)
}
