pub mod chat;
pub mod config_cmd;
pub mod doctor;
pub mod ingest;
pub mod search;

use ragchat_config::AppConfig;

/// Load and validate the configuration, or explain why it is unusable.
pub(crate) fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    AppConfig::load().map_err(|e| format!("Failed to load config: {e}").into())
}
