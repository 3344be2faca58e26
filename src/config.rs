// Startup configuration.
//
// Everything the bot needs at runtime comes from a single JSON file:
// Azure app credentials, the target plan, the Discord token, and the four
// identity mapping tables. The file is read once at startup and a load
// failure is fatal - there are no defaults to fall back on.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Default config location, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// Top-level configuration document.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub azure: AzureConfig,
    pub discord: DiscordConfig,
    pub mappings: MappingConfig,
}

/// Azure AD application credentials and the plan all tasks belong to.
#[derive(Debug, Clone, Deserialize)]
pub struct AzureConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub plan_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    pub token: String,
    /// Channel that receives watchdog status embeds.
    pub log_channel_id: u64,
}

/// The four forward mapping tables, keyed as they appear in the file.
///
/// `discord_id_mapping` maps Graph user ids to Discord user ids, and
/// `discord_channel_mapping` maps bucket ids to Discord channel ids.
/// The reverse directions are computed at startup, not stored here.
#[derive(Debug, Clone, Deserialize)]
pub struct MappingConfig {
    pub discord_id_mapping: HashMap<String, String>,
    pub bucket_id_to_name_mapping: HashMap<String, String>,
    pub user_id_to_name_mapping: HashMap<String, String>,
    pub discord_channel_mapping: HashMap<String, String>,
}

/// Load and parse the configuration file.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}
