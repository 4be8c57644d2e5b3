//! Configuration loading
//!
//! Two tiers, resolved once at process start and passed explicitly to every
//! component:
//! 1. **Environment**: credentials and storage location. All six variables are
//!    required and have no defaults.
//! 2. **TOML bootstrap** (optional): playlist, polling and logging tunables.
//!    A missing file is not an error; defaults are used instead.
//!
//! Command-line flags are applied on top by each binary.

use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const ENV_SPOTIFY_CLIENT_ID: &str = "SPOTIFY_CLIENT_ID";
pub const ENV_SPOTIFY_CLIENT_SECRET: &str = "SPOTIFY_CLIENT_SECRET";
pub const ENV_STORAGE_ACCOUNT_NAME: &str = "STORAGE_ACCOUNT_NAME";
pub const ENV_STORAGE_ACCOUNT_KEY: &str = "STORAGE_ACCOUNT_KEY";
pub const ENV_STORAGE_CONNECTION_STRING: &str = "STORAGE_CONNECTION_STRING";
pub const ENV_STORAGE_CONTAINER: &str = "STORAGE_CONTAINER";

/// Environment variable naming the TOML bootstrap file
pub const ENV_CONFIG_PATH: &str = "SPETL_CONFIG";

/// Top 50 Global
pub const DEFAULT_PLAYLIST_ID: &str = "37i9dQZEVXbNG2KDcFcKOF";

/// Largest page the playlist tracks endpoint serves
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Spotify application credentials (client-credentials flow)
#[derive(Clone)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for SpotifyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotifyCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Storage account settings
///
/// The account name/key pair authenticates data lake writes; the connection
/// string is used to list and download pending raw files.
#[derive(Clone)]
pub struct StorageConfig {
    pub account_name: String,
    pub account_key: String,
    pub connection_string: String,
    pub container: String,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("account_name", &self.account_name)
            .field("account_key", &"<redacted>")
            .field("connection_string", &"<redacted>")
            .field("container", &self.container)
            .finish()
    }
}

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Playlist to extract on every scheduled run
    #[serde(default = "default_playlist_id")]
    pub playlist_id: String,

    /// Page size requested from the playlist tracks endpoint (1..=100)
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,

    /// Seconds between raw zone polls in the transform-load watcher
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            playlist_id: default_playlist_id(),
            page_limit: default_page_limit(),
            poll_interval_secs: default_poll_interval_secs(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Page limit clamped to what the API accepts
    pub fn effective_page_limit(&self) -> u32 {
        self.page_limit.clamp(1, MAX_PAGE_LIMIT)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_playlist_id() -> String {
    DEFAULT_PLAYLIST_ID.to_string()
}

fn default_page_limit() -> u32 {
    MAX_PAGE_LIMIT
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Complete process configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub spotify: SpotifyCredentials,
    pub storage: StorageConfig,
    pub settings: TomlConfig,
}

impl PipelineConfig {
    /// Build configuration from the process environment
    pub fn from_env(settings: TomlConfig) -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), settings)
    }

    /// Build configuration from an arbitrary variable lookup
    ///
    /// Every missing or blank variable is reported in one error so a broken
    /// deployment can be fixed in a single pass.
    pub fn from_lookup<F>(lookup: F, settings: TomlConfig) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut require = |key: &'static str| -> String {
            match lookup(key).filter(|v| !v.trim().is_empty()) {
                Some(value) => value,
                None => {
                    missing.push(key);
                    String::new()
                }
            }
        };

        let spotify = SpotifyCredentials {
            client_id: require(ENV_SPOTIFY_CLIENT_ID),
            client_secret: require(ENV_SPOTIFY_CLIENT_SECRET),
        };
        let storage = StorageConfig {
            account_name: require(ENV_STORAGE_ACCOUNT_NAME),
            account_key: require(ENV_STORAGE_ACCOUNT_KEY),
            connection_string: require(ENV_STORAGE_CONNECTION_STRING),
            container: require(ENV_STORAGE_CONTAINER),
        };

        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            spotify,
            storage,
            settings,
        })
    }
}

/// Resolve the TOML bootstrap file location
///
/// Priority: command-line argument, then `SPETL_CONFIG`, then
/// `<config dir>/spetl/spetl.toml`.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir().map(|d| d.join("spetl").join("spetl.toml"))
}

/// Load the TOML bootstrap file
///
/// A missing file yields defaults with a warning. A file that exists but
/// does not parse is a configuration error.
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        warn!("No config file location available, using defaults");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        warn!("Config file {} not found, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    info!("Loaded config from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, String> {
        HashMap::from([
            (ENV_SPOTIFY_CLIENT_ID, "client-id".to_string()),
            (ENV_SPOTIFY_CLIENT_SECRET, "client-secret".to_string()),
            (ENV_STORAGE_ACCOUNT_NAME, "spetlacct".to_string()),
            (ENV_STORAGE_ACCOUNT_KEY, "a2V5".to_string()),
            (
                ENV_STORAGE_CONNECTION_STRING,
                "AccountName=spetlacct;AccountKey=a2V5".to_string(),
            ),
            (ENV_STORAGE_CONTAINER, "spotify".to_string()),
        ])
    }

    #[test]
    fn test_from_lookup_reads_all_variables() {
        let env = full_env();
        let config =
            PipelineConfig::from_lookup(|k| env.get(k).cloned(), TomlConfig::default()).unwrap();

        assert_eq!(config.spotify.client_id, "client-id");
        assert_eq!(config.storage.account_name, "spetlacct");
        assert_eq!(config.storage.container, "spotify");
        assert_eq!(config.settings.playlist_id, DEFAULT_PLAYLIST_ID);
    }

    #[test]
    fn test_from_lookup_reports_every_missing_variable() {
        let mut env = full_env();
        env.remove(ENV_SPOTIFY_CLIENT_SECRET);
        env.insert(ENV_STORAGE_CONTAINER, "   ".to_string());

        let err = PipelineConfig::from_lookup(|k| env.get(k).cloned(), TomlConfig::default())
            .unwrap_err();
        let message = err.to_string();

        assert!(message.contains(ENV_SPOTIFY_CLIENT_SECRET));
        assert!(message.contains(ENV_STORAGE_CONTAINER));
        assert!(!message.contains(ENV_STORAGE_ACCOUNT_NAME));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let env = full_env();
        let config =
            PipelineConfig::from_lookup(|k| env.get(k).cloned(), TomlConfig::default()).unwrap();
        let rendered = format!("{:?}", config);

        assert!(!rendered.contains("client-secret"));
        assert!(!rendered.contains("a2V5"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_toml_defaults_fill_missing_keys() {
        let config: TomlConfig = toml::from_str("poll_interval_secs = 5").unwrap();

        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.page_limit, 100);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_page_limit_is_clamped() {
        let config = TomlConfig {
            page_limit: 500,
            ..TomlConfig::default()
        };
        assert_eq!(config.effective_page_limit(), 100);

        let config = TomlConfig {
            page_limit: 0,
            ..TomlConfig::default()
        };
        assert_eq!(config.effective_page_limit(), 1);
    }
}
