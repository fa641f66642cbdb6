//! Configuration management with TOML, environment variables, and CLI overrides.

use crate::api::batch::DEFAULT_BATCH_SIZE;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API root, without a trailing slash
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User-Agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Application public key (client id)
    #[serde(default)]
    pub public_key: Option<String>,

    /// Application private key (client secret)
    #[serde(default)]
    pub private_key: Option<String>,

    /// Never re-authenticate and retry on bearer token errors
    #[serde(default)]
    pub noretry: bool,

    /// Maximum ids per request on id-list endpoints
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Proxy URL (e.g., socks5://host:port)
    #[serde(default)]
    pub proxy: Option<String>,

    /// Where the CLI keeps the last issued bearer token
    #[serde(default)]
    pub token_file: Option<PathBuf>,

    /// Output format
    #[serde(default)]
    pub format: OutputFormat,
}

fn default_base_url() -> String {
    "https://api.tcgplayer.com".to_string()
}

fn default_user_agent() -> String {
    "Unknown".to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            public_key: None,
            private_key: None,
            noretry: false,
            batch_size: default_batch_size(),
            timeout_secs: default_timeout_secs(),
            proxy: None,
            token_file: None,
            format: OutputFormat::Table,
        }
    }
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        // 1. Explicit path takes precedence
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        // 2. Try current directory
        let local_config = Path::new("config.toml");
        if local_config.exists() {
            debug!("Found config.toml in current directory");
            return Self::from_file(local_config);
        }

        // 3. Try XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("tcg-client").join("config.toml");
            if xdg_config.exists() {
                debug!("Found config in XDG config directory");
                return Self::from_file(xdg_config);
            }
        }

        // 4. Return default config
        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies environment variable overrides.
    ///
    /// API keys from the environment only fill keys the file left unset.
    pub fn with_env(mut self) -> Self {
        if self.public_key.is_none() {
            self.public_key = std::env::var("TCG_PLAYER_API_PUBLIC_KEY").ok();
        }

        if self.private_key.is_none() {
            self.private_key = std::env::var("TCG_PLAYER_API_PRIVATE_KEY").ok();
        }

        if let Ok(url) = std::env::var("TCG_BASE_URL") {
            self.base_url = url;
        }

        if let Ok(agent) = std::env::var("TCG_USER_AGENT") {
            self.user_agent = agent;
        }

        if let Ok(proxy) = std::env::var("TCG_PROXY") {
            self.proxy = Some(proxy);
        }

        if let Ok(noretry) = std::env::var("TCG_NORETRY") {
            if let Ok(n) = noretry.parse() {
                self.noretry = n;
            }
        }

        self
    }
}

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use: table, json, csv", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}
