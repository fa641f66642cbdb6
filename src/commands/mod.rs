//! CLI command implementations.

pub mod auth;
pub mod catalog;
pub mod pricing;

pub use auth::AuthCommand;
pub use catalog::{CatalogCommand, CatalogQuery};
pub use pricing::PricingCommand;

use crate::api::{ApiResponse, BearerToken, TcgClient};
use crate::config::Config;
use anyhow::{bail, Context, Result};
use tracing::debug;

/// Builds a client, starting from the saved token if there is one.
pub fn connect(config: &Config) -> Result<TcgClient> {
    let client = TcgClient::new(config).context("Failed to create HTTP client")?;

    match load_token(config)? {
        Some(token) => Ok(client.with_bearer_token(token)),
        None => Ok(client),
    }
}

/// Reads the token saved at `config.token_file`, if any.
pub fn load_token(config: &Config) -> Result<Option<BearerToken>> {
    let Some(path) = config.token_file.as_deref().filter(|p| p.exists()) else {
        return Ok(None);
    };
    debug!("Loading bearer token from: {}", path.display());

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read token file: {}", path.display()))?;
    let token = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse token file: {}", path.display()))?;

    Ok(Some(token))
}

/// Writes the client's current token to `config.token_file`, if configured.
pub fn save_token(config: &Config, client: &TcgClient) -> Result<()> {
    let (Some(path), Some(token)) = (config.token_file.as_deref(), client.bearer_token()) else {
        return Ok(());
    };
    debug!("Saving bearer token to: {}", path.display());

    let content = serde_json::to_string_pretty(&token)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write token file: {}", path.display()))
}

/// Turns an API-level rejection into an error for the CLI.
pub(crate) fn ensure_success(response: &ApiResponse<'_>) -> Result<()> {
    if response.success() {
        return Ok(());
    }

    let errors = response.errors();
    if errors.is_empty() {
        bail!("API request failed (HTTP {})", response.status());
    }
    bail!("API request failed: {}", errors.join("; "))
}
