//! Token exchange command.

use crate::api::TcgClient;
use crate::commands::save_token;
use crate::config::Config;
use crate::format::Formatter;
use anyhow::{Context, Result};
use tracing::info;

/// Authenticates with the configured keys and prints the issued token.
pub struct AuthCommand {
    config: Config,
}

impl AuthCommand {
    /// Creates a new auth command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Requests a fresh token and returns formatted output.
    pub async fn execute(&self) -> Result<String> {
        let client = TcgClient::new(&self.config).context("Failed to create HTTP client")?;
        self.execute_with_client(&client).await
    }

    /// Requests a fresh token with a provided client (for testing).
    pub async fn execute_with_client(&self, client: &TcgClient) -> Result<String> {
        let token =
            client.authenticate(None, None).await.context("Failed to obtain a bearer token")?;
        info!("Authenticated, token expires at {}", token.expires_at);

        save_token(&self.config, client)?;

        let formatter = Formatter::new(self.config.format);
        Ok(formatter.format_token(&token))
    }
}
