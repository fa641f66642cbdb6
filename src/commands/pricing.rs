//! Product pricing command implementation.

use crate::api::TcgClient;
use crate::commands::{connect, save_token};
use crate::config::Config;
use crate::format::Formatter;
use anyhow::{bail, Result};
use tracing::{info, warn};

/// Fetches market prices for products, grouped by product id.
pub struct PricingCommand {
    config: Config,
}

impl PricingCommand {
    /// Creates a new pricing command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Fetches prices and returns formatted output.
    pub async fn execute(&self, ids: &[u64], valid_only: bool) -> Result<String> {
        let client = connect(&self.config)?;
        let output = self.execute_with_client(&client, ids, valid_only).await?;
        save_token(&self.config, &client)?;
        Ok(output)
    }

    /// Fetches prices with a provided client (for testing).
    pub async fn execute_with_client(
        &self,
        client: &TcgClient,
        ids: &[u64],
        valid_only: bool,
    ) -> Result<String> {
        if ids.is_empty() {
            bail!("At least one product id is required");
        }

        let prices = client.product_pricing(ids).await?;
        if !prices.success() {
            bail!("API request failed: {}", prices.errors().join("; "));
        }

        let missing: Vec<&u64> = ids.iter().filter(|id| prices.get(**id).is_none()).collect();
        if !missing.is_empty() {
            warn!("No prices returned for {} of {} products", missing.len(), ids.len());
        }
        info!("Prices for {} products", prices.prices().len());

        let formatter = Formatter::new(self.config.format);
        Ok(formatter.format_prices(&prices, valid_only))
    }
}
