//! Catalog lookups: categories, search manifests, category search and products.

use crate::api::{ApiResponse, Field, Params, TcgClient};
use crate::commands::{connect, ensure_success, save_token};
use crate::config::Config;
use crate::format::Formatter;
use anyhow::{bail, Result};
use serde_json::{json, Value};
use tracing::info;

/// A catalog request from the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogQuery {
    Categories { limit: Option<u64>, offset: Option<u64>, all: bool },
    Category { ids: Vec<u64> },
    Manifest { category_id: u64 },
    Search {
        category_id: u64,
        sort: Option<String>,
        limit: Option<u64>,
        filters: Vec<(String, String)>,
        all: bool,
    },
    Products { ids: Vec<u64> },
}

/// Executes catalog queries.
pub struct CatalogCommand {
    config: Config,
}

impl CatalogCommand {
    /// Creates a new catalog command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Runs the query and returns formatted output.
    pub async fn execute(&self, query: &CatalogQuery) -> Result<String> {
        let client = connect(&self.config)?;
        let output = self.execute_with_client(&client, query).await?;
        save_token(&self.config, &client)?;
        Ok(output)
    }

    /// Runs the query with a provided client (for testing).
    pub async fn execute_with_client(
        &self,
        client: &TcgClient,
        query: &CatalogQuery,
    ) -> Result<String> {
        let formatter = Formatter::new(self.config.format);

        match query {
            CatalogQuery::Categories { limit, offset, all } => {
                let mut params = Params::new();
                if let Some(limit) = limit {
                    params.insert("limit".to_string(), json!(limit));
                }
                if let Some(offset) = offset {
                    params.insert("offset".to_string(), json!(offset));
                }

                let response = client.categories(params).await?;
                ensure_success(&response)?;
                Ok(formatter.format_items(&listing(&response, *all).await?))
            }

            CatalogQuery::Category { ids } => {
                if ids.is_empty() {
                    bail!("At least one category id is required");
                }
                let response = client.category_details(ids).await?;
                ensure_success(&response)?;
                Ok(formatter.format_items(&listing(&response, false).await?))
            }

            CatalogQuery::Manifest { category_id } => {
                let manifest = client.category_search_manifest(*category_id).await?;
                ensure_success(&manifest)?;
                Ok(formatter.format_manifest(&manifest))
            }

            CatalogQuery::Search { category_id, sort, limit, filters, all } => {
                let params = search_params(sort.as_deref(), *limit, filters);
                info!("Searching category {} with {} filters", category_id, filters.len());

                let response = client.category_search_products(*category_id, params).await?;
                ensure_success(&response)?;
                Ok(formatter.format_items(&listing(&response, *all).await?))
            }

            CatalogQuery::Products { ids } => {
                if ids.is_empty() {
                    bail!("At least one product id is required");
                }
                let response = client.product_details(ids, Params::new()).await?;
                ensure_success(&response)?;
                Ok(formatter.format_items(&listing(&response, false).await?))
            }
        }
    }
}

/// Parses a `NAME=VALUE` search filter.
pub fn parse_filter(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() && !value.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("Invalid filter: '{}'. Use NAME=VALUE, e.g. SetName=Base Set", s)),
    }
}

/// Search body: values given for the same filter name are grouped in order.
fn search_params(sort: Option<&str>, limit: Option<u64>, filters: &[(String, String)]) -> Params {
    let mut params = Params::new();
    if let Some(sort) = sort {
        params.insert("sort".to_string(), json!(sort));
    }
    if let Some(limit) = limit {
        params.insert("limit".to_string(), json!(limit));
    }

    let mut grouped: Vec<(&str, Vec<&str>)> = Vec::new();
    for (name, value) in filters {
        match grouped.iter_mut().find(|(n, _)| *n == name.as_str()) {
            Some((_, values)) => values.push(value.as_str()),
            None => grouped.push((name.as_str(), vec![value.as_str()])),
        }
    }
    if !grouped.is_empty() {
        let filters: Vec<Value> = grouped
            .into_iter()
            .map(|(name, values)| json!({ "name": name, "values": values }))
            .collect();
        params.insert("filters".to_string(), Value::Array(filters));
    }

    params
}

/// The page in hand, or every item across all pages.
async fn listing(response: &ApiResponse<'_>, all: bool) -> Result<Vec<Field>> {
    if all {
        return Ok(response.collect_all().await?);
    }

    Ok(response
        .results()
        .map(|results| results.iter().cloned().map(Field::from_element).collect())
        .unwrap_or_default())
}
