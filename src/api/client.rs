//! Authenticated client for the TCGplayer catalog and pricing API.

use crate::api::batch::{batch_and_merge, IdList};
use crate::api::manifest::Manifest;
use crate::api::pricing::ProductPriceList;
use crate::api::record::{Field, Record};
use crate::api::response::{ApiResponse, QueryContext};
use crate::api::token::{BearerToken, TokenState};
use crate::api::transport::{Body, HttpRequest, HttpTransport, Method, Params, Transport};
use crate::config::Config;
use crate::error::{AuthError, Result, TransportError};
use serde_json::{json, Value};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Sent in place of a token before the client has authenticated.
const NO_TOKEN: &str = "none";

/// Error text the API uses when the bearer token is missing or stale.
const BEARER_TOKEN_ERROR: &str = "bearer token";

/// Per-call query flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Send parameters as a JSON body with POST instead of a GET query string.
    pub post: bool,
    /// Return bearer-token errors instead of re-authenticating.
    pub noretry: bool,
}

impl QueryOptions {
    pub fn post() -> Self {
        Self { post: true, noretry: false }
    }

    pub fn noretry(mut self) -> Self {
        self.noretry = true;
        self
    }
}

/// TCGplayer API client.
///
/// Holds the bearer token; everything else is fixed at construction.
pub struct TcgClient {
    transport: Box<dyn Transport>,
    base_url: String,
    user_agent: String,
    public_key: Option<String>,
    private_key: Option<String>,
    noretry: bool,
    batch_size: usize,
    bearer_token: RwLock<Option<BearerToken>>,
}

impl TcgClient {
    /// Creates a client backed by the HTTP transport.
    pub fn new(config: &Config) -> Result<Self> {
        let transport =
            HttpTransport::new(Duration::from_secs(config.timeout_secs), config.proxy.as_deref())?;
        Ok(Self::with_transport(config, transport))
    }

    /// Creates a client with a custom transport (for testing).
    pub fn with_transport(config: &Config, transport: impl Transport + 'static) -> Self {
        Self {
            transport: Box::new(transport),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
            public_key: config.public_key.clone(),
            private_key: config.private_key.clone(),
            noretry: config.noretry,
            batch_size: config.batch_size,
            bearer_token: RwLock::new(None),
        }
    }

    /// Starts with a previously issued token.
    pub fn with_bearer_token(self, token: BearerToken) -> Self {
        self.set_bearer_token(Some(token));
        self
    }

    pub fn bearer_token(&self) -> Option<BearerToken> {
        self.bearer_token.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_bearer_token(&self, token: Option<BearerToken>) {
        *self.bearer_token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    /// Token validity right now.
    pub fn token_state(&self) -> TokenState {
        TokenState::of(self.bearer_token().as_ref())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn token_url(&self) -> String {
        format!("{}/token", self.base_url)
    }

    fn catalog_url(&self) -> String {
        format!("{}/catalog", self.base_url)
    }

    fn categories_url(&self) -> String {
        format!("{}/categories", self.catalog_url())
    }

    fn pricing_url(&self) -> String {
        format!("{}/pricing", self.base_url)
    }

    /// Exchanges client credentials for a bearer token and stores it.
    ///
    /// Keys given here take precedence over the ones from the configuration.
    pub async fn authenticate(
        &self,
        public_key: Option<&str>,
        private_key: Option<&str>,
    ) -> std::result::Result<BearerToken, AuthError> {
        let public_key = public_key.or(self.public_key.as_deref());
        let private_key = private_key.or(self.private_key.as_deref());
        let (Some(public_key), Some(private_key)) = (public_key, private_key) else {
            return Err(AuthError::MissingCredentials);
        };

        info!("Requesting bearer token");

        let request = HttpRequest {
            method: Method::Post,
            url: self.token_url(),
            auth_token: None,
            user_agent: self.user_agent.clone(),
            body: Body::Form(vec![
                ("grant_type".to_string(), "client_credentials".to_string()),
                ("client_id".to_string(), public_key.to_string()),
                ("client_secret".to_string(), private_key.to_string()),
            ]),
        };

        let body = match self.transport.send(request).await {
            Ok(raw) => raw.body,
            // Bad credentials come back as a non-2xx OAuth error object.
            Err(TransportError::Status { status, body }) => match oauth_error(&body) {
                Some(error) => error,
                None => return Err(TransportError::Status { status, body }.into()),
            },
            Err(e) => return Err(e.into()),
        };
        let token = BearerToken::from_response(&body)?;
        debug!("Bearer token issued, expires at {}", token.expires_at);

        self.set_bearer_token(Some(token.clone()));
        Ok(token)
    }

    /// Runs a query, re-authenticating and retrying once if the API rejects
    /// the bearer token.
    ///
    /// The retry is skipped when `options.noretry` or the client-level
    /// `noretry` is set. A second bearer-token error is returned as-is.
    pub async fn query(
        &self,
        url: &str,
        params: Params,
        options: QueryOptions,
    ) -> Result<ApiResponse<'_>> {
        let response = self.query_once(url, &params, options).await?;

        if options.noretry || self.noretry || !response.has_error_matching(BEARER_TOKEN_ERROR) {
            return Ok(response);
        }

        warn!("Bearer token rejected for {}, re-authenticating", url);
        self.authenticate(None, None).await?;
        self.query_once(url, &params, options).await
    }

    /// A single request with no retry.
    async fn query_once(
        &self,
        url: &str,
        params: &Params,
        options: QueryOptions,
    ) -> Result<ApiResponse<'_>> {
        debug!("Query: {} params: {}", url, serde_json::Value::Object(params.clone()));

        let auth_token = self.bearer_token().map_or_else(|| NO_TOKEN.to_string(), |t| t.token);
        let (method, body) = if options.post {
            (Method::Post, Body::Json(params.clone()))
        } else {
            (Method::Get, Body::Query(params.clone()))
        };

        let request = HttpRequest {
            method,
            url: url.to_string(),
            auth_token: Some(auth_token),
            user_agent: self.user_agent.clone(),
            body,
        };

        let raw = self.transport.send(request).await?;
        let record = Record::from_value(raw.body).ok_or_else(|| {
            TransportError::Decode(format!("expected a JSON object from {}", url))
        })?;

        let context = QueryContext { url: url.to_string(), params: params.clone(), options };
        Ok(ApiResponse::attached(record, raw.status, context, self))
    }

    /// Lists categories. Supports `limit`, `offset`, `sortOrder`, `sortDesc`.
    pub async fn categories(&self, params: Params) -> Result<ApiResponse<'_>> {
        info!("Listing categories");
        self.query(&self.categories_url(), params, QueryOptions::default()).await
    }

    /// Details for one or more categories.
    pub async fn category_details(&self, ids: impl Into<IdList>) -> Result<ApiResponse<'_>> {
        let ids = ids.into();
        info!("Fetching category details: {}", ids.join());
        let url = format!("{}/{}", self.categories_url(), ids.join());
        self.query(&url, Params::new(), QueryOptions::default()).await
    }

    /// Sort options and filters available when searching a category.
    pub async fn category_search_manifest(&self, category_id: u64) -> Result<Manifest<'_>> {
        info!("Fetching search manifest for category {}", category_id);
        let url = format!("{}/{}/search/manifest", self.categories_url(), category_id);
        let response = self.query(&url, Params::new(), QueryOptions::default()).await?;
        Ok(Manifest::new(response))
    }

    /// Searches a category for product ids.
    ///
    /// `params` may carry `sort`, `limit`, `offset` and `filters`
    /// (`[{"name": ..., "values": [...]}]`). Iterating the response walks
    /// every matching id.
    pub async fn category_search_products(
        &self,
        category_id: u64,
        params: Params,
    ) -> Result<ApiResponse<'_>> {
        info!("Searching category {}", category_id);
        let url = format!("{}/{}/search", self.categories_url(), category_id);
        self.query(&url, params, QueryOptions::post()).await
    }

    /// Product details for any number of ids, batched and merged.
    pub async fn product_details(
        &self,
        ids: impl Into<IdList>,
        params: Params,
    ) -> Result<ApiResponse<'_>> {
        let ids = ids.into();
        info!("Fetching details for {} products", ids.len());

        batch_and_merge(ids, self.batch_size, |chunk| {
            let url = format!("{}/products/{}", self.catalog_url(), chunk.join());
            let params = params.clone();
            async move { self.query(&url, params, QueryOptions::default()).await }
        })
        .await
    }

    /// Market prices for any number of product ids, batched, merged and
    /// grouped by product.
    pub async fn product_pricing(&self, ids: impl Into<IdList>) -> Result<ProductPriceList> {
        let ids = ids.into();
        info!("Fetching prices for {} products", ids.len());

        let merged = batch_and_merge(ids, self.batch_size, |chunk| {
            let url = format!("{}/product/{}", self.pricing_url(), chunk.join());
            async move { self.query(&url, Params::new(), QueryOptions::default()).await }
        })
        .await?;

        Ok(ProductPriceList::new(merged.into_record()))
    }

    /// First category whose name contains `pattern`, ignoring case. Walks
    /// every page of the category listing.
    pub async fn find_category(&self, pattern: &str) -> Result<Option<Record>> {
        let needle = pattern.to_lowercase();
        let params = json!({ "limit": 100 }).as_object().cloned().unwrap_or_default();
        let listing = self.categories(params).await?;

        let mut pages = listing.items();
        while let Some(item) = pages.next().await? {
            if let Field::Record(category) = item {
                let matches =
                    category.get_str("name").is_some_and(|n| n.to_lowercase().contains(&needle));
                if matches {
                    return Ok(Some(category));
                }
            }
        }

        Ok(None)
    }
}

/// The `{"error": ..}` object a token endpoint sends with a 4xx status.
fn oauth_error(body: &str) -> Option<Value> {
    serde_json::from_str::<Value>(body).ok().filter(|v| v.get("error").is_some())
}
