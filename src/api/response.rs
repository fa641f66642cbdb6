//! Query responses and transparent pagination over their `results`.

use crate::api::client::{QueryOptions, TcgClient};
use crate::api::record::{Field, Record};
use crate::api::transport::Params;
use crate::error::Result;
use futures::stream::{self, LocalBoxStream, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use std::ops::{Deref, DerefMut};
use tracing::debug;

/// Page size used for follow-up fetches when the original query set no limit.
pub const DEFAULT_PAGE_LIMIT: u64 = 100;

/// The endpoint and parameters a response came from.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryContext {
    pub url: String,
    pub params: Params,
    pub options: QueryOptions,
}

/// A decoded API response.
///
/// Dereferences to its [`Record`]. Responses produced by a client keep a
/// borrowed handle to it so that [`ApiResponse::items`] can fetch the pages
/// the server left out.
#[derive(Clone)]
pub struct ApiResponse<'c> {
    record: Record,
    status: u16,
    context: Option<QueryContext>,
    client: Option<&'c TcgClient>,
}

impl<'c> ApiResponse<'c> {
    /// Wraps a record with no originating query; iteration never fetches.
    pub fn detached(record: Record) -> Self {
        Self { record, status: 200, context: None, client: None }
    }

    pub(crate) fn attached(
        record: Record,
        status: u16,
        context: QueryContext,
        client: &'c TcgClient,
    ) -> Self {
        Self { record, status, context: Some(context), client: Some(client) }
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn into_record(self) -> Record {
        self.record
    }

    /// HTTP status of the response.
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn context(&self) -> Option<&QueryContext> {
        self.context.as_ref()
    }

    pub fn success(&self) -> bool {
        envelope_success(&self.record)
    }

    pub fn errors(&self) -> Vec<String> {
        envelope_errors(&self.record)
    }

    /// Returns true if any error message contains `needle`, ignoring case.
    pub fn has_error_matching(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.errors().iter().any(|e| e.to_lowercase().contains(&needle))
    }

    pub fn total_items(&self) -> Option<u64> {
        self.record.get_u64("totalItems")
    }

    /// The raw `results` array of this page only.
    pub fn results(&self) -> Option<&Vec<Value>> {
        self.record.raw("results").and_then(Value::as_array)
    }

    /// True when iteration can fetch further pages.
    pub fn is_paginated(&self) -> bool {
        self.total_items().is_some()
            && self.results().is_some()
            && self.context.is_some()
            && self.client.is_some()
    }

    /// Starts a fresh pass over every item, fetching missing pages on demand.
    ///
    /// Each call starts from the first item and re-issues the page queries.
    pub fn items(&self) -> Pages<'_, 'c> {
        Pages::new(self)
    }

    /// The lazy item sequence as a stream.
    pub fn stream(&self) -> LocalBoxStream<'_, Result<Field>> {
        stream::try_unfold(self.items(), |mut pages| async move {
            Ok(pages.next().await?.map(|item| (item, pages)))
        })
        .boxed_local()
    }

    /// Walks every page and collects all items.
    pub async fn collect_all(&self) -> Result<Vec<Field>> {
        let mut pages = self.items();
        let mut items = Vec::new();
        while let Some(item) = pages.next().await? {
            items.push(item);
        }
        Ok(items)
    }
}

impl Deref for ApiResponse<'_> {
    type Target = Record;

    fn deref(&self) -> &Record {
        &self.record
    }
}

impl DerefMut for ApiResponse<'_> {
    fn deref_mut(&mut self) -> &mut Record {
        &mut self.record
    }
}

impl fmt::Debug for ApiResponse<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiResponse")
            .field("record", &self.record)
            .field("status", &self.status)
            .field("context", &self.context)
            .field("attached", &self.client.is_some())
            .finish()
    }
}

pub(crate) fn envelope_success(record: &Record) -> bool {
    record.get_bool("success").unwrap_or(false)
}

pub(crate) fn envelope_errors(record: &Record) -> Vec<String> {
    record
        .raw("errors")
        .and_then(Value::as_array)
        .map(|errors| {
            errors
                .iter()
                .map(|e| e.as_str().map_or_else(|| e.to_string(), str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn param_u64(params: &Params, key: &str) -> Option<u64> {
    params.get(key).and_then(|v| v.as_u64().or_else(|| v.as_str()?.parse().ok()))
}

/// Cursor over all items of a paginated response.
pub struct Pages<'r, 'c> {
    response: &'r ApiResponse<'c>,
    buffer: VecDeque<Value>,
    offset: u64,
    limit: u64,
    total: u64,
    done: bool,
}

impl<'r, 'c> Pages<'r, 'c> {
    fn new(response: &'r ApiResponse<'c>) -> Self {
        let initial: Vec<Value> = response.results().cloned().unwrap_or_default();

        match (response.is_paginated(), response.total_items(), response.context()) {
            (true, Some(total), Some(context)) => {
                let start = param_u64(&context.params, "offset").unwrap_or(0);
                let limit = param_u64(&context.params, "limit").unwrap_or(DEFAULT_PAGE_LIMIT);
                Self {
                    response,
                    offset: start + initial.len() as u64,
                    limit,
                    total,
                    done: initial.is_empty(),
                    buffer: initial.into(),
                }
            }
            _ => Self { response, buffer: initial.into(), offset: 0, limit: 0, total: 0, done: true },
        }
    }

    /// Returns the next item, fetching the next page when the current one is
    /// used up. `None` once `totalItems` is reached or a page comes back empty.
    pub async fn next(&mut self) -> Result<Option<Field>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Ok(Some(Field::from_element(item)));
            }

            if self.done || self.offset >= self.total {
                return Ok(None);
            }

            let page = self.fetch_page().await?;
            if page.is_empty() {
                debug!("Empty page at offset {}, stopping", self.offset);
                self.done = true;
                return Ok(None);
            }

            self.offset += page.len() as u64;
            self.buffer.extend(page);
        }
    }

    async fn fetch_page(&self) -> Result<Vec<Value>> {
        let (Some(context), Some(client)) = (self.response.context(), self.response.client) else {
            return Ok(Vec::new());
        };

        let mut params = context.params.clone();
        params.insert("offset".to_string(), self.offset.into());
        params.insert("limit".to_string(), self.limit.into());

        debug!("Fetching page: offset={} limit={} total={}", self.offset, self.limit, self.total);

        let page = client.query(&context.url, params, context.options).await?;
        Ok(page.results().cloned().unwrap_or_default())
    }
}
