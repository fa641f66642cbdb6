//! Shortcuts into a category search manifest.
//!
//! The manifest lists the sort options and filters a category search accepts:
//!
//! ```text
//! { "success": true, "errors": [],
//!   "results": [{
//!     "sorting": [{ "text": "Best Match", "value": "Relevance" }, ...],
//!     "filters": [{ "name": "SetName", "displayText": "Set",
//!                   "items": [{ "text": "Base Set", "value": "Base Set" }, ...] }, ...]
//!   }] }
//! ```

use crate::api::record::Record;
use crate::api::response::ApiResponse;
use std::ops::Deref;

/// A search manifest response.
#[derive(Debug, Clone)]
pub struct Manifest<'c> {
    response: ApiResponse<'c>,
}

impl<'c> Manifest<'c> {
    pub fn new(response: ApiResponse<'c>) -> Self {
        Self { response }
    }

    pub fn into_response(self) -> ApiResponse<'c> {
        self.response
    }

    fn first_result(&self) -> Option<&Record> {
        self.response.get_records("results").and_then(<[Record]>::first)
    }

    /// Sort options, each with `text` and `value`.
    pub fn sorting(&self) -> &[Record] {
        self.first_result().and_then(|r| r.get_records("sorting")).unwrap_or_default()
    }

    /// Accepted values for a search's `sort` parameter.
    pub fn sort_values(&self) -> Vec<&str> {
        self.sorting().iter().filter_map(|s| s.get_str("value")).collect()
    }

    pub fn filters(&self) -> &[Record] {
        self.first_result().and_then(|r| r.get_records("filters")).unwrap_or_default()
    }

    /// The filter called `name`, e.g. `SetName`.
    pub fn filter(&self, name: &str) -> Option<&Record> {
        self.filters().iter().find(|f| f.get_str("name") == Some(name))
    }

    /// Items of filter `filter_name` whose `text` is exactly `text`.
    pub fn filter_items(&self, filter_name: &str, text: &str) -> Vec<&Record> {
        self.filter(filter_name)
            .and_then(|f| f.get_records("items"))
            .unwrap_or_default()
            .iter()
            .filter(|item| item.get_str("text") == Some(text))
            .collect()
    }
}

impl<'c> Deref for Manifest<'c> {
    type Target = ApiResponse<'c>;

    fn deref(&self) -> &ApiResponse<'c> {
        &self.response
    }
}
