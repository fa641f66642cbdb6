//! Splitting long id lists into bounded requests and merging the answers.

use crate::api::record::Record;
use crate::api::response::ApiResponse;
use serde_json::Value;
use std::future::Future;
use tracing::debug;

/// Largest id list the API accepts in one request.
pub const DEFAULT_BATCH_SIZE: usize = 200;

/// Identifiers for an id-list endpoint, kept in caller order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdList(Vec<String>);

impl IdList {
    pub fn new(ids: Vec<String>) -> Self {
        Self(ids)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Comma-separated form used in endpoint paths.
    pub fn join(&self) -> String {
        self.0.join(",")
    }
}

impl From<u64> for IdList {
    fn from(id: u64) -> Self {
        Self(vec![id.to_string()])
    }
}

impl From<&str> for IdList {
    fn from(id: &str) -> Self {
        Self(vec![id.to_string()])
    }
}

impl From<String> for IdList {
    fn from(id: String) -> Self {
        Self(vec![id])
    }
}

impl From<Vec<u64>> for IdList {
    fn from(ids: Vec<u64>) -> Self {
        Self::from(ids.as_slice())
    }
}

impl From<&Vec<u64>> for IdList {
    fn from(ids: &Vec<u64>) -> Self {
        Self::from(ids.as_slice())
    }
}

impl From<&[u64]> for IdList {
    fn from(ids: &[u64]) -> Self {
        Self(ids.iter().map(u64::to_string).collect())
    }
}

impl<const N: usize> From<[u64; N]> for IdList {
    fn from(ids: [u64; N]) -> Self {
        Self::from(ids.as_slice())
    }
}

impl From<Vec<String>> for IdList {
    fn from(ids: Vec<String>) -> Self {
        Self(ids)
    }
}

impl From<&[String]> for IdList {
    fn from(ids: &[String]) -> Self {
        Self(ids.to_vec())
    }
}

/// Responses whose `results` arrays can be concatenated.
pub trait MergeResults {
    /// Appends `other`'s results to this one's. Other fields are left alone.
    fn merge_results(&mut self, other: Self);
}

impl MergeResults for Record {
    fn merge_results(&mut self, mut other: Self) {
        let Some(Value::Array(extra)) = other.remove("results") else {
            return;
        };
        if let Some(Value::Array(results)) = self.raw_mut("results") {
            results.extend(extra);
        }
    }
}

impl MergeResults for ApiResponse<'_> {
    fn merge_results(&mut self, other: Self) {
        let record: &mut Record = self;
        record.merge_results(other.into_record());
    }
}

/// Runs `query` once per chunk of at most `batch_size` ids, in order, and
/// merges the responses into the first one.
///
/// An empty id list still issues exactly one query, with an empty chunk.
pub async fn batch_and_merge<R, E, F, Fut>(
    ids: impl Into<IdList>,
    batch_size: usize,
    mut query: F,
) -> Result<R, E>
where
    R: MergeResults,
    F: FnMut(IdList) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let ids = ids.into();
    let mut chunks = ids.as_slice().chunks(batch_size.max(1));

    let first = chunks.next().map(<[String]>::to_vec).unwrap_or_default();
    debug!("Batch 1: {} ids", first.len());
    let mut merged = query(IdList(first)).await?;

    for (index, chunk) in chunks.enumerate() {
        debug!("Batch {}: {} ids", index + 2, chunk.len());
        let response = query(IdList(chunk.to_vec())).await?;
        merged.merge_results(response);
    }

    Ok(merged)
}
