//! TCGplayer REST API client.
//!
//! Responses are dynamic [`Record`]s. Listing responses page transparently
//! through [`ApiResponse::items`], id-list endpoints are split into batches
//! and merged, and an expired bearer token is renewed once per query.

pub mod batch;
pub mod client;
pub mod manifest;
pub mod pricing;
pub mod record;
pub mod response;
pub mod token;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::{batch_and_merge, IdList, MergeResults, DEFAULT_BATCH_SIZE};
pub use client::{QueryOptions, TcgClient};
pub use manifest::Manifest;
pub use pricing::{group_prices, ProductPrice, ProductPriceList};
pub use record::{Field, Record};
pub use response::{ApiResponse, Pages, QueryContext, DEFAULT_PAGE_LIMIT};
pub use token::{BearerToken, TokenState};
pub use transport::{HttpTransport, Params, Transport};
