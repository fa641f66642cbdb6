//! tcg-client - Client library and CLI for the TCGplayer catalog and pricing API
//!
//! Queries return dynamic records that page through listings on demand,
//! id-list lookups are batched transparently, and the bearer token is
//! renewed when the API rejects it.

pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod format;

pub use api::{
    ApiResponse, BearerToken, Field, Manifest, ProductPrice, ProductPriceList, QueryOptions,
    Record, TcgClient, TokenState,
};
pub use config::Config;
pub use error::{AuthError, Error, Result, TransportError};
