//! Error types for the API client.
//!
//! API-level rejections are not errors: they arrive as `success == false` and
//! a non-empty `errors` list on an otherwise well-formed response.

use thiserror::Error;

/// Failure below the query layer: network, HTTP status, or body decoding.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be sent or the body could not be read.
    #[error("request failed: {0}")]
    Request(String),

    /// The server answered with a non-success status and no API envelope.
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not valid JSON.
    #[error("failed to decode response body: {0}")]
    Decode(String),
}

/// Failure while exchanging client credentials for a bearer token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Neither the call nor the client configuration supplied both keys.
    #[error("missing API credentials: set a public and private key")]
    MissingCredentials,

    /// The token endpoint refused the credentials.
    #[error("token request rejected: {0}")]
    Rejected(String),

    /// The token endpoint answered with a token we cannot use.
    #[error("invalid bearer token: {0}")]
    InvalidToken(String),

    #[error("token request failed: {0}")]
    Transport(#[from] TransportError),
}

/// Errors returned by client operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;
