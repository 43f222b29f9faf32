//! Error types for the passkey persistence layer
//!
//! Every fallible operation in the crate returns [`StoreError`]. Variants carry
//! enough context (which query, which key) for the caller to log the failure;
//! none of them carry credential material.

use thiserror::Error;

/// Boxed source error carried by query failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Text shown to clients for any failed user or session lookup
pub const CEREMONY_FAILED_MESSAGE: &str = "Passkey ceremony could not be completed";

/// Errors raised by the store adapter, codec and repository
#[derive(Debug, Error)]
pub enum StoreError {
    /// No such user. Expected and non-fatal; the caller decides what happens next.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A database round trip failed
    #[error("Query '{operation}' failed for {key}: {source}")]
    Query {
        operation: &'static str,
        key: String,
        #[source]
        source: BoxError,
    },

    /// A stored credential could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// A credential could not be encoded for storage
    #[error("Encode error: {0}")]
    Encode(String),

    /// The store could not be opened or failed its liveness check
    #[error("Connection error: {0}")]
    Connection(String),

    /// The entropy source failed while generating a session token
    #[error("Randomness error: {0}")]
    Randomness(String),

    /// The user identifier is not a decimal integer
    #[error("Invalid user id: {0}")]
    InvalidUserId(String),
}

impl StoreError {
    /// Build a query error from any source error
    pub fn query<E>(operation: &'static str, key: impl ToString, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Query {
            operation,
            key: key.to_string(),
            source: source.into(),
        }
    }

    /// Whether this error means "no such user"
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Message safe to return to a client.
    ///
    /// All variants map to the same text so a client cannot tell a missing
    /// account from a missing or expired ceremony.
    #[must_use]
    pub const fn client_message(&self) -> &'static str {
        CEREMONY_FAILED_MESSAGE
    }
}

/// Result alias used across the crate
pub type StoreResult<T> = Result<T, StoreError>;
