//! Relational store adapter
//!
//! [`RelationalStore`] is the query surface the passkey repository depends on.
//! Each method runs exactly one parameterized query and returns raw column
//! values; decoding and orchestration live in [`crate::passkey`].

use async_trait::async_trait;

use crate::error::StoreResult;

mod postgres;
pub use postgres::PostgresStore;

/// Parameterized queries over the `users` and `passkeys` tables.
///
/// Implementations must be safe for concurrent use; two ceremonies may hit
/// the store at the same time.
#[async_trait]
pub trait RelationalStore: Send + Sync {
    /// `SELECT id FROM users WHERE email = $1`
    ///
    /// # Errors
    /// Returns `StoreError::Query` if the round trip fails
    async fn find_user_id_by_email(&self, email: &str) -> StoreResult<Option<i64>>;

    /// `SELECT id FROM users WHERE id = $1`
    ///
    /// # Errors
    /// Returns `StoreError::Query` if the round trip fails
    async fn find_user_id(&self, id: i64) -> StoreResult<Option<i64>>;

    /// `SELECT email FROM users WHERE id = $1`
    ///
    /// # Errors
    /// Returns `StoreError::Query` if the round trip fails
    async fn find_user_email(&self, id: i64) -> StoreResult<Option<String>>;

    /// `SELECT keys FROM passkeys WHERE user_id = $1`
    ///
    /// # Errors
    /// Returns `StoreError::Query` if the round trip fails
    async fn list_credential_payloads(&self, user_id: i64) -> StoreResult<Vec<String>>;

    /// Whether a row with exactly this `(user_id, keys)` pair exists
    ///
    /// # Errors
    /// Returns `StoreError::Query` if the round trip fails
    async fn credential_exists(&self, user_id: i64, keys: &str) -> StoreResult<bool>;

    /// `INSERT INTO passkeys (user_id, keys) VALUES ($1, $2)`
    ///
    /// # Errors
    /// Returns `StoreError::Query` if the round trip fails
    async fn insert_credential(&self, user_id: i64, keys: &str) -> StoreResult<()>;
}
