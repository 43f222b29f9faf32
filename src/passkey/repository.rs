//! Passkey repository
//!
//! Assembles users and their credential sets from the relational store,
//! persists newly registered credentials without duplicating rows, and owns
//! the in-memory ceremony session map.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Duration;
use log::{debug, error, info};

use super::codec::{CredentialCodec, CredentialRecord, JsonCredentialCodec};
use super::session::SessionStore;
use super::user::{PasskeyUser, SkippedCredential};
use crate::db::RelationalStore;
use crate::error::{StoreError, StoreResult};
use crate::utils::logging::{token_prefix, LoggingHelper};

/// Random bytes per session token (256 bits)
pub const SESSION_TOKEN_BYTES: usize = 32;

/// Outcome of a [`PasskeyStore::save_user`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveReport {
    /// New rows written
    pub inserted: usize,
    /// Credentials whose exact row was already stored
    pub already_present: usize,
    /// Credentials that failed to encode, check or insert
    pub failed: usize,
    /// Credentials not attempted because the user id was malformed
    pub rejected: usize,
}

/// Store contract consumed by the WebAuthn ceremony handler
#[async_trait]
pub trait PasskeyStore<C, S>: Send + Sync
where
    C: CredentialRecord,
    S: Clone + Send + Sync + 'static,
{
    /// Load a user and all decodable credentials by email
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No user has this email (`StoreError::NotFound`)
    /// - A query fails (`StoreError::Query`)
    async fn get_user_by_email(&self, email: &str) -> StoreResult<PasskeyUser<C>>;

    /// Load a user and all decodable credentials by numeric id
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No user has this id (`StoreError::NotFound`)
    /// - A query fails (`StoreError::Query`)
    async fn get_user_by_id(&self, id: i64) -> StoreResult<PasskeyUser<C>>;

    /// Persist every credential of `user` that is not stored yet
    async fn save_user(&self, user: &PasskeyUser<C>) -> SaveReport;

    /// Generate a fresh URL-safe session token
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Randomness` if the OS entropy source fails
    fn gen_session_token(&self) -> StoreResult<String>;

    async fn get_session(&self, token: &str) -> Option<S>;

    async fn save_session(&self, token: &str, state: S);

    async fn delete_session(&self, token: &str);

    /// Fetch and remove a session in one step
    async fn take_session(&self, token: &str) -> Option<S>;

    /// Drop expired sessions, returning how many were removed
    async fn purge_expired_sessions(&self) -> usize;
}

/// Generate a 256-bit random token encoded as unpadded URL-safe base64
///
/// # Errors
///
/// Returns `StoreError::Randomness` if the OS entropy source fails
pub fn generate_session_token() -> StoreResult<String> {
    use rand::TryRngCore;

    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    rand::rngs::OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| StoreError::Randomness(format!("failed to read OS entropy: {e}")))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Repository backed by a [`RelationalStore`] and an in-memory [`SessionStore`]
pub struct PasskeyRepository<C, S, K = JsonCredentialCodec> {
    store: Arc<dyn RelationalStore>,
    sessions: SessionStore<S>,
    codec: K,
    _credential: PhantomData<fn() -> C>,
}

impl<C, S> PasskeyRepository<C, S, JsonCredentialCodec>
where
    C: CredentialRecord,
    S: Clone + Send + Sync + 'static,
{
    /// Create a repository using the JSON credential codec
    #[must_use]
    pub fn new(store: Arc<dyn RelationalStore>, session_ttl: Option<Duration>) -> Self {
        Self::with_codec(store, session_ttl, JsonCredentialCodec)
    }
}

impl<C, S, K> PasskeyRepository<C, S, K>
where
    C: CredentialRecord,
    S: Clone + Send + Sync + 'static,
    K: CredentialCodec<C>,
{
    #[must_use]
    pub fn with_codec(
        store: Arc<dyn RelationalStore>,
        session_ttl: Option<Duration>,
        codec: K,
    ) -> Self {
        Self {
            store,
            sessions: SessionStore::new(session_ttl),
            codec,
            _credential: PhantomData,
        }
    }

    /// Lifetime of unconsumed ceremony sessions, `None` when they never expire
    #[must_use]
    pub fn session_ttl(&self) -> Option<Duration> {
        self.sessions.ttl()
    }

    /// Number of sessions currently held, expired ones included until purged
    pub async fn active_sessions(&self) -> usize {
        self.sessions.len().await
    }

    /// Fetch and decode every credential row for `user_id`.
    ///
    /// Rows that fail to decode are logged and reported back instead of
    /// failing the whole fetch.
    async fn load_credentials(
        &self,
        user_id: i64,
    ) -> StoreResult<(Vec<C>, Vec<SkippedCredential>)> {
        let payloads = self
            .store
            .list_credential_payloads(user_id)
            .await
            .inspect_err(|e| error!("Failed to query passkeys: {e}"))?;

        let mut credentials = Vec::with_capacity(payloads.len());
        let mut skipped = Vec::new();
        for (row, keys) in payloads.iter().enumerate() {
            match self.codec.deserialize(keys) {
                Ok(credential) => credentials.push(credential),
                Err(e) => {
                    let reason = e.to_string();
                    LoggingHelper::log_skipped_credential(user_id, row, &reason);
                    skipped.push(SkippedCredential { row, reason });
                }
            }
        }
        Ok((credentials, skipped))
    }

    async fn assemble_user(&self, user_id: i64, email: &str) -> StoreResult<PasskeyUser<C>> {
        let (credentials, skipped) = self.load_credentials(user_id).await?;
        let mut user = PasskeyUser::new(user_id, email, credentials);
        user.skipped = skipped;
        Ok(user)
    }

    /// Store one credential unless the identical row already exists
    async fn save_credential(&self, user_id: i64, credential: &C, report: &mut SaveReport) {
        let keys = match self.codec.serialize(credential) {
            Ok(keys) => keys,
            Err(e) => {
                error!("Failed to serialize credential: {e}");
                report.failed += 1;
                return;
            }
        };

        match self.store.credential_exists(user_id, &keys).await {
            Ok(true) => {
                info!("Passkey already exists for user_id: {user_id}");
                report.already_present += 1;
            }
            Ok(false) => match self.store.insert_credential(user_id, &keys).await {
                Ok(()) => report.inserted += 1,
                Err(e) => {
                    error!("Failed to insert passkey: {e}");
                    report.failed += 1;
                }
            },
            Err(e) => {
                error!("Failed to check if passkey exists: {e}");
                report.failed += 1;
            }
        }
    }
}

#[async_trait]
impl<C, S, K> PasskeyStore<C, S> for PasskeyRepository<C, S, K>
where
    C: CredentialRecord,
    S: Clone + Send + Sync + 'static,
    K: CredentialCodec<C> + 'static,
{
    async fn get_user_by_email(&self, email: &str) -> StoreResult<PasskeyUser<C>> {
        info!("Get User: {email}");

        let user_id = self
            .store
            .find_user_id_by_email(email)
            .await
            .inspect_err(|e| error!("Failed to query user: {e}"))?
            .ok_or_else(|| {
                error!("Failed to find user with email {email}");
                StoreError::NotFound(format!("user with email '{email}'"))
            })?;

        self.assemble_user(user_id, email).await
    }

    async fn get_user_by_id(&self, id: i64) -> StoreResult<PasskeyUser<C>> {
        info!("Get User: {id}");

        let user_id = self
            .store
            .find_user_id(id)
            .await
            .inspect_err(|e| error!("Failed to query user: {e}"))?
            .ok_or_else(|| {
                error!("Failed to find user with id {id}");
                StoreError::NotFound(format!("user with id {id}"))
            })?;

        let email = self
            .store
            .find_user_email(user_id)
            .await
            .inspect_err(|e| error!("Failed to query user email: {e}"))?
            .ok_or_else(|| {
                error!("Failed to find user email for id {user_id}");
                StoreError::NotFound(format!("email for user id {user_id}"))
            })?;

        self.assemble_user(user_id, &email).await
    }

    async fn save_user(&self, user: &PasskeyUser<C>) -> SaveReport {
        info!("SaveUser: {}", user.webauthn_name());

        let user_id = match user.numeric_id() {
            Ok(user_id) => user_id,
            Err(e) => {
                error!("Invalid user ID: {e}");
                return SaveReport {
                    rejected: user.credentials.len(),
                    ..SaveReport::default()
                };
            }
        };

        let mut report = SaveReport::default();
        for credential in &user.credentials {
            self.save_credential(user_id, credential, &mut report).await;
        }

        LoggingHelper::log_save_summary(
            &user.id,
            report.inserted,
            report.already_present,
            report.failed,
        );
        report
    }

    fn gen_session_token(&self) -> StoreResult<String> {
        generate_session_token().inspect_err(|e| error!("Failed to generate session token: {e}"))
    }

    async fn get_session(&self, token: &str) -> Option<S> {
        let session = self.sessions.get(token).await;
        debug!(
            "Get Session: {} (found: {})",
            token_prefix(token),
            session.is_some()
        );
        session
    }

    async fn save_session(&self, token: &str, state: S) {
        debug!("SaveSession: {}", token_prefix(token));
        self.sessions.put(token, state).await;
    }

    async fn delete_session(&self, token: &str) {
        debug!("DeleteSession: {}", token_prefix(token));
        self.sessions.delete(token).await;
    }

    async fn take_session(&self, token: &str) -> Option<S> {
        let session = self.sessions.take(token).await;
        debug!(
            "TakeSession: {} (found: {})",
            token_prefix(token),
            session.is_some()
        );
        session
    }

    async fn purge_expired_sessions(&self) -> usize {
        let purged = self.sessions.purge_expired().await;
        LoggingHelper::log_sessions_purged(purged, self.sessions.len().await);
        purged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{credential, TestCredential};
    use crate::testing::MemoryStore;
    use std::collections::HashSet;

    fn repository(store: &Arc<MemoryStore>) -> PasskeyRepository<TestCredential, String> {
        PasskeyRepository::new(store.clone(), None)
    }

    #[tokio::test]
    async fn test_user_without_credentials() {
        let store = Arc::new(MemoryStore::new());
        store.add_user(7, "a@example.com");
        let repo = repository(&store);

        let user = repo.get_user_by_email("a@example.com").await.unwrap();

        assert_eq!(user.id, "7");
        assert_eq!(user.name, "a@example.com");
        assert_eq!(user.display_name, "a@example.com");
        assert!(user.credentials.is_empty());
        assert!(user.skipped.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let repo = repository(&store);

        let err = repo.get_user_by_id(999).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_unknown_email_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let repo = repository(&store);

        let err = repo.get_user_by_email("nobody@example.com").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_query_failure_is_surfaced() {
        let store = Arc::new(MemoryStore::new());
        store.add_user(3, "c@example.com");
        store.fail_on("list_credential_payloads");
        let repo = repository(&store);

        let err = repo.get_user_by_email("c@example.com").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Query {
                operation: "list_credential_payloads",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_save_user_rejects_non_numeric_id() {
        let store = Arc::new(MemoryStore::new());
        let repo = repository(&store);

        let mut user = PasskeyUser::new(1, "d@example.com", vec![credential(1), credential(2)]);
        user.id = "not-a-number".to_string();

        let report = repo.save_user(&user).await;
        assert_eq!(report.rejected, 2);
        assert_eq!(report.inserted, 0);
        assert_eq!(store.row_count(), 0);
    }

    #[tokio::test]
    async fn test_existence_check_failure_skips_credential() {
        let store = Arc::new(MemoryStore::new());
        store.add_user(4, "e@example.com");
        store.fail_on("credential_exists");
        let repo = repository(&store);

        let user = PasskeyUser::new(4, "e@example.com", vec![credential(1)]);
        let report = repo.save_user(&user).await;

        assert_eq!(report.failed, 1);
        assert_eq!(store.row_count(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_within_one_call_is_stored_once() {
        let store = Arc::new(MemoryStore::new());
        store.add_user(5, "f@example.com");
        let repo = repository(&store);

        let user = PasskeyUser::new(5, "f@example.com", vec![credential(1), credential(1)]);
        let report = repo.save_user(&user).await;

        assert_eq!(report.inserted, 1);
        assert_eq!(report.already_present, 1);
        assert_eq!(store.row_count(), 1);
    }

    #[test]
    fn test_token_shape() {
        let token = generate_session_token().unwrap();
        assert_eq!(token.len(), 43);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_eq!(URL_SAFE_NO_PAD.decode(&token).unwrap().len(), SESSION_TOKEN_BYTES);
    }

    #[test]
    fn test_tokens_do_not_collide() {
        let tokens: HashSet<String> = (0..1_000)
            .map(|_| generate_session_token().unwrap())
            .collect();
        assert_eq!(tokens.len(), 1_000);
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let store = Arc::new(MemoryStore::new());
        let repo = repository(&store);
        let token = repo.gen_session_token().unwrap();

        assert_eq!(repo.get_session(&token).await, None);

        repo.save_session(&token, "state".to_string()).await;
        assert_eq!(repo.get_session(&token).await, Some("state".to_string()));

        repo.delete_session(&token).await;
        assert_eq!(repo.get_session(&token).await, None);

        // Deleting again is fine
        repo.delete_session(&token).await;
        assert_eq!(repo.active_sessions().await, 0);
    }

    #[tokio::test]
    async fn test_expired_sessions_are_purged() {
        let store = Arc::new(MemoryStore::new());
        let repo: PasskeyRepository<TestCredential, String> =
            PasskeyRepository::new(store, Some(Duration::zero()));

        repo.save_session("t", "state".to_string()).await;
        assert_eq!(repo.get_session("t").await, None);
        assert_eq!(repo.purge_expired_sessions().await, 1);
        assert_eq!(repo.active_sessions().await, 0);
    }
}
