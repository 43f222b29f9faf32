//! Ceremony session store
//!
//! Holds the opaque session state the WebAuthn library produces when a
//! registration or login begins, keyed by a random token, until the matching
//! "finish" step consumes it. State is local to the process and is lost on
//! restart.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

/// One in-flight ceremony
#[derive(Debug, Clone)]
pub struct SessionEntry<S> {
    pub state: S,
    pub created_at: DateTime<Utc>,
}

impl<S> SessionEntry<S> {
    fn new(state: S) -> Self {
        Self {
            state,
            created_at: Utc::now(),
        }
    }

    /// An entry is expired once its age reaches the TTL
    fn is_expired(&self, ttl: Option<Duration>, now: DateTime<Utc>) -> bool {
        ttl.is_some_and(|ttl| now - self.created_at >= ttl)
    }
}

/// Token to session-state map shared by concurrent ceremony handlers
pub struct SessionStore<S> {
    entries: RwLock<HashMap<String, SessionEntry<S>>>,
    ttl: Option<Duration>,
}

impl<S: Clone + Send + Sync> SessionStore<S> {
    /// Create a store. With `ttl` set to `None` entries never expire.
    #[must_use]
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Look up a session without removing it
    pub async fn get(&self, token: &str) -> Option<S> {
        let entries = self.entries.read().await;
        entries
            .get(token)
            .filter(|entry| !entry.is_expired(self.ttl, Utc::now()))
            .map(|entry| entry.state.clone())
    }

    /// Insert or overwrite the session for `token`
    pub async fn put(&self, token: &str, state: S) {
        let mut entries = self.entries.write().await;
        entries.insert(token.to_string(), SessionEntry::new(state));
    }

    /// Remove the session for `token`. Absent tokens are ignored.
    pub async fn delete(&self, token: &str) -> bool {
        let mut entries = self.entries.write().await;
        entries.remove(token).is_some()
    }

    /// Remove and return the session for `token` in one step
    pub async fn take(&self, token: &str) -> Option<S> {
        let mut entries = self.entries.write().await;
        entries
            .remove(token)
            .filter(|entry| !entry.is_expired(self.ttl, Utc::now()))
            .map(|entry| entry.state)
    }

    /// Drop every expired entry and return how many were removed
    pub async fn purge_expired(&self) -> usize {
        let Some(ttl) = self.ttl else {
            return 0;
        };
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(Some(ttl), now));
        before - entries.len()
    }

    /// Number of stored entries, expired ones included until purged
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl<S: Clone + Send + Sync> Default for SessionStore<S> {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store: SessionStore<String> = SessionStore::default();

        store.put("t1", "challenge-1".to_string()).await;
        assert_eq!(store.get("t1").await, Some("challenge-1".to_string()));

        // Lookup does not consume
        assert_eq!(store.get("t1").await, Some("challenge-1".to_string()));

        assert!(store.delete("t1").await);
        assert_eq!(store.get("t1").await, None);
    }

    #[tokio::test]
    async fn test_delete_absent_token_is_noop() {
        let store: SessionStore<String> = SessionStore::default();
        assert!(!store.delete("missing").await);
        assert!(!store.delete("missing").await);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store: SessionStore<u32> = SessionStore::default();
        store.put("t", 1).await;
        store.put("t", 2).await;
        assert_eq!(store.get("t").await, Some(2));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_take_consumes_once() {
        let store: SessionStore<u32> = SessionStore::default();
        store.put("t", 9).await;
        assert_eq!(store.take("t").await, Some(9));
        assert_eq!(store.take("t").await, None);
        assert_eq!(store.get("t").await, None);
    }

    #[tokio::test]
    async fn test_zero_ttl_expires_immediately() {
        let store: SessionStore<u32> = SessionStore::new(Some(Duration::zero()));
        store.put("t", 1).await;

        assert_eq!(store.get("t").await, None);
        assert_eq!(store.take("t").await, None);

        store.put("u", 2).await;
        assert_eq!(store.len().await, 1);
        assert_eq!(store.purge_expired().await, 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_long_ttl_keeps_entries() {
        let store: SessionStore<u32> = SessionStore::new(Some(Duration::minutes(5)));
        store.put("t", 1).await;
        assert_eq!(store.purge_expired().await, 0);
        assert_eq!(store.get("t").await, Some(1));
    }

    #[tokio::test]
    async fn test_purge_without_ttl_keeps_everything() {
        let store: SessionStore<u32> = SessionStore::new(None);
        store.put("a", 1).await;
        store.put("b", 2).await;
        assert_eq!(store.purge_expired().await, 0);
        assert_eq!(store.len().await, 2);
    }
}
