//! Mock objects and fake implementations for testing
//!
//! [`MemoryStore`] mirrors the `users` / `passkeys` tables in memory so the
//! repository can be exercised without a database.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::db::RelationalStore;
use crate::error::{StoreError, StoreResult};

/// In-memory stand-in for the relational store
#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<HashMap<i64, String>>,
    passkeys: Mutex<Vec<(i64, String)>>,
    failing: Mutex<HashSet<&'static str>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user row
    pub fn add_user(&self, id: i64, email: &str) {
        lock(&self.users).insert(id, email.to_string());
    }

    /// Insert a raw `passkeys.keys` value, bypassing the codec
    pub fn insert_raw(&self, user_id: i64, keys: &str) {
        lock(&self.passkeys).push((user_id, keys.to_string()));
    }

    /// Total number of credential rows
    #[must_use]
    pub fn row_count(&self) -> usize {
        lock(&self.passkeys).len()
    }

    /// Credential rows stored for one user
    #[must_use]
    pub fn rows_for(&self, user_id: i64) -> Vec<String> {
        lock(&self.passkeys)
            .iter()
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, keys)| keys.clone())
            .collect()
    }

    /// Make every call to `operation` fail with a query error
    pub fn fail_on(&self, operation: &'static str) {
        lock(&self.failing).insert(operation);
    }

    pub fn clear_failures(&self) {
        lock(&self.failing).clear();
    }

    fn check(&self, operation: &'static str, key: impl ToString) -> StoreResult<()> {
        if lock(&self.failing).contains(operation) {
            return Err(StoreError::query(operation, key, "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl RelationalStore for MemoryStore {
    async fn find_user_id_by_email(&self, email: &str) -> StoreResult<Option<i64>> {
        self.check("find_user_id_by_email", email)?;
        Ok(lock(&self.users)
            .iter()
            .find(|(_, stored)| stored.as_str() == email)
            .map(|(id, _)| *id))
    }

    async fn find_user_id(&self, id: i64) -> StoreResult<Option<i64>> {
        self.check("find_user_id", id)?;
        Ok(lock(&self.users).contains_key(&id).then_some(id))
    }

    async fn find_user_email(&self, id: i64) -> StoreResult<Option<String>> {
        self.check("find_user_email", id)?;
        Ok(lock(&self.users).get(&id).cloned())
    }

    async fn list_credential_payloads(&self, user_id: i64) -> StoreResult<Vec<String>> {
        self.check("list_credential_payloads", user_id)?;
        Ok(self.rows_for(user_id))
    }

    async fn credential_exists(&self, user_id: i64, keys: &str) -> StoreResult<bool> {
        self.check("credential_exists", user_id)?;
        Ok(lock(&self.passkeys)
            .iter()
            .any(|(owner, stored)| *owner == user_id && stored == keys))
    }

    async fn insert_credential(&self, user_id: i64, keys: &str) -> StoreResult<()> {
        self.check("insert_credential", user_id)?;
        self.insert_raw(user_id, keys);
        Ok(())
    }
}
