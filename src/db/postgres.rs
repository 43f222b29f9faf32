use std::str::FromStr;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use tokio::sync::OnceCell;

use super::RelationalStore;
use crate::error::{StoreError, StoreResult};
use crate::settings::DatabaseSettings;
use crate::utils::logging::LoggingHelper;

/// PostgreSQL-backed store.
///
/// Built unconnected; the pool is opened by the first [`PostgresStore::connect`]
/// call and reused afterwards. The store is owned by the composition root and
/// handed to the repository, never kept in a global.
pub struct PostgresStore {
    settings: DatabaseSettings,
    pool: OnceCell<PgPool>,
}

impl PostgresStore {
    #[must_use]
    pub fn new(settings: DatabaseSettings) -> Self {
        Self {
            settings,
            pool: OnceCell::new(),
        }
    }

    /// Open the pool and run a liveness check.
    ///
    /// Idempotent: once a pool exists, later calls return it without touching
    /// the database.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connection` if:
    /// - The SSL mode is not recognised
    /// - The pool cannot be opened
    /// - The liveness check fails
    pub async fn connect(&self) -> StoreResult<&PgPool> {
        self.pool
            .get_or_try_init(|| async {
                let options = self.connect_options()?;
                let pool = PgPoolOptions::new()
                    .max_connections(self.settings.max_connections)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .connect_with(options)
                    .await
                    .map_err(|e| {
                        StoreError::Connection(format!("failed to open DB connection: {e}"))
                    })?;

                sqlx::query("SELECT 1")
                    .execute(&pool)
                    .await
                    .map_err(|e| StoreError::Connection(format!("failed to ping DB: {e}")))?;

                LoggingHelper::log_store_connected(
                    &self.settings.host,
                    self.settings.port,
                    &self.settings.name,
                );
                Ok::<PgPool, StoreError>(pool)
            })
            .await
    }

    /// Release the pool. No-op if the store was never connected.
    pub async fn close(&self) {
        if let Some(pool) = self.pool.get() {
            pool.close().await;
            log::info!("PostgreSQL pool closed");
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.pool.get().is_some_and(|pool| !pool.is_closed())
    }

    /// Create the `users` and `passkeys` tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is not reachable or a statement fails
    pub async fn run_migrations(&self) -> StoreResult<()> {
        let pool = self.connect().await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                email TEXT UNIQUE NOT NULL
            )
            ",
        )
        .execute(pool)
        .await
        .map_err(|e| StoreError::query("create_users_table", "users", e))?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS passkeys (
                user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                keys TEXT NOT NULL
            )
            ",
        )
        .execute(pool)
        .await
        .map_err(|e| StoreError::query("create_passkeys_table", "passkeys", e))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_passkeys_user_id ON passkeys(user_id)")
            .execute(pool)
            .await
            .map_err(|e| StoreError::query("create_passkeys_index", "passkeys", e))?;

        log::info!("Database migrations completed");
        Ok(())
    }

    fn connect_options(&self) -> StoreResult<PgConnectOptions> {
        let ssl_mode = PgSslMode::from_str(&self.settings.sslmode).map_err(|e| {
            StoreError::Connection(format!("invalid sslmode '{}': {e}", self.settings.sslmode))
        })?;

        Ok(PgConnectOptions::new()
            .host(&self.settings.host)
            .port(self.settings.port)
            .username(&self.settings.user)
            .password(&self.settings.password)
            .database(&self.settings.name)
            .ssl_mode(ssl_mode))
    }
}

#[async_trait]
impl RelationalStore for PostgresStore {
    async fn find_user_id_by_email(&self, email: &str) -> StoreResult<Option<i64>> {
        let pool = self.connect().await?;
        sqlx::query_scalar::<_, i64>("SELECT id::BIGINT FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await
            .map_err(|e| StoreError::query("find_user_id_by_email", email, e))
    }

    async fn find_user_id(&self, id: i64) -> StoreResult<Option<i64>> {
        let pool = self.connect().await?;
        sqlx::query_scalar::<_, i64>("SELECT id::BIGINT FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(|e| StoreError::query("find_user_id", id, e))
    }

    async fn find_user_email(&self, id: i64) -> StoreResult<Option<String>> {
        let pool = self.connect().await?;
        sqlx::query_scalar::<_, String>("SELECT email FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(|e| StoreError::query("find_user_email", id, e))
    }

    async fn list_credential_payloads(&self, user_id: i64) -> StoreResult<Vec<String>> {
        let pool = self.connect().await?;
        sqlx::query_scalar::<_, String>("SELECT keys FROM passkeys WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(pool)
            .await
            .map_err(|e| StoreError::query("list_credential_payloads", user_id, e))
    }

    async fn credential_exists(&self, user_id: i64, keys: &str) -> StoreResult<bool> {
        let pool = self.connect().await?;
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM passkeys WHERE user_id = $1 AND keys = $2)",
        )
        .bind(user_id)
        .bind(keys)
        .fetch_one(pool)
        .await
        .map_err(|e| StoreError::query("credential_exists", user_id, e))
    }

    async fn insert_credential(&self, user_id: i64, keys: &str) -> StoreResult<()> {
        let pool = self.connect().await?;
        sqlx::query("INSERT INTO passkeys (user_id, keys) VALUES ($1, $2)")
            .bind(user_id)
            .bind(keys)
            .execute(pool)
            .await
            .map_err(|e| StoreError::query("insert_credential", user_id, e))?;
        Ok(())
    }
}
