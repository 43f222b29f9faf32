// Centralized logging utilities to reduce verbose logging patterns
use log::{debug, error, info};

/// Initialize `env_logger` with the configured level.
///
/// Safe to call more than once; later calls are ignored.
pub fn init(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    if env_logger::Builder::from_env(env).try_init().is_err() {
        debug!("Logger already initialized, keeping existing configuration");
    }
}

/// Shorten a session token for log output
#[must_use]
pub fn token_prefix(token: &str) -> &str {
    token.get(..8).unwrap_or(token)
}

pub struct LoggingHelper;

impl LoggingHelper {
    /// Log a successful store connection
    pub fn log_store_connected(host: &str, port: u16, database: &str) {
        info!("✅ PostgreSQL connected successfully ({host}:{port}/{database})");
    }

    /// Log a credential row that was skipped because it could not be decoded
    pub fn log_skipped_credential(user_id: i64, row: usize, reason: &str) {
        error!("Failed to deserialize credential (user_id={user_id}, row={row}): {reason}");
    }

    /// Log the outcome of a credential save
    pub fn log_save_summary(user_id: &str, inserted: usize, already_present: usize, failed: usize) {
        info!(
            "SaveUser summary for user_id {user_id}: inserted={inserted}, already_present={already_present}, failed={failed}"
        );
    }

    /// Log a session purge sweep
    pub fn log_sessions_purged(purged: usize, remaining: usize) {
        if purged > 0 {
            info!("🧹 Purged {purged} expired ceremony sessions ({remaining} remaining)");
        } else {
            debug!("No expired ceremony sessions ({remaining} active)");
        }
    }
}
