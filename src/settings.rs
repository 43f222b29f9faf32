use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PasskeyStoreSettings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub sessions: SessionSettings,
    pub static_files: StaticFilesSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

/// Connection parameters for the relational store
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    /// One of `disable`, `allow`, `prefer`, `require`, `verify-ca`, `verify-full`
    pub sslmode: String,
    pub max_connections: u32,
    /// Create the `users` and `passkeys` tables at startup if they are missing
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Lifetime of an unconsumed ceremony session. 0 disables expiry.
    pub ttl_seconds: u64,
    /// How often the background sweep drops expired sessions
    pub purge_interval_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticFilesSettings {
    pub assets_folder: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            name: "passkeys".to_string(),
            sslmode: "disable".to_string(),
            max_connections: 25,
            run_migrations: false,
        }
    }
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("sslmode", &self.sslmode)
            .field("max_connections", &self.max_connections)
            .field("run_migrations", &self.run_migrations)
            .finish()
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ttl_seconds: 300, // WebAuthn ceremony timeout
            purge_interval_seconds: 60,
        }
    }
}

impl Default for StaticFilesSettings {
    fn default() -> Self {
        Self {
            assets_folder: "public".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl PasskeyStoreSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read
    /// - TOML parsing fails
    /// - A numeric or boolean environment override does not parse
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_env_file();

        // Load base settings from TOML or defaults
        let mut settings = Self::load_base_settings()?;

        // Logger first, so rejected overrides below are reported
        Self::apply_logging_env_overrides(&mut settings.logging);
        crate::utils::logging::init(&settings.logging.level);

        // Apply environment variable overrides
        Self::apply_env_overrides(&mut settings)?;

        Ok(settings)
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `PASSKEY_STORE_SECRETS_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read
    /// - TOML parsing fails
    fn load_base_settings() -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings = Self::default();

        let default_config_path = std::path::PathBuf::from("Settings.toml");
        if default_config_path.exists() {
            settings = Self::from_toml_file(&default_config_path)?;
            println!(
                "✓ Loaded base settings from {}",
                default_config_path.display()
            );
        }

        if let Ok(secrets_dir) = std::env::var("PASSKEY_STORE_SECRETS_DIR") {
            let secrets_path = std::path::Path::new(&secrets_dir).join("Settings.toml");
            if secrets_path.exists() {
                settings = Self::from_toml_file(&secrets_path)?;
                println!("✓ Overriding settings from {}", secrets_path.display());
            } else {
                println!(
                    "ℹ PASSKEY_STORE_SECRETS_DIR set but no Settings.toml found at: {}",
                    secrets_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Parse a settings file. Missing sections fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML
    pub fn from_toml_file(path: &std::path::Path) -> Result<Self, Box<dyn std::error::Error>> {
        let toml_content = fs::read_to_string(path)?;
        Ok(basic_toml::from_str(&toml_content)?)
    }

    /// Apply environment variable overrides to settings
    ///
    /// # Errors
    ///
    /// Returns an error naming the first variable whose value does not parse
    pub fn apply_env_overrides(settings: &mut Self) -> Result<(), Box<dyn std::error::Error>> {
        Self::apply_application_env_overrides(&mut settings.application)?;
        Self::apply_database_env_overrides(&mut settings.database)?;
        Self::apply_session_env_overrides(&mut settings.sessions)?;
        Self::apply_static_files_env_overrides(&mut settings.static_files);
        Self::apply_logging_env_overrides(&mut settings.logging);
        Ok(())
    }

    fn apply_application_env_overrides(
        app_settings: &mut ApplicationSettings,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if let Ok(host) = std::env::var("HOST") {
            app_settings.host = host;
        }
        Self::apply_parsed_env_override("PORT", &mut app_settings.port)?;
        Ok(())
    }

    /// Apply environment overrides for the database connection
    ///
    /// # Errors
    ///
    /// Returns an error if `DB_PORT`, `DB_MAX_CONNECTIONS` or `DB_RUN_MIGRATIONS`
    /// is set to a value that does not parse
    pub fn apply_database_env_overrides(
        db_settings: &mut DatabaseSettings,
    ) -> Result<(), Box<dyn std::error::Error>> {
        Self::apply_string_env_override("DB_HOST", &mut db_settings.host);
        Self::apply_parsed_env_override("DB_PORT", &mut db_settings.port)?;
        Self::apply_string_env_override("DB_USER", &mut db_settings.user);
        Self::apply_string_env_override("DB_PASSWORD", &mut db_settings.password);
        Self::apply_string_env_override("DB_NAME", &mut db_settings.name);
        Self::apply_string_env_override("DB_SSLMODE", &mut db_settings.sslmode);
        Self::apply_parsed_env_override("DB_MAX_CONNECTIONS", &mut db_settings.max_connections)?;
        Self::apply_parsed_env_override("DB_RUN_MIGRATIONS", &mut db_settings.run_migrations)?;
        Ok(())
    }

    /// Apply environment overrides for ceremony session settings
    ///
    /// # Errors
    ///
    /// Returns an error if either session variable is not a non-negative integer
    pub fn apply_session_env_overrides(
        session_settings: &mut SessionSettings,
    ) -> Result<(), Box<dyn std::error::Error>> {
        Self::apply_parsed_env_override("SESSION_TTL_SECONDS", &mut session_settings.ttl_seconds)?;
        Self::apply_parsed_env_override(
            "SESSION_PURGE_INTERVAL_SECONDS",
            &mut session_settings.purge_interval_seconds,
        )?;
        Ok(())
    }

    fn apply_static_files_env_overrides(static_settings: &mut StaticFilesSettings) {
        Self::apply_string_env_override("STATIC_FOLDER_PATH", &mut static_settings.assets_folder);
    }

    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        Self::apply_string_env_override("RUST_LOG", &mut logging_settings.level);
    }

    fn apply_string_env_override(env_var: &str, target: &mut String) {
        if let Ok(value) = std::env::var(env_var) {
            *target = value;
        }
    }

    /// A value that fails to parse is an error; the current setting is left untouched
    fn apply_parsed_env_override<T>(env_var: &str, target: &mut T) -> Result<(), String>
    where
        T: std::str::FromStr,
        T::Err: fmt::Display,
    {
        if let Ok(value_str) = std::env::var(env_var) {
            match value_str.trim().parse::<T>() {
                Ok(value) => *target = value,
                Err(e) => {
                    log::error!("Invalid {env_var} value '{value_str}': {e}");
                    return Err(format!("Invalid {env_var}: {e}"));
                }
            }
        }
        Ok(())
    }

    /// Load environment variables from .env file
    fn load_env_file() {
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        } else {
            println!("ℹ No .env file found, reading environment variables directly");
        }
    }

    /// Get the bind address for the server
    #[must_use]
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }
}

impl SessionSettings {
    /// Session lifetime, or `None` when expiry is disabled.
    ///
    /// Values beyond what `chrono` can represent are clamped to the largest
    /// duration rather than disabling expiry.
    #[must_use]
    pub fn ttl(&self) -> Option<chrono::Duration> {
        if self.ttl_seconds == 0 {
            return None;
        }
        let ttl = i64::try_from(self.ttl_seconds)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or_else(|| {
                log::warn!(
                    "Session TTL of {}s is out of range, clamping to the maximum",
                    self.ttl_seconds
                );
                chrono::Duration::MAX
            });
        Some(ttl)
    }

    #[must_use]
    pub fn purge_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.purge_interval_seconds.max(1))
    }
}
