#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![deny(warnings)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the passkey-store crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod db;
pub mod error;
pub mod handlers;
pub mod passkey;
pub mod settings;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use db::{PostgresStore, RelationalStore};
pub use error::{StoreError, StoreResult};
pub use passkey::{PasskeyRepository, PasskeyStore, PasskeyUser, WebauthnRepository};
pub use settings::PasskeyStoreSettings;
