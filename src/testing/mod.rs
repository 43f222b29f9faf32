//! Testing utilities for the passkey store
//!
//! Available to unit tests and, through the `testing` feature, to the
//! integration tests under `tests/`.
//!
//! - [`fixtures`] - Sample credentials and pre-populated stores
//! - [`mock`] - In-memory [`RelationalStore`](crate::db::RelationalStore) with fault injection
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use passkey_store::passkey::PasskeyRepository;
//! use passkey_store::testing::{fixtures::TestCredential, TestFixtures};
//!
//! let store = Arc::new(TestFixtures::store_with_user());
//! let repo: PasskeyRepository<TestCredential, String> = PasskeyRepository::new(store, None);
//! ```

pub mod fixtures;
pub mod mock;

pub use fixtures::TestFixtures;
pub use mock::MemoryStore;

/// Common test constants
pub mod constants {
    /// Default test email address
    pub const TEST_EMAIL: &str = "a@example.com";

    /// Numeric id of the default test user
    pub const TEST_USER_ID: i64 = 7;

    /// An id no fixture ever creates
    pub const MISSING_USER_ID: i64 = 999;
}
