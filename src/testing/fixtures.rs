//! Test fixtures providing pre-built test objects
//!
//! The credential type here stands in for the WebAuthn library's record: it
//! carries the same kind of data (id, public key, counter, transport hints,
//! backup flags) and round-trips through serde the same way.

use serde::{Deserialize, Serialize};
use webauthn_rs::prelude::Passkey;

use super::constants::{TEST_EMAIL, TEST_USER_ID};
use super::mock::MemoryStore;
use crate::passkey::{CredentialCodec, JsonCredentialCodec, PasskeyUser};

/// A stored `webauthn-rs` passkey: an ES256 credential with no attestation
pub const PASSKEY_JSON: &str = r#"{"cred":{"cred_id":"uZcVDBVS68E_MtAgeQpElJxldF_6cY9sSvbWqx_qRh8wiu42lyRBRmh5yFeD_r9k130dMbFHBHI9RTFgdJQIzQ","cred":{"type_":"ES256","key":{"EC_EC2":{"curve":"SECP256R1","x":"wn5_bfwXgxX8Bt9jLP6MG-YRXgWFHGgpkEWrlaEayPM","y":"j3u3nBiyFfh1n6JFqzS8_Bo7Bi9nXBM6dWf5ANsIX8Q"}}},"counter":2,"transports":null,"user_verified":false,"backup_eligible":false,"backup_state":false,"registration_policy":"preferred","extensions":{"cred_protect":"NotRequested","hmac_create_secret":"NotRequested","appid":"NotRequested","cred_props":"NotRequested"},"attestation":{"data":"None","metadata":"None"},"attestation_format":"none"}}"#;

/// Decode [`PASSKEY_JSON`]
///
/// # Panics
///
/// Panics if the fixture no longer matches the library's passkey format
#[must_use]
pub fn passkey() -> Passkey {
    serde_json::from_str(PASSKEY_JSON).unwrap()
}

/// Credential record used throughout the tests
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TestCredential {
    pub cred_id: Vec<u8>,
    pub public_key: Vec<u8>,
    pub counter: u32,
    pub transports: Vec<String>,
    pub backup_eligible: bool,
    pub backup_state: bool,
}

/// Build a distinct credential for each `seed`
#[must_use]
pub fn credential(seed: u8) -> TestCredential {
    TestCredential {
        cred_id: vec![seed; 16],
        public_key: vec![0x04, seed, seed.wrapping_add(1), seed.wrapping_add(2)],
        counter: u32::from(seed),
        transports: vec!["internal".to_string(), "hybrid".to_string()],
        backup_eligible: seed % 2 == 0,
        backup_state: false,
    }
}

/// Central fixture provider for all test data
pub struct TestFixtures;

impl TestFixtures {
    /// Store holding the default user (id 7, `a@example.com`) with no credentials
    #[must_use]
    pub fn store_with_user() -> MemoryStore {
        let store = MemoryStore::new();
        store.add_user(TEST_USER_ID, TEST_EMAIL);
        store
    }

    /// Store holding the default user plus the given credentials, already encoded
    ///
    /// # Panics
    ///
    /// Panics if a fixture credential fails to encode
    #[must_use]
    pub fn store_with_credentials(credentials: &[TestCredential]) -> MemoryStore {
        let store = Self::store_with_user();
        for credential in credentials {
            let keys = JsonCredentialCodec.serialize(credential).unwrap();
            store.insert_raw(TEST_USER_ID, &keys);
        }
        store
    }

    /// The default user carrying `credentials`
    #[must_use]
    pub fn user(credentials: Vec<TestCredential>) -> PasskeyUser<TestCredential> {
        PasskeyUser::new(TEST_USER_ID, TEST_EMAIL, credentials)
    }
}
