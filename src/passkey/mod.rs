//! Passkey credential and ceremony-session persistence
//!
//! This module maps users to their stored WebAuthn credentials and keeps
//! ceremony session state between the begin and finish steps.

// Credential encoding
mod codec;
pub use codec::{CredentialCodec, CredentialRecord, JsonCredentialCodec};

// Domain model
mod user;
pub use user::{PasskeyUser, SkippedCredential};

// Ceremony session map
mod session;
pub use session::{SessionEntry, SessionStore};

// Repository layer
mod repository;
pub use repository::{
    generate_session_token, PasskeyRepository, PasskeyStore, SaveReport, SESSION_TOKEN_BYTES,
};

// webauthn-rs binding
mod ceremony;
pub use ceremony::{CeremonyState, WebauthnRepository, WebauthnUser};
