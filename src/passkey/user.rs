use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// A stored credential row that could not be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedCredential {
    /// Position of the row in the fetched credential list
    pub row: usize,
    pub reason: String,
}

/// A user as seen by the WebAuthn ceremony handler.
///
/// `id` is the decimal rendering of the numeric `users.id`; its bytes double as
/// the WebAuthn user handle. Name and display name are both the email.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PasskeyUser<C> {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub credentials: Vec<C>,
    /// Rows dropped while assembling `credentials`
    #[serde(skip)]
    pub skipped: Vec<SkippedCredential>,
}

impl<C> PasskeyUser<C> {
    /// Assemble a user from its numeric id and email
    #[must_use]
    pub fn new(id: i64, email: &str, credentials: Vec<C>) -> Self {
        Self {
            id: id.to_string(),
            name: email.to_string(),
            display_name: email.to_string(),
            credentials,
            skipped: Vec::new(),
        }
    }

    /// User handle bytes handed to the WebAuthn library
    #[must_use]
    pub fn webauthn_id(&self) -> &[u8] {
        self.id.as_bytes()
    }

    #[must_use]
    pub fn webauthn_name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn webauthn_display_name(&self) -> &str {
        &self.display_name
    }

    /// Parse `id` back to the numeric `users.id`
    ///
    /// # Errors
    /// Returns `StoreError::InvalidUserId` if `id` is not a decimal integer
    pub fn numeric_id(&self) -> StoreResult<i64> {
        self.id
            .parse::<i64>()
            .map_err(|e| StoreError::InvalidUserId(format!("'{}': {e}", self.id)))
    }

    /// Attach a newly registered credential
    pub fn add_credential(&mut self, credential: C) {
        self.credentials.push(credential);
    }
}
