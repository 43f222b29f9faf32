//! Binding of the generic repository to `webauthn-rs` types
//!
//! The repository never looks inside these values; they only need to be
//! serializable credentials and cloneable session state.

use serde::{Deserialize, Serialize};
use webauthn_rs::prelude::{Passkey, PasskeyAuthentication, PasskeyRegistration};

use super::repository::PasskeyRepository;
use super::user::PasskeyUser;

/// State kept between the begin and finish steps of a ceremony
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum CeremonyState {
    Registration(PasskeyRegistration),
    Authentication(PasskeyAuthentication),
}

impl From<PasskeyRegistration> for CeremonyState {
    fn from(state: PasskeyRegistration) -> Self {
        Self::Registration(state)
    }
}

impl From<PasskeyAuthentication> for CeremonyState {
    fn from(state: PasskeyAuthentication) -> Self {
        Self::Authentication(state)
    }
}

impl CeremonyState {
    /// Registration state, if this session belongs to a registration
    #[must_use]
    pub fn into_registration(self) -> Option<PasskeyRegistration> {
        match self {
            Self::Registration(state) => Some(state),
            Self::Authentication(_) => None,
        }
    }

    /// Authentication state, if this session belongs to a login
    #[must_use]
    pub fn into_authentication(self) -> Option<PasskeyAuthentication> {
        match self {
            Self::Authentication(state) => Some(state),
            Self::Registration(_) => None,
        }
    }
}

pub type WebauthnUser = PasskeyUser<Passkey>;

/// Repository storing `webauthn-rs` passkeys and ceremony states
pub type WebauthnRepository = PasskeyRepository<Passkey, CeremonyState>;
