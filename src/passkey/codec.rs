use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{StoreError, StoreResult};

/// An opaque credential record produced by the WebAuthn library.
///
/// The persistence layer only needs to move it to and from storage; it never
/// inspects its fields.
pub trait CredentialRecord: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> CredentialRecord for T where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static
{
}

/// Converts credentials to and from the text stored in `passkeys.keys`
pub trait CredentialCodec<C>: Send + Sync {
    /// Encode a credential for storage
    ///
    /// # Errors
    /// Returns `StoreError::Encode` if the credential cannot be serialized
    fn serialize(&self, credential: &C) -> StoreResult<String>;

    /// Decode a stored credential
    ///
    /// # Errors
    /// Returns `StoreError::Decode` if the text is not a valid encoding
    fn deserialize(&self, stored: &str) -> StoreResult<C>;
}

/// JSON codec. Struct fields serialize in declaration order, so equal
/// credentials always produce identical text; `save_user` relies on this for
/// its existence check.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCredentialCodec;

impl<C: CredentialRecord> CredentialCodec<C> for JsonCredentialCodec {
    fn serialize(&self, credential: &C) -> StoreResult<String> {
        serde_json::to_string(credential)
            .map_err(|e| StoreError::Encode(format!("failed to marshal credential: {e}")))
    }

    fn deserialize(&self, stored: &str) -> StoreResult<C> {
        serde_json::from_str(stored)
            .map_err(|e| StoreError::Decode(format!("failed to unmarshal credential: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::passkey;
    use serde::Deserialize;
    use webauthn_rs::prelude::Passkey;

    #[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
    struct SampleCredential {
        cred_id: Vec<u8>,
        public_key: Vec<u8>,
        counter: u32,
        transports: Option<Vec<String>>,
        backup_eligible: bool,
    }

    fn sample() -> SampleCredential {
        SampleCredential {
            cred_id: vec![0xde, 0xad, 0xbe, 0xef],
            public_key: vec![4, 1, 2, 3, 4, 5],
            counter: 12,
            transports: Some(vec!["usb".to_string(), "nfc".to_string()]),
            backup_eligible: true,
        }
    }

    #[test]
    fn test_roundtrip_preserves_all_fields() {
        let codec = JsonCredentialCodec;
        let original = sample();

        let stored = CredentialCodec::<SampleCredential>::serialize(&codec, &original).unwrap();
        let decoded: SampleCredential = codec.deserialize(&stored).unwrap();

        assert_eq!(decoded, original);
    }

    #[test]
    fn test_serialization_is_stable() {
        let codec = JsonCredentialCodec;
        let first = CredentialCodec::<SampleCredential>::serialize(&codec, &sample()).unwrap();
        let second = CredentialCodec::<SampleCredential>::serialize(&codec, &sample()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_passkey_serialization_is_stable() {
        let codec = JsonCredentialCodec;
        let stored = passkey();

        let first = CredentialCodec::<Passkey>::serialize(&codec, &stored).unwrap();
        let second = CredentialCodec::<Passkey>::serialize(&codec, &stored).unwrap();
        assert_eq!(first, second);

        // Decoding what was stored and encoding it again must give the same row text
        let decoded: Passkey = codec.deserialize(&first).unwrap();
        let third = CredentialCodec::<Passkey>::serialize(&codec, &decoded).unwrap();
        assert_eq!(first, third);
        assert_eq!(decoded.cred_id(), stored.cred_id());
    }

    #[test]
    fn test_malformed_input_is_decode_error() {
        let codec = JsonCredentialCodec;
        let result: StoreResult<SampleCredential> = codec.deserialize("{not json");
        assert!(matches!(result, Err(StoreError::Decode(_))));
    }

    #[test]
    fn test_wrong_shape_is_decode_error() {
        let codec = JsonCredentialCodec;
        let result: StoreResult<SampleCredential> = codec.deserialize(r#"{"counter":"twelve"}"#);
        assert!(matches!(result, Err(StoreError::Decode(_))));
    }
}
