//! Domain error kinds.
//!
//! Every wrapper boundary (key exchange, KEM, signatures, AEAD, envelope
//! codec) maps primitive-library failures into one of these variants. Raw
//! library errors never leave the crate.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The remote entropy service could not be reached or returned garbage.
    /// `EntropySource` logs it and falls back to local randomness; callers
    /// of `request_bytes` never see it.
    #[error("Entropy source unavailable")]
    EntropyUnavailable,

    #[error("Length must be between 1 and {max} (got {requested})")]
    InvalidLength { requested: usize, max: usize },

    #[error("Invalid key material")]
    InvalidKeyMaterial,

    #[error("Invalid key size: expected {expected}, got {actual}")]
    InvalidKeySize { expected: usize, actual: usize },

    #[error("Invalid ciphertext size: expected {expected}, got {actual}")]
    InvalidCiphertextSize { expected: usize, actual: usize },

    /// AEAD tag mismatch. Deliberately carries no detail.
    #[error("Authentication failed")]
    AuthenticationFailure,

    #[error("Unsupported envelope version: {0}")]
    UnsupportedVersion(String),

    #[error("Malformed envelope")]
    MalformedEnvelope,

    #[error("No public keys on record for peer {0}")]
    UnknownPeer(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<crate::entropy::FetchError> for Error {
    fn from(_: crate::entropy::FetchError) -> Self {
        Error::EntropyUnavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication_failure_has_no_detail() {
        assert_eq!(Error::AuthenticationFailure.to_string(), "Authentication failed");
    }

    #[test]
    fn test_fetch_errors_map_to_entropy_unavailable() {
        use crate::entropy::FetchError;
        assert_eq!(Error::from(FetchError::Timeout), Error::EntropyUnavailable);
        assert_eq!(
            Error::from(FetchError::InvalidResponse("empty data")),
            Error::EntropyUnavailable
        );
    }

    #[test]
    fn test_invalid_length_message() {
        let err = Error::InvalidLength { requested: 10001, max: 10000 };
        assert_eq!(err.to_string(), "Length must be between 1 and 10000 (got 10001)");
    }
}
