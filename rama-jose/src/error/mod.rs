//! Error types used by rama jose.
//!
//! [`JoseError`] is the error returned by all public operations.
//! Structural failures (invalid base64, invalid json, ...) are carried
//! as an [`OpaqueError`] with a context chain, created using [`ErrorContext`].

use std::fmt;

mod context;
pub use context::ErrorContext;

mod opaque;
pub use opaque::OpaqueError;

#[derive(Debug)]
/// Error returned by header, JWS and JWE operations.
pub enum JoseError {
    /// A recognized header parameter received a value of the wrong type or shape.
    InvalidHeaderValue {
        /// name of the header parameter
        key: &'static str,
    },
    /// Lookup of a header parameter which is not present.
    UnknownHeaderKey(String),
    /// Compact serialization did not have the expected amount of segments,
    /// or a message cannot be represented in compact form.
    InvalidCompactPartsCount(usize),
    /// Algorithm identifier is known but not implemented, or not usable in this context.
    UnsupportedAlgorithm(String),
    /// Content encryption algorithm is known but not implemented.
    UnsupportedContentCipher(String),
    /// Private key is absent or of the wrong type for the chosen algorithm.
    MissingPrivateKey,
    /// Public key is absent or of the wrong type for the chosen algorithm.
    MissingPublicKey,
    /// Signature verification failed.
    InvalidSignature,
    /// No recipient produced a valid plaintext.
    DecryptionFailed,
    /// Message has no recipients.
    NoRecipients,
    /// Message has no signatures.
    NoSignatures,
    /// Compressing or decompressing the payload failed.
    Compression(OpaqueError),
    /// Malformed input or failure to produce output.
    Malformed(OpaqueError),
}

impl JoseError {
    pub(crate) fn malformed(msg: &'static str) -> Self {
        Self::Malformed(OpaqueError::from_display(msg))
    }
}

impl fmt::Display for JoseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHeaderValue { key } => {
                write!(f, "invalid value for header key '{key}'")
            }
            Self::UnknownHeaderKey(key) => write!(f, "unknown header key '{key}'"),
            Self::InvalidCompactPartsCount(count) => {
                write!(f, "invalid amount of compact serialization parts: {count}")
            }
            Self::UnsupportedAlgorithm(alg) => write!(f, "unsupported algorithm '{alg}'"),
            Self::UnsupportedContentCipher(enc) => {
                write!(f, "unsupported content cipher algorithm '{enc}'")
            }
            Self::MissingPrivateKey => write!(f, "missing private key"),
            Self::MissingPublicKey => write!(f, "missing public key"),
            Self::InvalidSignature => write!(f, "invalid signature"),
            Self::DecryptionFailed => write!(f, "failed to decrypt message"),
            Self::NoRecipients => write!(f, "message has no recipients"),
            Self::NoSignatures => write!(f, "message has no signatures"),
            Self::Compression(err) => write!(f, "compression error: {err}"),
            Self::Malformed(err) => write!(f, "malformed input: {err}"),
        }
    }
}

impl std::error::Error for JoseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Compression(err) | Self::Malformed(err) => Some(err as &dyn std::error::Error),
            Self::InvalidHeaderValue { .. }
            | Self::UnknownHeaderKey(_)
            | Self::InvalidCompactPartsCount(_)
            | Self::UnsupportedAlgorithm(_)
            | Self::UnsupportedContentCipher(_)
            | Self::MissingPrivateKey
            | Self::MissingPublicKey
            | Self::InvalidSignature
            | Self::DecryptionFailed
            | Self::NoRecipients
            | Self::NoSignatures => None,
        }
    }
}

impl From<OpaqueError> for JoseError {
    fn from(err: OpaqueError) -> Self {
        Self::Malformed(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_error_converts_to_malformed() {
        fn parse(input: &str) -> Result<u8, JoseError> {
            Ok(input.parse::<u8>().context("parse kid")?)
        }

        match parse("x") {
            Err(JoseError::Malformed(err)) => {
                assert_eq!(err.to_string(), "parse kid: invalid digit found in string")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn decryption_failed_is_opaque() {
        let err = JoseError::DecryptionFailed;
        assert_eq!(err.to_string(), "failed to decrypt message");
        assert!(std::error::Error::source(&err).is_none());
    }
}
