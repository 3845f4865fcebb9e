//! base64url (no padding) helpers shared by the JWS and JWE wire formats.

use base64::{Engine as _, prelude::BASE64_URL_SAFE_NO_PAD};

use crate::error::{ErrorContext as _, OpaqueError};

pub(crate) fn b64_encode(data: impl AsRef<[u8]>) -> String {
    BASE64_URL_SAFE_NO_PAD.encode(data)
}

/// Decoding is strict: padding and non-zero trailing bits are rejected,
/// so re-encoding the output yields the exact input again.
pub(crate) fn b64_decode(data: impl AsRef<[u8]>, what: &'static str) -> Result<Vec<u8>, OpaqueError> {
    BASE64_URL_SAFE_NO_PAD.decode(data).context(what)
}

/// Serde adapter for byte buffers carried as base64url strings,
/// where an empty buffer is represented by an absent field.
pub(crate) mod b64_bytes {
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    pub(crate) fn serialize<S>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::b64_encode(data))
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        super::b64_decode(encoded.as_bytes(), "decode base64url value").map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::assert_err;

    use super::*;

    #[test]
    fn decode_is_strict() {
        assert_eq!(b64_decode("aGVsbG8", "payload").unwrap(), b"hello");
        // padding is not allowed
        assert_err!(b64_decode("aGVsbG8=", "payload"));
        // non canonical trailing bits are not allowed
        assert_err!(b64_decode("aGVsbG9", "payload"));
        // standard alphabet is not allowed
        assert_err!(b64_decode("+/", "payload"));
    }

    #[test]
    fn encode_has_no_padding() {
        assert_eq!(b64_encode(b"hello"), "aGVsbG8");
        assert_eq!(b64_encode([0xfb, 0xff]), "-_8");
    }
}
