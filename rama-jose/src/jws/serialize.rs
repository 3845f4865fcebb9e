use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Message, Signature};
use crate::{
    JoseError,
    encoding::{b64_bytes, b64_decode, b64_encode},
    error::ErrorContext as _,
    header::{EncodedHeader, JWSEssentialHeader},
    macros::generate_set_and_with,
};

#[derive(Debug, Clone, Copy, Default)]
/// Compact serialization of a JWS, as defined in [`rfc7515, section 7.1`]:
///
/// ```text
/// BASE64URL(protected) '.' BASE64URL(payload) '.' BASE64URL(signature)
/// ```
///
/// Only messages with exactly one signature and without public header can be serialized.
///
/// [`rfc7515, section 7.1`]: https://datatracker.ietf.org/doc/html/rfc7515#section-7.1
pub struct CompactSerialize;

impl CompactSerialize {
    /// Serialize `message` in compact form
    pub fn serialize(self, message: &Message) -> Result<String, JoseError> {
        let [signature] = message.signatures() else {
            return Err(JoseError::InvalidCompactPartsCount(message.signatures().len()));
        };
        if !signature.public_header().is_empty() {
            return Err(JoseError::malformed(
                "compact serialization cannot carry a public header",
            ));
        }
        let mut compact = super::signing_input(signature.protected_header(), message.payload())?;
        compact.push('.');
        compact.push_str(&b64_encode(signature.signature()));
        Ok(compact)
    }

    /// Parse a compact serialized JWS
    pub fn parse(self, compact: &str) -> Result<Message, JoseError> {
        let parts: Vec<&str> = compact.trim().split('.').collect();
        let [protected, payload, signature] = parts.as_slice() else {
            return Err(JoseError::InvalidCompactPartsCount(parts.len()));
        };
        let protected = EncodedHeader::<JWSEssentialHeader>::decode(protected)?;
        let payload = b64_decode(payload, "decode jws payload")?;
        let signature = b64_decode(signature, "decode jws signature")?;
        Ok(Message::new(
            payload,
            vec![Signature::new(Default::default(), protected, signature)],
        ))
    }
}

#[derive(Debug, Clone, Default)]
/// General JSON serialization of a JWS, as defined in [`rfc7515, section 7.2.1`]
///
/// [`rfc7515, section 7.2.1`]: https://datatracker.ietf.org/doc/html/rfc7515#section-7.2.1
pub struct JSONSerialize {
    pretty: bool,
}

impl JSONSerialize {
    /// Create a new [`JSONSerialize`], producing compact (not pretty) JSON
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    generate_set_and_with! {
        /// Pretty print the produced JSON
        pub fn pretty(mut self, pretty: bool) -> Self {
            self.pretty = pretty;
            self
        }
    }

    /// Serialize `message` in the general JSON form
    pub fn serialize(&self, message: &Message) -> Result<String, JoseError> {
        let json = if self.pretty {
            serde_json::to_string_pretty(message)
        } else {
            serde_json::to_string(message)
        };
        Ok(json.context("serialize jws message as json")?)
    }
}

#[derive(Deserialize, Serialize)]
/// Flattened JSON form, as defined in [`rfc7515, section 7.2.2`]
///
/// [`rfc7515, section 7.2.2`]: https://datatracker.ietf.org/doc/html/rfc7515#section-7.2.2
struct Flattened {
    #[serde(with = "b64_bytes")]
    payload: Vec<u8>,
    #[serde(flatten)]
    signature: Signature,
}

impl Message {
    /// Parse a JWS in any of its serializations: compact,
    /// general JSON or flattened JSON.
    pub fn parse(data: &str) -> Result<Self, JoseError> {
        let data = data.trim();
        if !data.starts_with('{') {
            return CompactSerialize.parse(data);
        }

        let value: Value = serde_json::from_str(data).context("parse jws json")?;
        if value.get("signatures").is_some() {
            let message: Self = serde_json::from_value(value).context("parse general jws json")?;
            tracing::trace!(
                "parsed general jws json with {} signature(s)",
                message.signatures.len()
            );
            Ok(message)
        } else {
            let flattened: Flattened =
                serde_json::from_value(value).context("parse flattened jws json")?;
            Ok(Self::new(flattened.payload, vec![flattened.signature]))
        }
    }

    /// Serialize this message in the flattened JSON form, only possible with exactly one signature
    pub fn to_flattened_json(&self) -> Result<String, JoseError> {
        let [signature] = self.signatures() else {
            return Err(JoseError::InvalidCompactPartsCount(self.signatures().len()));
        };
        let flattened = Flattened {
            payload: self.payload.clone(),
            signature: signature.clone(),
        };
        Ok(serde_json::to_string(&flattened).context("serialize flattened jws json")?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio_test::assert_err;

    use super::*;
    use crate::{
        JWA,
        header::JWSHeader,
        jws::{HmacSigner, HmacVerifier, MultiSign},
    };

    fn signer(kid: &str) -> HmacSigner {
        HmacSigner::new(JWA::HS256, b"secret")
            .unwrap()
            .with_key_id(kid.to_owned())
    }

    #[test]
    fn compact_round_trip() {
        let message = Message::sign("hello", &signer("k1")).unwrap();
        let compact = CompactSerialize.serialize(&message).unwrap();
        assert_eq!(compact.split('.').count(), 3);
        assert!(compact.contains(".aGVsbG8."));

        let parsed = Message::parse(&compact).unwrap();
        assert_eq!(parsed.payload(), b"hello");
        parsed
            .verify(&HmacVerifier::new(JWA::HS256, b"secret").unwrap())
            .unwrap();
        assert_eq!(CompactSerialize.serialize(&parsed).unwrap(), compact);
    }

    #[test]
    fn compact_requires_exactly_one_signature() {
        let empty = Message::new(b"hello".to_vec(), Vec::new());
        assert!(matches!(
            CompactSerialize.serialize(&empty),
            Err(JoseError::InvalidCompactPartsCount(0))
        ));

        let double = MultiSign::new()
            .with_signer(signer("k1"))
            .with_signer(signer("k2"))
            .sign("hello")
            .unwrap();
        assert!(matches!(
            CompactSerialize.serialize(&double),
            Err(JoseError::InvalidCompactPartsCount(2))
        ));

        let public = signer("k1").with_public_header(JWSHeader::new().with_typ("JWT".to_owned()));
        let message = Message::sign("hello", &public).unwrap();
        assert_err!(CompactSerialize.serialize(&message));
    }

    #[test]
    fn compact_parse_rejects_wrong_parts_count() {
        assert!(matches!(
            Message::parse("a.b"),
            Err(JoseError::InvalidCompactPartsCount(2))
        ));
        assert!(matches!(
            Message::parse("a.b.c.d"),
            Err(JoseError::InvalidCompactPartsCount(4))
        ));
        assert!(matches!(
            Message::parse("e30.!!.c2ln"),
            Err(JoseError::Malformed(_))
        ));
    }

    #[test]
    fn general_json_round_trip() {
        let message = MultiSign::new()
            .with_signer(signer("k1").with_public_header(JWSHeader::new().with_typ("JWT".to_owned())))
            .with_signer(signer("k2"))
            .sign("hello")
            .unwrap();

        let json = JSONSerialize::new().serialize(&message).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["payload"], "aGVsbG8");
        assert_eq!(value["signatures"][0]["header"], json!({"typ": "JWT"}));
        assert!(value["signatures"][1].get("header").is_none());

        let parsed = Message::parse(&json).unwrap();
        assert_eq!(parsed.signatures().len(), 2);
        assert_eq!(parsed.lookup_signature("k2").len(), 1);
        assert_eq!(JSONSerialize::new().serialize(&parsed).unwrap(), json);

        let pretty = JSONSerialize::new().with_pretty(true).serialize(&parsed).unwrap();
        assert!(pretty.contains('\n'));
        assert_eq!(Message::parse(&pretty).unwrap(), parsed);
    }

    #[test]
    fn flattened_json_round_trip() {
        let message = Message::sign("hello", &signer("k1")).unwrap();
        let flattened = message.to_flattened_json().unwrap();
        let value: Value = serde_json::from_str(&flattened).unwrap();
        assert!(value.get("signatures").is_none());
        assert!(value.get("signature").is_some());

        let parsed = Message::parse(&flattened).unwrap();
        assert_eq!(parsed.payload(), message.payload());
        assert_eq!(parsed.signatures()[0].signature(), message.signatures()[0].signature());
        assert_eq!(parsed.to_flattened_json().unwrap(), flattened);
    }

    #[test]
    fn parsed_protected_header_is_echoed() {
        // rfc7515 appendix A.1 protected header, with its line breaks
        let protected = b64_encode(b"{\"typ\":\"JWT\",\r\n \"alg\":\"HS256\"}");
        assert_eq!(protected, "eyJ0eXAiOiJKV1QiLA0KICJhbGciOiJIUzI1NiJ9");

        let json = format!(
            r#"{{"payload":"aGVsbG8","signatures":[{{"protected":"{protected}","signature":"c2ln"}}]}}"#
        );
        let parsed = Message::parse(&json).unwrap();
        let serialized = JSONSerialize::new().serialize(&parsed).unwrap();
        assert!(serialized.contains(&protected));
        assert_eq!(
            parsed.signatures()[0].merged_header().algorithm(),
            JWA::HS256
        );
    }
}
