use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Message, Recipient};
use crate::{
    JoseError,
    encoding::{b64_bytes, b64_decode, b64_encode},
    error::ErrorContext as _,
    header::{EncodedHeader, JWEEssentialHeader, JWEHeader},
    macros::generate_set_and_with,
};

#[derive(Debug, Clone, Copy, Default)]
/// Compact serialization of a JWE, as defined in [`rfc7516, section 7.1`]:
///
/// ```text
/// BASE64URL(protected) '.' BASE64URL(encrypted_key) '.' BASE64URL(iv) '.'
/// BASE64URL(ciphertext) '.' BASE64URL(tag)
/// ```
///
/// Only messages with exactly one recipient, and without unprotected headers
/// or AAD, can be serialized.
///
/// [`rfc7516, section 7.1`]: https://datatracker.ietf.org/doc/html/rfc7516#section-7.1
pub struct CompactSerialize;

impl CompactSerialize {
    /// Serialize `message` in compact form
    pub fn serialize(self, message: &Message) -> Result<String, JoseError> {
        let [recipient] = message.recipients() else {
            return Err(JoseError::InvalidCompactPartsCount(message.recipients().len()));
        };
        if !message.unprotected.is_empty() || !recipient.header.is_empty() {
            return Err(JoseError::malformed(
                "compact serialization cannot carry unprotected headers",
            ));
        }
        if !message.aad.is_empty() {
            return Err(JoseError::malformed("compact serialization cannot carry aad"));
        }

        Ok([
            message.protected.encode()?,
            b64_encode(&recipient.encrypted_key),
            b64_encode(&message.iv),
            b64_encode(&message.ciphertext),
            b64_encode(&message.tag),
        ]
        .join("."))
    }

    /// Parse a compact serialized JWE
    pub fn parse(self, compact: &str) -> Result<Message, JoseError> {
        let parts: Vec<&str> = compact.trim().split('.').collect();
        let [protected, encrypted_key, iv, ciphertext, tag] = parts.as_slice() else {
            return Err(JoseError::InvalidCompactPartsCount(parts.len()));
        };
        Ok(Message {
            protected: EncodedHeader::decode(protected)?,
            recipients: vec![Recipient::new(
                JWEHeader::new(),
                b64_decode(encrypted_key, "decode jwe encrypted key")?,
            )],
            iv: b64_decode(iv, "decode jwe iv")?,
            ciphertext: b64_decode(ciphertext, "decode jwe ciphertext")?,
            tag: b64_decode(tag, "decode jwe tag")?,
            ..Default::default()
        })
    }
}

#[derive(Debug, Clone, Default)]
/// General JSON serialization of a JWE, as defined in [`rfc7516, section 7.2.1`]
///
/// [`rfc7516, section 7.2.1`]: https://datatracker.ietf.org/doc/html/rfc7516#section-7.2.1
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
        Ok(json.context("serialize jwe message as json")?)
    }
}

#[derive(Deserialize, Serialize)]
/// Flattened JSON form, as defined in [`rfc7516, section 7.2.2`]
///
/// [`rfc7516, section 7.2.2`]: https://datatracker.ietf.org/doc/html/rfc7516#section-7.2.2
struct Flattened {
    #[serde(default, skip_serializing_if = "EncodedHeader::is_empty")]
    protected: EncodedHeader<JWEEssentialHeader>,
    #[serde(default, skip_serializing_if = "JWEHeader::is_empty")]
    unprotected: JWEHeader,
    #[serde(flatten)]
    recipient: Recipient,
    #[serde(default, with = "b64_bytes", skip_serializing_if = "Vec::is_empty")]
    aad: Vec<u8>,
    #[serde(default, with = "b64_bytes", skip_serializing_if = "Vec::is_empty")]
    iv: Vec<u8>,
    #[serde(with = "b64_bytes")]
    ciphertext: Vec<u8>,
    #[serde(default, with = "b64_bytes", skip_serializing_if = "Vec::is_empty")]
    tag: Vec<u8>,
}

impl Message {
    /// Parse a JWE in any of its serializations: compact,
    /// general JSON or flattened JSON.
    pub fn parse(data: &str) -> Result<Self, JoseError> {
        let data = data.trim();
        if !data.starts_with('{') {
            return CompactSerialize.parse(data);
        }

        let value: Value = serde_json::from_str(data).context("parse jwe json")?;
        if value.get("recipients").is_some() {
            let message: Self = serde_json::from_value(value).context("parse general jwe json")?;
            tracing::trace!(
                "parsed general jwe json with {} recipient(s)",
                message.recipients.len()
            );
            Ok(message)
        } else {
            let flattened: Flattened =
                serde_json::from_value(value).context("parse flattened jwe json")?;
            Ok(Self {
                protected: flattened.protected,
                unprotected: flattened.unprotected,
                recipients: vec![flattened.recipient],
                aad: flattened.aad,
                iv: flattened.iv,
                ciphertext: flattened.ciphertext,
                tag: flattened.tag,
            })
        }
    }

    /// Serialize this message in the flattened JSON form, only possible with exactly one recipient
    pub fn to_flattened_json(&self) -> Result<String, JoseError> {
        let [recipient] = self.recipients() else {
            return Err(JoseError::InvalidCompactPartsCount(self.recipients().len()));
        };
        let flattened = Flattened {
            protected: self.protected.clone(),
            unprotected: self.unprotected.clone(),
            recipient: recipient.clone(),
            aad: self.aad.clone(),
            iv: self.iv.clone(),
            ciphertext: self.ciphertext.clone(),
            tag: self.tag.clone(),
        };
        Ok(serde_json::to_string(&flattened).context("serialize flattened jwe json")?)
    }
}
