use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _, ser::Error as _};

use super::{EssentialParameters, Header};
use crate::{
    JoseError,
    encoding::{b64_decode, b64_encode},
};

#[derive(Debug, Clone, Default, PartialEq)]
/// Integrity protected [`Header`] together with its encoded form
///
/// When parsed from external input the decoded JSON octets are kept as its source,
/// and [`EncodedHeader::encode`] returns exactly those octets (base64url encoded)
/// instead of a serialization of the parsed header. Signatures and JWE AAD are
/// computed over the octets as they appeared on the wire, which do not have
/// to match a re-serialization (key order, whitespace, ...).
///
/// Mutating the header through [`EncodedHeader::header_mut`] drops the source.
pub struct EncodedHeader<E> {
    header: Header<E>,
    source: Option<Vec<u8>>,
}

impl<E: EssentialParameters> EncodedHeader<E> {
    /// Create a new [`EncodedHeader`] for a header created locally
    #[must_use]
    pub fn new(header: Header<E>) -> Self {
        Self {
            header,
            source: None,
        }
    }

    /// Reference to the (parsed) header
    pub fn header(&self) -> &Header<E> {
        &self.header
    }

    /// Mutable reference to the header.
    ///
    /// This clears the source octets, so the next [`EncodedHeader::encode`]
    /// reflects the (possibly) modified header.
    pub fn header_mut(&mut self) -> &mut Header<E> {
        if self.source.take().is_some() {
            tracing::trace!("mutable access to encoded header: source octets dropped");
        }
        &mut self.header
    }

    /// Consume this [`EncodedHeader`] into the inner header
    pub fn into_header(self) -> Header<E> {
        self.header
    }

    /// Decoded JSON octets this header was parsed from, if any
    pub fn source(&self) -> Option<&[u8]> {
        self.source.as_deref()
    }

    /// Returns true if there is neither a source nor any header parameter
    pub fn is_empty(&self) -> bool {
        self.source.is_none() && self.header.is_empty()
    }

    /// Decode a base64url encoded JSON header, keeping the decoded octets as source.
    ///
    /// An empty input results in an empty header without source.
    pub fn decode(encoded: &str) -> Result<Self, JoseError> {
        if encoded.is_empty() {
            return Ok(Self::default());
        }
        let source = b64_decode(encoded, "decode protected header")?;
        let header = Header::unmarshal(&source)?;
        Ok(Self {
            header,
            source: Some(source),
        })
    }

    /// Base64url encoding of this header.
    ///
    /// The source octets are used when present, otherwise the header is serialized.
    /// An empty header without source encodes as an empty string.
    pub fn encode(&self) -> Result<String, JoseError> {
        match &self.source {
            Some(source) => Ok(b64_encode(source)),
            None if self.header.is_empty() => Ok(String::new()),
            None => Ok(b64_encode(self.header.marshal()?)),
        }
    }
}

impl<E: EssentialParameters> From<Header<E>> for EncodedHeader<E> {
    fn from(header: Header<E>) -> Self {
        Self::new(header)
    }
}

impl<E: EssentialParameters> Serialize for EncodedHeader<E> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let encoded = self.encode().map_err(S::Error::custom)?;
        serializer.serialize_str(&encoded)
    }
}

impl<'de, E: EssentialParameters> Deserialize<'de> for EncodedHeader<E> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        Self::decode(&encoded).map_err(D::Error::custom)
    }
}
