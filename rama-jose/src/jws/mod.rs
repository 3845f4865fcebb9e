//! JSON Web Signature (JWS), as defined in [`rfc7515`]
//!
//! A [`Message`] carries a payload and one or more [`Signature`]s. Messages
//! are created using a [`PayloadSigner`] (or a [`MultiSign`] for several of them),
//! checked using a [`Verifier`] and (de)serialized in the compact, general JSON
//! or flattened JSON form.
//!
//! [`rfc7515`]: https://datatracker.ietf.org/doc/html/rfc7515

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    JWA, JoseError,
    encoding::{b64_bytes, b64_encode},
    header::{EncodedHeader, JWSEssentialHeader, JWSHeader},
};

mod sign;
pub use sign::{EcdsaSigner, HmacSigner, MultiSign, PayloadSigner, RsaSigner};

mod verify;
pub use verify::{EcdsaVerifier, HmacVerifier, RsaVerifier, Verifier, verifier_from_jwk};

mod serialize;
pub use serialize::{CompactSerialize, JSONSerialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Single signature of a JWS [`Message`]
pub struct Signature {
    #[serde(rename = "header", default, skip_serializing_if = "JWSHeader::is_empty")]
    public: JWSHeader,
    #[serde(default, skip_serializing_if = "EncodedHeader::is_empty")]
    protected: EncodedHeader<JWSEssentialHeader>,
    #[serde(with = "b64_bytes")]
    signature: Vec<u8>,
}

impl Signature {
    /// Create a new [`Signature`] from its parts
    #[must_use]
    pub fn new(
        public: JWSHeader,
        protected: EncodedHeader<JWSEssentialHeader>,
        signature: Vec<u8>,
    ) -> Self {
        Self {
            public,
            protected,
            signature,
        }
    }

    /// Unprotected header of this signature
    pub fn public_header(&self) -> &JWSHeader {
        &self.public
    }

    /// Protected header of this signature
    pub fn protected_header(&self) -> &EncodedHeader<JWSEssentialHeader> {
        &self.protected
    }

    /// Raw signature bytes
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// View on the protected and public header of this signature
    pub fn merged_header(&self) -> MergedHeader<'_> {
        MergedHeader {
            protected: self.protected.header(),
            public: &self.public,
        }
    }

    /// JWS signing input: `BASE64URL(protected) || '.' || BASE64URL(payload)`
    ///
    /// The protected header is encoded using its source octets when it was parsed.
    pub fn signing_input(&self, payload: &[u8]) -> Result<Vec<u8>, JoseError> {
        Ok(signing_input(&self.protected, payload)?.into_bytes())
    }

    /// Verify this signature over `payload` using the given verifier.
    ///
    /// The algorithm of the (merged) header has to match the one of the verifier.
    pub fn verify(&self, payload: &[u8], verifier: &dyn Verifier) -> Result<(), JoseError> {
        let alg = self.merged_header().algorithm();
        if alg != verifier.algorithm() {
            tracing::trace!(
                "jws signature algorithm {alg} does not match verifier algorithm {}",
                verifier.algorithm()
            );
            return Err(JoseError::InvalidSignature);
        }
        let input = self.signing_input(payload)?;
        verifier.verify(&input, &self.signature)
    }
}

pub(crate) fn signing_input(
    protected: &EncodedHeader<JWSEssentialHeader>,
    payload: &[u8],
) -> Result<String, JoseError> {
    let protected = protected.encode()?;
    let payload = b64_encode(payload);
    let mut input = String::with_capacity(protected.len() + 1 + payload.len());
    input.push_str(&protected);
    input.push('.');
    input.push_str(&payload);
    Ok(input)
}

#[derive(Debug, Clone, Copy)]
/// Read-only view combining the protected and public header of a [`Signature`],
/// where parameters of the protected header take precedence.
pub struct MergedHeader<'a> {
    protected: &'a JWSHeader,
    public: &'a JWSHeader,
}

impl MergedHeader<'_> {
    /// Effective signature algorithm, [`JWA::None`] if set in neither header
    pub fn algorithm(&self) -> JWA {
        let alg = self.protected.algorithm();
        if alg.is_none() {
            self.public.algorithm()
        } else {
            alg
        }
    }

    /// Effective key id
    pub fn key_id(&self) -> Option<&str> {
        self.protected.key_id().or_else(|| self.public.key_id())
    }

    /// Effective value of parameter `key`
    pub fn get(&self, key: &str) -> Result<Value, JoseError> {
        match self.protected.get(key) {
            Ok(Value::Null) | Err(JoseError::UnknownHeaderKey(_)) => self.public.get(key),
            result => result,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// JWS message: a payload with one or more signatures
pub struct Message {
    #[serde(with = "b64_bytes")]
    payload: Vec<u8>,
    signatures: Vec<Signature>,
}

impl Message {
    /// Create a new [`Message`] from a payload and its signatures
    #[must_use]
    pub fn new(payload: Vec<u8>, signatures: Vec<Signature>) -> Self {
        Self {
            payload,
            signatures,
        }
    }

    /// Sign `payload` using a single signer
    pub fn sign(payload: impl Into<Vec<u8>>, signer: &dyn PayloadSigner) -> Result<Self, JoseError> {
        let payload = payload.into();
        let signature = sign::sign_payload(&payload, signer)?;
        Ok(Self::new(payload, vec![signature]))
    }

    /// Raw (decoded) payload
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// All signatures, in order
    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    /// Consume this [`Message`] into its payload
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// All signatures of which the effective key id equals `kid`
    pub fn lookup_signature(&self, kid: &str) -> Vec<&Signature> {
        self.signatures
            .iter()
            .filter(|signature| signature.merged_header().key_id() == Some(kid))
            .collect()
    }

    /// Verify this message, succeeding if at least one of its
    /// signatures verifies with the given verifier.
    pub fn verify(&self, verifier: &dyn Verifier) -> Result<(), JoseError> {
        if self.signatures.is_empty() {
            return Err(JoseError::NoSignatures);
        }
        for (index, signature) in self.signatures.iter().enumerate() {
            match signature.verify(&self.payload, verifier) {
                Ok(()) => {
                    tracing::trace!("jws signature #{index} verified");
                    return Ok(());
                }
                Err(err) => tracing::debug!("jws signature #{index} not verified: {err}"),
            }
        }
        Err(JoseError::InvalidSignature)
    }

    /// Verify this message, succeeding only if every signature
    /// verifies with at least one of the given verifiers.
    pub fn verify_all(&self, verifiers: &[&dyn Verifier]) -> Result<(), JoseError> {
        if self.signatures.is_empty() {
            return Err(JoseError::NoSignatures);
        }
        for (index, signature) in self.signatures.iter().enumerate() {
            let verified = verifiers
                .iter()
                .any(|verifier| signature.verify(&self.payload, *verifier).is_ok());
            if !verified {
                tracing::debug!("jws signature #{index} not verified by any verifier");
                return Err(JoseError::InvalidSignature);
            }
        }
        Ok(())
    }
}
