use aws_lc_rs::{
    hmac,
    rand::SystemRandom,
    signature::{
        KeyPair as _, RSA_PKCS1_SHA256, RSA_PKCS1_SHA384, RSA_PKCS1_SHA512, RSA_PSS_SHA256,
        RSA_PSS_SHA384, RSA_PSS_SHA512, RsaEncoding, RsaKeyPair,
    },
};

use super::{Signature, signing_input};
use crate::{
    EcdsaKey, JWA, JWK, JoseError,
    error::ErrorContext as _,
    header::{EncodedHeader, JWSHeader},
    macros::generate_set_and_with,
};

/// Minimum RSA modulus size in bytes, as required by [`rfc7518, section 3.3`]
///
/// [`rfc7518, section 3.3`]: https://datatracker.ietf.org/doc/html/rfc7518#section-3.3
const RSA_MIN_MODULUS_LEN: usize = 2048 / 8;

/// [`PayloadSigner`] produces the signature of a JWS, using a single algorithm,
/// together with the headers it wants to embed in it.
pub trait PayloadSigner {
    /// Algorithm of the produced signatures, always embedded in the protected header
    fn algorithm(&self) -> JWA;

    /// Header to be integrity protected by the signature
    fn protected_header(&self) -> &JWSHeader;

    /// Header to be carried unprotected next to the signature
    fn public_header(&self) -> &JWSHeader;

    /// Sign the JWS signing input
    fn sign(&self, signing_input: &[u8]) -> Result<Vec<u8>, JoseError>;
}

pub(super) fn sign_payload(payload: &[u8], signer: &dyn PayloadSigner) -> Result<Signature, JoseError> {
    let protected = signer
        .protected_header()
        .clone()
        .with_algorithm(signer.algorithm());
    let protected = EncodedHeader::new(protected);
    let input = signing_input(&protected, payload)?;
    let signature = signer.sign(input.as_bytes())?;
    tracing::trace!(
        "jws payload signed using {} ({} signature bytes)",
        signer.algorithm(),
        signature.len()
    );
    Ok(Signature::new(
        signer.public_header().clone(),
        protected,
        signature,
    ))
}

/// Header setters shared by all signers
macro_rules! signer_headers {
    () => {
        generate_set_and_with! {
            /// Set the header to be integrity protected, `alg` is always overwritten
            pub fn protected_header(mut self, header: JWSHeader) -> Self {
                self.protected = header;
                self
            }
        }

        generate_set_and_with! {
            /// Set the header to be carried unprotected
            pub fn public_header(mut self, header: JWSHeader) -> Self {
                self.public = header;
                self
            }
        }

        generate_set_and_with! {
            /// Set the key id (`kid`) in the protected header
            pub fn key_id(mut self, kid: String) -> Self {
                self.protected.set_key_id(kid);
                self
            }
        }
    };
}

macro_rules! impl_payload_signer_headers {
    () => {
        fn algorithm(&self) -> JWA {
            self.alg
        }

        fn protected_header(&self) -> &JWSHeader {
            &self.protected
        }

        fn public_header(&self) -> &JWSHeader {
            &self.public
        }
    };
}

/// HMAC signer using a shared secret (`HS256`, `HS384` and `HS512`)
pub struct HmacSigner {
    alg: JWA,
    key: hmac::Key,
    protected: JWSHeader,
    public: JWSHeader,
}

impl std::fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSigner")
            .field("alg", &self.alg)
            .field("protected", &self.protected)
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

pub(super) fn hmac_algorithm(alg: JWA) -> Result<hmac::Algorithm, JoseError> {
    match alg {
        JWA::HS256 => Ok(hmac::HMAC_SHA256),
        JWA::HS384 => Ok(hmac::HMAC_SHA384),
        JWA::HS512 => Ok(hmac::HMAC_SHA512),
        JWA::None
        | JWA::RS256
        | JWA::RS384
        | JWA::RS512
        | JWA::ES256
        | JWA::ES384
        | JWA::ES512
        | JWA::PS256
        | JWA::PS384
        | JWA::PS512 => Err(JoseError::UnsupportedAlgorithm(alg.to_string())),
    }
}

impl HmacSigner {
    /// Create a new [`HmacSigner`] for the given HMAC `alg` and shared secret
    pub fn new(alg: JWA, secret: &[u8]) -> Result<Self, JoseError> {
        let hmac_alg = hmac_algorithm(alg)?;
        if secret.is_empty() {
            return Err(JoseError::MissingPrivateKey);
        }
        Ok(Self {
            alg,
            key: hmac::Key::new(hmac_alg, secret),
            protected: JWSHeader::new(),
            public: JWSHeader::new(),
        })
    }

    signer_headers!();
}

impl PayloadSigner for HmacSigner {
    impl_payload_signer_headers!();

    fn sign(&self, signing_input: &[u8]) -> Result<Vec<u8>, JoseError> {
        Ok(hmac::sign(&self.key, signing_input).as_ref().to_vec())
    }
}

/// RSA signer, using either PKCS#1 v1.5 (`RS*`) or PSS (`PS*`) padding
pub struct RsaSigner {
    alg: JWA,
    padding: &'static dyn RsaEncoding,
    key_pair: RsaKeyPair,
    rng: SystemRandom,
    protected: JWSHeader,
    public: JWSHeader,
}

impl std::fmt::Debug for RsaSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaSigner")
            .field("alg", &self.alg)
            .field("protected", &self.protected)
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

impl RsaSigner {
    /// Create a new [`RsaSigner`] for the given RSA `alg` and key pair
    ///
    /// The key has to be at least 2048 bits.
    pub fn new(alg: JWA, key_pair: RsaKeyPair) -> Result<Self, JoseError> {
        let padding: &'static dyn RsaEncoding = match alg {
            JWA::RS256 => &RSA_PKCS1_SHA256,
            JWA::RS384 => &RSA_PKCS1_SHA384,
            JWA::RS512 => &RSA_PKCS1_SHA512,
            JWA::PS256 => &RSA_PSS_SHA256,
            JWA::PS384 => &RSA_PSS_SHA384,
            JWA::PS512 => &RSA_PSS_SHA512,
            JWA::None
            | JWA::HS256
            | JWA::HS384
            | JWA::HS512
            | JWA::ES256
            | JWA::ES384
            | JWA::ES512 => return Err(JoseError::UnsupportedAlgorithm(alg.to_string())),
        };
        if key_pair.public_modulus_len() < RSA_MIN_MODULUS_LEN {
            return Err(JoseError::malformed("rsa key has to be at least 2048 bits"));
        }
        Ok(Self {
            alg,
            padding,
            key_pair,
            rng: SystemRandom::new(),
            protected: JWSHeader::new(),
            public: JWSHeader::new(),
        })
    }

    /// Create a new [`RsaSigner`] from a pkcs8 der encoded private key
    pub fn from_pkcs8_der(alg: JWA, pkcs8_der: &[u8]) -> Result<Self, JoseError> {
        let key_pair = RsaKeyPair::from_pkcs8(pkcs8_der).context("create RsaKeyPair from pkcs8")?;
        Self::new(alg, key_pair)
    }

    /// DER encoded (PKCS#1) public key of this signer, usable with [`RsaVerifier`]
    ///
    /// [`RsaVerifier`]: super::RsaVerifier
    pub fn public_key_der(&self) -> Vec<u8> {
        self.key_pair.public_key().as_ref().to_vec()
    }

    signer_headers!();
}

impl PayloadSigner for RsaSigner {
    impl_payload_signer_headers!();

    fn sign(&self, signing_input: &[u8]) -> Result<Vec<u8>, JoseError> {
        let mut signature = vec![0; self.key_pair.public_modulus_len()];
        self.key_pair
            .sign(self.padding, &self.rng, signing_input, &mut signature)
            .context("rsa sign signing input")?;
        Ok(signature)
    }
}

#[derive(Debug)]
/// ECDSA signer (`ES256`, `ES384` and `ES512`) using an [`EcdsaKey`]
pub struct EcdsaSigner {
    alg: JWA,
    key: EcdsaKey,
    protected: JWSHeader,
    public: JWSHeader,
}

impl EcdsaSigner {
    /// Create a new [`EcdsaSigner`], the algorithm is defined by the curve of the key
    #[must_use]
    pub fn new(key: EcdsaKey) -> Self {
        Self {
            alg: key.alg(),
            key,
            protected: JWSHeader::new(),
            public: JWSHeader::new(),
        }
    }

    /// Public [`JWK`] of the signing key
    pub fn jwk(&self) -> Result<JWK, JoseError> {
        self.key.create_jwk()
    }

    /// Embed the public key as `jwk` in the protected header
    pub fn try_with_embedded_jwk(mut self) -> Result<Self, JoseError> {
        let jwk = self.key.create_jwk()?;
        self.protected.set_jwk(jwk);
        Ok(self)
    }

    signer_headers!();
}

impl PayloadSigner for EcdsaSigner {
    impl_payload_signer_headers!();

    fn sign(&self, signing_input: &[u8]) -> Result<Vec<u8>, JoseError> {
        self.key.sign(signing_input)
    }
}

#[derive(Default)]
/// Signs a payload with several signers, producing one signature per signer
pub struct MultiSign {
    signers: Vec<Box<dyn PayloadSigner>>,
}

impl std::fmt::Debug for MultiSign {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiSign")
            .field(
                "signers",
                &self
                    .signers
                    .iter()
                    .map(|signer| signer.algorithm())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl MultiSign {
    /// Create a new [`MultiSign`] without any signer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    generate_set_and_with! {
        /// Add a signer, signatures are created in the order signers were added
        pub fn signer(mut self, signer: impl PayloadSigner + 'static) -> Self {
            self.signers.push(Box::new(signer));
            self
        }
    }

    /// Amount of signers
    pub fn len(&self) -> usize {
        self.signers.len()
    }

    /// Returns true if there are no signers
    pub fn is_empty(&self) -> bool {
        self.signers.is_empty()
    }

    /// Sign `payload` with every signer.
    ///
    /// The first failing signer aborts the creation of the message.
    pub fn sign(&self, payload: impl Into<Vec<u8>>) -> Result<super::Message, JoseError> {
        if self.signers.is_empty() {
            return Err(JoseError::NoSignatures);
        }
        let payload = payload.into();
        let signatures = self
            .signers
            .iter()
            .map(|signer| sign_payload(&payload, signer.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(super::Message::new(payload, signatures))
    }
}
