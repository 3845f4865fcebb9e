use aws_lc_rs::{
    digest::{Digest, SHA256, digest},
    pkcs8::Document,
    rand::SystemRandom,
    rsa::PublicEncryptingKey,
    signature::{
        self, EcdsaKeyPair, EcdsaSigningAlgorithm, EcdsaVerificationAlgorithm, KeyPair,
        VerificationAlgorithm,
    },
};
use serde::{Deserialize, Serialize, Serializer, ser::SerializeStruct};

use crate::{
    JWA, JoseError,
    encoding::{b64_decode, b64_encode},
    error::ErrorContext as _,
    jwk_utils::{rsa_public_key_der, rsa_subject_public_key_info},
    macros::generate_set_and_with,
};

/// Uncompressed point marker of an EC public key (SEC 1, section 2.3.3).
const EC_POINT_UNCOMPRESSED: u8 = 0x04;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
/// [`JWK`] or JSON Web Key as defined in [`rfc7517`]
///
/// Only public key material is modelled, as this is what travels
/// inside `jwk` and `epk` header parameters.
///
/// [`rfc7517`]: https://datatracker.ietf.org/doc/html/rfc7517
pub struct JWK {
    /// Intended algorithm to be used with this key
    #[serde(skip_serializing_if = "Option::is_none")]
    alg: Option<String>,
    #[serde(flatten)]
    key_type: JWKType,
    #[serde(skip_serializing_if = "Option::is_none")]
    kid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    r#use: Option<JWKUse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    key_ops: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    x5c: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    x5t: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "x5t#S256")]
    x5t_sha256: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "kty")]
/// The "kty" (key type) parameter identifies the cryptographic algorithm family used with the key, such as "RSA", "EC", or "oct"
pub enum JWKType {
    /// RSA public key, `n` and `e` are base64url encoded big-endian integers
    RSA { n: String, e: String },
    /// Elleptic curve public key
    EC {
        crv: JWKEllipticCurves,
        x: String,
        y: String,
    },
    /// an octet sequence key, which represents a symmetric key
    #[serde(rename = "oct")]
    OCT { k: String },
}

impl Serialize for JWKType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Order here is important as this output will be used to generate jwk thumb
        match &self {
            Self::EC { crv, x, y } => {
                let mut state = serializer.serialize_struct("JWKType", 4)?;
                state.serialize_field("crv", crv)?;
                state.serialize_field("kty", "EC")?;
                state.serialize_field("x", x)?;
                state.serialize_field("y", y)?;
                state.end()
            }
            Self::RSA { n, e } => {
                let mut state = serializer.serialize_struct("JWKType", 3)?;
                state.serialize_field("e", e)?;
                state.serialize_field("kty", "RSA")?;
                state.serialize_field("n", n)?;
                state.end()
            }
            Self::OCT { k } => {
                let mut state = serializer.serialize_struct("JWKType", 2)?;
                state.serialize_field("k", k)?;
                state.serialize_field("kty", "oct")?;
                state.end()
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
/// Curves usable with EC keys, for both ECDSA and ECDH
pub enum JWKEllipticCurves {
    #[serde(rename = "P-256")]
    P256,
    #[serde(rename = "P-384")]
    P384,
    #[serde(rename = "P-521")]
    P521,
}

impl JWKEllipticCurves {
    /// Length in bytes of a single coordinate of a point on this curve.
    #[must_use]
    pub const fn coordinate_len(self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
            Self::P521 => 66,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
/// [`JWKUse`] identifies the intended use of the public key
pub enum JWKUse {
    #[serde(rename = "sig")]
    Signature,
    #[serde(rename = "enc")]
    Encryption,
}

impl JWK {
    /// Create a new [`JWK`] for the given key material, without any optional parameters
    #[must_use]
    pub fn new(key_type: JWKType) -> Self {
        Self {
            alg: None,
            key_type,
            kid: None,
            r#use: None,
            key_ops: None,
            x5c: None,
            x5t: None,
            x5t_sha256: None,
        }
    }

    /// Create an EC [`JWK`] from an uncompressed public point (`0x04 || x || y`)
    pub fn new_ec_public_key(crv: JWKEllipticCurves, point: &[u8]) -> Result<Self, JoseError> {
        let coordinate_len = crv.coordinate_len();
        match point.split_first() {
            Some((&EC_POINT_UNCOMPRESSED, xy)) if xy.len() == 2 * coordinate_len => {
                let (x, y) = xy.split_at(coordinate_len);
                Ok(Self::new(JWKType::EC {
                    crv,
                    x: b64_encode(x),
                    y: b64_encode(y),
                }))
            }
            _ => Err(JoseError::malformed("invalid uncompressed ec point")),
        }
    }

    /// Create an RSA [`JWK`] from the big-endian modulus and public exponent
    #[must_use]
    pub fn new_rsa_public_key(n: &[u8], e: &[u8]) -> Self {
        Self::new(JWKType::RSA {
            n: b64_encode(n),
            e: b64_encode(e),
        })
    }

    /// Create a [`JWK`] for the given [`EcdsaKeyPair`]
    fn new_from_escdsa_keypair(key: &EcdsaKeyPair, curve: JWKEllipticCurves) -> Result<Self, JoseError> {
        Ok(Self::new_ec_public_key(curve, key.public_key().as_ref())?
            .with_alg(JWA::from(curve).as_str().to_owned())
            .with_key_use(JWKUse::Signature))
    }

    generate_set_and_with! {
        /// Set the intended algorithm (`alg`) of this key
        pub fn alg(mut self, alg: Option<String>) -> Self {
            self.alg = alg;
            self
        }
    }

    generate_set_and_with! {
        /// Set the key id (`kid`) of this key
        pub fn key_id(mut self, kid: Option<String>) -> Self {
            self.kid = kid;
            self
        }
    }

    generate_set_and_with! {
        /// Set the intended use (`use`) of this key
        pub fn key_use(mut self, key_use: Option<JWKUse>) -> Self {
            self.r#use = key_use;
            self
        }
    }

    /// Key material of this [`JWK`]
    #[must_use]
    pub fn key_type(&self) -> &JWKType {
        &self.key_type
    }

    /// Intended algorithm of this key, if any
    #[must_use]
    pub fn alg(&self) -> Option<&str> {
        self.alg.as_deref()
    }

    /// Key id of this key, if any
    #[must_use]
    pub fn key_id(&self) -> Option<&str> {
        self.kid.as_deref()
    }

    /// [`JWKThumb`] as defined in [`rfc7638`] is url safe identifier for a [`JWK`]
    ///
    /// [`rfc7638`]: https://datatracker.ietf.org/doc/html/rfc7638
    pub fn thumb_sha256(&self) -> Result<Digest, JoseError> {
        Ok(digest(
            &SHA256,
            &serde_json::to_vec(&self.key_type).context("failed to serialise JWK")?,
        ))
    }

    /// Curve and uncompressed point (`0x04 || x || y`) of an EC key
    pub fn ec_point(&self) -> Result<(JWKEllipticCurves, Vec<u8>), JoseError> {
        let JWKType::EC { crv, x, y } = &self.key_type else {
            return Err(JoseError::MissingPublicKey);
        };

        let x_bytes = b64_decode(x, "decode ec curve x point")?;
        let y_bytes = b64_decode(y, "decode ec curve y point")?;
        let coordinate_len = crv.coordinate_len();
        if x_bytes.len() != coordinate_len || y_bytes.len() != coordinate_len {
            return Err(JoseError::malformed("ec point has invalid coordinate length"));
        }

        let mut point_bytes = Vec::with_capacity(1 + x_bytes.len() + y_bytes.len());
        point_bytes.push(EC_POINT_UNCOMPRESSED);
        point_bytes.extend_from_slice(&x_bytes);
        point_bytes.extend_from_slice(&y_bytes);
        Ok((*crv, point_bytes))
    }

    fn rsa_components(&self) -> Result<(Vec<u8>, Vec<u8>), JoseError> {
        let JWKType::RSA { n, e } = &self.key_type else {
            return Err(JoseError::MissingPublicKey);
        };
        Ok((
            b64_decode(n, "decode rsa modulus")?,
            b64_decode(e, "decode rsa exponent")?,
        ))
    }

    /// Convert this [`JWK`] to an unparsed public key which can be used
    /// to verify signatures made with the given `alg`
    ///
    /// Warning no verification is done on this key until `.verify()` is called
    pub fn unparsed_public_key(
        &self,
        alg: JWA,
    ) -> Result<signature::UnparsedPublicKey<Vec<u8>>, JoseError> {
        if alg.is_none() {
            return Err(JoseError::UnsupportedAlgorithm(alg.to_string()));
        }
        match &self.key_type {
            JWKType::RSA { .. } if alg.is_rsa() => {
                let verification_alg: &'static dyn VerificationAlgorithm = alg.try_into()?;
                let (n, e) = self.rsa_components()?;
                let der = rsa_public_key_der(&n, &e)
                    .ok_or_else(|| JoseError::malformed("rsa key has empty modulus or exponent"))?;
                Ok(signature::UnparsedPublicKey::new(verification_alg, der))
            }
            JWKType::EC { crv, .. } if JWA::from(*crv) == alg => {
                let verification_alg: &'static EcdsaVerificationAlgorithm = alg.try_into()?;
                let (_, point) = self.ec_point()?;
                Ok(signature::UnparsedPublicKey::new(verification_alg, point))
            }
            // key of another family (or curve) than the algorithm
            JWKType::OCT { .. } | JWKType::RSA { .. } | JWKType::EC { .. } => {
                Err(JoseError::MissingPublicKey)
            }
        }
    }

    /// Convert an RSA [`JWK`] into a key which can be used for RSA-OAEP key encryption
    pub fn rsa_public_encrypting_key(&self) -> Result<PublicEncryptingKey, JoseError> {
        let (n, e) = self.rsa_components()?;
        let spki = rsa_subject_public_key_info(&n, &e)
            .ok_or_else(|| JoseError::malformed("rsa key has empty modulus or exponent"))?;
        Ok(PublicEncryptingKey::from_der(&spki).context("parse rsa public key")?)
    }
}

/// [`EcdsaKey`] which is used to identify and authenticate our requests
///
/// This contains the private and public key we will be using for JWS
pub struct EcdsaKey {
    rng: SystemRandom,
    curve: JWKEllipticCurves,
    inner: EcdsaKeyPair,
}

impl std::fmt::Debug for EcdsaKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcdsaKey")
            .field("curve", &self.curve)
            .finish_non_exhaustive()
    }
}

impl EcdsaKey {
    /// Create a new [`EcdsaKey`] from the given [`EcdsaKeyPair`]
    ///
    /// `alg` has to be the ECDSA algorithm the key pair was created for.
    pub fn new(key_pair: EcdsaKeyPair, alg: JWA, rng: SystemRandom) -> Result<Self, JoseError> {
        let curve = JWKEllipticCurves::try_from(alg)?;
        Ok(Self {
            rng,
            curve,
            inner: key_pair,
        })
    }

    /// Generate a new [`EcdsaKey`] from a newly generated [`EcdsaKeyPair`] for the given ECDSA `alg`
    pub fn generate(alg: JWA) -> Result<Self, JoseError> {
        let ec_alg: &'static EcdsaSigningAlgorithm = alg.try_into()?;
        let key_pair = EcdsaKeyPair::generate(ec_alg).context("generate EcdsaKeyPair")?;

        Self::new(key_pair, alg, SystemRandom::new())
    }

    /// Generate a new [`EcdsaKey`] from the given pkcs8 der
    pub fn from_pkcs8_der(
        pkcs8_der: &[u8],
        alg: JWA,
        rng: SystemRandom,
    ) -> Result<Self, JoseError> {
        let ec_alg: &'static EcdsaSigningAlgorithm = alg.try_into()?;
        let key_pair = EcdsaKeyPair::from_pkcs8(ec_alg, pkcs8_der)
            .context("create EcdsaKeyPair from pkcs8")?;

        Self::new(key_pair, alg, rng)
    }

    /// Create pkcs8 der for the current [`EcdsaKeyPair`]
    pub fn pkcs8_der(&self) -> Result<(JWA, Document), JoseError> {
        let doc = self
            .inner
            .to_pkcs8v1()
            .context("create pkcs8 der from keypair")?;
        Ok((self.alg(), doc))
    }

    /// Signature algorithm of this key
    #[must_use]
    pub fn alg(&self) -> JWA {
        JWA::from(self.curve)
    }

    /// Create a [`JWK`] for this [`EcdsaKey`]
    pub fn create_jwk(&self) -> Result<JWK, JoseError> {
        JWK::new_from_escdsa_keypair(&self.inner, self.curve)
    }

    /// Sign `data`, producing the fixed size `r || s` signature used by JWS
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>, JoseError> {
        let signature = self
            .inner
            .sign(&self.rng, data)
            .context("ecdsa sign data")?;
        Ok(signature.as_ref().to_vec())
    }
}
