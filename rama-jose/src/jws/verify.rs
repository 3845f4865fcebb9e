use aws_lc_rs::{
    hmac,
    signature::{EcdsaVerificationAlgorithm, UnparsedPublicKey, VerificationAlgorithm},
};

use super::sign::hmac_algorithm;
use crate::{JWA, JWK, JWKType, JoseError, encoding::b64_decode};

/// [`Verifier`] checks JWS signatures made with a single algorithm and key.
///
/// Any failure, including a malformed signature, is a [`JoseError::InvalidSignature`].
pub trait Verifier {
    /// Algorithm of the signatures this verifier checks
    fn algorithm(&self) -> JWA;

    /// Verify `signature` over the JWS signing input
    fn verify(&self, signing_input: &[u8], signature: &[u8]) -> Result<(), JoseError>;
}

/// Verifier for HMAC signatures (`HS256`, `HS384` and `HS512`)
pub struct HmacVerifier {
    alg: JWA,
    key: hmac::Key,
}

impl std::fmt::Debug for HmacVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacVerifier")
            .field("alg", &self.alg)
            .finish_non_exhaustive()
    }
}

impl HmacVerifier {
    /// Create a new [`HmacVerifier`] for the given HMAC `alg` and shared secret
    pub fn new(alg: JWA, secret: &[u8]) -> Result<Self, JoseError> {
        let hmac_alg = hmac_algorithm(alg)?;
        if secret.is_empty() {
            return Err(JoseError::MissingPublicKey);
        }
        Ok(Self {
            alg,
            key: hmac::Key::new(hmac_alg, secret),
        })
    }
}

impl Verifier for HmacVerifier {
    fn algorithm(&self) -> JWA {
        self.alg
    }

    fn verify(&self, signing_input: &[u8], signature: &[u8]) -> Result<(), JoseError> {
        // constant time comparison of the recomputed tag
        hmac::verify(&self.key, signing_input, signature).map_err(|_err| JoseError::InvalidSignature)
    }
}

#[derive(Debug)]
/// Verifier for RSA signatures (`RS*` and `PS*`) using a public key
pub struct RsaVerifier {
    alg: JWA,
    key: UnparsedPublicKey<Vec<u8>>,
}

impl RsaVerifier {
    /// Create a new [`RsaVerifier`] from a DER encoded (PKCS#1) RSA public key
    pub fn new(alg: JWA, public_key_der: impl Into<Vec<u8>>) -> Result<Self, JoseError> {
        if !alg.is_rsa() {
            return Err(JoseError::UnsupportedAlgorithm(alg.to_string()));
        }
        let verification_alg: &'static dyn VerificationAlgorithm = alg.try_into()?;
        Ok(Self {
            alg,
            key: UnparsedPublicKey::new(verification_alg, public_key_der.into()),
        })
    }

    /// Create a new [`RsaVerifier`] from an RSA [`JWK`]
    pub fn from_jwk(alg: JWA, jwk: &JWK) -> Result<Self, JoseError> {
        if !matches!(jwk.key_type(), JWKType::RSA { .. }) {
            return Err(JoseError::MissingPublicKey);
        }
        Ok(Self {
            alg,
            key: jwk.unparsed_public_key(alg)?,
        })
    }
}

impl Verifier for RsaVerifier {
    fn algorithm(&self) -> JWA {
        self.alg
    }

    fn verify(&self, signing_input: &[u8], signature: &[u8]) -> Result<(), JoseError> {
        self.key
            .verify(signing_input, signature)
            .map_err(|_err| JoseError::InvalidSignature)
    }
}

#[derive(Debug)]
/// Verifier for ECDSA signatures (`ES256`, `ES384` and `ES512`) using a public key
pub struct EcdsaVerifier {
    alg: JWA,
    key: UnparsedPublicKey<Vec<u8>>,
}

impl EcdsaVerifier {
    /// Create a new [`EcdsaVerifier`] from an uncompressed public point (`0x04 || x || y`)
    pub fn new(alg: JWA, public_point: impl Into<Vec<u8>>) -> Result<Self, JoseError> {
        let verification_alg: &'static EcdsaVerificationAlgorithm = alg.try_into()?;
        Ok(Self {
            alg,
            key: UnparsedPublicKey::new(verification_alg, public_point.into()),
        })
    }

    /// Create a new [`EcdsaVerifier`] from an EC [`JWK`]
    pub fn from_jwk(alg: JWA, jwk: &JWK) -> Result<Self, JoseError> {
        if !matches!(jwk.key_type(), JWKType::EC { .. }) {
            return Err(JoseError::MissingPublicKey);
        }
        Ok(Self {
            alg,
            key: jwk.unparsed_public_key(alg)?,
        })
    }
}

impl Verifier for EcdsaVerifier {
    fn algorithm(&self) -> JWA {
        self.alg
    }

    fn verify(&self, signing_input: &[u8], signature: &[u8]) -> Result<(), JoseError> {
        self.key
            .verify(signing_input, signature)
            .map_err(|_err| JoseError::InvalidSignature)
    }
}

/// Create the [`Verifier`] matching the key type of `jwk` for the given `alg`
///
/// Symmetric (`oct`) keys result in an [`HmacVerifier`]. A key which does not
/// belong to the family of `alg` is a [`JoseError::MissingPublicKey`].
pub fn verifier_from_jwk(alg: JWA, jwk: &JWK) -> Result<Box<dyn Verifier>, JoseError> {
    if alg.is_none() {
        return Err(JoseError::UnsupportedAlgorithm(alg.to_string()));
    }
    match jwk.key_type() {
        JWKType::OCT { k } if alg.is_hmac() => {
            let secret = b64_decode(k, "decode symmetric key")?;
            Ok(Box::new(HmacVerifier::new(alg, &secret)?))
        }
        JWKType::OCT { .. } => Err(JoseError::MissingPublicKey),
        JWKType::RSA { .. } => Ok(Box::new(RsaVerifier::from_jwk(alg, jwk)?)),
        JWKType::EC { .. } => Ok(Box::new(EcdsaVerifier::from_jwk(alg, jwk)?)),
    }
}

#[cfg(test)]
mod tests {
    use aws_lc_rs::{
        rand::SystemRandom,
        signature::{KeyPair, RSA_PKCS1_SHA256, RsaKeyPair},
    };
    use tokio_test::assert_err;

    use super::*;
    use crate::{EcdsaKey, encoding::b64_encode};

    #[test]
    fn hmac_verifier_from_oct_jwk() {
        let jwk: JWK = serde_json::from_value(serde_json::json!({
            "kty": "oct",
            "k": b64_encode("secret"),
        }))
        .unwrap();
        let verifier = verifier_from_jwk(JWA::HS256, &jwk).unwrap();
        let tag = hmac::sign(&hmac::Key::new(hmac::HMAC_SHA256, b"secret"), b"a.b");

        verifier.verify(b"a.b", tag.as_ref()).unwrap();
        assert!(matches!(
            verifier.verify(b"a.c", tag.as_ref()),
            Err(JoseError::InvalidSignature)
        ));
        assert!(matches!(
            verifier.verify(b"a.b", &tag.as_ref()[1..]),
            Err(JoseError::InvalidSignature)
        ));
        assert!(matches!(
            verifier_from_jwk(JWA::RS256, &jwk),
            Err(JoseError::MissingPublicKey)
        ));
        assert!(matches!(
            verifier_from_jwk(JWA::None, &jwk),
            Err(JoseError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn rsa_verifier_from_jwk() {
        let key_pair = RsaKeyPair::generate(aws_lc_rs::rsa::KeySize::Rsa2048).unwrap();
        let mut signature = vec![0; key_pair.public_modulus_len()];
        key_pair
            .sign(&RSA_PKCS1_SHA256, &SystemRandom::new(), b"a.b", &mut signature)
            .unwrap();

        let der_verifier = RsaVerifier::new(JWA::RS256, key_pair.public_key().as_ref()).unwrap();
        der_verifier.verify(b"a.b", &signature).unwrap();

        // the modulus and exponent are the two integers of the PKCS#1 public key
        let (n, e) = parse_rsa_public_key(key_pair.public_key().as_ref());
        let jwk = JWK::new_rsa_public_key(n, e);
        let verifier = verifier_from_jwk(JWA::RS256, &jwk).unwrap();
        verifier.verify(b"a.b", &signature).unwrap();
        assert_err!(verifier.verify(b"a.c", &signature));

        let pss = verifier_from_jwk(JWA::PS256, &jwk).unwrap();
        assert_err!(pss.verify(b"a.b", &signature));
        for alg in [JWA::ES256, JWA::HS256] {
            assert!(matches!(
                verifier_from_jwk(alg, &jwk),
                Err(JoseError::MissingPublicKey)
            ));
        }
        assert!(matches!(
            RsaVerifier::new(JWA::ES256, key_pair.public_key().as_ref()),
            Err(JoseError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn ecdsa_verifier_from_point() {
        let key = EcdsaKey::generate(JWA::ES256).unwrap();
        let signature = key.sign(b"a.b").unwrap();
        let (_, point) = key.create_jwk().unwrap().ec_point().unwrap();

        let verifier = EcdsaVerifier::new(JWA::ES256, point).unwrap();
        verifier.verify(b"a.b", &signature).unwrap();
        assert_err!(verifier.verify(b"a.b", &signature[..signature.len() - 1]));
        assert_err!(EcdsaVerifier::new(JWA::HS256, Vec::new()));

        let jwk = key.create_jwk().unwrap();
        assert!(matches!(
            verifier_from_jwk(JWA::RS256, &jwk),
            Err(JoseError::MissingPublicKey)
        ));
        assert!(matches!(
            RsaVerifier::from_jwk(JWA::ES256, &jwk),
            Err(JoseError::MissingPublicKey)
        ));
        let verifier = verifier_from_jwk(JWA::ES256, &jwk).unwrap();
        verifier.verify(b"a.b", &signature).unwrap();
    }

    /// Split a DER `RSAPublicKey` into its (unsigned) modulus and exponent.
    fn parse_rsa_public_key(der: &[u8]) -> (&[u8], &[u8]) {
        fn read_tlv(input: &[u8]) -> (&[u8], &[u8]) {
            let (len, header_len) = match input[1] {
                len if len < 0x80 => (len as usize, 2),
                0x81 => (input[2] as usize, 3),
                0x82 => (((input[2] as usize) << 8) | input[3] as usize, 4),
                other => panic!("unexpected DER length octet {other:#x}"),
            };
            (
                &input[header_len..header_len + len],
                &input[header_len + len..],
            )
        }

        let (sequence, _) = read_tlv(der);
        let (n, rest) = read_tlv(sequence);
        let (e, _) = read_tlv(rest);
        (n, e)
    }
}
