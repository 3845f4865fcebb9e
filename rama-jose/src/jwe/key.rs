use aws_lc_rs::{
    agreement::{self, ECDH_P256, ECDH_P384, ECDH_P521},
    digest::{self, SHA256},
    key_wrap::{AES_128, AES_256, AesKek, KeyWrap as _},
    rand::{SecureRandom as _, SystemRandom},
    rsa::{
        OAEP_SHA1_MGF1SHA1, OAEP_SHA256_MGF1SHA256, OaepAlgorithm, OaepPrivateDecryptingKey,
        OaepPublicEncryptingKey, PrivateDecryptingKey, PublicEncryptingKey,
    },
};

use crate::{
    JWEEncryption, JWEKeyAlgorithm, JWK, JWKEllipticCurves, JoseError, error::ErrorContext as _,
    header::JWEHeader, macros::generate_set_and_with,
};

/// Size in bytes of the integrity check value prepended by AES key wrap
const KEY_WRAP_OVERHEAD: usize = 8;

/// Private (or shared) key material used to decrypt a JWE
pub enum JWEKey {
    /// Symmetric key, used as CEK (`dir`) or as key encryption key (`A128KW`, `A256KW`)
    Symmetric(Vec<u8>),
    /// RSA private key for `RSA-OAEP` and `RSA-OAEP-256`
    RsaOaep(OaepPrivateDecryptingKey),
    /// EC private key for `ECDH-ES` key agreement
    Ec {
        /// Curve of the private key
        curve: JWKEllipticCurves,
        /// The private key itself
        key: agreement::PrivateKey,
    },
}

impl std::fmt::Debug for JWEKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Symmetric(_) => f.debug_tuple("Symmetric").finish_non_exhaustive(),
            Self::RsaOaep(_) => f.debug_tuple("RsaOaep").finish_non_exhaustive(),
            Self::Ec { curve, .. } => f
                .debug_struct("Ec")
                .field("curve", curve)
                .finish_non_exhaustive(),
        }
    }
}

impl JWEKey {
    /// Create a symmetric [`JWEKey`]
    pub fn symmetric(key: impl Into<Vec<u8>>) -> Self {
        Self::Symmetric(key.into())
    }

    /// Create a [`JWEKey`] from an RSA private key
    pub fn rsa_oaep(key: PrivateDecryptingKey) -> Result<Self, JoseError> {
        Ok(Self::RsaOaep(
            OaepPrivateDecryptingKey::new(key).context("create rsa oaep decrypting key")?,
        ))
    }

    /// Create a [`JWEKey`] from a PKCS#8 DER encoded RSA private key
    pub fn rsa_oaep_from_pkcs8_der(der: &[u8]) -> Result<Self, JoseError> {
        let key = PrivateDecryptingKey::from_pkcs8(der).context("parse rsa private key")?;
        Self::rsa_oaep(key)
    }

    /// Create a [`JWEKey`] from a DER encoded EC private key on the given curve
    pub fn ec_from_der(curve: JWKEllipticCurves, der: &[u8]) -> Result<Self, JoseError> {
        let key = agreement::PrivateKey::from_private_key_der(agreement_algorithm(curve), der)
            .context("parse ec private key")?;
        Ok(Self::Ec { curve, key })
    }

    /// Generate a new EC [`JWEKey`] on the given curve
    pub fn generate_ec(curve: JWKEllipticCurves) -> Result<Self, JoseError> {
        let key = agreement::PrivateKey::generate(agreement_algorithm(curve))
            .context("generate ec private key")?;
        Ok(Self::Ec { curve, key })
    }

    /// Public [`JWK`] matching this key, `None` for symmetric keys
    pub fn public_jwk(&self) -> Result<Option<JWK>, JoseError> {
        match self {
            Self::Symmetric(_) | Self::RsaOaep(_) => Ok(None),
            Self::Ec { curve, key } => {
                let public = key.compute_public_key().context("compute ec public key")?;
                Ok(Some(JWK::new_ec_public_key(*curve, public.as_ref())?))
            }
        }
    }
}

fn agreement_algorithm(curve: JWKEllipticCurves) -> &'static agreement::Algorithm {
    match curve {
        JWKEllipticCurves::P256 => &ECDH_P256,
        JWKEllipticCurves::P384 => &ECDH_P384,
        JWKEllipticCurves::P521 => &ECDH_P521,
    }
}

fn oaep_algorithm(alg: JWEKeyAlgorithm) -> Option<&'static OaepAlgorithm> {
    match alg {
        JWEKeyAlgorithm::RsaOaep => Some(&OAEP_SHA1_MGF1SHA1),
        JWEKeyAlgorithm::RsaOaep256 => Some(&OAEP_SHA256_MGF1SHA256),
        _ => None,
    }
}

/// Size in bytes of the AES key wrap key for `alg`, if `alg` uses AES key wrap
fn key_wrap_size(alg: JWEKeyAlgorithm) -> Option<usize> {
    match alg {
        JWEKeyAlgorithm::A128KW | JWEKeyAlgorithm::EcdhEsA128KW => Some(16),
        JWEKeyAlgorithm::A256KW | JWEKeyAlgorithm::EcdhEsA256KW => Some(32),
        _ => None,
    }
}

fn aes_kek(kek: &[u8]) -> Result<AesKek, JoseError> {
    let cipher = match kek.len() {
        16 => &AES_128,
        32 => &AES_256,
        _ => return Err(JoseError::malformed("aes key wrap key has invalid size")),
    };
    Ok(AesKek::new(cipher, kek).context("create aes key wrap key")?)
}

fn aes_unwrap(kek: &[u8], wrapped: &[u8]) -> Result<Vec<u8>, JoseError> {
    if wrapped.len() < 2 * KEY_WRAP_OVERHEAD || wrapped.len() % KEY_WRAP_OVERHEAD != 0 {
        return Err(JoseError::malformed("aes wrapped key has invalid size"));
    }
    let mut output = vec![0; wrapped.len() - KEY_WRAP_OVERHEAD];
    let cek = aes_kek(kek)?
        .unwrap(wrapped, &mut output)
        .context("aes key unwrap")?;
    Ok(cek.to_vec())
}

fn aes_wrap(kek: &[u8], cek: &[u8]) -> Result<Vec<u8>, JoseError> {
    let mut output = vec![0; cek.len() + KEY_WRAP_OVERHEAD];
    let wrapped = aes_kek(kek)?.wrap(cek, &mut output).context("aes key wrap")?;
    Ok(wrapped.to_vec())
}

/// Parameters of the Concat KDF used by ECDH-ES ([`rfc7518, section 4.6.2`])
///
/// [`rfc7518, section 4.6.2`]: https://datatracker.ietf.org/doc/html/rfc7518#section-4.6.2
struct ConcatKdf<'a> {
    algorithm_id: &'a str,
    apu: &'a [u8],
    apv: &'a [u8],
    key_len: usize,
}

impl ConcatKdf<'_> {
    fn derive(&self, shared_secret: &[u8]) -> Result<Vec<u8>, JoseError> {
        let key_bits = self
            .key_len
            .checked_mul(8)
            .and_then(|bits| u32::try_from(bits).ok())
            .ok_or_else(|| JoseError::malformed("concat kdf key length too large"))?;

        let mut other_info = Vec::new();
        for field in [self.algorithm_id.as_bytes(), self.apu, self.apv] {
            let len = u32::try_from(field.len())
                .map_err(|_err| JoseError::malformed("concat kdf field too large"))?;
            other_info.extend_from_slice(&len.to_be_bytes());
            other_info.extend_from_slice(field);
        }
        other_info.extend_from_slice(&key_bits.to_be_bytes());

        let mut derived = Vec::with_capacity(self.key_len + digest::SHA256_OUTPUT_LEN);
        let mut round: u32 = 1;
        while derived.len() < self.key_len {
            let mut ctx = digest::Context::new(&SHA256);
            ctx.update(&round.to_be_bytes());
            ctx.update(shared_secret);
            ctx.update(&other_info);
            derived.extend_from_slice(ctx.finish().as_ref());
            round += 1;
        }
        derived.truncate(self.key_len);
        Ok(derived)
    }
}

/// Algorithm id, and key length, fed into the Concat KDF for an ECDH-ES based `alg`
fn ecdh_kdf_target(
    alg: JWEKeyAlgorithm,
    enc: Option<JWEEncryption>,
    cek_size: usize,
) -> Result<(&'static str, usize), JoseError> {
    match alg {
        JWEKeyAlgorithm::EcdhEs => {
            let enc = enc.ok_or(JoseError::InvalidHeaderValue { key: "enc" })?;
            Ok((enc.as_str(), cek_size))
        }
        JWEKeyAlgorithm::EcdhEsA128KW | JWEKeyAlgorithm::EcdhEsA256KW => {
            let key_len = key_wrap_size(alg).unwrap_or_default();
            Ok((alg.as_str(), key_len))
        }
        _ => Err(JoseError::UnsupportedAlgorithm(alg.to_string())),
    }
}

/// Decrypts the encrypted CEK of a single JWE recipient,
/// created using [`build_key_decrypter`].
///
/// Supported key management algorithms are `dir`, `A128KW`, `A256KW`,
/// `RSA-OAEP`, `RSA-OAEP-256`, `ECDH-ES`, `ECDH-ES+A128KW` and `ECDH-ES+A256KW`.
pub struct KeyDecrypter<'a> {
    alg: JWEKeyAlgorithm,
    kind: DecrypterKind<'a>,
}

enum DecrypterKind<'a> {
    Direct {
        cek: &'a [u8],
    },
    AesKeyWrap {
        kek: &'a [u8],
    },
    RsaOaep {
        algorithm: &'static OaepAlgorithm,
        key: &'a OaepPrivateDecryptingKey,
    },
    EcdhEs {
        key: &'a agreement::PrivateKey,
        curve: JWKEllipticCurves,
        epk: Vec<u8>,
        algorithm_id: &'static str,
        apu: Vec<u8>,
        apv: Vec<u8>,
        key_len: usize,
        wrapped: bool,
    },
}

impl std::fmt::Debug for KeyDecrypter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyDecrypter")
            .field("alg", &self.alg)
            .finish_non_exhaustive()
    }
}

/// Build the [`KeyDecrypter`] for `alg`, using the (merged) recipient `header`,
/// the caller supplied `key` and the key size required by the content cipher.
pub fn build_key_decrypter<'a>(
    alg: JWEKeyAlgorithm,
    header: &JWEHeader,
    key: &'a JWEKey,
    cek_size: usize,
) -> Result<KeyDecrypter<'a>, JoseError> {
    let kind = match alg {
        JWEKeyAlgorithm::Direct => {
            let JWEKey::Symmetric(cek) = key else {
                return Err(JoseError::MissingPrivateKey);
            };
            if cek.len() != cek_size {
                return Err(JoseError::malformed("direct key does not match content cipher key size"));
            }
            DecrypterKind::Direct { cek }
        }
        JWEKeyAlgorithm::A128KW | JWEKeyAlgorithm::A256KW => {
            let JWEKey::Symmetric(kek) = key else {
                return Err(JoseError::MissingPrivateKey);
            };
            if Some(kek.len()) != key_wrap_size(alg) {
                return Err(JoseError::malformed("key encryption key has invalid size"));
            }
            DecrypterKind::AesKeyWrap { kek }
        }
        JWEKeyAlgorithm::RsaOaep | JWEKeyAlgorithm::RsaOaep256 => {
            let JWEKey::RsaOaep(key) = key else {
                return Err(JoseError::MissingPrivateKey);
            };
            let algorithm = oaep_algorithm(alg)
                .ok_or_else(|| JoseError::UnsupportedAlgorithm(alg.to_string()))?;
            DecrypterKind::RsaOaep { algorithm, key }
        }
        JWEKeyAlgorithm::EcdhEs | JWEKeyAlgorithm::EcdhEsA128KW | JWEKeyAlgorithm::EcdhEsA256KW => {
            let JWEKey::Ec { curve, key } = key else {
                return Err(JoseError::MissingPrivateKey);
            };
            let epk = header
                .essential()
                .epk
                .as_ref()
                .ok_or(JoseError::InvalidHeaderValue { key: "epk" })?;
            let (epk_curve, epk) = epk.ec_point()?;
            if epk_curve != *curve {
                return Err(JoseError::InvalidHeaderValue { key: "epk" });
            }
            let (algorithm_id, key_len) = ecdh_kdf_target(alg, header.encryption(), cek_size)?;
            DecrypterKind::EcdhEs {
                key,
                curve: *curve,
                epk,
                algorithm_id,
                apu: header.essential().apu.clone(),
                apv: header.essential().apv.clone(),
                key_len,
                wrapped: alg != JWEKeyAlgorithm::EcdhEs,
            }
        }
        JWEKeyAlgorithm::Rsa1v5
        | JWEKeyAlgorithm::A192KW
        | JWEKeyAlgorithm::EcdhEsA192KW
        | JWEKeyAlgorithm::A128GCMKW
        | JWEKeyAlgorithm::A192GCMKW
        | JWEKeyAlgorithm::A256GCMKW
        | JWEKeyAlgorithm::Pbes2HS256A128KW
        | JWEKeyAlgorithm::Pbes2HS384A192KW
        | JWEKeyAlgorithm::Pbes2HS512A256KW => {
            return Err(JoseError::UnsupportedAlgorithm(alg.to_string()));
        }
    };
    Ok(KeyDecrypter { alg, kind })
}

impl KeyDecrypter<'_> {
    /// Key management algorithm of this decrypter
    pub fn algorithm(&self) -> JWEKeyAlgorithm {
        self.alg
    }

    /// Recover the CEK from the `encrypted_key` of a recipient
    pub fn key_decrypt(&self, encrypted_key: &[u8]) -> Result<Vec<u8>, JoseError> {
        match &self.kind {
            DecrypterKind::Direct { cek } => {
                if !encrypted_key.is_empty() {
                    return Err(JoseError::malformed("direct encryption requires an empty encrypted key"));
                }
                Ok(cek.to_vec())
            }
            DecrypterKind::AesKeyWrap { kek } => aes_unwrap(kek, encrypted_key),
            DecrypterKind::RsaOaep { algorithm, key } => {
                let mut output = vec![0; key.min_output_size()];
                let cek = key
                    .decrypt(*algorithm, encrypted_key, &mut output, None)
                    .context("rsa oaep decrypt")?;
                Ok(cek.to_vec())
            }
            DecrypterKind::EcdhEs {
                key,
                curve,
                epk,
                algorithm_id,
                apu,
                apv,
                key_len,
                wrapped,
            } => {
                let peer = agreement::UnparsedPublicKey::new(agreement_algorithm(*curve), epk);
                let kdf = ConcatKdf {
                    algorithm_id: *algorithm_id,
                    apu,
                    apv,
                    key_len: *key_len,
                };
                let derived = agreement::agree(
                    key,
                    &peer,
                    JoseError::malformed("ecdh key agreement failed"),
                    |shared_secret| kdf.derive(shared_secret),
                )?;
                if *wrapped {
                    aes_unwrap(&derived, encrypted_key)
                } else if encrypted_key.is_empty() {
                    Ok(derived)
                } else {
                    Err(JoseError::malformed("direct key agreement requires an empty encrypted key"))
                }
            }
        }
    }
}

/// Output of a [`KeyEncrypter`] for a single recipient
pub(super) struct EncryptedKey {
    pub(super) cek: Vec<u8>,
    pub(super) encrypted_key: Vec<u8>,
    /// Algorithm parameters to be carried by the recipient (e.g. `epk`)
    pub(super) header: JWEHeader,
}

/// Encrypts (or agrees on) the CEK for a single JWE recipient
///
/// The counterpart of [`KeyDecrypter`], supporting the same algorithms.
pub struct KeyEncrypter {
    alg: JWEKeyAlgorithm,
    kind: EncrypterKind,
    header: JWEHeader,
}

enum EncrypterKind {
    Direct {
        cek: Vec<u8>,
    },
    AesKeyWrap {
        kek: Vec<u8>,
    },
    RsaOaep {
        algorithm: &'static OaepAlgorithm,
        key: OaepPublicEncryptingKey,
    },
    EcdhEs {
        curve: JWKEllipticCurves,
        public_point: Vec<u8>,
        apu: Vec<u8>,
        apv: Vec<u8>,
    },
}

impl std::fmt::Debug for KeyEncrypter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyEncrypter")
            .field("alg", &self.alg)
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}

impl KeyEncrypter {
    fn new(alg: JWEKeyAlgorithm, kind: EncrypterKind) -> Self {
        Self {
            alg,
            kind,
            header: JWEHeader::new().with_algorithm(alg),
        }
    }

    /// Use the shared symmetric `key` directly as CEK (`dir`)
    pub fn direct(key: impl Into<Vec<u8>>) -> Self {
        Self::new(JWEKeyAlgorithm::Direct, EncrypterKind::Direct { cek: key.into() })
    }

    /// Wrap the CEK using AES key wrap (`A128KW` or `A256KW`)
    pub fn aes_key_wrap(alg: JWEKeyAlgorithm, kek: impl Into<Vec<u8>>) -> Result<Self, JoseError> {
        let kek = kek.into();
        match key_wrap_size(alg) {
            Some(size) if matches!(alg, JWEKeyAlgorithm::A128KW | JWEKeyAlgorithm::A256KW) => {
                if kek.len() != size {
                    return Err(JoseError::malformed("key encryption key has invalid size"));
                }
                Ok(Self::new(alg, EncrypterKind::AesKeyWrap { kek }))
            }
            _ => Err(JoseError::UnsupportedAlgorithm(alg.to_string())),
        }
    }

    /// Encrypt the CEK using RSA-OAEP (`RSA-OAEP` or `RSA-OAEP-256`)
    pub fn rsa_oaep(alg: JWEKeyAlgorithm, key: PublicEncryptingKey) -> Result<Self, JoseError> {
        let algorithm =
            oaep_algorithm(alg).ok_or_else(|| JoseError::UnsupportedAlgorithm(alg.to_string()))?;
        let key = OaepPublicEncryptingKey::new(key).context("create rsa oaep encrypting key")?;
        Ok(Self::new(alg, EncrypterKind::RsaOaep { algorithm, key }))
    }

    /// Encrypt the CEK using RSA-OAEP, for the public key of an RSA [`JWK`]
    pub fn rsa_oaep_from_jwk(alg: JWEKeyAlgorithm, jwk: &JWK) -> Result<Self, JoseError> {
        Self::rsa_oaep(alg, jwk.rsa_public_encrypting_key()?)
    }

    /// Agree on the CEK (or its wrapping key) with the EC public key
    /// of the recipient (`ECDH-ES`, `ECDH-ES+A128KW` or `ECDH-ES+A256KW`)
    pub fn ecdh_es(alg: JWEKeyAlgorithm, jwk: &JWK) -> Result<Self, JoseError> {
        if !matches!(
            alg,
            JWEKeyAlgorithm::EcdhEs | JWEKeyAlgorithm::EcdhEsA128KW | JWEKeyAlgorithm::EcdhEsA256KW
        ) {
            return Err(JoseError::UnsupportedAlgorithm(alg.to_string()));
        }
        let (curve, public_point) = jwk.ec_point().map_err(|_err| JoseError::MissingPublicKey)?;
        Ok(Self::new(
            alg,
            EncrypterKind::EcdhEs {
                curve,
                public_point,
                apu: Vec::new(),
                apv: Vec::new(),
            },
        ))
    }

    generate_set_and_with! {
        /// Agreement party infos (`apu`, `apv`) fed into the ECDH-ES key derivation,
        /// ignored by other algorithms.
        pub fn agreement_party_info(mut self, apu: Vec<u8>, apv: Vec<u8>) -> Self {
            if let EncrypterKind::EcdhEs {
                apu: kind_apu,
                apv: kind_apv,
                ..
            } = &mut self.kind
            {
                kind_apu.clone_from(&apu);
                kind_apv.clone_from(&apv);
                self.header.set_agreement_party_info(apu, apv);
            }
            self
        }
    }

    generate_set_and_with! {
        /// Set the key id (`kid`) of the recipient
        pub fn key_id(mut self, kid: Option<String>) -> Self {
            self.header.maybe_set_key_id(kid);
            self
        }
    }

    /// Key management algorithm of this encrypter
    pub fn algorithm(&self) -> JWEKeyAlgorithm {
        self.alg
    }

    /// True if this encrypter determines the CEK itself (`dir` and `ECDH-ES`),
    /// only possible for messages with a single recipient.
    pub fn determines_cek(&self) -> bool {
        matches!(self.alg, JWEKeyAlgorithm::Direct | JWEKeyAlgorithm::EcdhEs)
    }

    /// Produce the encrypted key of this recipient for the shared `cek`,
    /// or determine the CEK itself when [`Self::determines_cek`].
    pub(super) fn encrypt_key(
        &self,
        enc: JWEEncryption,
        cek_size: usize,
        cek: Option<&[u8]>,
    ) -> Result<EncryptedKey, JoseError> {
        let shared_cek = || cek.ok_or_else(|| JoseError::malformed("missing content encryption key"));
        let mut header = self.header.clone();

        let (cek, encrypted_key) = match &self.kind {
            EncrypterKind::Direct { cek } => {
                if cek.len() != cek_size {
                    return Err(JoseError::malformed("direct key does not match content cipher key size"));
                }
                (cek.clone(), Vec::new())
            }
            EncrypterKind::AesKeyWrap { kek } => {
                let cek = shared_cek()?;
                (cek.to_vec(), aes_wrap(kek, cek)?)
            }
            EncrypterKind::RsaOaep { algorithm, key } => {
                let cek = shared_cek()?;
                let mut output = vec![0; key.ciphertext_size()];
                let encrypted = key
                    .encrypt(*algorithm, cek, &mut output, None)
                    .context("rsa oaep encrypt")?;
                (cek.to_vec(), encrypted.to_vec())
            }
            EncrypterKind::EcdhEs {
                curve,
                public_point,
                apu,
                apv,
            } => {
                let ephemeral = agreement::PrivateKey::generate(agreement_algorithm(*curve))
                    .context("generate ephemeral ec key")?;
                let epk_point = ephemeral
                    .compute_public_key()
                    .context("compute ephemeral ec public key")?;
                header.try_set(
                    "epk",
                    JWK::new_ec_public_key(*curve, epk_point.as_ref())?,
                )?;

                let (algorithm_id, key_len) = ecdh_kdf_target(self.alg, Some(enc), cek_size)?;
                let kdf = ConcatKdf {
                    algorithm_id,
                    apu,
                    apv,
                    key_len,
                };
                let peer = agreement::UnparsedPublicKey::new(agreement_algorithm(*curve), public_point);
                let derived = agreement::agree(
                    &ephemeral,
                    &peer,
                    JoseError::malformed("ecdh key agreement failed"),
                    |shared_secret| kdf.derive(shared_secret),
                )?;

                if self.determines_cek() {
                    (derived, Vec::new())
                } else {
                    let cek = shared_cek()?;
                    (cek.to_vec(), aes_wrap(&derived, cek)?)
                }
            }
        };

        Ok(EncryptedKey {
            cek,
            encrypted_key,
            header,
        })
    }
}

/// Generate a random key of `size` bytes, used for CEKs and IVs
pub(super) fn random_bytes(size: usize) -> Result<Vec<u8>, JoseError> {
    let mut bytes = vec![0; size];
    SystemRandom::new()
        .fill(&mut bytes)
        .context("generate random bytes")?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use aws_lc_rs::rsa::KeySize;
    use tokio_test::assert_err;

    use super::*;
    use crate::encoding::b64_decode;

    fn header(alg: JWEKeyAlgorithm) -> JWEHeader {
        JWEHeader::new()
            .with_algorithm(alg)
            .with_encryption(JWEEncryption::A128CbcHS256)
    }

    #[test]
    fn aes_key_unwrap_rfc7516_appendix_a3() {
        let kek = b64_decode("GawgguFyGrWKav7AX4VKUg", "kek").unwrap();
        let encrypted_key = b64_decode(
            "6KB707dM9YTIgHtLvtgWQ8mKwboJW3of9locizkDTHzBC2IlrT1oOQ",
            "encrypted key",
        )
        .unwrap();
        let key = JWEKey::symmetric(kek);

        let decrypter =
            build_key_decrypter(JWEKeyAlgorithm::A128KW, &header(JWEKeyAlgorithm::A128KW), &key, 32)
                .unwrap();
        let cek = decrypter.key_decrypt(&encrypted_key).unwrap();
        assert_eq!(
            cek,
            [
                4, 211, 31, 197, 84, 157, 252, 254, 11, 100, 157, 250, 63, 170, 106, 206, 107,
                124, 212, 45, 111, 107, 9, 219, 200, 177, 0, 240, 143, 156, 44, 207,
            ]
        );

        let mut tampered = encrypted_key;
        tampered[3] ^= 1;
        assert_err!(decrypter.key_decrypt(&tampered));
        assert_err!(decrypter.key_decrypt(&[0; 12]));
    }

    #[test]
    fn concat_kdf_rfc7518_appendix_c() {
        // rfc7518, appendix C: ECDH-ES for A128GCM, "Alice" and "Bob"
        let shared_secret = [
            158, 86, 217, 29, 129, 113, 53, 211, 114, 131, 66, 131, 191, 132, 38, 156, 251, 49,
            110, 163, 218, 128, 106, 72, 246, 218, 167, 121, 140, 254, 144, 196,
        ];
        let kdf = ConcatKdf {
            algorithm_id: "A128GCM",
            apu: b"Alice",
            apv: b"Bob",
            key_len: 16,
        };
        assert_eq!(
            kdf.derive(&shared_secret).unwrap(),
            b64_decode("VqqN6vgjbSBcIijNcacQGg", "derived key").unwrap()
        );
    }

    #[test]
    fn key_of_wrong_kind_is_missing_private_key() {
        let symmetric = JWEKey::symmetric(vec![0; 16]);
        let ec = JWEKey::generate_ec(JWKEllipticCurves::P256).unwrap();

        for (alg, key) in [
            (JWEKeyAlgorithm::Direct, &ec),
            (JWEKeyAlgorithm::A128KW, &ec),
            (JWEKeyAlgorithm::RsaOaep, &symmetric),
            (JWEKeyAlgorithm::EcdhEs, &symmetric),
        ] {
            assert!(matches!(
                build_key_decrypter(alg, &header(alg), key, 32),
                Err(JoseError::MissingPrivateKey)
            ));
        }
    }

    #[test]
    fn unimplemented_algorithms_are_unsupported() {
        let key = JWEKey::symmetric(vec![0; 32]);
        for alg in [
            JWEKeyAlgorithm::Rsa1v5,
            JWEKeyAlgorithm::A192KW,
            JWEKeyAlgorithm::A256GCMKW,
            JWEKeyAlgorithm::Pbes2HS256A128KW,
        ] {
            assert!(matches!(
                build_key_decrypter(alg, &header(alg), &key, 32),
                Err(JoseError::UnsupportedAlgorithm(id)) if id == alg.as_str()
            ));
        }
        assert_err!(KeyEncrypter::aes_key_wrap(JWEKeyAlgorithm::A192KW, vec![0; 24]));
        assert_err!(KeyEncrypter::aes_key_wrap(JWEKeyAlgorithm::EcdhEsA128KW, vec![0; 16]));
    }

    #[test]
    fn direct_requires_empty_encrypted_key() {
        let key = JWEKey::symmetric(vec![1; 32]);
        let decrypter =
            build_key_decrypter(JWEKeyAlgorithm::Direct, &header(JWEKeyAlgorithm::Direct), &key, 32)
                .unwrap();
        assert_eq!(decrypter.key_decrypt(&[]).unwrap(), vec![1; 32]);
        assert_err!(decrypter.key_decrypt(&[1]));

        assert_err!(build_key_decrypter(
            JWEKeyAlgorithm::Direct,
            &header(JWEKeyAlgorithm::Direct),
            &key,
            16
        ));
    }

    #[test]
    fn aes_key_wrap_round_trip() {
        let cek = random_bytes(64).unwrap();
        let encrypter = KeyEncrypter::aes_key_wrap(JWEKeyAlgorithm::A256KW, vec![9; 32]).unwrap();
        let encrypted = encrypter
            .encrypt_key(JWEEncryption::A256CbcHS512, 64, Some(&cek))
            .unwrap();
        assert_eq!(encrypted.cek, cek);
        assert_eq!(encrypted.encrypted_key.len(), 72);
        assert_eq!(encrypted.header.algorithm(), Some(JWEKeyAlgorithm::A256KW));

        let key = JWEKey::symmetric(vec![9; 32]);
        let decrypter =
            build_key_decrypter(JWEKeyAlgorithm::A256KW, &encrypted.header, &key, 64).unwrap();
        assert_eq!(decrypter.key_decrypt(&encrypted.encrypted_key).unwrap(), cek);

        let wrong = JWEKey::symmetric(vec![8; 32]);
        let decrypter =
            build_key_decrypter(JWEKeyAlgorithm::A256KW, &encrypted.header, &wrong, 64).unwrap();
        assert_err!(decrypter.key_decrypt(&encrypted.encrypted_key));
    }

    #[test]
    fn rsa_oaep_round_trip() {
        let private = PrivateDecryptingKey::generate(KeySize::Rsa2048).unwrap();
        let encrypters = [JWEKeyAlgorithm::RsaOaep, JWEKeyAlgorithm::RsaOaep256]
            .map(|alg| KeyEncrypter::rsa_oaep(alg, private.public_key()).unwrap());
        let key = JWEKey::rsa_oaep(private).unwrap();
        let cek = random_bytes(16).unwrap();

        for encrypter in encrypters {
            let encrypted = encrypter
                .encrypt_key(JWEEncryption::A128GCM, 16, Some(&cek))
                .unwrap();
            assert_eq!(encrypted.encrypted_key.len(), 256);

            let decrypter =
                build_key_decrypter(encrypter.algorithm(), &encrypted.header, &key, 16).unwrap();
            assert_eq!(decrypter.key_decrypt(&encrypted.encrypted_key).unwrap(), cek);
        }

        let other = KeyEncrypter::rsa_oaep(
            JWEKeyAlgorithm::RsaOaep,
            PrivateDecryptingKey::generate(KeySize::Rsa2048)
                .unwrap()
                .public_key(),
        )
        .unwrap()
        .encrypt_key(JWEEncryption::A128GCM, 16, Some(&cek))
        .unwrap();
        let decrypter =
            build_key_decrypter(JWEKeyAlgorithm::RsaOaep, &other.header, &key, 16).unwrap();
        assert_err!(decrypter.key_decrypt(&other.encrypted_key));
    }

    #[test]
    fn ecdh_es_agrees_on_cek() {
        for curve in [
            JWKEllipticCurves::P256,
            JWKEllipticCurves::P384,
            JWKEllipticCurves::P521,
        ] {
            let key = JWEKey::generate_ec(curve).unwrap();
            let jwk = key.public_jwk().unwrap().unwrap();
            let encrypter = KeyEncrypter::ecdh_es(JWEKeyAlgorithm::EcdhEs, &jwk)
                .unwrap()
                .with_agreement_party_info(b"Alice".to_vec(), b"Bob".to_vec());
            assert!(encrypter.determines_cek());

            let encrypted = encrypter
                .encrypt_key(JWEEncryption::A256GCM, 32, None)
                .unwrap();
            assert_eq!(encrypted.cek.len(), 32);
            assert!(encrypted.encrypted_key.is_empty());
            assert!(encrypted.header.essential().epk.is_some());

            let header = encrypted.header.clone().with_encryption(JWEEncryption::A256GCM);
            let decrypter =
                build_key_decrypter(JWEKeyAlgorithm::EcdhEs, &header, &key, 32).unwrap();
            assert_eq!(decrypter.key_decrypt(&[]).unwrap(), encrypted.cek);

            // party info is part of the derivation
            let other = header.with_agreement_party_info(b"Mallory".to_vec(), b"Bob".to_vec());
            let decrypter = build_key_decrypter(JWEKeyAlgorithm::EcdhEs, &other, &key, 32).unwrap();
            assert_ne!(decrypter.key_decrypt(&[]).unwrap(), encrypted.cek);
        }
    }

    #[test]
    fn ecdh_es_key_wrap_round_trip() {
        let key = JWEKey::generate_ec(JWKEllipticCurves::P384).unwrap();
        let jwk = key.public_jwk().unwrap().unwrap();
        let encrypter = KeyEncrypter::ecdh_es(JWEKeyAlgorithm::EcdhEsA128KW, &jwk).unwrap();
        assert!(!encrypter.determines_cek());

        let cek = random_bytes(32).unwrap();
        let encrypted = encrypter
            .encrypt_key(JWEEncryption::A128CbcHS256, 32, Some(&cek))
            .unwrap();
        assert_eq!(encrypted.encrypted_key.len(), 40);

        let decrypter =
            build_key_decrypter(JWEKeyAlgorithm::EcdhEsA128KW, &encrypted.header, &key, 32)
                .unwrap();
        assert_eq!(decrypter.key_decrypt(&encrypted.encrypted_key).unwrap(), cek);

        let other_curve = JWEKey::generate_ec(JWKEllipticCurves::P256).unwrap();
        assert!(matches!(
            build_key_decrypter(JWEKeyAlgorithm::EcdhEsA128KW, &encrypted.header, &other_curve, 32),
            Err(JoseError::InvalidHeaderValue { key: "epk" })
        ));
    }
}
