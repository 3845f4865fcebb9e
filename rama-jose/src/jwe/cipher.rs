use aws_lc_rs::{
    aead::{AES_128_GCM, AES_256_GCM, Aad, LessSafeKey, Nonce, UnboundKey},
    cipher::{
        AES_128, AES_256, DecryptionContext, EncryptionContext, PaddedBlockDecryptingKey,
        PaddedBlockEncryptingKey, UnboundCipherKey,
    },
    constant_time, hmac,
    iv::FixedLength,
};

use crate::{JWEEncryption, JoseError, error::ErrorContext as _};

const GCM_IV_LEN: usize = 12;
const GCM_TAG_LEN: usize = 16;
const CBC_IV_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Content encryption algorithm of a JWE, resolved from its `enc` identifier
/// using [`build_content_cipher`]
pub enum ContentCipher {
    /// AES GCM ([`rfc7518, section 5.3`])
    ///
    /// [`rfc7518, section 5.3`]: https://datatracker.ietf.org/doc/html/rfc7518#section-5.3
    AesGcm {
        /// Key size in bytes
        key_size: usize,
    },
    /// AES CBC with HMAC SHA-2 ([`rfc7518, section 5.2`])
    ///
    /// [`rfc7518, section 5.2`]: https://datatracker.ietf.org/doc/html/rfc7518#section-5.2
    AesCbcHmac {
        /// Key size in bytes, the MAC key and encryption key combined
        key_size: usize,
    },
}

/// Resolve the [`ContentCipher`] for `enc`
pub fn build_content_cipher(enc: JWEEncryption) -> Result<ContentCipher, JoseError> {
    match enc {
        JWEEncryption::A128GCM => Ok(ContentCipher::AesGcm { key_size: 16 }),
        JWEEncryption::A256GCM => Ok(ContentCipher::AesGcm { key_size: 32 }),
        JWEEncryption::A128CbcHS256 => Ok(ContentCipher::AesCbcHmac { key_size: 32 }),
        JWEEncryption::A256CbcHS512 => Ok(ContentCipher::AesCbcHmac { key_size: 64 }),
        JWEEncryption::A192GCM | JWEEncryption::A192CbcHS384 => {
            Err(JoseError::UnsupportedContentCipher(enc.to_string()))
        }
    }
}

impl ContentCipher {
    /// Size in bytes of the content encryption key (CEK)
    pub fn key_size(&self) -> usize {
        match self {
            Self::AesGcm { key_size } | Self::AesCbcHmac { key_size } => *key_size,
        }
    }

    /// Size in bytes of the initialization vector
    pub fn iv_size(&self) -> usize {
        match self {
            Self::AesGcm { .. } => GCM_IV_LEN,
            Self::AesCbcHmac { .. } => CBC_IV_LEN,
        }
    }

    fn check_key(&self, cek: &[u8]) -> Result<(), JoseError> {
        if cek.len() == self.key_size() {
            Ok(())
        } else {
            Err(JoseError::malformed("content encryption key has invalid size"))
        }
    }

    /// Encrypt `plaintext`, returning the ciphertext and authentication tag
    pub fn encrypt(
        &self,
        cek: &[u8],
        iv: &[u8],
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), JoseError> {
        self.check_key(cek)?;
        match self {
            Self::AesGcm { .. } => {
                let key = gcm_key(cek)?;
                let nonce = Nonce::try_assume_unique_for_key(iv).context("create aes gcm nonce")?;
                let mut in_out = plaintext.to_vec();
                let tag = key
                    .seal_in_place_separate_tag(nonce, Aad::from(aad), &mut in_out)
                    .context("aes gcm seal")?;
                Ok((in_out, tag.as_ref().to_vec()))
            }
            Self::AesCbcHmac { key_size } => {
                let (mac_key, enc_key) = cek.split_at(key_size / 2);
                let iv = cbc_iv(iv)?;
                let key = PaddedBlockEncryptingKey::cbc_pkcs7(cbc_key(enc_key)?)
                    .context("create aes cbc encrypting key")?;
                let mut in_out = plaintext.to_vec();
                key.less_safe_encrypt(&mut in_out, EncryptionContext::Iv128(FixedLength::from(iv)))
                    .context("aes cbc encrypt")?;
                let tag = cbc_hmac_tag(mac_key, aad, &iv, &in_out)?;
                Ok((in_out, tag))
            }
        }
    }

    /// Authenticate and decrypt `ciphertext`, returning the plaintext
    pub fn decrypt(
        &self,
        cek: &[u8],
        iv: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, JoseError> {
        self.check_key(cek)?;
        match self {
            Self::AesGcm { .. } => {
                if tag.len() != GCM_TAG_LEN {
                    return Err(JoseError::malformed("aes gcm tag has invalid size"));
                }
                let key = gcm_key(cek)?;
                let nonce = Nonce::try_assume_unique_for_key(iv).context("create aes gcm nonce")?;
                let mut in_out = Vec::with_capacity(ciphertext.len() + tag.len());
                in_out.extend_from_slice(ciphertext);
                in_out.extend_from_slice(tag);
                let plaintext = key
                    .open_in_place(nonce, Aad::from(aad), &mut in_out)
                    .context("aes gcm open")?;
                Ok(plaintext.to_vec())
            }
            Self::AesCbcHmac { key_size } => {
                let (mac_key, enc_key) = cek.split_at(key_size / 2);
                let iv = cbc_iv(iv)?;
                // authenticate before decrypting anything
                let expected = cbc_hmac_tag(mac_key, aad, &iv, ciphertext)?;
                constant_time::verify_slices_are_equal(&expected, tag)
                    .context("aes cbc hmac tag mismatch")?;

                let key = PaddedBlockDecryptingKey::cbc_pkcs7(cbc_key(enc_key)?)
                    .context("create aes cbc decrypting key")?;
                let mut in_out = ciphertext.to_vec();
                let plaintext = key
                    .decrypt(&mut in_out, DecryptionContext::Iv128(FixedLength::from(iv)))
                    .context("aes cbc decrypt")?;
                Ok(plaintext.to_vec())
            }
        }
    }
}

fn gcm_key(cek: &[u8]) -> Result<LessSafeKey, JoseError> {
    let alg = match cek.len() {
        16 => &AES_128_GCM,
        32 => &AES_256_GCM,
        _ => return Err(JoseError::malformed("aes gcm key has invalid size")),
    };
    let key = UnboundKey::new(alg, cek).context("create aes gcm key")?;
    Ok(LessSafeKey::new(key))
}

fn cbc_key(enc_key: &[u8]) -> Result<UnboundCipherKey, JoseError> {
    let alg = match enc_key.len() {
        16 => &AES_128,
        32 => &AES_256,
        _ => return Err(JoseError::malformed("aes cbc key has invalid size")),
    };
    Ok(UnboundCipherKey::new(alg, enc_key).context("create aes cbc key")?)
}

fn cbc_iv(iv: &[u8]) -> Result<[u8; CBC_IV_LEN], JoseError> {
    Ok(iv.try_into().context("aes cbc iv has to be 16 bytes")?)
}

/// `HMAC(mac_key, aad || iv || ciphertext || AL)` truncated to the size of the MAC key,
/// where `AL` is the bit length of `aad` as a 64-bit big-endian integer.
fn cbc_hmac_tag(mac_key: &[u8], aad: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, JoseError> {
    let alg = match mac_key.len() {
        16 => hmac::HMAC_SHA256,
        32 => hmac::HMAC_SHA512,
        _ => return Err(JoseError::malformed("aes cbc hmac key has invalid size")),
    };
    let aad_bits = u64::try_from(aad.len())
        .ok()
        .and_then(|len| len.checked_mul(8))
        .ok_or_else(|| JoseError::malformed("aad too large"))?;

    let key = hmac::Key::new(alg, mac_key);
    let mut ctx = hmac::Context::with_key(&key);
    ctx.update(aad);
    ctx.update(iv);
    ctx.update(ciphertext);
    ctx.update(&aad_bits.to_be_bytes());
    let tag = ctx.sign();
    Ok(tag.as_ref()[..mac_key.len()].to_vec())
}
