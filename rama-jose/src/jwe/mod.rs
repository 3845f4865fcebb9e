//! JSON Web Encryption (JWE), as defined in [`rfc7516`]
//!
//! A [`Message`] carries a ciphertext encrypted with a content encryption key (CEK),
//! and one or more [`Recipient`]s each holding that CEK encrypted for their own key.
//! Messages are produced using an [`Encrypter`] and opened using [`Message::decrypt`],
//! which tries the recipients in order until one of them yields a valid plaintext.
//!
//! [`rfc7516`]: https://datatracker.ietf.org/doc/html/rfc7516

use serde::{Deserialize, Serialize};

use crate::{
    JWEKeyAlgorithm, JoseError,
    encoding::{b64_bytes, b64_encode},
    header::{EncodedHeader, JWEEssentialHeader, JWEHeader},
    macros::generate_set_and_with,
};

mod cipher;
pub use cipher::{ContentCipher, build_content_cipher};

mod key;
pub use key::{JWEKey, KeyDecrypter, KeyEncrypter, build_key_decrypter};

mod compress;
pub use compress::DEFAULT_MAX_DECOMPRESSED_SIZE;

mod encrypt;
pub use encrypt::Encrypter;

mod serialize;
pub use serialize::{CompactSerialize, JSONSerialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Single recipient of a JWE [`Message`]
pub struct Recipient {
    #[serde(default, skip_serializing_if = "JWEHeader::is_empty")]
    header: JWEHeader,
    #[serde(default, with = "b64_bytes", skip_serializing_if = "Vec::is_empty")]
    encrypted_key: Vec<u8>,
}

impl Recipient {
    /// Create a new [`Recipient`] from its header and encrypted CEK
    #[must_use]
    pub fn new(header: JWEHeader, encrypted_key: Vec<u8>) -> Self {
        Self {
            header,
            encrypted_key,
        }
    }

    /// Per-recipient (unprotected) header
    pub fn header(&self) -> &JWEHeader {
        &self.header
    }

    /// Encrypted CEK, empty for `dir` and `ECDH-ES`
    pub fn encrypted_key(&self) -> &[u8] {
        &self.encrypted_key
    }
}

#[derive(Debug, Clone)]
/// Options used by [`Message::decrypt_with`]
pub struct DecryptOptions {
    max_decompressed_size: usize,
}

impl Default for DecryptOptions {
    fn default() -> Self {
        Self {
            max_decompressed_size: DEFAULT_MAX_DECOMPRESSED_SIZE,
        }
    }
}

impl DecryptOptions {
    /// Create new [`DecryptOptions`] with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    generate_set_and_with! {
        /// Upper bound for the size of a decompressed plaintext,
        /// [`DEFAULT_MAX_DECOMPRESSED_SIZE`] by default
        pub fn max_decompressed_size(mut self, size: usize) -> Self {
            self.max_decompressed_size = size;
            self
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// JWE message: an encrypted payload with one or more recipients
pub struct Message {
    #[serde(default, skip_serializing_if = "EncodedHeader::is_empty")]
    protected: EncodedHeader<JWEEssentialHeader>,
    #[serde(default, skip_serializing_if = "JWEHeader::is_empty")]
    unprotected: JWEHeader,
    recipients: Vec<Recipient>,
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
    /// Protected header, shared by all recipients and integrity protected
    pub fn protected_header(&self) -> &EncodedHeader<JWEEssentialHeader> {
        &self.protected
    }

    /// Shared unprotected header
    pub fn unprotected_header(&self) -> &JWEHeader {
        &self.unprotected
    }

    /// Additional authenticated data (the JWE AAD), empty if absent
    pub fn aad(&self) -> &[u8] {
        &self.aad
    }

    /// Initialization vector of the content encryption
    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    /// Encrypted payload
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Authentication tag of the content encryption
    pub fn tag(&self) -> &[u8] {
        &self.tag
    }

    /// All recipients, in order
    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
    }

    /// Mutable access to the recipients, e.g. to add recipients sharing the CEK
    pub fn recipients_mut(&mut self) -> &mut Vec<Recipient> {
        &mut self.recipients
    }

    /// All recipients of which the effective key id equals `kid`
    pub fn lookup_recipient(&self, kid: &str) -> Vec<&Recipient> {
        let base = self.base_header();
        self.recipients
            .iter()
            .filter(|recipient| base.merge(&recipient.header).key_id() == Some(kid))
            .collect()
    }

    /// Header shared by all recipients: the protected header merged with the unprotected one
    pub fn base_header(&self) -> JWEHeader {
        self.protected.header().merge(&self.unprotected)
    }

    /// Effective header of a recipient: the base header merged with the recipient header
    pub fn recipient_header(&self, recipient: &Recipient) -> JWEHeader {
        self.base_header().merge(&recipient.header)
    }

    /// Additional authenticated data of the content encryption:
    /// `ASCII(BASE64URL(protected))`, followed by `'.' || BASE64URL(aad)` when the
    /// message carries AAD ([`rfc7516, section 5.1`]).
    ///
    /// The protected header is encoded using its source octets when it was parsed.
    ///
    /// [`rfc7516, section 5.1`]: https://datatracker.ietf.org/doc/html/rfc7516#section-5.1
    pub fn authenticated_data(&self) -> Result<Vec<u8>, JoseError> {
        let mut aad = self.protected.encode()?;
        if !self.aad.is_empty() {
            aad.push('.');
            aad.push_str(&b64_encode(&self.aad));
        }
        Ok(aad.into_bytes())
    }

    /// Decrypt this message for the recipient(s) using `alg`, with the given key
    /// and default [`DecryptOptions`].
    pub fn decrypt(&self, alg: JWEKeyAlgorithm, key: &JWEKey) -> Result<Vec<u8>, JoseError> {
        self.decrypt_with(alg, key, &DecryptOptions::default())
    }

    /// Decrypt this message for the recipient(s) using `alg`, with the given key.
    ///
    /// Recipients of which the effective algorithm is not `alg` are skipped.
    /// The others are tried in order, where the first one of which the recovered
    /// CEK decrypts the content wins. Failures of individual recipients are not
    /// reported: if none succeeds the result is a [`JoseError::DecryptionFailed`].
    ///
    /// The plaintext is inflated if the protected header carries a `zip` parameter.
    /// A `zip` found in an unprotected or recipient header is ignored.
    pub fn decrypt_with(
        &self,
        alg: JWEKeyAlgorithm,
        key: &JWEKey,
        options: &DecryptOptions,
    ) -> Result<Vec<u8>, JoseError> {
        if self.recipients.is_empty() {
            return Err(JoseError::NoRecipients);
        }

        let base = self.base_header();
        let aad = self.authenticated_data()?;
        let enc = base
            .encryption()
            .ok_or_else(|| JoseError::UnsupportedContentCipher(String::new()))?;
        let cipher = build_content_cipher(enc)?;

        let mut decrypted = None;
        for (index, recipient) in self.recipients.iter().enumerate() {
            let header = base.merge(&recipient.header);
            if header.algorithm() != Some(alg) {
                tracing::trace!("jwe recipient #{index}: algorithm does not match {alg}, skip");
                continue;
            }

            let cek = match build_key_decrypter(alg, &header, key, cipher.key_size())
                .and_then(|decrypter| decrypter.key_decrypt(&recipient.encrypted_key))
            {
                Ok(cek) => cek,
                Err(err) => {
                    tracing::debug!("jwe recipient #{index}: failed to decrypt cek: {err}");
                    continue;
                }
            };

            match cipher.decrypt(&cek, &self.iv, &self.ciphertext, &self.tag, &aad) {
                Ok(plaintext) => {
                    tracing::trace!("jwe recipient #{index}: content decrypted using {enc}");
                    decrypted = Some(plaintext);
                    break;
                }
                Err(err) => {
                    tracing::debug!("jwe recipient #{index}: failed to decrypt content: {err}");
                }
            }
        }

        let Some(plaintext) = decrypted else {
            return Err(JoseError::DecryptionFailed);
        };
        // zip is only honoured when integrity protected
        match self.protected.header().compression() {
            Some(zip) => compress::decompress(zip, &plaintext, options.max_decompressed_size),
            None => Ok(plaintext),
        }
    }
}
