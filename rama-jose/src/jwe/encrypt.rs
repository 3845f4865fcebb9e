use super::{
    Message, Recipient, build_content_cipher, compress,
    key::{KeyEncrypter, random_bytes},
};
use crate::{
    JWECompression, JWEEncryption, JoseError,
    encoding::b64_encode,
    header::{EncodedHeader, JWEHeader},
    macros::generate_set_and_with,
};

#[derive(Debug)]
/// Builder of JWE [`Message`]s, encrypting a plaintext for one or more recipients.
///
/// The `enc` and `zip` parameters are placed in the protected header.
/// With a single recipient its key management parameters are placed there as well,
/// so the resulting message can be compact serialized; with multiple recipients
/// they end up in the per-recipient headers.
pub struct Encrypter {
    enc: JWEEncryption,
    zip: Option<JWECompression>,
    protected: JWEHeader,
    unprotected: JWEHeader,
    aad: Vec<u8>,
    recipients: Vec<KeyEncrypter>,
}

impl Encrypter {
    /// Create a new [`Encrypter`] using the given content encryption algorithm
    #[must_use]
    pub fn new(enc: JWEEncryption) -> Self {
        Self {
            enc,
            zip: None,
            protected: JWEHeader::new(),
            unprotected: JWEHeader::new(),
            aad: Vec::new(),
            recipients: Vec::new(),
        }
    }

    generate_set_and_with! {
        /// Compress the plaintext prior to encryption
        pub fn compression(mut self, zip: Option<JWECompression>) -> Self {
            self.zip = zip;
            self
        }
    }

    generate_set_and_with! {
        /// Additional parameters for the protected header
        pub fn protected_header(mut self, header: JWEHeader) -> Self {
            self.protected = header;
            self
        }
    }

    generate_set_and_with! {
        /// Shared unprotected header
        pub fn unprotected_header(mut self, header: JWEHeader) -> Self {
            self.unprotected = header;
            self
        }
    }

    generate_set_and_with! {
        /// Additional authenticated data, carried in the clear as the JWE AAD
        pub fn aad(mut self, aad: Vec<u8>) -> Self {
            self.aad = aad;
            self
        }
    }

    generate_set_and_with! {
        /// Add a recipient
        pub fn recipient(mut self, recipient: KeyEncrypter) -> Self {
            self.recipients.push(recipient);
            self
        }
    }

    /// Encrypt `plaintext` for all recipients
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Message, JoseError> {
        if self.recipients.is_empty() {
            return Err(JoseError::NoRecipients);
        }
        let cipher = build_content_cipher(self.enc)?;

        let determines_cek = self.recipients.iter().any(KeyEncrypter::determines_cek);
        if determines_cek && self.recipients.len() > 1 {
            return Err(JoseError::malformed(
                "direct encryption and direct key agreement require a single recipient",
            ));
        }
        let shared_cek = if determines_cek {
            None
        } else {
            Some(random_bytes(cipher.key_size())?)
        };

        let mut protected = self
            .protected
            .clone()
            .with_encryption(self.enc)
            .maybe_with_compression(self.zip);

        let mut cek = Vec::new();
        let mut recipients = Vec::with_capacity(self.recipients.len());
        for encrypter in &self.recipients {
            let encrypted = encrypter.encrypt_key(self.enc, cipher.key_size(), shared_cek.as_deref())?;
            if self.recipients.len() == 1 {
                protected = protected.merge(&encrypted.header);
                recipients.push(Recipient::new(JWEHeader::new(), encrypted.encrypted_key));
            } else {
                recipients.push(Recipient::new(encrypted.header, encrypted.encrypted_key));
            }
            cek = encrypted.cek;
        }

        // parse our own encoding so the exact protected octets travel with the message
        let protected = EncodedHeader::decode(&b64_encode(protected.marshal()?))?;

        let mut message = Message {
            protected,
            unprotected: self.unprotected.clone(),
            recipients,
            aad: self.aad.clone(),
            ..Default::default()
        };

        let compressed;
        let plaintext = match self.zip {
            Some(zip) => {
                compressed = compress::compress(zip, plaintext)?;
                compressed.as_slice()
            }
            None => plaintext,
        };

        let iv = random_bytes(cipher.iv_size())?;
        let aad = message.authenticated_data()?;
        let (ciphertext, tag) = cipher.encrypt(&cek, &iv, plaintext, &aad)?;
        message.iv = iv;
        message.ciphertext = ciphertext;
        message.tag = tag;

        tracing::trace!(
            "jwe encrypted using {} for {} recipient(s)",
            self.enc,
            message.recipients.len()
        );
        Ok(message)
    }
}
