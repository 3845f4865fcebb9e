use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::{EssentialParameters, Header, merge_option, parse_optional, private};
use crate::{
    JWECompression, JWEEncryption, JWEKeyAlgorithm, JWK, JWKType, JoseError, encoding::b64_bytes,
    macros::generate_set_and_with,
};

/// Header of a JWE message or recipient, see [`JWEEssentialHeader`] for its typed parameters
pub type JWEHeader = Header<JWEEssentialHeader>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Registered header parameters of a JWE, as defined in [`rfc7516, section 4.1`]
/// and the algorithm specific ones of [`rfc7518, section 4`]
///
/// [`rfc7516, section 4.1`]: https://datatracker.ietf.org/doc/html/rfc7516#section-4.1
/// [`rfc7518, section 4`]: https://datatracker.ietf.org/doc/html/rfc7518#section-4
pub struct JWEEssentialHeader {
    /// Key management algorithm used for the CEK
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<JWEKeyAlgorithm>,
    /// Content encryption algorithm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enc: Option<JWEEncryption>,
    /// Compression applied to the plaintext before encryption
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<JWECompression>,
    /// Agreement PartyUInfo for ECDH-ES, raw bytes
    ///
    /// Base64url encoded on the wire and when read using [`Header::get`].
    #[serde(default, with = "b64_bytes", skip_serializing_if = "Vec::is_empty")]
    pub apu: Vec<u8>,
    /// Agreement PartyVInfo for ECDH-ES, raw bytes
    #[serde(default, with = "b64_bytes", skip_serializing_if = "Vec::is_empty")]
    pub apv: Vec<u8>,
    /// Ephemeral public key of the originator for ECDH-ES
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epk: Option<JWK>,
    /// Content type of the encrypted payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cty: Option<String>,
    /// Extensions that must be understood and processed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crit: Option<Vec<String>>,
    /// Public key to which the CEK was encrypted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwk: Option<JWK>,
    /// Url of a JWK set containing the recipient key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jku: Option<Url>,
    /// Hint indicating which key was used to encrypt the CEK
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Media type of the complete JWE
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    /// Url of the X.509 certificate (chain) of the recipient key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x5u: Option<Url>,
    /// X.509 certificate chain, base64 (not url) encoded DER certificates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x5c: Option<Vec<String>>,
    /// SHA-1 thumbprint of the X.509 certificate of the recipient key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x5t: Option<String>,
    /// SHA-256 thumbprint of the X.509 certificate of the recipient key
    #[serde(default, rename = "x5t#S256", skip_serializing_if = "Option::is_none")]
    pub x5t_s256: Option<String>,
}

impl private::SealedEssentialParameters for JWEEssentialHeader {}

impl EssentialParameters for JWEEssentialHeader {
    const KEYS: &'static [&'static str] = &[
        "alg", "enc", "zip", "apu", "apv", "epk", "cty", "crit", "jwk", "jku", "kid", "typ",
        "x5u", "x5c", "x5t", "x5t#S256",
    ];

    fn set_value(&mut self, key: &'static str, value: Value) -> Result<(), JoseError> {
        match key {
            "alg" => self.alg = parse_optional(key, value)?,
            "enc" => self.enc = parse_optional(key, value)?,
            "zip" => self.zip = parse_optional(key, value)?,
            "apu" => self.apu = agreement_party_info(key, value)?,
            "apv" => self.apv = agreement_party_info(key, value)?,
            "epk" => {
                let epk: Option<JWK> = parse_optional(key, value)?;
                if epk
                    .as_ref()
                    .is_some_and(|jwk| !matches!(jwk.key_type(), JWKType::EC { .. }))
                {
                    return Err(JoseError::InvalidHeaderValue { key });
                }
                self.epk = epk;
            }
            "cty" => self.cty = parse_optional(key, value)?,
            "crit" => self.crit = parse_optional(key, value)?,
            "jwk" => self.jwk = parse_optional(key, value)?,
            "jku" => self.jku = parse_optional(key, value)?,
            "kid" => self.kid = parse_optional(key, value)?,
            "typ" => self.typ = parse_optional(key, value)?,
            "x5u" => self.x5u = parse_optional(key, value)?,
            "x5c" => self.x5c = parse_optional(key, value)?,
            "x5t" => self.x5t = parse_optional(key, value)?,
            "x5t#S256" => self.x5t_s256 = parse_optional(key, value)?,
            _ => return Err(JoseError::UnknownHeaderKey(key.to_owned())),
        }
        Ok(())
    }

    fn merge_from(&mut self, other: &Self) {
        merge_option(&mut self.alg, &other.alg);
        merge_option(&mut self.enc, &other.enc);
        merge_option(&mut self.zip, &other.zip);
        if !other.apu.is_empty() {
            self.apu.clone_from(&other.apu);
        }
        if !other.apv.is_empty() {
            self.apv.clone_from(&other.apv);
        }
        merge_option(&mut self.epk, &other.epk);
        merge_option(&mut self.cty, &other.cty);
        merge_option(&mut self.crit, &other.crit);
        merge_option(&mut self.jwk, &other.jwk);
        merge_option(&mut self.jku, &other.jku);
        merge_option(&mut self.kid, &other.kid);
        merge_option(&mut self.typ, &other.typ);
        merge_option(&mut self.x5u, &other.x5u);
        merge_option(&mut self.x5c, &other.x5c);
        merge_option(&mut self.x5t, &other.x5t);
        merge_option(&mut self.x5t_s256, &other.x5t_s256);
    }
}

/// `apu` and `apv` are set as raw bytes, either as a string or as a byte sequence.
///
/// Reading them back through [`Header::get`] yields their wire form, the base64url
/// encoding of those bytes, so a `get` followed by a `try_set` of the same value
/// does not round-trip. Use [`JWEEssentialHeader::apu`] for the raw bytes.
fn agreement_party_info(key: &'static str, value: Value) -> Result<Vec<u8>, JoseError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(info) => Ok(info.into_bytes()),
        value => serde_json::from_value(value).map_err(|_err| JoseError::InvalidHeaderValue { key }),
    }
}

impl JWEHeader {
    /// Key management algorithm (`alg`) of this header
    pub fn algorithm(&self) -> Option<JWEKeyAlgorithm> {
        self.essential().alg
    }

    /// Content encryption algorithm (`enc`) of this header
    pub fn encryption(&self) -> Option<JWEEncryption> {
        self.essential().enc
    }

    /// Compression algorithm (`zip`) of this header
    pub fn compression(&self) -> Option<JWECompression> {
        self.essential().zip
    }

    /// Key id (`kid`) of this header
    pub fn key_id(&self) -> Option<&str> {
        self.essential().kid.as_deref()
    }

    generate_set_and_with! {
        /// Set the key management algorithm (`alg`)
        pub fn algorithm(mut self, alg: Option<JWEKeyAlgorithm>) -> Self {
            self.essential_mut().alg = alg;
            self
        }
    }

    generate_set_and_with! {
        /// Set the content encryption algorithm (`enc`)
        pub fn encryption(mut self, enc: Option<JWEEncryption>) -> Self {
            self.essential_mut().enc = enc;
            self
        }
    }

    generate_set_and_with! {
        /// Set the compression algorithm (`zip`)
        pub fn compression(mut self, zip: Option<JWECompression>) -> Self {
            self.essential_mut().zip = zip;
            self
        }
    }

    generate_set_and_with! {
        /// Set the key id (`kid`)
        pub fn key_id(mut self, kid: Option<String>) -> Self {
            self.essential_mut().kid = kid;
            self
        }
    }

    generate_set_and_with! {
        /// Set the content type (`cty`)
        pub fn content_type(mut self, cty: Option<String>) -> Self {
            self.essential_mut().cty = cty;
            self
        }
    }

    generate_set_and_with! {
        /// Set the agreement party infos (`apu` and `apv`) used by ECDH-ES
        pub fn agreement_party_info(mut self, apu: Vec<u8>, apv: Vec<u8>) -> Self {
            self.essential_mut().apu = apu;
            self.essential_mut().apv = apv;
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;
    use serde_json::json;

    use super::*;
    use crate::{EcdsaKey, JWA};

    impl Arbitrary for JWEHeader {
        fn arbitrary(g: &mut Gen) -> Self {
            let algs = [
                JWEKeyAlgorithm::Direct,
                JWEKeyAlgorithm::A128KW,
                JWEKeyAlgorithm::RsaOaep256,
                JWEKeyAlgorithm::EcdhEs,
            ];
            let encs = [JWEEncryption::A128GCM, JWEEncryption::A256CbcHS512];
            let mut header = Self::new()
                .maybe_with_algorithm(bool::arbitrary(g).then(|| *g.choose(&algs).unwrap()))
                .maybe_with_encryption(bool::arbitrary(g).then(|| *g.choose(&encs).unwrap()))
                .maybe_with_compression(bool::arbitrary(g).then_some(JWECompression::Deflate))
                .maybe_with_key_id(Option::<String>::arbitrary(g))
                .with_agreement_party_info(Vec::arbitrary(g), Vec::arbitrary(g));
            for (key, value) in Vec::<(String, String)>::arbitrary(g) {
                if Self::essential_key(&key).is_none() {
                    header.try_set(&key, value).unwrap();
                }
            }
            header
        }
    }

    #[test]
    fn set_validates_jwe_parameters() {
        let mut header = JWEHeader::new();
        header
            .try_set("alg", JWEKeyAlgorithm::Direct)
            .unwrap()
            .try_set("enc", "A256GCM")
            .unwrap()
            .try_set("zip", "DEF")
            .unwrap()
            .try_set("apu", "Alice")
            .unwrap()
            .try_set("apv", b"Bob".to_vec())
            .unwrap();

        assert_eq!(header.algorithm(), Some(JWEKeyAlgorithm::Direct));
        assert_eq!(header.encryption(), Some(JWEEncryption::A256GCM));
        assert_eq!(header.compression(), Some(JWECompression::Deflate));
        assert_eq!(header.essential().apu, b"Alice");
        assert_eq!(header.essential().apv, b"Bob");
        // on the wire agreement party info is base64url encoded
        assert_eq!(header.get("apu").unwrap(), json!("QWxpY2U"));
        assert!(header.extensions().is_empty());
        // setting the wire form stores the encoded text as raw bytes
        let mut echoed = header.clone();
        echoed.try_set("apu", header.get("apu").unwrap()).unwrap();
        assert_eq!(echoed.essential().apu, b"QWxpY2U");

        let before = header.clone();
        for (key, value) in [
            ("enc", json!("A512GCM")),
            ("alg", json!(1)),
            ("zip", json!("GZIP")),
            ("apu", json!({"a": 1})),
            ("epk", json!({"kty": "oct", "k": "abc"})),
        ] {
            assert!(matches!(
                header.try_set(key, value),
                Err(JoseError::InvalidHeaderValue { .. })
            ));
        }
        assert_eq!(header, before);
    }

    #[test]
    fn epk_accepts_ec_public_keys() {
        let jwk = EcdsaKey::generate(JWA::ES256).unwrap().create_jwk().unwrap();
        let header = JWEHeader::new().try_with("epk", &jwk).unwrap();
        assert_eq!(header.essential().epk.as_ref(), Some(&jwk));

        let parsed = JWEHeader::unmarshal(&header.marshal().unwrap()).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn merge_keeps_unset_fields_of_receiver() {
        let base = JWEHeader::new()
            .with_encryption(JWEEncryption::A128GCM)
            .with_compression(JWECompression::Deflate)
            .with_agreement_party_info(b"u".to_vec(), Vec::new());
        let recipient = JWEHeader::new()
            .with_algorithm(JWEKeyAlgorithm::A128KW)
            .with_key_id("r1".to_owned());

        let merged = base.merge(&recipient);
        assert_eq!(merged.algorithm(), Some(JWEKeyAlgorithm::A128KW));
        assert_eq!(merged.encryption(), Some(JWEEncryption::A128GCM));
        assert_eq!(merged.compression(), Some(JWECompression::Deflate));
        assert_eq!(merged.key_id(), Some("r1"));
        assert_eq!(merged.essential().apu, b"u");
        assert!(merged.essential().apv.is_empty());
    }

    #[test]
    fn unmarshal_keeps_unknown_parameters() {
        let header =
            JWEHeader::unmarshal(br#"{"alg":"dir","enc":"A128CBC-HS256","p2c":4096,"ext":{"a":[1]}}"#)
                .unwrap();
        assert_eq!(header.algorithm(), Some(JWEKeyAlgorithm::Direct));
        assert_eq!(header.get("p2c").unwrap(), json!(4096));
        assert_eq!(header.get("ext").unwrap(), json!({"a": [1]}));
        assert_eq!(header.extensions().len(), 2);
    }

    #[quickcheck]
    fn marshal_round_trip(header: JWEHeader) -> bool {
        JWEHeader::unmarshal(&header.marshal().unwrap()).unwrap() == header
    }

    #[quickcheck]
    fn merge_never_mutates_inputs(a: JWEHeader, b: JWEHeader) -> bool {
        let (a_before, b_before) = (a.clone(), b.clone());
        let merged = a.merge(&b);
        let expected_enc = b.encryption().or(a.encryption());
        a == a_before && b == b_before && merged.encryption() == expected_enc
    }
}
