use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use url::Url;

use super::{EssentialParameters, Header, merge_option, parse_optional, parse_value, private};
use crate::{JWA, JWK, JoseError, macros::generate_set_and_with};

/// Header of a JWS signature, see [`JWSEssentialHeader`] for its typed parameters
pub type JWSHeader = Header<JWSEssentialHeader>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Registered header parameters of a JWS, as defined in [`rfc7515, section 4.1`]
///
/// [`rfc7515, section 4.1`]: https://datatracker.ietf.org/doc/html/rfc7515#section-4.1
pub struct JWSEssentialHeader {
    /// Algorithm used to secure the JWS, [`JWA::None`] when not set
    #[serde(default, skip_serializing_if = "is_no_signature")]
    pub alg: JWA,
    /// Content type of the secured payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cty: Option<String>,
    /// Extensions that must be understood and processed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crit: Option<Vec<String>>,
    /// Public key corresponding to the key used to sign
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwk: Option<JWK>,
    /// Url of a JWK set containing the signing key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jku: Option<Url>,
    /// Hint indicating which key was used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Media type of the complete JWS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    /// Url of the X.509 certificate (chain) of the signing key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x5u: Option<Url>,
    /// X.509 certificate chain, base64 (not url) encoded DER certificates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x5c: Option<Vec<String>>,
    /// SHA-1 thumbprint of the X.509 certificate of the signing key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x5t: Option<String>,
    /// SHA-256 thumbprint of the X.509 certificate of the signing key
    #[serde(default, rename = "x5t#S256", skip_serializing_if = "Option::is_none")]
    pub x5t_s256: Option<String>,
}

fn is_no_signature(alg: &JWA) -> bool {
    alg.is_none()
}

impl private::SealedEssentialParameters for JWSEssentialHeader {}

impl EssentialParameters for JWSEssentialHeader {
    const KEYS: &'static [&'static str] = &[
        "alg", "cty", "crit", "jwk", "jku", "kid", "typ", "x5u", "x5c", "x5t", "x5t#S256",
    ];

    fn set_value(&mut self, key: &'static str, value: Value) -> Result<(), JoseError> {
        match key {
            "alg" => self.alg = parse_value(key, value)?,
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
        if !other.alg.is_none() {
            self.alg = other.alg;
        }
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

impl JWSEssentialHeader {
    /// Leniently construct the essential parameters from a generic JSON map.
    ///
    /// Every parameter which is absent or does not have the expected type
    /// is left unset, an absent or unknown `alg` becomes [`JWA::None`].
    #[must_use]
    pub fn construct_from_map(map: &Map<String, Value>) -> Self {
        fn lenient<T: DeserializeOwned>(map: &Map<String, Value>, key: &str) -> Option<T> {
            map.get(key)
                .and_then(|value| serde_json::from_value(value.clone()).ok())
        }

        Self {
            alg: lenient(map, "alg").unwrap_or_default(),
            cty: lenient(map, "cty"),
            crit: lenient(map, "crit"),
            jwk: lenient(map, "jwk"),
            jku: lenient(map, "jku"),
            kid: lenient(map, "kid"),
            typ: lenient(map, "typ"),
            x5u: lenient(map, "x5u"),
            x5c: lenient(map, "x5c"),
            x5t: lenient(map, "x5t"),
            x5t_s256: lenient(map, "x5t#S256"),
        }
    }
}

impl JWSHeader {
    /// Signature algorithm (`alg`) of this header
    pub fn algorithm(&self) -> JWA {
        self.essential().alg
    }

    /// Key id (`kid`) of this header
    pub fn key_id(&self) -> Option<&str> {
        self.essential().kid.as_deref()
    }

    generate_set_and_with! {
        /// Set the signature algorithm (`alg`)
        pub fn algorithm(mut self, alg: JWA) -> Self {
            self.essential_mut().alg = alg;
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
        /// Set the media type (`typ`)
        pub fn typ(mut self, typ: Option<String>) -> Self {
            self.essential_mut().typ = typ;
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
        /// Set the public key (`jwk`)
        pub fn jwk(mut self, jwk: Option<JWK>) -> Self {
            self.essential_mut().jwk = jwk;
            self
        }
    }
}
