use std::{fmt, str::FromStr};

use aws_lc_rs::signature::{
    ECDSA_P256_SHA256_FIXED, ECDSA_P256_SHA256_FIXED_SIGNING, ECDSA_P384_SHA384_FIXED,
    ECDSA_P384_SHA384_FIXED_SIGNING, ECDSA_P521_SHA512_FIXED, ECDSA_P521_SHA512_FIXED_SIGNING,
    EcdsaSigningAlgorithm, EcdsaVerificationAlgorithm, RSA_PKCS1_2048_8192_SHA256,
    RSA_PKCS1_2048_8192_SHA384, RSA_PKCS1_2048_8192_SHA512, RSA_PSS_2048_8192_SHA256,
    RSA_PSS_2048_8192_SHA384, RSA_PSS_2048_8192_SHA512, VerificationAlgorithm,
};
use serde::{Deserialize, Serialize};

use crate::{JWKEllipticCurves, JoseError};

macro_rules! algorithm_identifiers {
    (
        $(#[$m:meta])*
        pub enum $name:ident {
            $( $(#[$var_meta:meta])* $var:ident => $id:literal ),+ $(,)?
        }
    ) => {
        $(#[$m])*
        #[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                $(#[$var_meta])*
                #[serde(rename = $id)]
                $var,
            )+
        }

        impl $name {
            /// Registered identifier of this algorithm, as used on the wire.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $( Self::$var => $id, )+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = JoseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $id => Ok(Self::$var), )+
                    other => Err(JoseError::UnsupportedAlgorithm(other.to_owned())),
                }
            }
        }
    };
}

algorithm_identifiers! {
    /// [`JWA`] or JSON Web Algorithms for digital signatures and MACs, as defined in [`rfc7518`]
    ///
    /// [`JWA::None`] is the explicit "no signature" value, and the default of a header.
    ///
    /// [`rfc7518`]: https://datatracker.ietf.org/doc/html/rfc7518#section-3.1
    pub enum JWA {
        /// No digital signature or MAC performed
        None => "none",
        /// HMAC using SHA-256 (Required)
        HS256 => "HS256",
        /// HMAC using SHA-384 (Optional)
        HS384 => "HS384",
        /// HMAC using SHA-512 (Optional)
        HS512 => "HS512",
        /// RSASSA-PKCS1-v1_5 using SHA-256 (Recommended)
        RS256 => "RS256",
        /// RSASSA-PKCS1-v1_5 using SHA-384 (Optional)
        RS384 => "RS384",
        /// RSASSA-PKCS1-v1_5 using SHA-512 (Optional)
        RS512 => "RS512",
        /// ECDSA using P-256 and SHA-256 (Recommended+)
        ES256 => "ES256",
        /// ECDSA using P-384 and SHA-384 (Optional)
        ES384 => "ES384",
        /// ECDSA using P-521 and SHA-512 (Optional)
        ES512 => "ES512",
        /// RSASSA-PSS using SHA-256 and MGF1 with SHA-256 (Optional)
        PS256 => "PS256",
        /// RSASSA-PSS using SHA-384 and MGF1 with SHA-384 (Optional)
        PS384 => "PS384",
        /// RSASSA-PSS using SHA-512 and MGF1 with SHA-512 (Optional)
        PS512 => "PS512",
    }
}

impl Default for JWA {
    fn default() -> Self {
        Self::None
    }
}

impl JWA {
    /// Returns true for the "no signature" sentinel.
    #[must_use]
    pub fn is_none(self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns true for the HMAC algorithms (`HS*`).
    #[must_use]
    pub fn is_hmac(self) -> bool {
        matches!(self, Self::HS256 | Self::HS384 | Self::HS512)
    }

    /// Returns true for the RSA signature algorithms (`RS*` and `PS*`).
    #[must_use]
    pub fn is_rsa(self) -> bool {
        matches!(
            self,
            Self::RS256 | Self::RS384 | Self::RS512 | Self::PS256 | Self::PS384 | Self::PS512
        )
    }
}

algorithm_identifiers! {
    /// Key management algorithm (`alg`) of a JWE recipient, as defined in [`rfc7518, section 4.1`]
    ///
    /// All registered identifiers are known, not all of them are implemented,
    /// see [`crate::jwe::KeyDecrypter`] for the supported ones.
    ///
    /// [`rfc7518, section 4.1`]: https://datatracker.ietf.org/doc/html/rfc7518#section-4.1
    pub enum JWEKeyAlgorithm {
        /// RSAES-PKCS1-v1_5
        Rsa1v5 => "RSA1_5",
        /// RSAES OAEP using default parameters
        RsaOaep => "RSA-OAEP",
        /// RSAES OAEP using SHA-256 and MGF1 with SHA-256
        RsaOaep256 => "RSA-OAEP-256",
        /// AES Key Wrap with default initial value using 128-bit key
        A128KW => "A128KW",
        /// AES Key Wrap with default initial value using 192-bit key
        A192KW => "A192KW",
        /// AES Key Wrap with default initial value using 256-bit key
        A256KW => "A256KW",
        /// Direct use of a shared symmetric key as the CEK
        Direct => "dir",
        /// Elliptic Curve Diffie-Hellman Ephemeral Static key agreement using Concat KDF
        EcdhEs => "ECDH-ES",
        /// ECDH-ES using Concat KDF and CEK wrapped with "A128KW"
        EcdhEsA128KW => "ECDH-ES+A128KW",
        /// ECDH-ES using Concat KDF and CEK wrapped with "A192KW"
        EcdhEsA192KW => "ECDH-ES+A192KW",
        /// ECDH-ES using Concat KDF and CEK wrapped with "A256KW"
        EcdhEsA256KW => "ECDH-ES+A256KW",
        /// Key wrapping with AES GCM using 128-bit key
        A128GCMKW => "A128GCMKW",
        /// Key wrapping with AES GCM using 192-bit key
        A192GCMKW => "A192GCMKW",
        /// Key wrapping with AES GCM using 256-bit key
        A256GCMKW => "A256GCMKW",
        /// PBES2 with HMAC SHA-256 and "A128KW" wrapping
        Pbes2HS256A128KW => "PBES2-HS256+A128KW",
        /// PBES2 with HMAC SHA-384 and "A192KW" wrapping
        Pbes2HS384A192KW => "PBES2-HS384+A192KW",
        /// PBES2 with HMAC SHA-512 and "A256KW" wrapping
        Pbes2HS512A256KW => "PBES2-HS512+A256KW",
    }
}

algorithm_identifiers! {
    /// Content encryption algorithm (`enc`) of a JWE, as defined in [`rfc7518, section 5.1`]
    ///
    /// [`rfc7518, section 5.1`]: https://datatracker.ietf.org/doc/html/rfc7518#section-5.1
    pub enum JWEEncryption {
        /// AES_128_CBC_HMAC_SHA_256 authenticated encryption
        A128CbcHS256 => "A128CBC-HS256",
        /// AES_192_CBC_HMAC_SHA_384 authenticated encryption
        A192CbcHS384 => "A192CBC-HS384",
        /// AES_256_CBC_HMAC_SHA_512 authenticated encryption
        A256CbcHS512 => "A256CBC-HS512",
        /// AES GCM using 128-bit key
        A128GCM => "A128GCM",
        /// AES GCM using 192-bit key
        A192GCM => "A192GCM",
        /// AES GCM using 256-bit key
        A256GCM => "A256GCM",
    }
}

algorithm_identifiers! {
    /// Compression algorithm (`zip`) applied to the plaintext before encryption,
    /// as defined in [`rfc7516, section 4.1.3`]
    ///
    /// [`rfc7516, section 4.1.3`]: https://datatracker.ietf.org/doc/html/rfc7516#section-4.1.3
    pub enum JWECompression {
        /// DEFLATE, as defined in RFC 1951
        Deflate => "DEF",
    }
}

impl From<JWKEllipticCurves> for JWA {
    fn from(value: JWKEllipticCurves) -> Self {
        match value {
            JWKEllipticCurves::P256 => Self::ES256,
            JWKEllipticCurves::P384 => Self::ES384,
            JWKEllipticCurves::P521 => Self::ES512,
        }
    }
}

impl TryFrom<JWA> for JWKEllipticCurves {
    type Error = JoseError;

    fn try_from(value: JWA) -> Result<Self, Self::Error> {
        match value {
            JWA::ES256 => Ok(Self::P256),
            JWA::ES384 => Ok(Self::P384),
            JWA::ES512 => Ok(Self::P521),
            JWA::None
            | JWA::HS256
            | JWA::HS384
            | JWA::HS512
            | JWA::RS256
            | JWA::RS384
            | JWA::RS512
            | JWA::PS256
            | JWA::PS384
            | JWA::PS512 => Err(JoseError::UnsupportedAlgorithm(value.to_string())),
        }
    }
}

impl TryFrom<JWA> for &'static EcdsaSigningAlgorithm {
    type Error = JoseError;

    fn try_from(value: JWA) -> Result<Self, Self::Error> {
        match JWKEllipticCurves::try_from(value)? {
            JWKEllipticCurves::P256 => Ok(&ECDSA_P256_SHA256_FIXED_SIGNING),
            JWKEllipticCurves::P384 => Ok(&ECDSA_P384_SHA384_FIXED_SIGNING),
            JWKEllipticCurves::P521 => Ok(&ECDSA_P521_SHA512_FIXED_SIGNING),
        }
    }
}

impl TryFrom<JWA> for &'static EcdsaVerificationAlgorithm {
    type Error = JoseError;

    fn try_from(value: JWA) -> Result<Self, Self::Error> {
        match JWKEllipticCurves::try_from(value)? {
            JWKEllipticCurves::P256 => Ok(&ECDSA_P256_SHA256_FIXED),
            JWKEllipticCurves::P384 => Ok(&ECDSA_P384_SHA384_FIXED),
            JWKEllipticCurves::P521 => Ok(&ECDSA_P521_SHA512_FIXED),
        }
    }
}

impl TryFrom<JWA> for &'static dyn VerificationAlgorithm {
    type Error = JoseError;

    fn try_from(value: JWA) -> Result<Self, Self::Error> {
        match value {
            JWA::RS256 => Ok(&RSA_PKCS1_2048_8192_SHA256),
            JWA::RS384 => Ok(&RSA_PKCS1_2048_8192_SHA384),
            JWA::RS512 => Ok(&RSA_PKCS1_2048_8192_SHA512),
            JWA::PS256 => Ok(&RSA_PSS_2048_8192_SHA256),
            JWA::PS384 => Ok(&RSA_PSS_2048_8192_SHA384),
            JWA::PS512 => Ok(&RSA_PSS_2048_8192_SHA512),
            JWA::ES256 | JWA::ES384 | JWA::ES512 => {
                let ecdsa: &'static EcdsaVerificationAlgorithm = value.try_into()?;
                Ok(ecdsa)
            }
            JWA::None | JWA::HS256 | JWA::HS384 | JWA::HS512 => {
                Err(JoseError::UnsupportedAlgorithm(value.to_string()))
            }
        }
    }
}
