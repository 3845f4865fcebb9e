//! JOSE envelopes (JWS and JWE) used by rama.
//!
//! This includes but is not limited to:
//! - JWS and JWE headers, with their essential parameters and free-form extensions
//! - Protected headers which keep the exact octets they were parsed from
//! - JWS: multi-signature messages, signers and verifiers (HMAC, RSA, ECDSA)
//! - JWE: multi-recipient messages, content ciphers, key management and compression
//!
//! # Rama
//!
//! Crate used by the end-user `rama` crate and `rama` crate authors alike.
//!
//! Learn more about `rama`:
//!
//! - Github: <https://github.com/plabayo/rama>
//! - Book: <https://ramaproxy.org/book/>

#![doc(
    html_favicon_url = "https://raw.githubusercontent.com/plabayo/rama/main/docs/img/old_logo.png"
)]
#![doc(html_logo_url = "https://raw.githubusercontent.com/plabayo/rama/main/docs/img/old_logo.png")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(test), warn(clippy::print_stdout, clippy::dbg_macro))]

mod macros;

pub mod error;
pub use error::JoseError;

mod encoding;

mod jwa;
pub use jwa::{JWA, JWECompression, JWEEncryption, JWEKeyAlgorithm};

mod jwk;
mod jwk_utils;
pub use jwk::{EcdsaKey, JWK, JWKEllipticCurves, JWKType, JWKUse};

pub mod header;

pub mod jws;

pub mod jwe;

pub mod dep {
    //! Dependencies for rama jose modules.
    //!
    //! Exported for your convenience

    pub mod aws_lc_rs {
        //! Re-export of the [`aws-lc-rs`] crate.
        //!
        //! [`aws-lc-rs`]: https://docs.rs/aws-lc-rs

        #[doc(inline)]
        pub use aws_lc_rs::*;
    }

    pub mod serde_json {
        //! Re-export of the [`serde_json`] crate.
        //!
        //! [`serde_json`]: https://docs.rs/serde_json

        #[doc(inline)]
        pub use serde_json::*;
    }

    pub mod url {
        //! Re-export of the [`url`] crate.
        //!
        //! [`url`]: https://docs.rs/url

        #[doc(inline)]
        pub use url::*;
    }
}
