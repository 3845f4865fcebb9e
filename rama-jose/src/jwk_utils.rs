//! Minimal DER encoding, only used to turn the `n` and `e`
//! parameters of an RSA [`JWK`] into public keys [`aws_lc_rs`] can parse.
//!
//! [`JWK`]: crate::JWK

/// Identifier tag for a DER encoded integer.
/// Defined in [ITU X.680](https://www.itu.int/ITU-T/studygroups/com17/languages/X.680-0207.pdf).
const DER_TAG_INTEGER: u8 = 0x02;
/// Identifier tag for a DER encoded bit string.
const DER_TAG_BIT_STRING: u8 = 0x03;
/// Identifier tag for a DER encoded sequence.
const DER_TAG_SEQUENCE: u8 = 0x30;
/// Maximum length of a DER encoded length in short form.
/// Defined in [ITU X.690](https://www.itu.int/ITU-T/studygroups/com17/languages/X.690-0207.pdf).
const DER_LENGTH_SHORT_FORM_MAX: usize = 127;
/// Octet that indicates that no unused bits are present in a bit string.
const BIT_STRING_NO_UNUSED_BITS: u8 = 0x00;
const INTEGER_SIGN_BIT_MASK: u8 = 0x80;

/// DER encoded `rsaEncryption` algorithm identifier (`1.2.840.113549.1.1.1`, NULL parameters),
/// see appendix C of [RFC 8017](https://datatracker.ietf.org/doc/rfc8017/) and
/// section 2.2.1 of [RFC 3279](https://www.rfc-editor.org/rfc/rfc3279.html).
const RSA_ALGORITHM_IDENTIFIER: [u8; 15] = [
    DER_TAG_SEQUENCE,
    0x0d,
    // OBJECT IDENTIFIER, 9 bytes
    0x06,
    0x09,
    0x2a,
    0x86,
    0x48,
    0x86,
    0xf7,
    0x0d,
    0x01,
    0x01,
    0x01,
    // NULL
    0x05,
    0x00,
];

/// Create the PKCS#1 `RSAPublicKey` (appendix A.1.1 of [RFC 8017]):
///
/// ```text
/// RSAPublicKey = SEQUENCE {
///     modulus  INTEGER,
///     exponent INTEGER,
/// }
/// ```
///
/// `n` and `e` are the big-endian unsigned magnitudes as found in a JWK.
///
/// [RFC 8017]: https://datatracker.ietf.org/doc/rfc8017/
pub(crate) fn rsa_public_key_der(n: &[u8], e: &[u8]) -> Option<Vec<u8>> {
    let mut rsa_public_key = encode_unsigned_integer(n)?;
    rsa_public_key.extend(encode_unsigned_integer(e)?);
    Some(encode_tlv(DER_TAG_SEQUENCE, &rsa_public_key))
}

/// Create the `SubjectPublicKeyInfo` (section 4.1 of [RFC 5280]) for an RSA public key:
///
/// ```text
/// SubjectPublicKeyInfo = SEQUENCE {
///     algorithm        AlgorithmIdentifier,
///     subjectPublicKey BIT STRING (RSAPublicKey),
/// }
/// ```
///
/// [RFC 5280]: https://datatracker.ietf.org/doc/rfc5280/
pub(crate) fn rsa_subject_public_key_info(n: &[u8], e: &[u8]) -> Option<Vec<u8>> {
    let rsa_public_key = rsa_public_key_der(n, e)?;

    let mut bit_string = Vec::with_capacity(1 + rsa_public_key.len());
    bit_string.push(BIT_STRING_NO_UNUSED_BITS);
    bit_string.extend(rsa_public_key);

    let mut spki = RSA_ALGORITHM_IDENTIFIER.to_vec();
    spki.extend(encode_tlv(DER_TAG_BIT_STRING, &bit_string));
    Some(encode_tlv(DER_TAG_SEQUENCE, &spki))
}

fn encode_tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let len = encode_der_length(content.len());
    let mut out = Vec::with_capacity(1 + len.len() + content.len());
    out.push(tag);
    out.extend(len);
    out.extend_from_slice(content);
    out
}

/// Length encoding as defined in section 8.1.3 of ITU X.690.
fn encode_der_length(len: usize) -> Vec<u8> {
    if len <= DER_LENGTH_SHORT_FORM_MAX {
        return vec![len as u8];
    }
    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    let mut out = Vec::with_capacity(1 + bytes.len() - skip);
    out.push(INTEGER_SIGN_BIT_MASK | (bytes.len() - skip) as u8);
    out.extend_from_slice(&bytes[skip..]);
    out
}

/// Positive integer encoding (section 8.3 of ITU X.690).
///
/// Leading zero octets of the input are stripped and a single zero octet
/// is prepended when the high bit is set. `None` for an empty or all-zero input.
fn encode_unsigned_integer(value: &[u8]) -> Option<Vec<u8>> {
    let skip = value.iter().take_while(|b| **b == 0).count();
    let value = &value[skip..];
    let first = *value.first()?;

    let mut content = Vec::with_capacity(value.len() + 1);
    if first & INTEGER_SIGN_BIT_MASK != 0 {
        content.push(0);
    }
    content.extend_from_slice(value);
    Some(encode_tlv(DER_TAG_INTEGER, &content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_gets_sign_padding() {
        assert_eq!(encode_unsigned_integer(&[0x01, 0x00, 0x01]).unwrap(), [
            0x02, 0x03, 0x01, 0x00, 0x01
        ]);
        assert_eq!(encode_unsigned_integer(&[0x80]).unwrap(), [0x02, 0x02, 0x00, 0x80]);
        assert_eq!(encode_unsigned_integer(&[0x00, 0x00, 0x7f]).unwrap(), [0x02, 0x01, 0x7f]);
        assert!(encode_unsigned_integer(&[]).is_none());
        assert!(encode_unsigned_integer(&[0, 0]).is_none());
    }

    #[test]
    fn long_form_length() {
        assert_eq!(encode_der_length(127), [127]);
        assert_eq!(encode_der_length(128), [0x81, 0x80]);
        assert_eq!(encode_der_length(257), [0x82, 0x01, 0x01]);
    }

    #[test]
    fn spki_structure() {
        let spki = rsa_subject_public_key_info(&[0xc5; 256], &[0x01, 0x00, 0x01]).unwrap();
        assert_eq!(spki[0], DER_TAG_SEQUENCE);
        // 2048 bit modulus needs the two byte long form
        assert_eq!(spki[1], 0x82);
        assert_eq!(&spki[4..4 + RSA_ALGORITHM_IDENTIFIER.len()], RSA_ALGORITHM_IDENTIFIER);
        assert!(spki.ends_with(&[0x02, 0x03, 0x01, 0x00, 0x01]));
    }
}
