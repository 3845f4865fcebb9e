use base64::{Engine as _, prelude::BASE64_URL_SAFE_NO_PAD};
use rama_jose::{
    EcdsaKey, JWA, JoseError,
    dep::aws_lc_rs::{rsa::KeySize, signature::RsaKeyPair},
    header::JWSHeader,
    jws::{
        CompactSerialize, EcdsaSigner, HmacSigner, HmacVerifier, JSONSerialize, Message,
        MultiSign, RsaSigner, RsaVerifier, Signature, verifier_from_jwk,
    },
};
use tokio_test::{assert_err, assert_ok};

#[test]
fn hmac_signed_message_verifies_with_shared_secret() {
    let signer = HmacSigner::new(JWA::HS256, b"secret")
        .unwrap()
        .with_key_id("k1".to_owned());
    let message = Message::sign("hello", &signer).unwrap();
    let signature = message.lookup_signature("k1")[0];
    assert_eq!(signature.merged_header().algorithm(), JWA::HS256);

    let compact = CompactSerialize.serialize(&message).unwrap();
    let parsed = Message::parse(&compact).unwrap();
    assert_eq!(parsed.payload(), b"hello");

    assert_ok!(parsed.verify(&HmacVerifier::new(JWA::HS256, b"secret").unwrap()));
    assert!(matches!(
        parsed.verify(&HmacVerifier::new(JWA::HS256, b"wrong").unwrap()),
        Err(JoseError::InvalidSignature)
    ));
}

#[test]
fn multi_signature_message_with_mixed_algorithms() {
    let ecdsa = EcdsaSigner::new(EcdsaKey::generate(JWA::ES384).unwrap())
        .try_with_embedded_jwk()
        .unwrap()
        .with_key_id("ec".to_owned());
    let rsa = RsaSigner::new(JWA::PS256, RsaKeyPair::generate(KeySize::Rsa2048).unwrap())
        .unwrap()
        .with_public_header(JWSHeader::new().with_key_id("rsa".to_owned()));
    let rsa_public_key = rsa.public_key_der();
    let hmac = HmacSigner::new(JWA::HS512, b"another secret")
        .unwrap()
        .with_key_id("hmac".to_owned());

    let message = MultiSign::new()
        .with_signer(ecdsa)
        .with_signer(rsa)
        .with_signer(hmac)
        .sign(br#"{"iss":"rama"}"#)
        .unwrap();
    let json = JSONSerialize::new().serialize(&message).unwrap();
    let parsed = Message::parse(&json).unwrap();
    assert_eq!(parsed.signatures().len(), 3);

    // the ecdsa signer embedded its public key
    let ec_signature = parsed.lookup_signature("ec")[0];
    let jwk = ec_signature
        .protected_header()
        .header()
        .essential()
        .jwk
        .clone()
        .unwrap();
    let ec_verifier = verifier_from_jwk(JWA::ES384, &jwk).unwrap();
    assert_ok!(parsed.verify(ec_verifier.as_ref()));

    let rsa_verifier = RsaVerifier::new(JWA::PS256, rsa_public_key).unwrap();
    assert_ok!(parsed.verify(&rsa_verifier));
    assert_eq!(
        parsed.lookup_signature("rsa")[0].merged_header().algorithm(),
        JWA::PS256
    );

    let hmac_verifier = HmacVerifier::new(JWA::HS512, b"another secret").unwrap();
    assert_ok!(parsed.verify_all(&[ec_verifier.as_ref(), &rsa_verifier, &hmac_verifier]));
    assert_err!(parsed.verify_all(&[ec_verifier.as_ref(), &rsa_verifier]));
}

#[test]
fn foreign_protected_header_verifies_byte_exact() {
    // rfc7515, appendix A.1
    let jws = "eyJ0eXAiOiJKV1QiLA0KICJhbGciOiJIUzI1NiJ9.\
        eyJpc3MiOiJqb2UiLA0KICJleHAiOjEzMDA4MTkzODAsDQogImh0dHA6Ly9leGFtcGxlLmNvbS9pc19yb290Ijp0cnVlfQ.\
        dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    let key = BASE64_URL_SAFE_NO_PAD
        .decode("AyM1SysPpbyDfgZld3umj1qzKObwVMkoqQ-EstJQLr_T-1qS0gZH75aKtMN3Yj0iPS4hcgUuTwjAzZr1Z9CAow")
        .unwrap();

    let message = Message::parse(jws).unwrap();
    let verifier = HmacVerifier::new(JWA::HS256, &key).unwrap();
    assert_ok!(message.verify(&verifier));
    assert_eq!(CompactSerialize.serialize(&message).unwrap(), jws);

    // touching the header drops the original octets and so invalidates the signature
    let signature = &message.signatures()[0];
    let mut protected = signature.protected_header().clone();
    protected.header_mut().try_set("typ", "JWT").unwrap();
    assert!(protected.source().is_none());
    let signature = Signature::new(
        signature.public_header().clone(),
        protected,
        signature.signature().to_vec(),
    );
    assert!(matches!(
        signature.verify(message.payload(), &verifier),
        Err(JoseError::InvalidSignature)
    ));
}

#[test]
fn tampered_signature_fails_verify_all_only() {
    let message = MultiSign::new()
        .with_signer(
            HmacSigner::new(JWA::HS256, b"first")
                .unwrap()
                .with_key_id("k1".to_owned()),
        )
        .with_signer(
            HmacSigner::new(JWA::HS384, b"second")
                .unwrap()
                .with_key_id("k2".to_owned()),
        )
        .sign("payload")
        .unwrap();
    let first = HmacVerifier::new(JWA::HS256, b"first").unwrap();
    let second = HmacVerifier::new(JWA::HS384, b"second").unwrap();
    assert_ok!(message.verify_all(&[&first, &second]));

    // flip a bit in the signature of k2
    let k2 = message.lookup_signature("k2")[0];
    let mut tag = k2.signature().to_vec();
    tag[0] ^= 0x01;
    let signatures = vec![
        message.signatures()[0].clone(),
        Signature::new(k2.public_header().clone(), k2.protected_header().clone(), tag),
    ];
    let tampered = Message::parse(
        &JSONSerialize::new()
            .serialize(&Message::new(message.payload().to_vec(), signatures))
            .unwrap(),
    )
    .unwrap();

    assert_ok!(tampered.verify(&first));
    assert!(matches!(
        tampered.verify(&second),
        Err(JoseError::InvalidSignature)
    ));
    assert!(matches!(
        tampered.verify_all(&[&first, &second]),
        Err(JoseError::InvalidSignature)
    ));
}
