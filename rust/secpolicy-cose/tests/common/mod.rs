// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Shared helpers for `secpolicy-cose` integration tests.
//!
//! Signing tests need real EC keys and certificates; these are generated
//! fresh per test with `rcgen` rather than shipping key fixtures.

#![allow(dead_code)]

use minicbor::data::Tag;
use minicbor::Encoder;

/// A generated signer: PEM certificate (self-signed) plus PKCS#8 key PEM.
pub struct TestSigner {
    pub cert_pem: String,
    pub key_pem: String,
    pub cert_der: Vec<u8>,
}

/// Creates a self-signed P-384 certificate and matching signing key.
pub fn make_p384_signer() -> TestSigner {
    let key = rcgen::KeyPair::generate_for(&rcgen::PKCS_ECDSA_P384_SHA384).unwrap();
    let params = rcgen::CertificateParams::new(vec!["fragment.test".to_string()]).unwrap();
    let cert = params.self_signed(&key).unwrap();

    TestSigner {
        cert_pem: cert.pem(),
        key_pem: key.serialize_pem(),
        cert_der: cert.der().to_vec(),
    }
}

/// Creates a self-signed P-256 certificate and matching signing key.
pub fn make_p256_signer() -> TestSigner {
    let key = rcgen::KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256).unwrap();
    let params = rcgen::CertificateParams::new(vec!["fragment.test".to_string()]).unwrap();
    let cert = params.self_signed(&key).unwrap();

    TestSigner {
        cert_pem: cert.pem(),
        key_pem: key.serialize_pem(),
        cert_der: cert.der().to_vec(),
    }
}

/// Encodes a minimal protected header map (alg only).
pub fn protected_alg_only(alg: i64) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut enc = Encoder::new(&mut buf);
    enc.map(1).unwrap();
    enc.i64(1).unwrap();
    enc.i64(alg).unwrap();
    buf
}

/// Encodes a COSE_Sign1 from raw components.
///
/// This is a focused test helper, not a general-purpose COSE encoder.
pub fn encode_raw_cose_sign1(
    tagged: bool,
    protected_bstr_contents: &[u8],
    payload: Option<&[u8]>,
    signature: &[u8],
) -> Vec<u8> {
    let mut out = Vec::new();
    let mut enc = Encoder::new(&mut out);

    if tagged {
        enc.tag(Tag::new(18)).unwrap();
    }

    enc.array(4).unwrap();
    enc.bytes(protected_bstr_contents).unwrap();
    enc.map(0).unwrap();
    match payload {
        Some(p) => enc.bytes(p).unwrap(),
        None => enc.null().unwrap(),
    };
    enc.bytes(signature).unwrap();

    out
}
