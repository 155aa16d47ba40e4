// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Shared helpers for `secpolicy-x509` integration tests.
//!
//! Chains are generated fresh with `rcgen`: a self-signed root, an
//! optional intermediate CA, and a P-384 leaf that signs envelopes.

#![allow(dead_code)]

use rcgen::{BasicConstraints, CertificateParams, IsCa, KeyPair, PKCS_ECDSA_P384_SHA384};

pub struct TestChain {
    /// Leaf-first PEM chain, as embedded in envelopes.
    pub chain_pem: String,
    /// PKCS#8 PEM for the leaf signing key.
    pub leaf_key_pem: String,
    /// The root certificate alone (trust anchor input).
    pub root_pem: String,
    pub leaf_der: Vec<u8>,
    pub root_der: Vec<u8>,
}

fn ca_params(cn: &str) -> CertificateParams {
    let mut params = CertificateParams::new(vec![cn.to_string()]).unwrap();
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params
}

/// A root → intermediate → leaf chain (three certificates).
pub fn make_three_link_chain() -> TestChain {
    let root_key = KeyPair::generate_for(&PKCS_ECDSA_P384_SHA384).unwrap();
    let root_cert = ca_params("policy-root.test").self_signed(&root_key).unwrap();

    let inter_key = KeyPair::generate_for(&PKCS_ECDSA_P384_SHA384).unwrap();
    let inter_cert = ca_params("policy-intermediate.test")
        .signed_by(&inter_key, &root_cert, &root_key)
        .unwrap();

    let leaf_key = KeyPair::generate_for(&PKCS_ECDSA_P384_SHA384).unwrap();
    let leaf_cert = CertificateParams::new(vec!["policy-signer.test".to_string()])
        .unwrap()
        .signed_by(&leaf_key, &inter_cert, &inter_key)
        .unwrap();

    TestChain {
        chain_pem: format!("{}{}{}", leaf_cert.pem(), inter_cert.pem(), root_cert.pem()),
        leaf_key_pem: leaf_key.serialize_pem(),
        root_pem: root_cert.pem(),
        leaf_der: leaf_cert.der().to_vec(),
        root_der: root_cert.der().to_vec(),
    }
}

/// A root → leaf chain (two certificates).
pub fn make_two_link_chain() -> TestChain {
    let root_key = KeyPair::generate_for(&PKCS_ECDSA_P384_SHA384).unwrap();
    let root_cert = ca_params("policy-root.test").self_signed(&root_key).unwrap();

    let leaf_key = KeyPair::generate_for(&PKCS_ECDSA_P384_SHA384).unwrap();
    let leaf_cert = CertificateParams::new(vec!["policy-signer.test".to_string()])
        .unwrap()
        .signed_by(&leaf_key, &root_cert, &root_key)
        .unwrap();

    TestChain {
        chain_pem: format!("{}{}", leaf_cert.pem(), root_cert.pem()),
        leaf_key_pem: leaf_key.serialize_pem(),
        root_pem: root_cert.pem(),
        leaf_der: leaf_cert.der().to_vec(),
        root_der: root_cert.der().to_vec(),
    }
}

/// A single self-signed certificate acting as its own chain.
pub fn make_self_signed_leaf() -> TestChain {
    let key = KeyPair::generate_for(&PKCS_ECDSA_P384_SHA384).unwrap();
    let cert = CertificateParams::new(vec!["policy-signer.test".to_string()])
        .unwrap()
        .self_signed(&key)
        .unwrap();

    TestChain {
        chain_pem: cert.pem(),
        leaf_key_pem: key.serialize_pem(),
        root_pem: cert.pem(),
        leaf_der: cert.der().to_vec(),
        root_der: cert.der().to_vec(),
    }
}

/// Signs a canonical test envelope over `payload` with the chain's leaf key.
pub fn sign_test_envelope(chain: &TestChain, payload: &[u8]) -> Vec<u8> {
    secpolicy_cose::create_cose_sign1(
        payload,
        "TestIssuer",
        "TestFeed",
        "application/unknown+json",
        chain.chain_pem.as_bytes(),
        chain.leaf_key_pem.as_bytes(),
        secpolicy_cose::SaltMode::Zero,
        secpolicy_cose::CoseAlgorithm::ES384,
        false,
    )
    .unwrap()
}
