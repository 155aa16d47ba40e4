// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! End-to-end pipeline tests: author → sign → decode → verify → authorize
//! → merge → render, plus the failure paths a consumer depends on.

use rcgen::{BasicConstraints, CertificateParams, IsCa, KeyPair, PKCS_ECDSA_P384_SHA384};
use secpolicy::{
    authorize, create_cose_sign1, load_fragment, marshal_fragment, parse_cose_sign1,
    unpack_and_verify, Container, CoseAlgorithm, EnvRuleConfig, EnvRuleStrategy, FragmentConfig,
    FragmentLoadError, PolicyFormat, SaltMode, SecurityPolicy, VerifyError,
};

struct Pki {
    chain_pem: String,
    leaf_key_pem: String,
    root_pem: String,
}

fn make_pki() -> Pki {
    let root_key = KeyPair::generate_for(&PKCS_ECDSA_P384_SHA384).unwrap();
    let mut root_params = CertificateParams::new(vec!["fragment-root.test".to_string()]).unwrap();
    root_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    let root_cert = root_params.self_signed(&root_key).unwrap();

    let leaf_key = KeyPair::generate_for(&PKCS_ECDSA_P384_SHA384).unwrap();
    let leaf_cert = CertificateParams::new(vec!["fragment-signer.test".to_string()])
        .unwrap()
        .signed_by(&leaf_key, &root_cert, &root_key)
        .unwrap();

    Pki {
        chain_pem: format!("{}{}", leaf_cert.pem(), root_cert.pem()),
        leaf_key_pem: leaf_key.serialize_pem(),
        root_pem: root_cert.pem(),
    }
}

fn infra_container() -> Container {
    Container::new(
        vec!["/bin/infra-agent".to_string()],
        vec![EnvRuleConfig {
            rule: "PATH=/usr/bin:/bin".to_string(),
            strategy: EnvRuleStrategy::String,
            required: false,
        }],
        vec!["9f6b8c2e4a55d9e1b4c70e2f39a1d8b27e5f0c6a3d94b1e8f2a7c05d6b3e9a14".to_string()],
        Vec::new(),
        Vec::new(),
        Vec::new(),
        false,
        "/".to_string(),
        true,
    )
    .unwrap()
}

fn authored_fragment() -> String {
    marshal_fragment("infra", "2.10.0", &[infra_container()], &[], &[]).unwrap()
}

fn sign_fragment(pki: &Pki, fragment: &str) -> Vec<u8> {
    create_cose_sign1(
        fragment.as_bytes(),
        "TestIssuer",
        "TestFeed",
        "application/unknown+json",
        pki.chain_pem.as_bytes(),
        pki.leaf_key_pem.as_bytes(),
        SaltMode::Zero,
        CoseAlgorithm::ES384,
        false,
    )
    .unwrap()
}

#[test]
fn author_to_consumer_round_trip() {
    let pki = make_pki();
    let fragment_text = authored_fragment();
    let cose = sign_fragment(&pki, &fragment_text);

    // Consumer side: decode, verify, authorize.
    let unpacked =
        unpack_and_verify(&cose, Some(pki.root_pem.as_bytes()), false, false).expect("verify");
    assert_eq!(unpacked.issuer, "TestIssuer");
    assert_eq!(unpacked.feed, "TestFeed");
    assert_eq!(unpacked.content_type, "application/unknown+json");
    assert_eq!(unpacked.payload, fragment_text.as_bytes());

    let fragment = authorize(&unpacked, "TestIssuer", "TestFeed", "2.0").expect("authorize");
    assert_eq!(fragment.namespace, "infra");
    assert_eq!(fragment.svn.to_string(), "2.10.0");
    assert_eq!(fragment.payload, fragment_text.as_bytes());

    // Merge: reference the accepted fragment from the consumer policy.
    let policy = SecurityPolicy::new(
        false,
        vec![infra_container()],
        Vec::new(),
        vec![FragmentConfig {
            issuer: fragment.issuer.clone(),
            feed: fragment.feed.clone(),
            minimum_svn: "2.0".to_string(),
            includes: vec!["containers".to_string()],
        }],
        true,
        false,
        false,
        true,
        true,
    )
    .unwrap();
    let rendered = policy.marshal(PolicyFormat::Rego).unwrap();

    assert!(rendered.contains(
        r#"{"issuer": "TestIssuer", "feed": "TestFeed", "minimum_svn": "2.0", "includes": ["containers"]}"#
    ));
    assert!(rendered.contains("containers := ["));
}

#[test]
fn load_fragment_is_the_same_pipeline() {
    let pki = make_pki();
    let fragment_text = authored_fragment();
    let cose = sign_fragment(&pki, &fragment_text);

    let fragment = load_fragment(
        &cose,
        Some(pki.root_pem.as_bytes()),
        false,
        "TestIssuer",
        "TestFeed",
        "2.0",
    )
    .expect("load");
    assert_eq!(fragment.namespace, "infra");
}

#[test]
fn canonical_envelope_is_reproducible() {
    // With deterministic salt, the distribution artifact is a pure
    // function of its inputs: signing twice gives identical bytes, and
    // decoding recovers every field bit-for-bit.
    let pki = make_pki();
    let fragment_text = authored_fragment();

    let first = sign_fragment(&pki, &fragment_text);
    let second = sign_fragment(&pki, &fragment_text);
    assert_eq!(first, second);

    let parsed = parse_cose_sign1(&first).unwrap();
    assert_eq!(parsed.protected_headers.issuer(), Some("TestIssuer"));
    assert_eq!(parsed.protected_headers.feed(), Some("TestFeed"));
    assert_eq!(parsed.payload.as_deref(), Some(fragment_text.as_bytes()));
}

#[test]
fn corrupted_fragment_is_rejected_before_authorization() {
    let pki = make_pki();
    let fragment_text = authored_fragment();
    let mut cose = sign_fragment(&pki, &fragment_text);
    let needle = b"package infra";
    let offset = cose
        .windows(needle.len())
        .position(|w| w == needle)
        .expect("payload present in envelope");
    cose[offset] ^= 0x01;

    match load_fragment(
        &cose,
        Some(pki.root_pem.as_bytes()),
        false,
        "TestIssuer",
        "TestFeed",
        "2.0",
    )
    .unwrap_err()
    {
        FragmentLoadError::Verify(_) => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn stale_fragment_is_rejected_after_verification() {
    let pki = make_pki();
    let fragment_text = authored_fragment(); // svn 2.10.0
    let cose = sign_fragment(&pki, &fragment_text);

    match load_fragment(
        &cose,
        Some(pki.root_pem.as_bytes()),
        false,
        "TestIssuer",
        "TestFeed",
        "2.11",
    )
    .unwrap_err()
    {
        FragmentLoadError::Authorize(secpolicy::AuthorizeError::SvnTooLow { .. }) => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn wrong_identity_is_rejected() {
    let pki = make_pki();
    let cose = sign_fragment(&pki, &authored_fragment());

    match load_fragment(
        &cose,
        Some(pki.root_pem.as_bytes()),
        false,
        "SomeoneElse",
        "TestFeed",
        "1",
    )
    .unwrap_err()
    {
        FragmentLoadError::Authorize(secpolicy::AuthorizeError::IssuerMismatch { .. }) => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn untrusted_signer_is_rejected() {
    let trusted = make_pki();
    let rogue = make_pki();
    let cose = sign_fragment(&rogue, &authored_fragment());

    match load_fragment(
        &cose,
        Some(trusted.root_pem.as_bytes()),
        false,
        "TestIssuer",
        "TestFeed",
        "1",
    )
    .unwrap_err()
    {
        FragmentLoadError::Verify(VerifyError::UntrustedAnchor(_)) => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn authored_fragment_round_trips_through_the_gate_parser() {
    // The shape marshal_fragment emits is exactly what authorize parses.
    let fragment_text = marshal_fragment("team.widgets", "1.0.1", &[], &[], &[]).unwrap();
    let pki = make_pki();
    let cose = sign_fragment(&pki, &fragment_text);

    let fragment = load_fragment(
        &cose,
        Some(pki.root_pem.as_bytes()),
        false,
        "TestIssuer",
        "TestFeed",
        "1.0",
    )
    .expect("load");
    assert_eq!(fragment.namespace, "team.widgets");
    assert_eq!(fragment.svn.to_string(), "1.0.1");
}
