// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Envelope unpacking: decode, authenticate, extract.

use secpolicy_cose::{
    encode_signature1_sig_structure, parse_cose_sign1, CoseAlgorithm, EnvelopeError,
    verify_sig_structure,
};
use tracing::debug;

use crate::chain::{parse_cert_der, walk_chain};
use crate::pem::{decode_certs_pem, encode_pem};
use crate::VerifyError;

/// The trusted view of a fragment envelope.
///
/// Only produced by [`unpack_and_verify`]; holding one means the envelope's
/// signature checked out against an authenticated leaf certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpackedDocument {
    pub issuer: String,
    pub feed: String,
    pub content_type: String,
    pub payload: Vec<u8>,
    /// Leaf certificate in PEM form.
    pub leaf_cert_pem: String,
    /// Leaf SubjectPublicKeyInfo in PEM form.
    pub leaf_key_pem: String,
}

/// Decode an envelope, validate its certificate chain, and verify its
/// signature against the chain's leaf key.
///
/// `trust_anchor_pem` supplies the certificate the chain must terminate at;
/// with `allow_self_signed` a self-signed terminal is accepted instead
/// (permissive/dev verification). `skip_chain_checks` limits chain
/// validation to link integrity. The signature check is unconditional:
/// a corrupted byte anywhere in the signed region fails verification.
pub fn unpack_and_verify(
    raw: &[u8],
    trust_anchor_pem: Option<&[u8]>,
    allow_self_signed: bool,
    skip_chain_checks: bool,
) -> Result<UnpackedDocument, VerifyError> {
    let parsed = parse_cose_sign1(raw)?;

    let chain_der = parsed
        .unprotected_headers
        .cert_chain_der()
        .or_else(|| parsed.protected_headers.cert_chain_der())
        .ok_or(VerifyError::MissingChain)?;

    let mut certs = Vec::with_capacity(chain_der.len());
    for (index, der) in chain_der.iter().enumerate() {
        let cert = parse_cert_der(der)
            .map_err(|detail| VerifyError::InvalidCertificate { index, detail })?;
        certs.push(cert);
    }

    let anchor = match trust_anchor_pem {
        Some(pem) => {
            let ders = decode_certs_pem(pem).map_err(VerifyError::InvalidTrustAnchor)?;
            let der = ders
                .first()
                .ok_or_else(|| {
                    VerifyError::InvalidTrustAnchor(
                        "no CERTIFICATE block in trust anchor".to_string(),
                    )
                })?;
            Some(parse_cert_der(der).map_err(VerifyError::InvalidTrustAnchor)?)
        }
        None => None,
    };

    walk_chain(&certs, anchor.as_ref(), allow_self_signed, skip_chain_checks)?;

    // Chain holds; now recompute the envelope signature with the leaf key.
    let alg_id = parsed
        .protected_headers
        .algorithm_id()
        .ok_or_else(|| EnvelopeError::Malformed("missing alg header".to_string()))?;
    let alg = CoseAlgorithm::from_cose_id(alg_id)?;

    let sig_structure = encode_signature1_sig_structure(&parsed, None)?;
    let leaf = &certs[0];
    verify_sig_structure(alg, &leaf.der, &sig_structure, &parsed.signature)?;

    let issuer = parsed
        .protected_headers
        .issuer()
        .unwrap_or_default()
        .to_string();
    let feed = parsed
        .protected_headers
        .feed()
        .unwrap_or_default()
        .to_string();
    let content_type = parsed
        .protected_headers
        .content_type()
        .unwrap_or_default()
        .to_string();

    debug!(
        issuer = %issuer,
        feed = %feed,
        chain_len = certs.len(),
        "envelope verified"
    );

    Ok(UnpackedDocument {
        issuer,
        feed,
        content_type,
        payload: parsed.payload.unwrap_or_default(),
        leaf_cert_pem: encode_pem("CERTIFICATE", &leaf.der),
        leaf_key_pem: encode_pem("PUBLIC KEY", &leaf.spki_der),
    })
}
