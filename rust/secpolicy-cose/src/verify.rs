// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Raw Sig_structure verification.
//!
//! Accepts either a DER certificate or a bare SubjectPublicKeyInfo as key
//! material, like the rest of the pipeline. No chain or trust reasoning
//! happens here.

use p256::elliptic_curve::sec1::ToEncodedPoint as _;
use p256::pkcs8::DecodePublicKey as _;
use signature::Verifier as _;

use crate::{CoseAlgorithm, SignatureError};

/// Extract SPKI DER from a certificate, passing bare SPKI bytes through.
pub fn leaf_spki_der(der_cert_or_key: &[u8]) -> Vec<u8> {
    if let Ok((_, cert)) = x509_parser::parse_x509_certificate(der_cert_or_key) {
        return cert.tbs_certificate.subject_pki.raw.to_vec();
    }
    der_cert_or_key.to_vec()
}

/// Verify a COSE signature (raw r||s) over a Sig_structure.
pub fn verify_sig_structure(
    alg: CoseAlgorithm,
    public_key_bytes: &[u8],
    sig_structure: &[u8],
    signature: &[u8],
) -> Result<(), SignatureError> {
    let spki = leaf_spki_der(public_key_bytes);
    match alg {
        CoseAlgorithm::ES256 => verify_ecdsa_p256(&spki, sig_structure, signature),
        CoseAlgorithm::ES384 => verify_ecdsa_p384(&spki, sig_structure, signature),
        CoseAlgorithm::ES512 => verify_ecdsa_p521(&spki, sig_structure, signature),
    }
}

fn verify_ecdsa_p256(spki: &[u8], msg: &[u8], sig: &[u8]) -> Result<(), SignatureError> {
    let pk = p256::PublicKey::from_public_key_der(spki)
        .map_err(|e| SignatureError::InvalidPublicKey(format!("bad P-256 public key: {e}")))?;
    let ep = pk.to_encoded_point(false);
    let vk = p256::ecdsa::VerifyingKey::from_sec1_bytes(ep.as_bytes())
        .map_err(|e| SignatureError::InvalidPublicKey(format!("bad P-256 public key: {e}")))?;
    let signature =
        p256::ecdsa::Signature::from_slice(sig).map_err(|_| SignatureError::Mismatch)?;
    vk.verify(msg, &signature).map_err(|_| SignatureError::Mismatch)
}

fn verify_ecdsa_p384(spki: &[u8], msg: &[u8], sig: &[u8]) -> Result<(), SignatureError> {
    let pk = p384::PublicKey::from_public_key_der(spki)
        .map_err(|e| SignatureError::InvalidPublicKey(format!("bad P-384 public key: {e}")))?;
    let ep = pk.to_encoded_point(false);
    let vk = p384::ecdsa::VerifyingKey::from_sec1_bytes(ep.as_bytes())
        .map_err(|e| SignatureError::InvalidPublicKey(format!("bad P-384 public key: {e}")))?;
    let signature =
        p384::ecdsa::Signature::from_slice(sig).map_err(|_| SignatureError::Mismatch)?;
    vk.verify(msg, &signature).map_err(|_| SignatureError::Mismatch)
}

fn verify_ecdsa_p521(spki: &[u8], msg: &[u8], sig: &[u8]) -> Result<(), SignatureError> {
    let pk = p521::PublicKey::from_public_key_der(spki)
        .map_err(|e| SignatureError::InvalidPublicKey(format!("bad P-521 public key: {e}")))?;
    let ep = pk.to_encoded_point(false);
    let vk = p521::ecdsa::VerifyingKey::from_sec1_bytes(ep.as_bytes())
        .map_err(|e| SignatureError::InvalidPublicKey(format!("bad P-521 public key: {e}")))?;
    let signature =
        p521::ecdsa::Signature::from_slice(sig).map_err(|_| SignatureError::Mismatch)?;
    vk.verify(msg, &signature).map_err(|_| SignatureError::Mismatch)
}
