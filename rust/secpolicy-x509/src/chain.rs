// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Certificate-chain walking.
//!
//! The chain is positional: index 0 is the leaf, the last entry the
//! terminal certificate. Each link must be signed by its successor; the
//! terminal must match the caller's trust anchor, or be self-signed when
//! permissive verification is enabled. The walk is an explicit state
//! machine so every rejection path is enumerable.

use p256::elliptic_curve::sec1::ToEncodedPoint as _;
use rsa::pkcs8::DecodePublicKey as _;
use rsa::{pkcs1v15, RsaPublicKey};
use sha2::{Sha256, Sha384, Sha512};
use signature::Verifier as _;

use crate::VerifyError;

/// One certificate out of an `x5chain` header, parsed to the fields the
/// walk needs.
#[derive(Debug, Clone)]
pub(crate) struct ParsedCert {
    pub der: Vec<u8>,
    pub subject_dn: String,
    pub issuer_dn: String,
    pub spki_der: Vec<u8>,
    pub tbs_der: Vec<u8>,
    pub signature_oid: String,
    pub signature: Vec<u8>,
}

pub(crate) fn parse_cert_der(der: &[u8]) -> Result<ParsedCert, String> {
    let (_, cert) =
        x509_parser::parse_x509_certificate(der).map_err(|e| format!("invalid cert DER: {e}"))?;

    Ok(ParsedCert {
        der: der.to_vec(),
        subject_dn: cert.tbs_certificate.subject.to_string(),
        issuer_dn: cert.tbs_certificate.issuer.to_string(),
        spki_der: cert.tbs_certificate.subject_pki.raw.to_vec(),
        tbs_der: cert.tbs_certificate.as_ref().to_vec(),
        signature_oid: cert.signature_algorithm.algorithm.to_string(),
        signature: cert.signature_value.data.to_vec(),
    })
}

impl ParsedCert {
    /// Whether this certificate's own signature verifies against its own key.
    pub(crate) fn is_self_signed(&self) -> bool {
        verify_cert_signature(&self.spki_der, &self.tbs_der, &self.signature_oid, &self.signature)
            .is_ok()
    }
}

/// Positions of the chain walk. Terminal states are `AnchorAccepted` and
/// `Rejected`; the walk never leaves a terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainState {
    /// The link at this index has not been checked yet.
    Unverified(usize),
    /// Links up to and including this index chain correctly.
    LinkVerified(usize),
    /// The terminal certificate is trusted.
    AnchorAccepted,
    /// The chain was rejected; the `VerifyError` names the reason.
    Rejected,
}

/// Walk a parsed chain from leaf to terminal.
///
/// `skip_chain_checks` limits the walk to link integrity (dev/test use);
/// anchor matching is byte-equal DER or equal SubjectPublicKeyInfo.
pub(crate) fn walk_chain(
    certs: &[ParsedCert],
    anchor: Option<&ParsedCert>,
    allow_self_signed: bool,
    skip_chain_checks: bool,
) -> Result<ChainState, VerifyError> {
    let mut state = ChainState::Unverified(0);

    // Phase 1: link integrity, leaf upward. Every exit from this loop is
    // either a typed rejection or "all links hold".
    loop {
        state = match state {
            ChainState::Unverified(i) => {
                if i + 1 >= certs.len() {
                    break;
                }
                let subject = &certs[i];
                let issuer = &certs[i + 1];
                match verify_cert_signature(
                    &issuer.spki_der,
                    &subject.tbs_der,
                    &subject.signature_oid,
                    &subject.signature,
                ) {
                    Ok(()) => ChainState::LinkVerified(i),
                    Err(detail) => return Err(VerifyError::ChainBroken { link: i, detail }),
                }
            }
            ChainState::LinkVerified(i) => {
                if i + 2 >= certs.len() {
                    break;
                }
                ChainState::Unverified(i + 1)
            }
            ChainState::AnchorAccepted | ChainState::Rejected => {
                unreachable!("terminal state inside link walk")
            }
        };
    }

    // Phase 2: terminal trust decision.
    if skip_chain_checks {
        return Ok(ChainState::AnchorAccepted);
    }

    let terminal = certs.last().expect("chain is non-empty");
    if let Some(anchor) = anchor {
        if terminal.der == anchor.der || terminal.spki_der == anchor.spki_der {
            return Ok(ChainState::AnchorAccepted);
        }
    }
    if allow_self_signed && terminal.is_self_signed() {
        return Ok(ChainState::AnchorAccepted);
    }

    let reason = if anchor.is_some() {
        format!(
            "terminal certificate {:?} does not match the trust anchor",
            terminal.subject_dn
        )
    } else if allow_self_signed {
        format!(
            "terminal certificate {:?} is not self-signed and no trust anchor was given",
            terminal.subject_dn
        )
    } else {
        "no trust anchor was given and self-signed chains are not allowed".to_string()
    };
    Err(VerifyError::UntrustedAnchor(reason))
}

/// Verify one certificate signature given the issuer's SPKI.
///
/// Supports the signature algorithms real chains carry: RSA PKCS#1 v1.5
/// with SHA-256/384/512 and ECDSA over P-256/P-384/P-521.
pub(crate) fn verify_cert_signature(
    issuer_spki_der: &[u8],
    tbs_der: &[u8],
    signature_oid: &str,
    signature: &[u8],
) -> Result<(), String> {
    match signature_oid {
        // sha256/384/512WithRSAEncryption
        "1.2.840.113549.1.1.11" => {
            let key = rsa_public_key_from_spki(issuer_spki_der)?;
            let vk = pkcs1v15::VerifyingKey::<Sha256>::new(key);
            let sig = pkcs1v15::Signature::try_from(signature)
                .map_err(|e| format!("bad RSA signature bytes: {e}"))?;
            vk.verify(tbs_der, &sig)
                .map_err(|_| "certificate signature verification failed".to_string())
        }
        "1.2.840.113549.1.1.12" => {
            let key = rsa_public_key_from_spki(issuer_spki_der)?;
            let vk = pkcs1v15::VerifyingKey::<Sha384>::new(key);
            let sig = pkcs1v15::Signature::try_from(signature)
                .map_err(|e| format!("bad RSA signature bytes: {e}"))?;
            vk.verify(tbs_der, &sig)
                .map_err(|_| "certificate signature verification failed".to_string())
        }
        "1.2.840.113549.1.1.13" => {
            let key = rsa_public_key_from_spki(issuer_spki_der)?;
            let vk = pkcs1v15::VerifyingKey::<Sha512>::new(key);
            let sig = pkcs1v15::Signature::try_from(signature)
                .map_err(|e| format!("bad RSA signature bytes: {e}"))?;
            vk.verify(tbs_der, &sig)
                .map_err(|_| "certificate signature verification failed".to_string())
        }

        // ecdsa-with-SHA256 / SHA384 / SHA512
        "1.2.840.10045.4.3.2" => {
            let pk = p256::PublicKey::from_public_key_der(issuer_spki_der)
                .map_err(|e| format!("bad P-256 issuer public key: {e}"))?;
            let ep = pk.to_encoded_point(false);
            let vk = p256::ecdsa::VerifyingKey::from_sec1_bytes(ep.as_bytes())
                .map_err(|e| format!("bad P-256 issuer public key: {e}"))?;
            let sig = p256::ecdsa::Signature::from_der(signature)
                .map_err(|e| format!("bad ECDSA signature bytes: {e}"))?;
            vk.verify(tbs_der, &sig)
                .map_err(|_| "certificate signature verification failed".to_string())
        }
        "1.2.840.10045.4.3.3" => {
            let pk = p384::PublicKey::from_public_key_der(issuer_spki_der)
                .map_err(|e| format!("bad P-384 issuer public key: {e}"))?;
            let ep = pk.to_encoded_point(false);
            let vk = p384::ecdsa::VerifyingKey::from_sec1_bytes(ep.as_bytes())
                .map_err(|e| format!("bad P-384 issuer public key: {e}"))?;
            let sig = p384::ecdsa::Signature::from_der(signature)
                .map_err(|e| format!("bad ECDSA signature bytes: {e}"))?;
            vk.verify(tbs_der, &sig)
                .map_err(|_| "certificate signature verification failed".to_string())
        }
        "1.2.840.10045.4.3.4" => {
            let pk = p521::PublicKey::from_public_key_der(issuer_spki_der)
                .map_err(|e| format!("bad P-521 issuer public key: {e}"))?;
            let ep = pk.to_encoded_point(false);
            let vk = p521::ecdsa::VerifyingKey::from_sec1_bytes(ep.as_bytes())
                .map_err(|e| format!("bad P-521 issuer public key: {e}"))?;
            let sig = p521::ecdsa::Signature::from_der(signature)
                .map_err(|e| format!("bad ECDSA signature bytes: {e}"))?;
            vk.verify(tbs_der, &sig)
                .map_err(|_| "certificate signature verification failed".to_string())
        }

        _ => Err(format!(
            "unsupported certificate signature algorithm OID: {signature_oid}"
        )),
    }
}

fn rsa_public_key_from_spki(spki_der: &[u8]) -> Result<RsaPublicKey, String> {
    RsaPublicKey::from_public_key_der(spki_der).map_err(|e| format!("bad RSA public key: {e}"))
}
