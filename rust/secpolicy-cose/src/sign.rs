// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Envelope creation and signing.

use p256::pkcs8::DecodePrivateKey as _;
use rand_core::OsRng;
use signature::{RandomizedSigner, Signer};
use x509_parser::pem::Pem;

use crate::{
    encode_cose_sign1, encode_signature1_sig_structure, CoseAlgorithm, EnvelopeError, HeaderLabel,
    HeaderMap, HeaderValue, ParsedCoseSign1, HEADER_KEY_FEED, HEADER_KEY_ISSUER, HEADER_LABEL_ALG,
    HEADER_LABEL_CONTENT_TYPE, HEADER_LABEL_X5CHAIN,
};

/// Nonce-generation policy for ECDSA signing.
///
/// `Zero` derives nonces deterministically (RFC 6979), so signing the same
/// inputs twice yields byte-identical envelopes; reproducible fixtures
/// depend on this. `Random` draws nonces from the OS RNG. This is a
/// configuration choice for the auxiliary signing randomness, not a
/// weakening of the signature scheme.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SaltMode {
    Zero,
    Random,
}

impl SaltMode {
    /// Map the wire-level salt names (`"zero"` / `"rand"`) onto a mode.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "zero" => Some(SaltMode::Zero),
            "rand" => Some(SaltMode::Random),
            _ => None,
        }
    }
}

/// Create a signed COSE_Sign1 fragment envelope.
///
/// Protected headers carry the algorithm, content type and issuer/feed
/// identity; the unprotected headers carry the certificate chain (leaf
/// first). With `detached` the payload slot is null on the wire but the
/// signature is still computed over `payload`.
#[allow(clippy::too_many_arguments)]
pub fn create_cose_sign1(
    payload: &[u8],
    issuer: &str,
    feed: &str,
    content_type: &str,
    cert_chain_pem: &[u8],
    private_key_pem: &[u8],
    salt: SaltMode,
    algorithm: CoseAlgorithm,
    detached: bool,
) -> Result<Vec<u8>, EnvelopeError> {
    let chain_der = decode_cert_chain_pem(cert_chain_pem)?;

    let mut protected_headers = HeaderMap::default();
    protected_headers.insert(
        HeaderLabel::Int(HEADER_LABEL_ALG),
        HeaderValue::Int(algorithm.cose_id()),
    );
    protected_headers.insert(
        HeaderLabel::Int(HEADER_LABEL_CONTENT_TYPE),
        HeaderValue::Text(content_type.to_string()),
    );
    protected_headers.insert(
        HeaderLabel::Text(HEADER_KEY_ISSUER.to_string()),
        HeaderValue::Text(issuer.to_string()),
    );
    protected_headers.insert(
        HeaderLabel::Text(HEADER_KEY_FEED.to_string()),
        HeaderValue::Text(feed.to_string()),
    );
    protected_headers.seal()?;

    let mut unprotected_headers = HeaderMap::default();
    unprotected_headers.insert(
        HeaderLabel::Int(HEADER_LABEL_X5CHAIN),
        HeaderValue::Array(chain_der.into_iter().map(HeaderValue::Bytes).collect()),
    );

    let mut msg = ParsedCoseSign1 {
        protected_headers,
        unprotected_headers,
        payload: Some(payload.to_vec()),
        signature: Vec::new(),
    };

    let sig_structure = encode_signature1_sig_structure(&msg, None)?;
    msg.signature = sign_sig_structure(algorithm, private_key_pem, salt, &sig_structure)?;

    if detached {
        msg.payload = None;
    }

    encode_cose_sign1(&msg)
}

fn decode_cert_chain_pem(cert_chain_pem: &[u8]) -> Result<Vec<Vec<u8>>, EnvelopeError> {
    let mut chain = Vec::new();
    for pem in Pem::iter_from_buffer(cert_chain_pem) {
        let pem = pem.map_err(|e| {
            EnvelopeError::InvalidCertificateChain(format!("bad PEM block: {e}"))
        })?;
        if pem.label == "CERTIFICATE" {
            chain.push(pem.contents);
        }
    }

    if chain.is_empty() {
        return Err(EnvelopeError::InvalidCertificateChain(
            "no CERTIFICATE blocks in signing chain".to_string(),
        ));
    }

    Ok(chain)
}

fn sign_sig_structure(
    algorithm: CoseAlgorithm,
    private_key_pem: &[u8],
    salt: SaltMode,
    sig_structure: &[u8],
) -> Result<Vec<u8>, EnvelopeError> {
    let pem = std::str::from_utf8(private_key_pem)
        .map_err(|_| EnvelopeError::InvalidSigningKey("private key PEM is not UTF-8".to_string()))?;

    let bad_key =
        |e: p256::pkcs8::Error| EnvelopeError::InvalidSigningKey(format!("bad PKCS#8 key: {e}"));

    // COSE carries the raw fixed-width r||s form, not DER.
    match algorithm {
        CoseAlgorithm::ES256 => {
            let key = p256::ecdsa::SigningKey::from_pkcs8_pem(pem).map_err(bad_key)?;
            let sig: p256::ecdsa::Signature = match salt {
                SaltMode::Zero => key.sign(sig_structure),
                SaltMode::Random => key.sign_with_rng(&mut OsRng, sig_structure),
            };
            Ok(sig.to_bytes().to_vec())
        }
        CoseAlgorithm::ES384 => {
            let key = p384::ecdsa::SigningKey::from_pkcs8_pem(pem).map_err(bad_key)?;
            let sig: p384::ecdsa::Signature = match salt {
                SaltMode::Zero => key.sign(sig_structure),
                SaltMode::Random => key.sign_with_rng(&mut OsRng, sig_structure),
            };
            Ok(sig.to_bytes().to_vec())
        }
        CoseAlgorithm::ES512 => {
            // p521 0.13's ecdsa::SigningKey is a newtype that does not expose
            // `DecodePrivateKey`, so parse the PKCS#8 PEM into a SecretKey (which
            // does) and rebuild the signing key from its scalar bytes.
            let secret = p521::SecretKey::from_pkcs8_pem(pem).map_err(bad_key)?;
            let key = p521::ecdsa::SigningKey::from_bytes(&secret.to_bytes()).map_err(|e| {
                EnvelopeError::InvalidSigningKey(format!("bad PKCS#8 key: {e}"))
            })?;
            let sig: p521::ecdsa::Signature = match salt {
                SaltMode::Zero => key.sign(sig_structure),
                SaltMode::Random => key.sign_with_rng(&mut OsRng, sig_structure),
            };
            Ok(sig.to_bytes().to_vec())
        }
    }
}
