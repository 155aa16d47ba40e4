// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use secpolicy_cose::{EnvelopeError, SignatureError};
use thiserror::Error;

/// Trust failures reported by envelope verification.
///
/// Each security-relevant outcome is a distinct variant: callers branch on
/// the variant, never on the message text, to tell a corrupted document
/// from a wrong key from an untrusted issuer.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("malformed envelope: {0}")]
    Malformed(#[from] EnvelopeError),

    #[error("no certificate chain in envelope headers")]
    MissingChain,

    #[error("certificate {index} in chain is invalid: {detail}")]
    InvalidCertificate { index: usize, detail: String },

    #[error("invalid trust anchor: {0}")]
    InvalidTrustAnchor(String),

    #[error("certificate chain broken at link {link}: {detail}")]
    ChainBroken { link: usize, detail: String },

    #[error("chain terminal certificate is not trusted: {0}")]
    UntrustedAnchor(String),

    #[error("envelope signature is invalid: {0}")]
    SignatureInvalid(#[from] SignatureError),
}
