// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

/// Errors produced by the envelope codec.
///
/// Structural decode failures, unusable key material and signing failures
/// are distinct variants so callers can tell corrupted wire bytes apart
/// from caller-side configuration mistakes.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("malformed COSE_Sign1 envelope: {0}")]
    Malformed(String),

    #[error("unsupported COSE algorithm: {0}")]
    UnsupportedAlgorithm(i64),

    #[error("invalid signing key: {0}")]
    InvalidSigningKey(String),

    #[error("invalid certificate chain: {0}")]
    InvalidCertificateChain(String),

    #[error("signing failed: {0}")]
    Signing(String),
}

/// Errors produced by raw signature verification.
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("signature does not verify")]
    Mismatch,
}
