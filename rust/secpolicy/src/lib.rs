// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Trust-and-composition pipeline for confidential-container security
//! policies.
//!
//! This crate is the primary entry point; it re-exports the layered
//! workspace crates and adds the one composition they are always used in:
//!
//! 1. A fragment author renders a sub-policy ([`marshal_fragment`]) and
//!    signs it into a COSE_Sign1 envelope ([`create_cose_sign1`]).
//! 2. A consumer decodes and authenticates the envelope
//!    ([`unpack_and_verify`]), authorizes it against an expected issuer,
//!    feed and minimum SVN ([`authorize`]), and only then references it
//!    from its own [`SecurityPolicy`].
//! 3. The merged policy is rendered once ([`SecurityPolicy::marshal`])
//!    and handed to the external policy-decision engine.

use thiserror::Error;

pub use secpolicy_cose::{
    create_cose_sign1, encode_cose_sign1, encode_signature1_sig_structure, parse_cose_sign1,
    CoseAlgorithm, EnvelopeError, HeaderLabel, HeaderMap, HeaderValue, ParsedCoseSign1, SaltMode,
};
pub use secpolicy_fragments::{
    authorize, AuthorizeError, SvnParseError, SvnVersion, VerifiedFragment,
};
pub use secpolicy_policy::{
    marshal_fragment, Container, EnvRuleConfig, EnvRuleStrategy, ExecProcessConfig,
    ExternalProcessConfig, FragmentConfig, MountConfig, PolicyError, PolicyFormat, SecurityPolicy,
};
pub use secpolicy_x509::{unpack_and_verify, UnpackedDocument, VerifyError};

/// Any failure along the fragment consumption pipeline.
#[derive(Debug, Error)]
pub enum FragmentLoadError {
    #[error(transparent)]
    Verify(#[from] VerifyError),

    #[error(transparent)]
    Authorize(#[from] AuthorizeError),
}

/// Decode, authenticate and authorize a signed fragment in one step.
///
/// This is the consumer-side pipeline: envelope bytes in, trusted fragment
/// out. Rejection anywhere is all-or-nothing; no fragment content is
/// exposed on failure.
pub fn load_fragment(
    raw: &[u8],
    trust_anchor_pem: Option<&[u8]>,
    allow_self_signed: bool,
    expected_issuer: &str,
    expected_feed: &str,
    required_minimum_svn: &str,
) -> Result<VerifiedFragment, FragmentLoadError> {
    let unpacked = unpack_and_verify(raw, trust_anchor_pem, allow_self_signed, false)?;
    Ok(authorize(
        &unpacked,
        expected_issuer,
        expected_feed,
        required_minimum_svn,
    )?)
}
