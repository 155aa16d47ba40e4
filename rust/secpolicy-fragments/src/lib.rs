// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Fragment authorization.
//!
//! A fragment that survived cryptographic verification still has to be
//! *authorized*: its issuer and feed must match the identity the consumer
//! expects, and its declared security version number must be at or above
//! the consumer's required minimum. This is a pure decision function with
//! no I/O and no mutation, so it is testable independently of the crypto
//! layer.

mod svn;

use std::str::FromStr;

use secpolicy_x509::UnpackedDocument;
use thiserror::Error;
use tracing::debug;

pub use svn::{SvnParseError, SvnVersion};

/// Authorization failures.
///
/// Policy rejections (wrong identity, stale SVN) are distinct from
/// malformed-payload failures so callers can tell a rollback attempt from
/// a broken artifact.
#[derive(Debug, Error)]
pub enum AuthorizeError {
    #[error("fragment issuer {actual:?} does not match expected issuer {expected:?}")]
    IssuerMismatch { expected: String, actual: String },

    #[error("fragment feed {actual:?} does not match expected feed {expected:?}")]
    FeedMismatch { expected: String, actual: String },

    #[error("fragment SVN {actual} is below the required minimum {required}")]
    SvnTooLow {
        required: SvnVersion,
        actual: SvnVersion,
    },

    #[error("malformed fragment payload: {0}")]
    MalformedFragment(String),

    #[error(transparent)]
    InvalidSvn(#[from] SvnParseError),
}

/// A fragment that passed the trust gate.
///
/// Only now may its content be merged into a consumer policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedFragment {
    pub issuer: String,
    pub feed: String,
    /// The Rego package namespace the fragment declares.
    pub namespace: String,
    /// The SVN the fragment declares for itself.
    pub svn: SvnVersion,
    pub payload: Vec<u8>,
}

/// Authorize a verified fragment against an expected identity and minimum
/// SVN.
///
/// Issuer and feed are compared exactly (case-sensitive). The fragment's
/// own namespace and SVN are read from the `package` and `svn := "..."`
/// bindings at the head of its payload, the shape the fragment
/// serializer emits.
pub fn authorize(
    document: &UnpackedDocument,
    expected_issuer: &str,
    expected_feed: &str,
    required_minimum_svn: &str,
) -> Result<VerifiedFragment, AuthorizeError> {
    if document.issuer != expected_issuer {
        return Err(AuthorizeError::IssuerMismatch {
            expected: expected_issuer.to_string(),
            actual: document.issuer.clone(),
        });
    }

    if document.feed != expected_feed {
        return Err(AuthorizeError::FeedMismatch {
            expected: expected_feed.to_string(),
            actual: document.feed.clone(),
        });
    }

    let required = SvnVersion::from_str(required_minimum_svn)?;
    let (namespace, declared_svn) = parse_fragment_header(&document.payload)?;
    let actual = SvnVersion::from_str(&declared_svn)?;

    if actual < required {
        return Err(AuthorizeError::SvnTooLow { required, actual });
    }

    debug!(
        issuer = %document.issuer,
        feed = %document.feed,
        namespace = %namespace,
        svn = %actual,
        "fragment authorized"
    );

    Ok(VerifiedFragment {
        issuer: document.issuer.clone(),
        feed: document.feed.clone(),
        namespace,
        svn: actual,
        payload: document.payload.clone(),
    })
}

/// Extract the `package` namespace and declared SVN from a fragment
/// payload.
fn parse_fragment_header(payload: &[u8]) -> Result<(String, String), AuthorizeError> {
    let text = std::str::from_utf8(payload)
        .map_err(|_| AuthorizeError::MalformedFragment("payload is not UTF-8".to_string()))?;

    let mut namespace = None;
    let mut svn = None;

    for line in text.lines() {
        let line = line.trim();
        if namespace.is_none() {
            if let Some(rest) = line.strip_prefix("package ") {
                let name = rest.trim();
                if name.is_empty() {
                    return Err(AuthorizeError::MalformedFragment(
                        "empty package namespace".to_string(),
                    ));
                }
                namespace = Some(name.to_string());
                continue;
            }
        }
        if svn.is_none() {
            if let Some(rest) = line.strip_prefix("svn := ") {
                let value = rest.trim();
                let value = value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .ok_or_else(|| {
                        AuthorizeError::MalformedFragment(
                            "svn binding is not a quoted string".to_string(),
                        )
                    })?;
                svn = Some(value.to_string());
            }
        }
        if namespace.is_some() && svn.is_some() {
            break;
        }
    }

    match (namespace, svn) {
        (Some(ns), Some(svn)) => Ok((ns, svn)),
        (None, _) => Err(AuthorizeError::MalformedFragment(
            "no package declaration in fragment".to_string(),
        )),
        (_, None) => Err(AuthorizeError::MalformedFragment(
            "no svn declaration in fragment".to_string(),
        )),
    }
}
