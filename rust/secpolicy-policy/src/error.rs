// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

/// Construction and serialization failures.
///
/// These are all local, construction-time errors: a policy either builds
/// and renders completely or not at all.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("cannot specify allow_all with a non-empty containers list")]
    InvalidOpenDoorPolicy,

    #[error("invalid environment variable rule pattern {rule:?}: {detail}")]
    InvalidPattern { rule: String, detail: String },

    #[error("unknown policy encoding: {0:?}")]
    UnknownEncoding(String),

    #[error("invalid fragment namespace: {0:?}")]
    InvalidNamespace(String),

    #[error("failed to encode policy JSON: {0}")]
    Json(#[from] serde_json::Error),
}
