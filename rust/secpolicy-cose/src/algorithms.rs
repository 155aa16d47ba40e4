// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::EnvelopeError;

/// Supported COSE algorithms (IANA COSE Algorithms registry).
///
/// Fragments are signed with the ECDSA family; the registry ids are the
/// values carried in the protected `alg` header.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(i64)]
pub enum CoseAlgorithm {
    /// ECDSA w/ SHA-256 over P-256.
    ES256 = -7,
    /// ECDSA w/ SHA-384 over P-384.
    ES384 = -35,
    /// ECDSA w/ SHA-512 over P-521.
    ES512 = -36,
}

impl CoseAlgorithm {
    /// The IANA registry id carried in the `alg` header.
    pub fn cose_id(self) -> i64 {
        self as i64
    }

    /// Map an `alg` header value onto a supported algorithm.
    pub fn from_cose_id(id: i64) -> Result<Self, EnvelopeError> {
        match id {
            -7 => Ok(CoseAlgorithm::ES256),
            -35 => Ok(CoseAlgorithm::ES384),
            -36 => Ok(CoseAlgorithm::ES512),
            other => Err(EnvelopeError::UnsupportedAlgorithm(other)),
        }
    }
}
