// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! COSE_Sign1 envelope codec for signed security-policy fragments.
//!
//! Policy fragments travel as COSE_Sign1 envelopes: protected headers carry
//! the algorithm, content type and issuer/feed identity, the unprotected
//! headers carry the signing certificate chain, and the payload is the
//! rendered fragment document. This crate owns the wire codec and the raw
//! signature primitives; it never makes trust decisions.
//!
//! Design note: to keep the public API simple, parsing, encoding and signing
//! are exposed directly at the crate root.

mod algorithms;
mod envelope;
mod error;
mod header_map;
mod sign;
mod verify;

pub use algorithms::CoseAlgorithm;
pub use envelope::{
    encode_cose_sign1, encode_signature1_sig_structure, parse_cose_sign1, ParsedCoseSign1,
    COSE_SIGN1_TAG,
};
pub use error::{EnvelopeError, SignatureError};
pub use header_map::{HeaderLabel, HeaderMap, HeaderValue};
pub use sign::{create_cose_sign1, SaltMode};
pub use verify::{leaf_spki_der, verify_sig_structure};

/// COSE header label for the signature algorithm.
pub const HEADER_LABEL_ALG: i64 = 1;
/// COSE header label for the payload content type.
pub const HEADER_LABEL_CONTENT_TYPE: i64 = 3;
/// COSE header label for the `x5chain` certificate chain.
pub const HEADER_LABEL_X5CHAIN: i64 = 33;
/// Protected header text key carrying the fragment issuer DID.
pub const HEADER_KEY_ISSUER: &str = "iss";
/// Protected header text key carrying the fragment feed name.
pub const HEADER_KEY_FEED: &str = "feed";
