// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Certificate-chain verification for signed policy fragments.
//!
//! A fragment envelope carries its signing chain in the `x5chain` header,
//! leaf first. This crate authenticates the envelope: it walks the chain
//! link by link, anchors the terminal certificate against caller-supplied
//! trust (or a self-signed leaf in permissive/dev mode), recomputes the
//! envelope signature with the leaf key, and only then hands back the
//! issuer identity and payload as an [`UnpackedDocument`].

mod chain;
mod error;
mod pem;
mod unpack;

pub use chain::ChainState;
pub use error::VerifyError;
pub use pem::{decode_certs_pem, encode_pem};
pub use unpack::{unpack_and_verify, UnpackedDocument};
