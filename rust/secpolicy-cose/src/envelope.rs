// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! COSE_Sign1 wire codec.
//!
//! The envelope is the standard 4-tuple `[protected bstr, unprotected map,
//! payload bstr / null, signature bstr]`, optionally wrapped in CBOR tag 18.
//! Decoding never verifies anything; a decoded envelope is untrusted input
//! until it has been through the chain verifier.

use minicbor::data::{Tag, Type};
use minicbor::{Decoder, Encoder};

use crate::header_map::{decode_header_map_from_cbor, decode_header_map_from_decoder};
use crate::{CoseAlgorithm, EnvelopeError, HeaderMap};

pub const COSE_SIGN1_TAG: u64 = 18;
const SIG_STRUCTURE_CONTEXT_SIGNATURE1: &str = "Signature1";

/// A decoded (or about-to-be-encoded) COSE_Sign1 envelope.
///
/// Immutable once signed: the signature is computed over the protected
/// header bytes and payload, so any later mutation invalidates it.
#[derive(Debug, Clone, Default)]
pub struct ParsedCoseSign1 {
    pub protected_headers: HeaderMap,
    pub unprotected_headers: HeaderMap,
    /// `None` means the payload travels detached from the envelope.
    pub payload: Option<Vec<u8>>,
    pub signature: Vec<u8>,
}

/// Parse a COSE_Sign1 envelope from its CBOR encoding.
///
/// Structural problems and an `alg` header naming an algorithm this codec
/// does not support are both decode failures.
pub fn parse_cose_sign1(input: &[u8]) -> Result<ParsedCoseSign1, EnvelopeError> {
    let parsed = parse_inner(input).map_err(EnvelopeError::Malformed)?;

    let alg = parsed
        .protected_headers
        .algorithm_id()
        .or_else(|| parsed.unprotected_headers.algorithm_id());
    if let Some(id) = alg {
        CoseAlgorithm::from_cose_id(id)?;
    }

    Ok(parsed)
}

fn parse_inner(input: &[u8]) -> Result<ParsedCoseSign1, String> {
    if input.is_empty() {
        return Err("empty input".to_string());
    }

    let mut dec = Decoder::new(input);

    // Optional COSE_Sign1 tag (18)
    if matches!(dec.datatype().map_err(|e| e.to_string())?, Type::Tag) {
        let tag = dec.tag().map_err(|e| format!("failed to read CBOR tag: {e}"))?;
        if tag != Tag::new(COSE_SIGN1_TAG) {
            return Err("unexpected CBOR tag (expected COSE_Sign1 tag 18 or no tag)".to_string());
        }
    }

    let len = dec
        .array()
        .map_err(|e| format!("top-level item is not an array: {e}"))?
        .ok_or_else(|| "indefinite-length arrays are not supported".to_string())?;

    if len != 4 {
        return Err("array length was not 4".to_string());
    }

    // protected headers (bstr-wrapped map)
    let protected_bstr = dec
        .bytes()
        .map_err(|e| format!("failed to read protected headers (bstr): {e}"))?;

    let protected_headers = decode_header_map_from_cbor(protected_bstr)?;

    // unprotected headers (map)
    if !matches!(dec.datatype().map_err(|e| e.to_string())?, Type::Map) {
        return Err("unprotected headers are not a map".to_string());
    }

    let unprotected_headers = decode_header_map_from_decoder(&mut dec)?;

    // payload (bstr or null for detached)
    let payload = match dec.datatype().map_err(|e| e.to_string())? {
        Type::Null => {
            dec.null().map_err(|e| e.to_string())?;
            None
        }
        Type::Bytes => Some(
            dec.bytes()
                .map_err(|e| format!("failed to read payload (bstr or null): {e}"))?
                .to_vec(),
        ),
        _ => return Err("failed to read payload (bstr or null)".to_string()),
    };

    // signature (bstr)
    let signature = dec
        .bytes()
        .map_err(|e| format!("failed to read signature (bstr): {e}"))?
        .to_vec();

    if dec.position() != input.len() {
        return Err("trailing bytes after COSE_Sign1".to_string());
    }

    Ok(ParsedCoseSign1 {
        protected_headers,
        unprotected_headers,
        payload,
        signature,
    })
}

/// Encode an envelope to its tagged CBOR wire form.
pub fn encode_cose_sign1(msg: &ParsedCoseSign1) -> Result<Vec<u8>, EnvelopeError> {
    let unprotected = {
        let mut map = msg.unprotected_headers.clone();
        map.seal()?;
        map
    };

    let mut out = Vec::with_capacity(
        64 + msg.protected_headers.raw_cbor().len()
            + unprotected.raw_cbor().len()
            + msg.payload.as_ref().map_or(0, Vec::len)
            + msg.signature.len(),
    );
    let mut enc = Encoder::new(&mut out);
    fn err<E: std::fmt::Display>(e: E) -> EnvelopeError {
        EnvelopeError::Malformed(format!("failed to encode envelope: {e}"))
    }

    enc.tag(Tag::new(COSE_SIGN1_TAG)).map_err(err)?;
    enc.array(4).map_err(err)?;
    enc.bytes(msg.protected_headers.raw_cbor()).map_err(err)?;
    // The unprotected map is spliced in pre-encoded: Encoder has no
    // raw-append, so write the already-valid map bytes directly.
    drop(enc);
    out.extend_from_slice(unprotected.raw_cbor());
    let mut enc = Encoder::new(&mut out);
    match &msg.payload {
        Some(p) => enc.bytes(p).map_err(err)?,
        None => enc.null().map_err(err)?,
    };
    enc.bytes(&msg.signature).map_err(err)?;

    Ok(out)
}

/// Encode the canonical `Signature1` Sig_structure for an envelope.
///
/// For detached payloads the caller supplies the payload bytes out of band;
/// the signature is always computed over the real payload.
pub fn encode_signature1_sig_structure(
    msg: &ParsedCoseSign1,
    external_payload: Option<&[u8]>,
) -> Result<Vec<u8>, EnvelopeError> {
    let payload = match (&msg.payload, external_payload) {
        (Some(p), _) => p.as_slice(),
        (None, Some(ext)) => ext,
        (None, None) => {
            return Err(EnvelopeError::Malformed(
                "detached payload requires external payload bytes".to_string(),
            ))
        }
    };

    let mut out =
        Vec::with_capacity(128 + msg.protected_headers.raw_cbor().len() + payload.len());
    let mut enc = Encoder::new(&mut out);
    fn err<E: std::fmt::Display>(e: E) -> EnvelopeError {
        EnvelopeError::Malformed(format!("failed to encode Sig_structure: {e}"))
    }
    enc.array(4).map_err(err)?;
    enc.str(SIG_STRUCTURE_CONTEXT_SIGNATURE1).map_err(err)?;
    enc.bytes(msg.protected_headers.raw_cbor()).map_err(err)?;
    enc.bytes(&[]).map_err(err)?; // external_aad empty bstr
    enc.bytes(payload).map_err(err)?;

    Ok(out)
}
