// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! COSE header maps with typed accessors for the fragment envelope headers.
//!
//! The protected header map keeps the exact CBOR bytes it was decoded from
//! (or encoded to, on the signing path): the Sig_structure is computed over
//! those bytes, so they must never be re-derived from the decoded entries.

use std::collections::BTreeMap;

use minicbor::data::Type;
use minicbor::{Decoder, Encoder};

use crate::{
    EnvelopeError, HEADER_KEY_FEED, HEADER_KEY_ISSUER, HEADER_LABEL_ALG,
    HEADER_LABEL_CONTENT_TYPE, HEADER_LABEL_X5CHAIN,
};

/// A COSE header label: either an integer from the IANA registry or an
/// application-chosen text key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum HeaderLabel {
    Int(i64),
    Text(String),
}

/// A decoded COSE header value.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Int(i64),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<HeaderValue>),
    Map(BTreeMap<HeaderLabel, HeaderValue>),
    Bool(bool),
    Null,
}

/// An ordered COSE header map.
///
/// `raw_cbor` is only populated for protected maps; unprotected maps are
/// re-encoded from their entries when the envelope is serialized.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct HeaderMap {
    raw_cbor: Vec<u8>,
    entries: BTreeMap<HeaderLabel, HeaderValue>,
}

impl HeaderMap {
    /// The encoded map bytes this header set was decoded from or encoded to.
    pub fn raw_cbor(&self) -> &[u8] {
        &self.raw_cbor
    }

    pub fn entries(&self) -> &BTreeMap<HeaderLabel, HeaderValue> {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert an entry. The raw encoding is invalidated; call
    /// [`HeaderMap::seal`] once the map is complete.
    pub fn insert(&mut self, label: HeaderLabel, value: HeaderValue) {
        self.raw_cbor.clear();
        self.entries.insert(label, value);
    }

    /// Encode the entries and freeze the result as the map's raw bytes.
    ///
    /// Labels are emitted in `HeaderLabel` order (integers ascending, then
    /// text keys), which keeps the encoding deterministic for a given set
    /// of entries.
    pub fn seal(&mut self) -> Result<(), EnvelopeError> {
        let mut enc = Encoder::new(Vec::new());
        encode_entries(&mut enc, &self.entries)
            .map_err(|e| EnvelopeError::Malformed(format!("failed to encode header map: {e}")))?;
        self.raw_cbor = enc.into_writer();
        Ok(())
    }

    pub fn get(&self, label: &HeaderLabel) -> Option<&HeaderValue> {
        self.entries.get(label)
    }

    pub fn get_i64(&self, label: i64) -> Option<i64> {
        match self.entries.get(&HeaderLabel::Int(label)) {
            Some(HeaderValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn get_text(&self, key: &str) -> Option<&str> {
        match self.entries.get(&HeaderLabel::Text(key.to_string())) {
            Some(HeaderValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn get_array(&self, label: i64) -> Option<&[HeaderValue]> {
        match self.entries.get(&HeaderLabel::Int(label)) {
            Some(HeaderValue::Array(a)) => Some(a.as_slice()),
            _ => None,
        }
    }

    /// The `alg` header (label 1), wherever it appears.
    pub fn algorithm_id(&self) -> Option<i64> {
        self.get_i64(HEADER_LABEL_ALG)
    }

    /// The payload content type (label 3) when carried as text.
    pub fn content_type(&self) -> Option<&str> {
        match self.entries.get(&HeaderLabel::Int(HEADER_LABEL_CONTENT_TYPE)) {
            Some(HeaderValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// The fragment issuer (`iss` text key).
    pub fn issuer(&self) -> Option<&str> {
        self.get_text(HEADER_KEY_ISSUER)
    }

    /// The fragment feed (`feed` text key).
    pub fn feed(&self) -> Option<&str> {
        self.get_text(HEADER_KEY_FEED)
    }

    /// The `x5chain` certificate chain (label 33): an ordered array of DER
    /// certificates, leaf first. A single bstr is accepted as a one-element
    /// chain, as COSE permits.
    pub fn cert_chain_der(&self) -> Option<Vec<Vec<u8>>> {
        match self.entries.get(&HeaderLabel::Int(HEADER_LABEL_X5CHAIN))? {
            HeaderValue::Bytes(b) => Some(vec![b.clone()]),
            HeaderValue::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        HeaderValue::Bytes(b) => out.push(b.clone()),
                        _ => return None,
                    }
                }
                Some(out)
            }
            _ => None,
        }
    }
}

fn encode_entries(
    enc: &mut Encoder<Vec<u8>>,
    entries: &BTreeMap<HeaderLabel, HeaderValue>,
) -> Result<(), minicbor::encode::Error<std::convert::Infallible>> {
    enc.map(entries.len() as u64)?;
    for (label, value) in entries {
        match label {
            HeaderLabel::Int(i) => enc.i64(*i)?,
            HeaderLabel::Text(s) => enc.str(s)?,
        };
        encode_value(enc, value)?;
    }
    Ok(())
}

fn encode_value(
    enc: &mut Encoder<Vec<u8>>,
    value: &HeaderValue,
) -> Result<(), minicbor::encode::Error<std::convert::Infallible>> {
    match value {
        HeaderValue::Int(i) => {
            enc.i64(*i)?;
        }
        HeaderValue::Bytes(b) => {
            enc.bytes(b)?;
        }
        HeaderValue::Text(s) => {
            enc.str(s)?;
        }
        HeaderValue::Bool(b) => {
            enc.bool(*b)?;
        }
        HeaderValue::Null => {
            enc.null()?;
        }
        HeaderValue::Array(items) => {
            enc.array(items.len() as u64)?;
            for item in items {
                encode_value(enc, item)?;
            }
        }
        HeaderValue::Map(entries) => {
            encode_entries(enc, entries)?;
        }
    }
    Ok(())
}

/// Decode a protected header map from its enclosing bstr contents.
///
/// An empty bstr is an empty map, per COSE.
pub(crate) fn decode_header_map_from_cbor(bytes: &[u8]) -> Result<HeaderMap, String> {
    let mut map = HeaderMap {
        raw_cbor: bytes.to_vec(),
        entries: BTreeMap::new(),
    };

    if bytes.is_empty() {
        return Ok(map);
    }

    let mut dec = Decoder::new(bytes);
    map.entries = decode_entries(&mut dec)?;

    if dec.position() != bytes.len() {
        return Err("trailing bytes after header map".to_string());
    }

    Ok(map)
}

/// Decode an unprotected header map in place from an envelope decoder.
pub(crate) fn decode_header_map_from_decoder(dec: &mut Decoder<'_>) -> Result<HeaderMap, String> {
    Ok(HeaderMap {
        raw_cbor: Vec::new(),
        entries: decode_entries(dec)?,
    })
}

fn decode_entries(dec: &mut Decoder<'_>) -> Result<BTreeMap<HeaderLabel, HeaderValue>, String> {
    let len = dec
        .map()
        .map_err(|e| format!("failed to read map: {e}"))?
        .ok_or_else(|| "indefinite-length maps are not supported".to_string())?;

    let mut entries = BTreeMap::new();
    for _ in 0..len {
        let label = decode_label(dec)?;
        let value = decode_value(dec)?;
        entries.insert(label, value);
    }

    Ok(entries)
}

fn decode_label(dec: &mut Decoder<'_>) -> Result<HeaderLabel, String> {
    match dec.datatype().map_err(|e| e.to_string())? {
        Type::I8
        | Type::I16
        | Type::I32
        | Type::I64
        | Type::Int
        | Type::U8
        | Type::U16
        | Type::U32
        | Type::U64 => {
            let i = dec
                .i64()
                .map_err(|e| format!("failed to decode int header label: {e}"))?;
            Ok(HeaderLabel::Int(i))
        }
        Type::String => {
            let s = dec
                .str()
                .map_err(|e| format!("failed to decode text header label: {e}"))?;
            Ok(HeaderLabel::Text(s.to_string()))
        }
        other => Err(format!("unsupported header label type: {other:?}")),
    }
}

fn decode_value(dec: &mut Decoder<'_>) -> Result<HeaderValue, String> {
    match dec.datatype().map_err(|e| e.to_string())? {
        Type::Null => {
            dec.null().map_err(|e| e.to_string())?;
            Ok(HeaderValue::Null)
        }
        Type::Bool => {
            let b = dec.bool().map_err(|e| e.to_string())?;
            Ok(HeaderValue::Bool(b))
        }
        Type::Bytes => {
            let b = dec.bytes().map_err(|e| e.to_string())?;
            Ok(HeaderValue::Bytes(b.to_vec()))
        }
        Type::String => {
            let s = dec.str().map_err(|e| e.to_string())?;
            Ok(HeaderValue::Text(s.to_string()))
        }
        Type::I8
        | Type::I16
        | Type::I32
        | Type::I64
        | Type::Int
        | Type::U8
        | Type::U16
        | Type::U32
        | Type::U64 => {
            let i = dec.i64().map_err(|e| e.to_string())?;
            Ok(HeaderValue::Int(i))
        }
        Type::Array => {
            let len = dec
                .array()
                .map_err(|e| format!("failed to read array: {e}"))?
                .ok_or_else(|| "indefinite-length arrays are not supported".to_string())?;
            let mut out = Vec::with_capacity(len as usize);
            for _ in 0..len {
                out.push(decode_value(dec)?);
            }
            Ok(HeaderValue::Array(out))
        }
        Type::Map => {
            let len = dec
                .map()
                .map_err(|e| format!("failed to read nested map: {e}"))?
                .ok_or_else(|| "indefinite-length maps are not supported".to_string())?;
            let mut out = BTreeMap::new();
            for _ in 0..len {
                let k = decode_label(dec)?;
                let v = decode_value(dec)?;
                out.insert(k, v);
            }
            Ok(HeaderValue::Map(out))
        }
        other => Err(format!("unsupported header value type: {other:?}")),
    }
}
