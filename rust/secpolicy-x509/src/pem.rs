// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! PEM rendering and reading.
//!
//! Verified leaf material is handed to callers in PEM text form; trust
//! anchors arrive the same way.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use x509_parser::pem::Pem;

/// Render DER bytes as a PEM block with 64-column base64 body.
pub fn encode_pem(label: &str, der: &[u8]) -> String {
    let body = STANDARD.encode(der);

    let mut out = String::with_capacity(body.len() + body.len() / 64 + 2 * label.len() + 40);
    out.push_str("-----BEGIN ");
    out.push_str(label);
    out.push_str("-----\n");
    for chunk in body.as_bytes().chunks(64) {
        // chunks of an ASCII base64 string are always valid UTF-8
        out.push_str(std::str::from_utf8(chunk).unwrap_or_default());
        out.push('\n');
    }
    out.push_str("-----END ");
    out.push_str(label);
    out.push_str("-----\n");
    out
}

/// Read all CERTIFICATE blocks from a PEM buffer, in order.
pub fn decode_certs_pem(pem: &[u8]) -> Result<Vec<Vec<u8>>, String> {
    let mut certs = Vec::new();
    for block in Pem::iter_from_buffer(pem) {
        let block = block.map_err(|e| format!("bad PEM block: {e}"))?;
        if block.label == "CERTIFICATE" {
            certs.push(block.contents);
        }
    }
    Ok(certs)
}
