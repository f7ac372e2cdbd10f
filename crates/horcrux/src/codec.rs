//! string codecs for key, digest and ciphertext material
//!
//! - utf8 text
//! - lowercase hex
//! - url-safe base64 (padded on output, lenient on input)

use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// how a string maps to bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[default]
    Utf8,
    Hex,
    Base64,
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Encoding::Utf8 => write!(f, "utf8"),
            Encoding::Hex => write!(f, "hex"),
            Encoding::Base64 => write!(f, "base64"),
        }
    }
}

/// encode bytes as a string
///
/// fails only for [`Encoding::Utf8`] when the bytes are not valid utf-8
pub fn encode(bytes: &[u8], encoding: Encoding) -> Result<String> {
    match encoding {
        Encoding::Utf8 => String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::DecodeError(format!("invalid utf-8: {}", e))),
        Encoding::Hex => Ok(hex::encode(bytes)),
        Encoding::Base64 => Ok(b64_encode(bytes)),
    }
}

/// decode a string into bytes
pub fn decode(input: &str, encoding: Encoding) -> Result<Vec<u8>> {
    match encoding {
        Encoding::Utf8 => Ok(input.as_bytes().to_vec()),
        Encoding::Hex => {
            hex::decode(input).map_err(|e| Error::DecodeError(format!("invalid hex: {}", e)))
        }
        Encoding::Base64 => b64_decode(input),
    }
}

/// url-safe base64 with padding
pub fn b64_encode(bytes: &[u8]) -> String {
    URL_SAFE.encode(bytes)
}

/// base64 decoding accepting both alphabets, with or without padding
pub fn b64_decode(input: &str) -> Result<Vec<u8>> {
    let normalized: String = input
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            c => c,
        })
        .collect();
    URL_SAFE_NO_PAD
        .decode(normalized)
        .map_err(|e| Error::DecodeError(format!("invalid base64: {}", e)))
}

/// decode base64 into a fixed-size array
pub(crate) fn b64_decode_array<const N: usize>(input: &str) -> Result<[u8; N]> {
    let bytes = b64_decode(input)?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| Error::DecodeError(format!("expected {} bytes, got {}", N, len)))
}

pub fn base64_to_hex(input: &str) -> Result<String> {
    Ok(hex::encode(b64_decode(input)?))
}

pub fn hex_to_base64url(input: &str) -> Result<String> {
    let bytes =
        hex::decode(input).map_err(|e| Error::DecodeError(format!("invalid hex: {}", e)))?;
    Ok(b64_encode(&bytes))
}
