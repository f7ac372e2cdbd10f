//! time-based one-time codes (rfc 6238)
//!
//! 30-second step, 6 digits, hmac-sha1. the hmac key is the secret string's
//! own bytes, so both sides only need to agree on the encoded secret.

use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha1::Sha1;
use subtle::ConstantTimeEq;

use crate::codec;
use crate::crypto::random_vec;
use crate::{Error, Result};

type HmacSha1 = Hmac<Sha1>;

/// time step in seconds
pub const STEP: u64 = 30;

/// code length
pub const DIGITS: u32 = 6;

/// windows accepted on each side of the current one
pub const SKEW: u64 = 1;

/// default secret length in bytes
pub const SECRET_LENGTH: usize = 32;

/// random secret of `length` bytes, base64url encoded
pub fn new_secret(length: usize) -> String {
    codec::b64_encode(&random_vec(length))
}

/// code for the current window
pub fn generate_code(secret: &str) -> Result<String> {
    generate_code_at(secret, unix_now())
}

/// code for the window containing `unix_seconds`
pub fn generate_code_at(secret: &str, unix_seconds: u64) -> Result<String> {
    hotp(secret.as_bytes(), unix_seconds / STEP)
}

/// check `code` against the current window, with skew tolerance
pub fn verify_code(code: &str, secret: &str) -> Result<()> {
    verify_code_at(code, secret, unix_now())
}

pub fn verify_code_at(code: &str, secret: &str, unix_seconds: u64) -> Result<()> {
    if code.len() != DIGITS as usize || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidCode);
    }

    let counter = unix_seconds / STEP;
    let first = counter.saturating_sub(SKEW);
    let mut matched = false;
    for c in first..=counter + SKEW {
        let expected = hotp(secret.as_bytes(), c)?;
        // no early exit, every window is computed
        matched |= bool::from(expected.as_bytes().ct_eq(code.as_bytes()));
    }

    if matched {
        Ok(())
    } else {
        Err(Error::InvalidCode)
    }
}

/// rfc 4226 hotp with dynamic truncation
fn hotp(key: &[u8], counter: u64) -> Result<String> {
    let mut mac =
        HmacSha1::new_from_slice(key).map_err(|e| Error::InvalidKey(e.to_string()))?;
    mac.update(&counter.to_be_bytes());
    let hash = mac.finalize().into_bytes();

    let offset = (hash[hash.len() - 1] & 0x0f) as usize;
    let binary = ((hash[offset] as u32 & 0x7f) << 24)
        | ((hash[offset + 1] as u32) << 16)
        | ((hash[offset + 2] as u32) << 8)
        | (hash[offset + 3] as u32);

    let code = binary % 10u32.pow(DIGITS);
    Ok(format!("{:0width$}", code, width = DIGITS as usize))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
