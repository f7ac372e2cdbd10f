//! threshold secret sharing using shamir's scheme over GF(256)
//!
//! every byte of the secret gets its own random polynomial of degree
//! `threshold - 1`; share `i` holds the evaluations at `x = i`.
//!
//! shares carry a random group id, the threshold and their index, so
//! combining can reject shares from different splits and refuse to
//! interpolate below the threshold.

use rand::RngCore;
use zeroize::Zeroize;

use crate::codec::{self, Encoding};
use crate::crypto::random_bytes;
use crate::{Error, Result};

/// maximum number of shares (indices are non-zero bytes)
pub const MAX_SHARES: usize = 255;

const VERSION: u8 = 1;
const HEADER_LENGTH: usize = 1 + 8 + 1 + 1;

/// a single share
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Share {
    /// random id common to every share of one split
    pub id: [u8; 8],
    /// shares needed to reconstruct
    pub threshold: u8,
    /// share index (1-indexed, must be non-zero)
    pub index: u8,
    /// share data (same length as secret)
    pub data: Vec<u8>,
}

impl Share {
    /// `version ‖ id ‖ threshold ‖ index ‖ data`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LENGTH + self.data.len());
        bytes.push(VERSION);
        bytes.extend_from_slice(&self.id);
        bytes.push(self.threshold);
        bytes.push(self.index);
        bytes.extend_from_slice(&self.data);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LENGTH || bytes[0] != VERSION {
            return Err(Error::InvalidShareFormat);
        }
        let mut id = [0u8; 8];
        id.copy_from_slice(&bytes[1..9]);
        let threshold = bytes[9];
        let index = bytes[10];
        if threshold == 0 || index == 0 {
            return Err(Error::InvalidShareFormat);
        }
        Ok(Self {
            id,
            threshold,
            index,
            data: bytes[HEADER_LENGTH..].to_vec(),
        })
    }

    pub fn to_base64(&self) -> String {
        codec::b64_encode(&self.to_bytes())
    }

    pub fn from_base64(s: &str) -> Result<Self> {
        let bytes = codec::b64_decode(s).map_err(|_| Error::InvalidShareFormat)?;
        Self::from_bytes(&bytes)
    }
}

/// GF(256) multiplication using AES polynomial (x^8 + x^4 + x^3 + x + 1)
fn gf256_mul(a: u8, b: u8) -> u8 {
    let mut result = 0u8;
    let mut a = a;
    let mut b = b;

    while b != 0 {
        if b & 1 != 0 {
            result ^= a;
        }
        let hi = a & 0x80;
        a <<= 1;
        if hi != 0 {
            a ^= 0x1b;
        }
        b >>= 1;
    }
    result
}

/// GF(256) multiplicative inverse, a^254
fn gf256_inv(a: u8) -> u8 {
    if a == 0 {
        return 0;
    }
    let mut result = a;
    for _ in 0..6 {
        result = gf256_mul(result, result);
        result = gf256_mul(result, a);
    }
    gf256_mul(result, result)
}

fn gf256_div(a: u8, b: u8) -> u8 {
    gf256_mul(a, gf256_inv(b))
}

/// evaluate polynomial at point x
fn poly_eval(coeffs: &[u8], x: u8) -> u8 {
    // horner, highest coefficient first
    coeffs
        .iter()
        .rev()
        .fold(0u8, |acc, &coeff| gf256_mul(acc, x) ^ coeff)
}

/// lagrange interpolation at x=0
fn lagrange_interpolate(points: &[(u8, u8)]) -> u8 {
    let mut result = 0u8;

    for (i, &(xi, yi)) in points.iter().enumerate() {
        let mut num = 1u8;
        let mut den = 1u8;

        for (j, &(xj, _)) in points.iter().enumerate() {
            if i != j {
                num = gf256_mul(num, xj); // (0 - xj) = xj in GF(256)
                den = gf256_mul(den, xi ^ xj); // (xi - xj)
            }
        }

        result ^= gf256_mul(yi, gf256_div(num, den));
    }

    result
}

/// split raw bytes into `num_shards` shares, any `threshold` of which recover them
pub fn split_bytes(secret: &[u8], num_shards: usize, threshold: usize) -> Result<Vec<Share>> {
    if threshold == 0 {
        return Err(Error::InvalidParameters("threshold must be at least 1".into()));
    }
    if threshold > num_shards {
        return Err(Error::InvalidParameters(format!(
            "threshold {} exceeds number of shards {}",
            threshold, num_shards
        )));
    }
    if num_shards > MAX_SHARES {
        return Err(Error::InvalidParameters(format!(
            "at most {} shards are supported, got {}",
            MAX_SHARES, num_shards
        )));
    }

    let id: [u8; 8] = random_bytes();
    let mut shares: Vec<Share> = (1..=num_shards)
        .map(|i| Share {
            id,
            threshold: threshold as u8,
            index: i as u8,
            data: Vec::with_capacity(secret.len()),
        })
        .collect();

    let mut rng = rand::thread_rng();
    let mut coeffs = vec![0u8; threshold];
    for &byte in secret {
        // f(x) = byte + a1*x + ... + a(t-1)*x^(t-1)
        coeffs[0] = byte;
        rng.fill_bytes(&mut coeffs[1..]);

        for share in shares.iter_mut() {
            share.data.push(poly_eval(&coeffs, share.index));
        }
    }
    coeffs.zeroize();

    Ok(shares)
}

/// reconstruct raw bytes from at least `threshold` shares of one split
pub fn combine_bytes(shares: &[Share]) -> Result<Vec<u8>> {
    let first = shares.first().ok_or(Error::InsufficientShares { have: 0, need: 1 })?;

    for share in shares {
        if share.id != first.id
            || share.threshold != first.threshold
            || share.data.len() != first.data.len()
        {
            return Err(Error::MismatchedShares);
        }
    }

    let mut indices: Vec<u8> = shares.iter().map(|s| s.index).collect();
    indices.sort_unstable();
    if indices.windows(2).any(|w| w[0] == w[1]) {
        return Err(Error::MismatchedShares);
    }

    let need = first.threshold as usize;
    if shares.len() < need {
        return Err(Error::InsufficientShares {
            have: shares.len(),
            need,
        });
    }

    let used = &shares[..need];
    let secret = (0..first.data.len())
        .map(|i| {
            let points: Vec<(u8, u8)> = used.iter().map(|s| (s.index, s.data[i])).collect();
            lagrange_interpolate(&points)
        })
        .collect();

    Ok(secret)
}

/// split an encoded secret into base64url shares
pub fn split(
    secret: &str,
    num_shards: usize,
    threshold: usize,
    encoding: Encoding,
) -> Result<Vec<String>> {
    let bytes = codec::decode(secret, encoding)?;
    let shares = split_bytes(&bytes, num_shards, threshold)?;
    Ok(shares.iter().map(Share::to_base64).collect())
}

/// combine base64url shares, returning the secret in `encoding`
pub fn combine<S: AsRef<str>>(shares: &[S], encoding: Encoding) -> Result<String> {
    let parsed = shares
        .iter()
        .map(|s| Share::from_base64(s.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    let secret = combine_bytes(&parsed)?;
    codec::encode(&secret, encoding)
}
