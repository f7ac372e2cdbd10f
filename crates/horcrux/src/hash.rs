//! sha-256 message digests over encoded strings

use sha2::{Digest, Sha256};

use crate::codec::{self, Encoding};
use crate::Result;

/// sha-256 of the decoded input
pub fn digest_raw(input: &str, input_encoding: Encoding) -> Result<[u8; 32]> {
    let bytes = codec::decode(input, input_encoding)?;
    Ok(Sha256::digest(&bytes).into())
}

/// sha-256 of the decoded input, re-encoded
pub fn digest(input: &str, input_encoding: Encoding, output_encoding: Encoding) -> Result<String> {
    let hash = digest_raw(input, input_encoding)?;
    codec::encode(&hash, output_encoding)
}
