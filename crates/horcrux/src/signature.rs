//! ed25519 signatures over sha-256 digests
//!
//! the signed blob embeds the digest it covers (`signature ‖ digest`), so a
//! verifier checks both the signature and that the embedded digest matches
//! its own recomputation of the input.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey, SIGNATURE_LENGTH};

use crate::codec::{self, Encoding};
use crate::hash::digest_raw;
use crate::{Error, Result};

const DIGEST_LENGTH: usize = 32;

/// sign the sha-256 digest of `input`
///
/// returns the base64url `signature ‖ digest` blob
pub fn sign(input: &str, input_encoding: Encoding, secret_key: &SigningKey) -> Result<String> {
    let digest = digest_raw(input, input_encoding)?;
    let signature = secret_key.sign(&digest);

    let mut blob = Vec::with_capacity(SIGNATURE_LENGTH + DIGEST_LENGTH);
    blob.extend_from_slice(&signature.to_bytes());
    blob.extend_from_slice(&digest);
    Ok(codec::b64_encode(&blob))
}

/// verify a blob produced by [`sign`] against `input`
///
/// returns the verified digest, base64url encoded
pub fn verify(
    input: &str,
    signature: &str,
    public_key: &VerifyingKey,
    input_encoding: Encoding,
) -> Result<String> {
    let blob = codec::b64_decode(signature).map_err(|_| Error::InvalidSignature)?;
    if blob.len() != SIGNATURE_LENGTH + DIGEST_LENGTH {
        return Err(Error::InvalidSignature);
    }
    let (sig_bytes, embedded) = blob.split_at(SIGNATURE_LENGTH);
    let sig = Signature::from_slice(sig_bytes).map_err(|_| Error::InvalidSignature)?;

    public_key
        .verify_strict(embedded, &sig)
        .map_err(|_| Error::InvalidSignature)?;

    let expected = digest_raw(input, input_encoding)?;
    if embedded != expected.as_slice() {
        return Err(Error::InvalidSignature);
    }

    Ok(codec::b64_encode(&expected))
}

/// parse a base64url ed25519 secret key (32-byte seed or 64-byte keypair)
pub fn parse_signing_key(encoded: &str) -> Result<SigningKey> {
    let bytes = codec::b64_decode(encoded)?;
    match bytes.len() {
        32 => {
            let mut seed = [0u8; 32];
            seed.copy_from_slice(&bytes);
            Ok(SigningKey::from_bytes(&seed))
        }
        64 => {
            let mut keypair = [0u8; 64];
            keypair.copy_from_slice(&bytes);
            SigningKey::from_keypair_bytes(&keypair)
                .map_err(|e| Error::InvalidKey(e.to_string()))
        }
        n => Err(Error::InvalidKey(format!(
            "ed25519 secret key must be 32 or 64 bytes, got {}",
            n
        ))),
    }
}

/// parse a base64url ed25519 public key
pub fn parse_verifying_key(encoded: &str) -> Result<VerifyingKey> {
    let bytes = codec::b64_decode_array::<32>(encoded)?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| Error::InvalidKey(e.to_string()))
}

/// encode a secret key as a base64url 64-byte keypair
pub fn encode_signing_key(key: &SigningKey) -> String {
    codec::b64_encode(&key.to_keypair_bytes())
}

pub fn encode_verifying_key(key: &VerifyingKey) -> String {
    codec::b64_encode(key.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn keypair() -> SigningKey {
        SigningKey::generate(&mut OsRng)
    }

    #[test]
    fn test_sign_verify_utf8() {
        let key = keypair();
        let message = "Hello, World !";
        let sig = sign(message, Encoding::Utf8, &key).unwrap();
        let digest = verify(message, &sig, &key.verifying_key(), Encoding::Utf8).unwrap();
        assert_eq!(digest, "fUhpFbkUMyu1cw_XciI-iydpGeUe3KLeD4LF_BvOfrU=");
    }

    #[test]
    fn test_sign_verify_base64() {
        let key = keypair();
        let message = "BY5Fcm4PGJZZMhqMB3fAPnDSSScX2/PSpJgLz1WIK1E=";
        let sig = sign(message, Encoding::Base64, &key).unwrap();
        let digest = verify(message, &sig, &key.verifying_key(), Encoding::Base64).unwrap();
        assert_eq!(digest, "GkJZItrhYIwTzDGJf_WrzNvifqb6ladImYv605RY-S0=");
    }

    #[test]
    fn test_sign_verify_hex() {
        let key = keypair();
        let message = "2543150184508be826606da40ea19ee0f8b25467cb6d5a9480";
        let sig = sign(message, Encoding::Hex, &key).unwrap();
        let digest = verify(message, &sig, &key.verifying_key(), Encoding::Hex).unwrap();
        assert_eq!(digest, "hJBHHJzqcsJb0Qtp5nSf3DfykS98L_JHmfxi0iAtP0g=");
    }

    #[test]
    fn test_wrong_key_fails() {
        let key_a = keypair();
        let key_b = keypair();
        let sig = sign("Hello, World !", Encoding::Utf8, &key_a).unwrap();
        let result = verify("Hello, World !", &sig, &key_b.verifying_key(), Encoding::Utf8);
        assert!(matches!(result, Err(Error::InvalidSignature)));
    }

    #[test]
    fn test_modified_message_fails() {
        let key = keypair();
        let sig = sign("Hello, World !", Encoding::Utf8, &key).unwrap();
        let result = verify("not the same message", &sig, &key.verifying_key(), Encoding::Utf8);
        assert!(matches!(result, Err(Error::InvalidSignature)));
    }

    #[test]
    fn test_unrelated_valid_signature_fails() {
        // a genuine signature over some other digest must not pass for this input
        let key = keypair();
        let other = sign("something else", Encoding::Utf8, &key).unwrap();
        let result = verify("Hello, World !", &other, &key.verifying_key(), Encoding::Utf8);
        assert!(matches!(result, Err(Error::InvalidSignature)));
    }

    #[test]
    fn test_tampered_blob_fails() {
        let key = keypair();
        let sig = sign("Hello, World !", Encoding::Utf8, &key).unwrap();
        let mut blob = codec::b64_decode(&sig).unwrap();
        blob[70] ^= 0x01;
        let tampered = codec::b64_encode(&blob);
        let result = verify("Hello, World !", &tampered, &key.verifying_key(), Encoding::Utf8);
        assert!(matches!(result, Err(Error::InvalidSignature)));

        let garbage = verify("Hello, World !", "not-a-signature", &key.verifying_key(), Encoding::Utf8);
        assert!(matches!(garbage, Err(Error::InvalidSignature)));
    }

    #[test]
    fn test_key_encoding_roundtrip() {
        let key = keypair();
        let parsed = parse_signing_key(&encode_signing_key(&key)).unwrap();
        assert_eq!(parsed.to_bytes(), key.to_bytes());

        let seed_only = parse_signing_key(&codec::b64_encode(&key.to_bytes())).unwrap();
        assert_eq!(seed_only.verifying_key(), key.verifying_key());

        let public = parse_verifying_key(&encode_verifying_key(&key.verifying_key())).unwrap();
        assert_eq!(public, key.verifying_key());

        assert!(parse_signing_key(&codec::b64_encode(&[1u8; 16])).is_err());
    }
}
