//! authenticated public-key encryption for shard payloads
//!
//! x25519 with an ephemeral sender key, hkdf-sha256 key derivation,
//! chacha20-poly1305. the output is self-contained:
//! `ephemeral_pub(32) ‖ nonce(12) ‖ ciphertext ‖ tag(16)`, base64url.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use crate::codec;
use crate::{Error, Result};

const KEY_LENGTH: usize = 32;
const NONCE_LENGTH: usize = 12;
const TAG_LENGTH: usize = 16;

/// x25519 keypair held by a recipient
///
/// the client keeps one per handshake attempt to open the response
#[derive(Clone)]
pub struct BoxKeyPair {
    pub secret: StaticSecret,
    pub public: PublicKey,
}

impl BoxKeyPair {
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(rand::thread_rng());
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// base64url public key, as sent in request params
    pub fn public_b64(&self) -> String {
        codec::b64_encode(self.public.as_bytes())
    }
}

impl std::fmt::Debug for BoxKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxKeyPair")
            .field("public", &self.public_b64())
            .finish_non_exhaustive()
    }
}

/// parse a base64url x25519 public key
pub fn parse_public_key(encoded: &str) -> Result<PublicKey> {
    let bytes = codec::b64_decode_array::<32>(encoded)
        .map_err(|e| Error::InvalidKey(e.to_string()))?;
    Ok(PublicKey::from(bytes))
}

/// encrypt `plaintext` to `recipient`
pub fn encrypt(plaintext: &[u8], recipient: &PublicKey) -> Result<String> {
    let mut rng = rand::thread_rng();

    let ephemeral_secret = EphemeralSecret::random_from_rng(&mut rng);
    let ephemeral_public = PublicKey::from(&ephemeral_secret);
    let shared = ephemeral_secret.diffie_hellman(recipient);

    let key = derive_key(shared.as_bytes(), &ephemeral_public, recipient)?;

    let mut nonce = [0u8; NONCE_LENGTH];
    rng.fill_bytes(&mut nonce);

    let cipher = ChaCha20Poly1305::new_from_slice(&key)
        .map_err(|e| Error::EncryptionFailed(e.to_string()))?;
    let sealed = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| Error::EncryptionFailed(e.to_string()))?;

    let mut out = Vec::with_capacity(32 + NONCE_LENGTH + sealed.len());
    out.extend_from_slice(ephemeral_public.as_bytes());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);
    Ok(codec::b64_encode(&out))
}

/// decrypt a ciphertext produced by [`encrypt`]
pub fn decrypt(ciphertext: &str, secret: &StaticSecret) -> Result<Vec<u8>> {
    let bytes = codec::b64_decode(ciphertext).map_err(|_| Error::DecryptionFailed)?;
    if bytes.len() < 32 + NONCE_LENGTH + TAG_LENGTH {
        return Err(Error::DecryptionFailed);
    }

    let mut epk = [0u8; 32];
    epk.copy_from_slice(&bytes[..32]);
    let ephemeral_public = PublicKey::from(epk);
    let nonce = &bytes[32..32 + NONCE_LENGTH];
    let sealed = &bytes[32 + NONCE_LENGTH..];

    let recipient = PublicKey::from(secret);
    let shared = secret.diffie_hellman(&ephemeral_public);
    let key = derive_key(shared.as_bytes(), &ephemeral_public, &recipient)?;

    let cipher = ChaCha20Poly1305::new_from_slice(&key).map_err(|_| Error::DecryptionFailed)?;
    cipher
        .decrypt(Nonce::from_slice(nonce), sealed)
        .map_err(|_| Error::DecryptionFailed)
}

/// derive the aead key, binding both public keys
fn derive_key(shared: &[u8], ephemeral: &PublicKey, recipient: &PublicKey) -> Result<[u8; KEY_LENGTH]> {
    let mut salt = [0u8; 64];
    salt[..32].copy_from_slice(ephemeral.as_bytes());
    salt[32..].copy_from_slice(recipient.as_bytes());

    let hk = Hkdf::<Sha256>::new(Some(&salt), shared);
    let mut key = [0u8; KEY_LENGTH];
    hk.expand(b"horcrux:box:v1", &mut key)
        .map_err(|e| Error::EncryptionFailed(e.to_string()))?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt() {
        let keypair = BoxKeyPair::generate();
        let ciphertext = encrypt(b"Hello, World !", &keypair.public).unwrap();
        let plaintext = decrypt(&ciphertext, &keypair.secret).unwrap();
        assert_eq!(plaintext, b"Hello, World !");
    }

    #[test]
    fn test_wrong_key_fails() {
        let keypair_a = BoxKeyPair::generate();
        let keypair_b = BoxKeyPair::generate();
        let ciphertext = encrypt(b"Hello, World !", &keypair_a.public).unwrap();
        assert!(matches!(
            decrypt(&ciphertext, &keypair_b.secret),
            Err(Error::DecryptionFailed)
        ));
    }

    #[test]
    fn test_secret_key_used_for_encryption_fails() {
        // same length as a public key, so it can only be caught at decryption
        let keypair = BoxKeyPair::generate();
        let confused = PublicKey::from(keypair.secret.to_bytes());
        let ciphertext = encrypt(b"Hello, World !", &confused).unwrap();
        assert!(matches!(
            decrypt(&ciphertext, &keypair.secret),
            Err(Error::DecryptionFailed)
        ));
    }

    #[test]
    fn test_public_key_used_for_decryption_fails() {
        let keypair = BoxKeyPair::generate();
        let ciphertext = encrypt(b"Hello, World !", &keypair.public).unwrap();
        let confused = StaticSecret::from(keypair.public.to_bytes());
        assert!(matches!(
            decrypt(&ciphertext, &confused),
            Err(Error::DecryptionFailed)
        ));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let keypair = BoxKeyPair::generate();
        let ciphertext = encrypt(b"Hello, World !", &keypair.public).unwrap();
        let mut bytes = codec::b64_decode(&ciphertext).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x80;
        assert!(matches!(
            decrypt(&codec::b64_encode(&bytes), &keypair.secret),
            Err(Error::DecryptionFailed)
        ));

        // truncated below header + tag
        assert!(matches!(
            decrypt(&codec::b64_encode(&bytes[..40]), &keypair.secret),
            Err(Error::DecryptionFailed)
        ));
    }

    #[test]
    fn test_ciphertexts_are_randomized() {
        let keypair = BoxKeyPair::generate();
        let a = encrypt(b"same", &keypair.public).unwrap();
        let b = encrypt(b"same", &keypair.public).unwrap();
        assert_ne!(a, b);
    }
}
