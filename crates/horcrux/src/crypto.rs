//! randomness helpers shared by the primitives

use rand::RngCore;

/// generate random bytes
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// generate a random byte vector
pub fn random_vec(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_lengths() {
        assert_eq!(random_bytes::<8>().len(), 8);
        assert_eq!(random_vec(42).len(), 42);
        assert!(random_vec(0).is_empty());
    }

    #[test]
    fn test_random_differs() {
        assert_ne!(random_bytes::<32>(), random_bytes::<32>());
    }
}
