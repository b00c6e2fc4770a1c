//! Content hash used to index the save database.

use sha1::{Digest, Sha1};

/// 160-bit SHA-1 digest.
pub type Sha1Digest = [u8; 20];

/// SHA-1 over the padded ROM image.
pub fn content_hash(rom: &[u8]) -> Sha1Digest {
    Sha1::digest(rom).into()
}

/// Database key: the first 64 bits of the digest as a big-endian integer.
pub fn hash_key(digest: &Sha1Digest) -> u64 {
    let mut key = [0u8; 8];
    key.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_matches_known_vector() {
        assert_eq!(
            hex::encode(content_hash(b"abc")),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn key_is_big_endian_prefix() {
        let digest = content_hash(b"abc");
        assert_eq!(hash_key(&digest), 0xA999_3E36_4706_816A);
    }
}
