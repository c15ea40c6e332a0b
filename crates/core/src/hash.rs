//! Blake3 hashing utilities for the ledger.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// A named alias for a 32-byte(u8) array, used to represent a 256-bit digest.
pub type H256 = [u8; 32];

/// Errors produced when parsing a digest from text.
#[derive(Debug, Error, PartialEq)]
pub enum ParseHashError {
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// A wrapper type for H256 with Display and Debug formatting.
///
/// JSON and other human-readable formats see the lowercase hex string;
/// binary formats (bincode) see the raw 32 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Hash(pub H256);

impl Hash {
    /// The zero hash. Used as the genesis block's previous hash.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create a new Hash from raw bytes.
    pub fn from_bytes(bytes: H256) -> Self {
        Self(bytes)
    }

    /// Get the underlying bytes.
    pub fn as_bytes(&self) -> &H256 {
        &self.0
    }

    /// Convert to a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, ParseHashError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(ParseHashError::InvalidLength(bytes.len()));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Number of leading `0` characters in the hex rendering.
    pub fn leading_zero_nibbles(&self) -> u32 {
        let mut count = 0;
        for byte in self.0 {
            if byte == 0 {
                count += 2;
                continue;
            }
            if byte >> 4 == 0 {
                count += 1;
            }
            break;
        }
        count
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", &self.to_hex()[..8])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<H256> for Hash {
    fn from(bytes: H256) -> Self {
        Self(bytes)
    }
}

impl From<Hash> for H256 {
    fn from(hash: Hash) -> Self {
        hash.0
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Hash::from_hex(&s).map_err(serde::de::Error::custom)
        } else {
            H256::deserialize(deserializer).map(Hash)
        }
    }
}

/// Hash arbitrary data using Blake3.
pub fn hash(data: &[u8]) -> Hash {
    Hash(blake3::hash(data).into())
}

/// Hash multiple pieces of data by concatenating them.
pub fn hash_concat(parts: &[&[u8]]) -> Hash {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    Hash(hasher.finalize().into())
}

/// Hash the canonical (bincode) encoding of a value.
///
/// Field order of `value`'s type fixes the canonical layout, so two equal
/// values always produce the same digest.
pub fn hash_encoded<T: Serialize + ?Sized>(value: &T) -> Hash {
    let encoded = bincode::serialize(value).expect("serialization should not fail");
    hash(&encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        let data = b"hello world";
        let h1 = hash(data);
        let h2 = hash(data);
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_hash_different_inputs() {
        let h1 = hash(b"hello");
        let h2 = hash(b"world");
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_hash_hex_roundtrip() {
        let h = hash(b"test data");
        let parsed = Hash::from_hex(&h.to_hex()).unwrap();
        assert_eq!(h, parsed);
    }

    #[test]
    fn test_from_hex_wrong_length() {
        assert_eq!(
            Hash::from_hex("abcd"),
            Err(ParseHashError::InvalidLength(2))
        );
        assert!(matches!(
            Hash::from_hex("zz"),
            Err(ParseHashError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_from_hex_odd_length() {
        assert_eq!(
            Hash::from_hex("abc"),
            Err(ParseHashError::InvalidHex(hex::FromHexError::OddLength))
        );
    }

    #[test]
    fn test_hash_display() {
        let h = hash(b"test");
        assert_eq!(format!("{}", h).len(), 64);
    }

    #[test]
    fn test_hash_concat() {
        let h1 = hash_concat(&[b"hello", b"world"]);
        let h2 = hash(b"helloworld");
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_leading_zero_nibbles() {
        assert_eq!(Hash::ZERO.leading_zero_nibbles(), 64);

        let mut bytes = [0xFFu8; 32];
        assert_eq!(Hash(bytes).leading_zero_nibbles(), 0);

        bytes[0] = 0x0F;
        assert_eq!(Hash(bytes).leading_zero_nibbles(), 1);

        bytes[0] = 0x00;
        bytes[1] = 0x1F;
        assert_eq!(Hash(bytes).leading_zero_nibbles(), 2);

        bytes[1] = 0x01;
        assert_eq!(Hash(bytes).leading_zero_nibbles(), 3);
    }

    #[test]
    fn test_leading_zero_nibbles_matches_hex() {
        for i in 0u32..64 {
            let h = hash(&i.to_le_bytes());
            let hex_zeros = h.to_hex().chars().take_while(|c| *c == '0').count() as u32;
            assert_eq!(h.leading_zero_nibbles(), hex_zeros);
        }
    }

    #[test]
    fn test_json_uses_hex() {
        let h = hash(b"json");
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{}\"", h.to_hex()));
        let back: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn test_bincode_uses_raw_bytes() {
        let h = hash(b"bincode");
        let encoded = bincode::serialize(&h).unwrap();
        assert_eq!(encoded.len(), 32);
        let back: Hash = bincode::deserialize(&encoded).unwrap();
        assert_eq!(back, h);
    }
}
