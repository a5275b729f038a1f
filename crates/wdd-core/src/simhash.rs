//! Weighted simhash over BLAKE2b-512 token digests.
//!
//! Each distinct token votes on every output bit with its weight: `+w` when
//! the matching digest bit is set, `-w` otherwise. A bit of the fingerprint
//! is set only when its tally ends strictly positive, so near-identical
//! token multisets land a small Hamming distance apart.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use blake2::{Blake2b512, Digest};

use crate::error::AppError;
use crate::models::FeatureMap;

/// Widest fingerprint that fits the `u64` representation.
pub const MAX_WIDTH: u32 = 64;

/// Number of bytes in the canonical serialized form.
pub const ENCODED_LEN: usize = 8;

/// A simhash fingerprint; bit `i` of the value is output bit `i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    /// Hamming distance between two fingerprints (XOR + popcount).
    pub fn hamming_distance(&self, other: &Self) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    /// Little-endian byte form: byte `i` holds bits `[8i, 8i+8)`.
    pub fn to_bytes(self) -> [u8; ENCODED_LEN] {
        self.0.to_le_bytes()
    }

    /// Inverse of [`to_bytes`](Self::to_bytes) that tolerates short input.
    ///
    /// Missing high bytes are zero; anything past the eighth byte is ignored.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut buf = [0u8; ENCODED_LEN];
        let n = bytes.len().min(ENCODED_LEN);
        buf[..n].copy_from_slice(&bytes[..n]);
        Fingerprint(u64::from_le_bytes(buf))
    }

    /// Standard base64 of the 8-byte little-endian form.
    pub fn encode(self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    pub fn decode(encoded: &str) -> Result<Self, AppError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| AppError::DecodeError(format!("invalid base64 fingerprint: {e}")))?;
        Ok(Self::from_bytes(&bytes))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

/// Clamp a configured bit width to `[1, 64]`.
pub fn effective_width(size: u32) -> u32 {
    size.clamp(1, MAX_WIDTH)
}

/// Compute the `size`-bit simhash of a weighted token multiset.
///
/// `size` is clamped with [`effective_width`]. An empty multiset yields the
/// all-zero fingerprint (every tally is a zero tie).
pub fn fingerprint(features: &FeatureMap, size: u32) -> Fingerprint {
    let width = effective_width(size) as usize;
    let mut tally = vec![0i64; width];

    for (token, &weight) in features {
        let digest = Blake2b512::digest(token.as_bytes());
        let weight = i64::from(weight);
        for (i, slot) in tally.iter_mut().enumerate() {
            if digest_bit(&digest, i) {
                *slot += weight;
            } else {
                *slot -= weight;
            }
        }
    }

    let value = tally
        .iter()
        .enumerate()
        .filter(|&(_, &v)| v > 0)
        .fold(0u64, |acc, (i, _)| acc | (1u64 << i));

    Fingerprint(value)
}

/// Bit `i` of the digest, most-significant-bit first within each byte.
fn digest_bit(digest: &[u8], i: usize) -> bool {
    (digest[i / 8] >> (7 - (i % 8))) & 1 == 1
}
