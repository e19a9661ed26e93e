// src/miner/target.rs
//! Difficulty to target conversion
//!
//! A digest is accepted when, read as a big-endian unsigned integer, it is
//! strictly below `2^(256 - difficulty)`.

use crate::types::{Digest, Round};
use alloy::primitives::U256;

/// Bit width of the digest's numeric space
pub const DIGEST_BITS: u32 = 256;

/// Lowest difficulty the miner will ever search at
pub const MIN_DIFFICULTY: u32 = 1;

/// Identity modulus and divisor used for the per-miner adjustment
const IDENTITY_MODULUS: u64 = 100_000;
const IDENTITY_DIVISOR: u64 = 100;

/// Converts contract difficulty into a per-miner difficulty and target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetPolicy {
    identity: u64,
}

impl TargetPolicy {
    /// Creates a policy for the given miner identity (the NFT id)
    pub fn new(identity: u64) -> Self {
        TargetPolicy { identity }
    }

    /// Miner identity used for the adjustment
    pub fn identity(&self) -> u64 {
        self.identity
    }

    /// Difficulty reduction granted to this miner
    pub fn adjustment(&self) -> u64 {
        (self.identity % IDENTITY_MODULUS) / IDENTITY_DIVISOR
    }

    /// `max(1, raw_difficulty - (identity mod 100000) / 100)`
    ///
    /// Identity 123456 reduces by 234, so raw difficulty 50 becomes 1, not
    /// 16; the contract computes the same. Raw 50 gives 16 for identity
    /// 3456, see `effective_difficulty_small_identity`.
    pub fn effective_difficulty(&self, raw_difficulty: u64) -> u32 {
        let adjusted = raw_difficulty.saturating_sub(self.adjustment());
        u32::try_from(adjusted)
            .unwrap_or(u32::MAX)
            .max(MIN_DIFFICULTY)
    }

    /// Builds the round for a freshly observed block
    pub fn round(&self, block_number: u64, raw_difficulty: u64) -> Round {
        Round {
            block_number,
            raw_difficulty,
            effective_difficulty: self.effective_difficulty(raw_difficulty),
        }
    }
}

/// Returns `2^(256 - effective_difficulty)`
///
/// Difficulty 0 is clamped to 1 so the result always fits in 256 bits.
/// Difficulties above 256 give a zero threshold that accepts nothing.
pub fn acceptance_threshold(effective_difficulty: u32) -> U256 {
    let difficulty = effective_difficulty.max(MIN_DIFFICULTY);
    if difficulty > DIGEST_BITS {
        return U256::ZERO;
    }
    U256::from(1u8) << ((DIGEST_BITS - difficulty) as usize)
}

/// True iff the digest, as an unsigned integer, is strictly below the threshold
#[inline]
pub fn accepts(digest: &Digest, threshold: &U256) -> bool {
    U256::from_be_bytes(*digest) < *threshold
}
