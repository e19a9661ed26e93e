// src/miner/algorithm/mod.rs
//! Proof-of-work hash functions
//!
//! The digest computed here must match the contract's verifier bit for bit;
//! any difference in how the two integers are encoded makes every
//! submission revert.

/// SHA-256 over the ABI encoding of `(uint256 block, uint256 nonce)`
pub mod sha256;

pub use sha256::Sha256Pow;

use crate::types::Digest;

/// Common interface for PoW hash functions
///
/// Implementations must be pure: the same inputs always give the same
/// digest. The search workers and the test doubles both go through this
/// trait.
pub trait HashFunction: Send + Sync {
    /// Compute the digest for a block number and nonce
    fn digest(&self, block_number: u64, nonce: u64) -> Digest;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}
