// src/miner/algorithm/sha256.rs
//! SHA-256 PoW digest
//!
//! The contract hashes `abi.encode(blockNumber, nonce)`: two 32-byte
//! big-endian words, concatenated, then a single SHA-256 pass.

use crate::miner::algorithm::HashFunction;
use crate::types::Digest;
use sha2::{Digest as _, Sha256};

/// Length of one ABI-encoded `uint256` word
const WORD: usize = 32;

/// SHA-256 over two ABI-encoded `uint256` words
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Pow;

impl Sha256Pow {
    /// Creates the hash function
    pub fn new() -> Self {
        Sha256Pow
    }

    /// Builds the 64-byte preimage for `(block_number, nonce)`
    ///
    /// Both values are left-padded with zeros to a full 256-bit word.
    pub fn preimage(block_number: u64, nonce: u64) -> [u8; 2 * WORD] {
        let mut data = [0u8; 2 * WORD];
        data[WORD - 8..WORD].copy_from_slice(&block_number.to_be_bytes());
        data[2 * WORD - 8..].copy_from_slice(&nonce.to_be_bytes());
        data
    }
}

impl HashFunction for Sha256Pow {
    fn digest(&self, block_number: u64, nonce: u64) -> Digest {
        Sha256::digest(Self::preimage(block_number, nonce)).into()
    }

    fn name(&self) -> &'static str {
        "sha256"
    }
}
