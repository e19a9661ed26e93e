// src/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Fixed-width output of the PoW hash, big-endian
pub type Digest = [u8; 32];

/// One mining attempt tied to an observed block number and difficulty
///
/// A round is immutable. When the oracle reports a newer block number a new
/// round is created and the old one is superseded, never updated.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    /// Block number reported by the contract
    pub block_number: u64,
    /// Difficulty reported by the contract
    pub raw_difficulty: u64,
    /// Difficulty after the per-miner adjustment, never below 1
    pub effective_difficulty: u32,
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "block {} (difficulty {}, effective {})",
            self.block_number, self.raw_difficulty, self.effective_difficulty
        )
    }
}

/// A nonce whose digest falls below the round's target
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MiningResult {
    /// Block number of the round that produced this result
    pub block_number: u64,
    /// Worker that found the nonce
    pub worker_id: usize,
    /// The winning nonce
    pub nonce: u64,
    /// Digest of (block_number, nonce)
    pub digest: Digest,
    /// Time from round start until the nonce was found
    pub elapsed: Duration,
}

impl MiningResult {
    /// Digest as a `0x`-prefixed lowercase hex string, the form the contract expects
    pub fn digest_hex(&self) -> String {
        format!("0x{}", hex::encode(self.digest))
    }
}

/// Fee parameters attached to a submission
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FeeModel {
    /// Fee-market network: priority fee plus a cap on the total fee
    Eip1559 {
        /// Upper bound on base fee plus priority fee, in wei
        max_fee_per_gas: u128,
        /// Tip paid to the block producer, in wei
        max_priority_fee_per_gas: u128,
    },
    /// Flat gas price
    Legacy {
        /// Gas price in wei
        gas_price: u128,
    },
}

impl fmt::Display for FeeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeeModel::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => write!(
                f,
                "eip1559 (max {} wei, priority {} wei)",
                max_fee_per_gas, max_priority_fee_per_gas
            ),
            FeeModel::Legacy { gas_price } => write!(f, "legacy ({} wei)", gas_price),
        }
    }
}
