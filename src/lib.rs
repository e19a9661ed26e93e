//! CommuDAO Miner - proof-of-work NFT mining in Rust
//!
//! This crate mines against a contract that publishes a block number and a
//! difficulty, with support for:
//! - Parallel nonce search with first-winner cancellation
//! - Per-miner difficulty adjustment derived from the NFT id
//! - Transaction submission with confirmation tracking and stall recovery
//! - Resumable search progress and performance benchmarking

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Miner core implementation: hashing, targets, workers and the mining loop
pub mod miner;

/// Ledger communication: RPC client, signing, chain watching and submission
pub mod network;

/// Statistics collection and reporting functionality
pub mod stats;

/// Utility functions and error handling
pub mod utils;

/// Command-line interface definitions
pub mod cli;

/// Configuration management
pub mod config;

/// Shared type definitions
pub mod types;

// Core exports
pub use cli::Commands;
pub use config::Config;
pub use miner::{Coordinator, HashFunction, MiningLoop, RoundTracker, Sha256Pow, TargetPolicy};
pub use network::{ChainWatcher, KeystoreSigner, RpcClient, SubmissionPipeline};
pub use stats::{MiningStats, StatsReporter};
pub use types::{MiningResult, Round};
pub use utils::{MinerError, init_logging};
