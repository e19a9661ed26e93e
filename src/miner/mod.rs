// src/miner/mod.rs
//! Core mining functionality
//!
//! This module contains everything between a round and its winning nonce:
//! - The PoW hash function and the difficulty target
//! - Per-round shared state and the current-round tracker
//! - Search workers and the coordinator that runs them in parallel
//! - Progress checkpoints and the top-level mining loop

/// Proof-of-work hash functions
pub mod algorithm;

/// Parallel nonce search over a dedicated worker pool
pub mod coordinator;

/// Top-level fetch, search, submit loop
pub mod mining_loop;

/// Search progress checkpoints
pub mod progress;

/// Per-round shared state and the authoritative current round
pub mod round;

/// Difficulty adjustment and acceptance threshold
pub mod target;

/// Nonce search worker
///
/// Each worker walks its own slice of the nonce space and checks the
/// round's cancellation flag every `check_interval` hashes.
pub mod worker;

pub use self::algorithm::{HashFunction, Sha256Pow};
pub use self::coordinator::{Coordinator, CoordinatorConfig, SearchOutcome, SearchReport};
pub use self::mining_loop::{MiningLoop, RoundOutcome};
pub use self::progress::{Checkpoint, ProgressStore};
pub use self::round::{RoundContext, RoundTracker};
pub use self::target::TargetPolicy;
pub use self::worker::{NonceAssignment, Worker, WorkerState};
