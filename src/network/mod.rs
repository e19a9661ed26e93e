// src/network/mod.rs
//! Ledger communication
//!
//! Everything that talks to the chain goes through two traits:
//! - [`ChainOracle`]: the contract's current block and difficulty
//! - [`LedgerClient`]: what the submission pipeline needs to build,
//!   broadcast and confirm a transaction
//!
//! [`RpcClient`] implements both over JSON-RPC; tests substitute scripted
//! doubles.

/// Contract ABI bindings
pub mod contract;

/// JSON-RPC client for an Ethereum-compatible node
pub mod rpc;

/// Wallet keystore and transaction signing
pub mod signer;

/// Submission state machine
pub mod submission;

/// Chain state polling
pub mod watcher;

pub use rpc::RpcClient;
pub use signer::{KeystoreSigner, TransactionSigner, UnsignedTransaction};
pub use submission::{PipelineConfig, SubmissionAttempt, SubmissionPipeline, SubmissionStatus};
pub use watcher::ChainWatcher;

use crate::utils::error::MinerError;
use alloy::primitives::{Address, B256, Bytes};
use std::future::Future;

/// Read access to the mining contract
pub trait ChainOracle: Send + Sync {
    /// Block number the contract is currently mining
    fn current_block(&self) -> impl Future<Output = Result<u64, MinerError>> + Send;

    /// Difficulty the contract currently requires
    fn current_difficulty(&self) -> impl Future<Output = Result<u64, MinerError>> + Send;
}

/// Inclusion information for a broadcast transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    /// Height of the block that included the transaction
    pub block_number: u64,
    /// False when execution reverted
    pub success: bool,
}

/// Node operations used to submit a solution
pub trait LedgerClient: Send + Sync {
    /// Network identity, used to pick the fee model
    fn chain_id(&self) -> impl Future<Output = Result<u64, MinerError>> + Send;

    /// Next account nonce from mined transactions only, so a stuck broadcast
    /// keeps its slot and a rebuild replaces it
    fn transaction_count(
        &self,
        address: Address,
    ) -> impl Future<Output = Result<u64, MinerError>> + Send;

    /// Current gas price in wei
    fn gas_price(&self) -> impl Future<Output = Result<u128, MinerError>> + Send;

    /// Suggested priority fee in wei
    fn max_priority_fee(&self) -> impl Future<Output = Result<u128, MinerError>> + Send;

    /// Gas needed to execute `data` against `to`
    fn estimate_gas(
        &self,
        from: Address,
        to: Address,
        data: &Bytes,
    ) -> impl Future<Output = Result<u64, MinerError>> + Send;

    /// Broadcasts a signed transaction and returns its hash
    fn send_raw_transaction(
        &self,
        raw: &Bytes,
    ) -> impl Future<Output = Result<B256, MinerError>> + Send;

    /// Receipt of `hash`, or `None` while it is not yet included
    fn transaction_receipt(
        &self,
        hash: B256,
    ) -> impl Future<Output = Result<Option<Receipt>, MinerError>> + Send;

    /// Current chain height
    fn block_number(&self) -> impl Future<Output = Result<u64, MinerError>> + Send;
}
