// src/network/submission.rs
//! Submission state machine
//!
//! ```text
//! Built -> Signed -> Broadcast -> Pending -> Included -> Confirmed
//!                        ^            |
//!                        |            +-> Stuck (no confirmation in time)
//!                        +----------------+   same nonce, raised fees
//! Stuck -> Dropped (the round went stale while the broadcast was stuck)
//! any step before confirmation -> Failed (rejected, reverted, build error)
//! ```
//!
//! Resubmission after a stall is a loop iteration, not a recursive call, so
//! a long-running miner never grows its stack.

use crate::network::contract::submit_pow_call;
use crate::network::signer::{TransactionSigner, UnsignedTransaction};
use crate::network::{LedgerClient, Receipt};
use crate::stats::reporter::SubmissionEvent;
use crate::types::{FeeModel, MiningResult, Round};
use crate::utils::error::MinerError;
use alloy::primitives::{Address, B256, Bytes};
use crossbeam_channel::Sender;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Wei per gwei, for the manual gas price override
pub const WEI_PER_GWEI: u128 = 1_000_000_000;

/// Submission parameters
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Mining contract address
    pub contract: Address,
    /// Row index of the NFT
    pub nft_index: u64,
    /// NFT id
    pub nft_id: u64,
    /// Confirmation depth required before a submission counts
    pub confirmations: u64,
    /// Delay between receipt polls
    pub poll_interval: Duration,
    /// Time without confirmation after which a broadcast is considered stuck
    pub stall_timeout: Duration,
    /// Chain ids that use the EIP-1559 fee market
    pub fee_market_chains: Vec<u64>,
    /// Replaces the network's gas price when set, in wei
    pub gas_price_override: Option<u128>,
}

/// Where a submission stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionStatus {
    /// Broadcast, or about to be, with no receipt yet
    Pending,
    /// Included in a block but not yet deep enough
    Included {
        /// Inclusion height
        block_number: u64,
    },
    /// Reached the required confirmation depth
    Confirmed {
        /// Depth when confirmation was declared
        depth: u64,
    },
    /// Not confirmed within the stall timeout
    Stuck,
    /// Abandoned after a stall because the chain moved past the round
    Dropped,
    /// Terminal failure
    Failed(String),
}

impl SubmissionStatus {
    /// Confirmed, Dropped and Failed never change again
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubmissionStatus::Confirmed { .. }
                | SubmissionStatus::Dropped
                | SubmissionStatus::Failed(_)
        )
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionStatus::Pending => write!(f, "pending"),
            SubmissionStatus::Included { block_number } => {
                write!(f, "included in block {}", block_number)
            }
            SubmissionStatus::Confirmed { depth } => {
                write!(f, "confirmed ({} confirmations)", depth)
            }
            SubmissionStatus::Stuck => write!(f, "stuck"),
            SubmissionStatus::Dropped => write!(f, "dropped, round is stale"),
            SubmissionStatus::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// One mining result's journey to the chain
#[derive(Debug, Clone)]
pub struct SubmissionAttempt {
    /// Hash of the latest broadcast; changes when a stall forces a rebuild
    pub tx_hash: Option<B256>,
    /// Round the result belongs to
    pub round: Round,
    /// The solution being submitted
    pub result: MiningResult,
    /// Current status
    pub status: SubmissionStatus,
    /// Successful broadcasts so far
    pub broadcasts: u32,
    /// Stalls so far
    pub stalls: u32,
}

impl SubmissionAttempt {
    /// A fresh attempt in `Pending`
    pub fn new(round: Round, result: MiningResult) -> Self {
        SubmissionAttempt {
            tx_hash: None,
            round,
            result,
            status: SubmissionStatus::Pending,
            broadcasts: 0,
            stalls: 0,
        }
    }

    /// Moves to `next` if that is a forward transition
    ///
    /// Terminal states never change; an inclusion never goes back to
    /// pending except through `Stuck`. Returns whether the status changed.
    pub fn transition(&mut self, next: SubmissionStatus) -> bool {
        use SubmissionStatus::*;

        let allowed = match (&self.status, &next) {
            (Confirmed { .. }, _) | (Dropped, _) | (Failed(_), _) => false,
            (_, Failed(_)) => true,
            (Stuck, Pending) | (Stuck, Dropped) => true,
            (Stuck, _) => false,
            (_, Stuck) => true,
            (Pending, Included { .. }) | (Pending, Confirmed { .. }) => true,
            (Included { block_number: a }, Included { block_number: b }) => a != b,
            (Included { .. }, Confirmed { .. }) => true,
            _ => false,
        };
        if allowed {
            self.status = next;
        }
        allowed
    }
}

/// Builds, signs, broadcasts and confirms solutions
pub struct SubmissionPipeline<L: LedgerClient> {
    ledger: Arc<L>,
    config: PipelineConfig,
    events: Option<Sender<SubmissionEvent>>,
}

impl<L: LedgerClient> SubmissionPipeline<L> {
    /// Creates a pipeline over `ledger`
    pub fn new(ledger: Arc<L>, config: PipelineConfig) -> Self {
        SubmissionPipeline {
            ledger,
            config,
            events: None,
        }
    }

    /// Reports outcomes to the stats reporter
    pub fn with_events(mut self, events: Sender<SubmissionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Submission parameters
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Drives `result` to `Confirmed` or `Failed`
    ///
    /// Same as [`SubmissionPipeline::submit_while`] with a round that never
    /// goes stale.
    pub async fn submit(
        &self,
        round: Round,
        result: MiningResult,
        signer: &dyn TransactionSigner,
    ) -> SubmissionAttempt {
        self.submit_while(round, result, signer, || async { true })
            .await
    }

    /// Drives `result` to `Confirmed`, `Failed` or `Dropped`
    ///
    /// A stall asks `still_current` whether the round is still the chain's.
    /// If it is, the transaction is rebuilt at the account's mined nonce with
    /// fees raised over the stuck broadcast, so the node replaces it. If not,
    /// the attempt ends as `Dropped` without another broadcast. Broadcast
    /// rejections are not retried.
    pub async fn submit_while<F, Fut>(
        &self,
        round: Round,
        result: MiningResult,
        signer: &dyn TransactionSigner,
        mut still_current: F,
    ) -> SubmissionAttempt
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        let data = submit_pow_call(self.config.nft_index, self.config.nft_id, &result);
        let mut attempt = SubmissionAttempt::new(round, result);
        let mut previous: Option<FeeModel> = None;

        loop {
            let mut tx = match self.build(signer.address(), data.clone()).await {
                Ok(tx) => tx,
                Err(e) => return self.fail(attempt, format!("could not build transaction: {}", e)),
            };
            if let Some(stuck) = previous {
                tx.fees = replacement_fees(tx.fees, stuck);
            }
            previous = Some(tx.fees);
            log::debug!(
                "Built submission: nonce {}, gas {}, {}",
                tx.nonce,
                tx.gas_limit,
                tx.fees
            );

            let raw = match signer.sign_transaction(&tx) {
                Ok(raw) => raw,
                Err(e) => return self.fail(attempt, e.to_string()),
            };

            let hash = match self.ledger.send_raw_transaction(&raw).await {
                Ok(hash) => hash,
                Err(e) => return self.fail(attempt, format!("broadcast rejected: {}", e)),
            };
            log::info!("Tx Hash: {}", hash);
            attempt.tx_hash = Some(hash);
            attempt.broadcasts += 1;
            attempt.transition(SubmissionStatus::Pending);

            self.await_confirmation(&mut attempt, hash).await;
            match &attempt.status {
                SubmissionStatus::Confirmed { depth } => {
                    log::info!("Transaction confirmed with {} confirmations", depth);
                    self.notify(SubmissionEvent::Confirmed);
                    return attempt;
                }
                SubmissionStatus::Failed(reason) => {
                    log::error!("Transaction failed: {}", reason);
                    self.notify(SubmissionEvent::Failed);
                    return attempt;
                }
                _ => {
                    attempt.stalls += 1;
                    if !still_current().await {
                        log::warn!(
                            "Transaction {} stuck and block {} is no longer current, dropping it",
                            hash,
                            attempt.round.block_number
                        );
                        attempt.transition(SubmissionStatus::Dropped);
                        return attempt;
                    }
                    log::warn!(
                        "Transaction {} stuck for {:?}, resubmitting",
                        hash,
                        self.config.stall_timeout
                    );
                    self.notify(SubmissionEvent::Resubmitted);
                }
            }
        }
    }

    /// Polls until confirmed, reverted, or stuck
    async fn await_confirmation(&self, attempt: &mut SubmissionAttempt, hash: B256) {
        let started = Instant::now();
        loop {
            tokio::time::sleep(self.config.poll_interval).await;

            match self.ledger.transaction_receipt(hash).await {
                Ok(Some(Receipt { success: false, .. })) => {
                    attempt.transition(SubmissionStatus::Failed("execution reverted".into()));
                    return;
                }
                Ok(Some(receipt)) => {
                    attempt.transition(SubmissionStatus::Included {
                        block_number: receipt.block_number,
                    });
                    if let Some(depth) = self.confirmation_depth(&receipt).await {
                        log::info!("Confirmations: {}/{}", depth, self.config.confirmations);
                        if depth >= self.config.confirmations {
                            attempt.transition(SubmissionStatus::Confirmed { depth });
                            return;
                        }
                    }
                }
                Ok(None) => log::debug!("Waiting for receipt of {}", hash),
                Err(e) if e.is_transient() => log::debug!("Waiting RPC receipt: {}", e),
                Err(e) => log::warn!("Receipt query for {} failed: {}", hash, e),
            }

            if started.elapsed() > self.config.stall_timeout {
                attempt.transition(SubmissionStatus::Stuck);
                return;
            }
        }
    }

    async fn confirmation_depth(&self, receipt: &Receipt) -> Option<u64> {
        match self.ledger.block_number().await {
            Ok(height) => Some(height.saturating_sub(receipt.block_number) + 1),
            Err(e) => {
                log::debug!("Could not read chain height: {}", e);
                None
            }
        }
    }

    /// Assembles the call with the account's mined nonce, gas limit and fees
    async fn build(&self, from: Address, data: Bytes) -> Result<UnsignedTransaction, MinerError> {
        let chain_id = self.ledger.chain_id().await?;
        let nonce = self.ledger.transaction_count(from).await?;
        let gas_limit = self
            .ledger
            .estimate_gas(from, self.config.contract, &data)
            .await?;
        let fees = self.fees(chain_id).await?;

        Ok(UnsignedTransaction {
            chain_id,
            nonce,
            to: self.config.contract,
            input: data,
            gas_limit,
            fees,
        })
    }

    /// Picks the fee model from the network identity
    async fn fees(&self, chain_id: u64) -> Result<FeeModel, MinerError> {
        let base = match self.config.gas_price_override {
            Some(price) => price,
            None => self.ledger.gas_price().await?,
        };
        if self.config.fee_market_chains.contains(&chain_id) {
            let priority = self.ledger.max_priority_fee().await?;
            Ok(FeeModel::Eip1559 {
                max_fee_per_gas: base.saturating_add(priority),
                max_priority_fee_per_gas: priority,
            })
        } else {
            Ok(FeeModel::Legacy { gas_price: base })
        }
    }

    fn fail(&self, mut attempt: SubmissionAttempt, reason: String) -> SubmissionAttempt {
        log::error!("Transaction Failed: {}", reason);
        attempt.transition(SubmissionStatus::Failed(reason));
        self.notify(SubmissionEvent::Failed);
        attempt
    }

    fn notify(&self, event: SubmissionEvent) {
        if let Some(events) = &self.events {
            if let Err(e) = events.send(event).map_err(MinerError::from) {
                log::debug!("{}", e);
            }
        }
    }
}

/// Raises `price` by an eighth, at least one wei
fn bump(price: u128) -> u128 {
    price.saturating_add((price / 8).max(1))
}

/// Fees for a rebuild that must replace a stuck broadcast at the same nonce
///
/// Nodes only accept a replacement priced above the transaction it evicts,
/// so each field is the larger of the fresh quote and the bumped stuck fee.
pub fn replacement_fees(fresh: FeeModel, stuck: FeeModel) -> FeeModel {
    match (fresh, stuck) {
        (FeeModel::Legacy { gas_price }, FeeModel::Legacy { gas_price: old }) => FeeModel::Legacy {
            gas_price: gas_price.max(bump(old)),
        },
        (
            FeeModel::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            },
            FeeModel::Eip1559 {
                max_fee_per_gas: old_max,
                max_priority_fee_per_gas: old_priority,
            },
        ) => {
            let priority = max_priority_fee_per_gas.max(bump(old_priority));
            FeeModel::Eip1559 {
                max_fee_per_gas: max_fee_per_gas.max(bump(old_max)).max(priority),
                max_priority_fee_per_gas: priority,
            }
        }
        (fresh, _) => fresh,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type ReceiptScript = Box<dyn Fn(usize, usize) -> Result<Option<Receipt>, MinerError> + Send + Sync>;

    /// Scripted ledger; the n-th broadcast gets hash `0x00..0n`
    struct MockLedger {
        chain_id: u64,
        reject_broadcast: Option<String>,
        /// (broadcast index, poll number) -> receipt
        receipt: ReceiptScript,
        /// n-th height query -> height
        height: Box<dyn Fn(usize) -> u64 + Send + Sync>,
        sent: Mutex<Vec<Bytes>>,
        polls: Mutex<HashMap<B256, usize>>,
        height_calls: AtomicUsize,
    }

    impl MockLedger {
        fn new(receipt: ReceiptScript) -> Self {
            MockLedger {
                chain_id: 8899,
                reject_broadcast: None,
                receipt,
                height: Box::new(|_| 100),
                sent: Mutex::new(Vec::new()),
                polls: Mutex::new(HashMap::new()),
                height_calls: AtomicUsize::new(0),
            }
        }

        fn broadcasts(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    impl LedgerClient for MockLedger {
        async fn chain_id(&self) -> Result<u64, MinerError> {
            Ok(self.chain_id)
        }

        // Nothing scripted here is ever mined before the next rebuild
        async fn transaction_count(&self, _address: Address) -> Result<u64, MinerError> {
            Ok(5)
        }

        async fn gas_price(&self) -> Result<u128, MinerError> {
            Ok(3 * WEI_PER_GWEI)
        }

        async fn max_priority_fee(&self) -> Result<u128, MinerError> {
            Ok(WEI_PER_GWEI)
        }

        async fn estimate_gas(
            &self,
            _from: Address,
            _to: Address,
            _data: &Bytes,
        ) -> Result<u64, MinerError> {
            Ok(90_000)
        }

        async fn send_raw_transaction(&self, raw: &Bytes) -> Result<B256, MinerError> {
            let mut sent = self.sent.lock().unwrap();
            sent.push(raw.clone());
            if let Some(message) = &self.reject_broadcast {
                return Err(MinerError::RpcError {
                    code: -32000,
                    message: message.clone(),
                });
            }
            Ok(B256::with_last_byte(sent.len() as u8))
        }

        async fn transaction_receipt(&self, hash: B256) -> Result<Option<Receipt>, MinerError> {
            let poll = {
                let mut polls = self.polls.lock().unwrap();
                let count = polls.entry(hash).or_insert(0);
                *count += 1;
                *count
            };
            (self.receipt)(hash[31] as usize - 1, poll)
        }

        async fn block_number(&self) -> Result<u64, MinerError> {
            let n = self.height_calls.fetch_add(1, Ordering::SeqCst);
            Ok((self.height)(n))
        }
    }

    /// Records what it was asked to sign
    #[derive(Default)]
    struct RecordingSigner {
        signed: Mutex<Vec<UnsignedTransaction>>,
    }

    impl TransactionSigner for RecordingSigner {
        fn address(&self) -> Address {
            Address::repeat_byte(0x11)
        }

        fn sign_transaction(&self, tx: &UnsignedTransaction) -> Result<Bytes, MinerError> {
            self.signed.lock().unwrap().push(tx.clone());
            Ok(Bytes::from(tx.nonce.to_be_bytes().to_vec()))
        }
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            contract: Address::repeat_byte(0x86),
            nft_index: 2,
            nft_id: 3_456,
            confirmations: 1,
            poll_interval: Duration::from_secs(1),
            stall_timeout: Duration::from_secs(60),
            fee_market_chains: vec![1, 5, 137, 8899],
            gas_price_override: None,
        }
    }

    fn round() -> Round {
        Round {
            block_number: 77,
            raw_difficulty: 50,
            effective_difficulty: 16,
        }
    }

    fn result() -> MiningResult {
        MiningResult {
            block_number: 77,
            worker_id: 0,
            nonce: 42,
            digest: [0u8; 32],
            elapsed: Duration::from_millis(5),
        }
    }

    fn included_at(block_number: u64) -> Result<Option<Receipt>, MinerError> {
        Ok(Some(Receipt {
            block_number,
            success: true,
        }))
    }

    #[tokio::test(start_paused = true)]
    async fn confirms_on_first_inclusion_with_depth_one() {
        let ledger = Arc::new(MockLedger::new(Box::new(|_, poll| {
            if poll < 3 { Ok(None) } else { included_at(100) }
        })));
        let pipeline = SubmissionPipeline::new(ledger.clone(), config());
        let signer = RecordingSigner::default();

        let attempt = pipeline.submit(round(), result(), &signer).await;
        assert_eq!(attempt.status, SubmissionStatus::Confirmed { depth: 1 });
        assert_eq!(attempt.broadcasts, 1);
        assert_eq!(attempt.stalls, 0);
        assert_eq!(attempt.tx_hash, Some(B256::with_last_byte(1)));
        assert_eq!(ledger.broadcasts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_required_depth() {
        let mut ledger = MockLedger::new(Box::new(|_, _| included_at(100)));
        ledger.height = Box::new(|n| 100 + n as u64);
        let ledger = Arc::new(ledger);
        let mut config = config();
        config.confirmations = 3;
        let pipeline = SubmissionPipeline::new(ledger.clone(), config);

        let attempt = pipeline
            .submit(round(), result(), &RecordingSigner::default())
            .await;
        assert_eq!(attempt.status, SubmissionStatus::Confirmed { depth: 3 });
        assert_eq!(ledger.height_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stall_rebuilds_and_rebroadcasts_once() {
        // First broadcast never gets a receipt, the second is included at once.
        let ledger = Arc::new(MockLedger::new(Box::new(|broadcast, _| {
            if broadcast == 0 { Ok(None) } else { included_at(100) }
        })));
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        let pipeline = SubmissionPipeline::new(ledger.clone(), config()).with_events(events_tx);
        let signer = RecordingSigner::default();
        let checks = AtomicUsize::new(0);
        let counter = &checks;

        let started = Instant::now();
        let attempt = pipeline
            .submit_while(round(), result(), &signer, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            })
            .await;

        assert_eq!(attempt.status, SubmissionStatus::Confirmed { depth: 1 });
        assert_eq!(attempt.stalls, 1);
        assert_eq!(attempt.broadcasts, 2);
        assert_eq!(ledger.broadcasts(), 2);
        assert_eq!(attempt.tx_hash, Some(B256::with_last_byte(2)));
        assert!(started.elapsed() >= Duration::from_secs(60));
        assert_eq!(checks.load(Ordering::SeqCst), 1);

        // The rebuild replaces the stuck broadcast: same nonce, higher fees.
        let signed = signer.signed.lock().unwrap();
        assert_eq!(signed.len(), 2);
        assert_eq!(signed[0].nonce, 5);
        assert_eq!(signed[1].nonce, 5);
        assert_eq!(
            signed[0].fees,
            FeeModel::Eip1559 {
                max_fee_per_gas: 4 * WEI_PER_GWEI,
                max_priority_fee_per_gas: WEI_PER_GWEI,
            }
        );
        assert_eq!(
            signed[1].fees,
            FeeModel::Eip1559 {
                max_fee_per_gas: 4_500_000_000,
                max_priority_fee_per_gas: 1_125_000_000,
            }
        );

        let events: Vec<SubmissionEvent> = events_rx.try_iter().collect();
        assert_eq!(
            events,
            vec![SubmissionEvent::Resubmitted, SubmissionEvent::Confirmed]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stall_on_a_stale_round_drops_without_rebroadcast() {
        let ledger = Arc::new(MockLedger::new(Box::new(|_, _| Ok(None))));
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        let pipeline = SubmissionPipeline::new(ledger.clone(), config()).with_events(events_tx);
        let signer = RecordingSigner::default();

        let attempt = pipeline
            .submit_while(round(), result(), &signer, || async { false })
            .await;

        assert_eq!(attempt.status, SubmissionStatus::Dropped);
        assert!(attempt.status.is_terminal());
        assert_eq!(attempt.stalls, 1);
        assert_eq!(attempt.broadcasts, 1);
        assert_eq!(ledger.broadcasts(), 1);
        assert_eq!(signer.signed.lock().unwrap().len(), 1);
        assert_eq!(events_rx.try_iter().count(), 0);
    }

    #[test]
    fn replacement_fees_outbid_the_stuck_broadcast() {
        let legacy = |gas_price| FeeModel::Legacy { gas_price };
        assert_eq!(replacement_fees(legacy(100), legacy(100)), legacy(112));
        assert_eq!(replacement_fees(legacy(200), legacy(100)), legacy(200));
        assert_eq!(replacement_fees(legacy(0), legacy(0)), legacy(1));

        let market = |max_fee_per_gas, max_priority_fee_per_gas| FeeModel::Eip1559 {
            max_fee_per_gas,
            max_priority_fee_per_gas,
        };
        assert_eq!(replacement_fees(market(80, 8), market(80, 8)), market(90, 9));
        assert_eq!(replacement_fees(market(200, 1), market(80, 8)), market(200, 9));
        // The priority fee never exceeds the cap
        assert_eq!(replacement_fees(market(10, 1), market(10, 80)), market(90, 90));

        // A fee model switch takes the fresh quote
        assert_eq!(replacement_fees(legacy(5), market(80, 8)), legacy(5));
    }

    #[tokio::test(start_paused = true)]
    async fn broadcast_rejection_is_terminal() {
        let mut ledger = MockLedger::new(Box::new(|_, _| Ok(None)));
        ledger.reject_broadcast = Some("insufficient funds for gas".into());
        let ledger = Arc::new(ledger);
        let pipeline = SubmissionPipeline::new(ledger.clone(), config());

        let attempt = pipeline
            .submit(round(), result(), &RecordingSigner::default())
            .await;
        match &attempt.status {
            SubmissionStatus::Failed(reason) => assert!(reason.contains("insufficient funds")),
            other => panic!("unexpected status {}", other),
        }
        assert_eq!(ledger.broadcasts(), 1);
        assert_eq!(attempt.broadcasts, 0);
        assert_eq!(attempt.tx_hash, None);
    }

    #[tokio::test(start_paused = true)]
    async fn reverted_receipt_is_terminal() {
        let ledger = Arc::new(MockLedger::new(Box::new(|_, _| {
            Ok(Some(Receipt {
                block_number: 100,
                success: false,
            }))
        })));
        let pipeline = SubmissionPipeline::new(ledger.clone(), config());

        let attempt = pipeline
            .submit(round(), result(), &RecordingSigner::default())
            .await;
        assert!(matches!(attempt.status, SubmissionStatus::Failed(_)));
        assert_eq!(ledger.broadcasts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_receipt_errors_are_swallowed() {
        let ledger = Arc::new(MockLedger::new(Box::new(|_, poll| {
            if poll <= 5 {
                Err(MinerError::ConnectionError("timed out".into()))
            } else {
                included_at(100)
            }
        })));
        let pipeline = SubmissionPipeline::new(ledger.clone(), config());

        let attempt = pipeline
            .submit(round(), result(), &RecordingSigner::default())
            .await;
        assert_eq!(attempt.status, SubmissionStatus::Confirmed { depth: 1 });
        assert_eq!(attempt.stalls, 0);
        assert_eq!(ledger.broadcasts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fee_model_follows_network_identity() {
        let ledger = Arc::new(MockLedger::new(Box::new(|_, _| included_at(100))));
        let pipeline = SubmissionPipeline::new(ledger.clone(), config());
        assert_eq!(
            pipeline.fees(8899).await.unwrap(),
            FeeModel::Eip1559 {
                max_fee_per_gas: 4 * WEI_PER_GWEI,
                max_priority_fee_per_gas: WEI_PER_GWEI,
            }
        );
        assert_eq!(
            pipeline.fees(96).await.unwrap(),
            FeeModel::Legacy {
                gas_price: 3 * WEI_PER_GWEI
            }
        );

        let mut overridden = config();
        overridden.gas_price_override = Some(10 * WEI_PER_GWEI);
        let pipeline = SubmissionPipeline::new(ledger, overridden);
        assert_eq!(
            pipeline.fees(96).await.unwrap(),
            FeeModel::Legacy {
                gas_price: 10 * WEI_PER_GWEI
            }
        );
        assert_eq!(
            pipeline.fees(1).await.unwrap(),
            FeeModel::Eip1559 {
                max_fee_per_gas: 11 * WEI_PER_GWEI,
                max_priority_fee_per_gas: WEI_PER_GWEI,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn built_transaction_targets_contract() {
        let ledger = Arc::new(MockLedger::new(Box::new(|_, _| included_at(100))));
        let pipeline = SubmissionPipeline::new(ledger, config());
        let signer = RecordingSigner::default();
        pipeline.submit(round(), result(), &signer).await;

        let signed = signer.signed.lock().unwrap();
        assert_eq!(signed.len(), 1);
        assert_eq!(signed[0].to, Address::repeat_byte(0x86));
        assert_eq!(signed[0].chain_id, 8899);
        assert_eq!(signed[0].gas_limit, 90_000);
        assert_eq!(signed[0].input, submit_pow_call(2, 3_456, &result()));
    }

    #[test]
    fn transitions_are_monotonic() {
        let mut attempt = SubmissionAttempt::new(round(), result());
        assert!(attempt.transition(SubmissionStatus::Included { block_number: 9 }));
        assert!(!attempt.transition(SubmissionStatus::Pending));
        assert!(attempt.transition(SubmissionStatus::Confirmed { depth: 1 }));
        assert!(!attempt.transition(SubmissionStatus::Stuck));
        assert!(!attempt.transition(SubmissionStatus::Failed("late".into())));
        assert_eq!(attempt.status, SubmissionStatus::Confirmed { depth: 1 });
    }

    #[test]
    fn stuck_only_returns_to_pending() {
        let mut attempt = SubmissionAttempt::new(round(), result());
        assert!(attempt.transition(SubmissionStatus::Stuck));
        assert!(!attempt.transition(SubmissionStatus::Confirmed { depth: 1 }));
        assert!(attempt.transition(SubmissionStatus::Pending));
        assert!(attempt.transition(SubmissionStatus::Failed("rejected".into())));
        assert!(attempt.status.is_terminal());
    }

    #[test]
    fn only_a_stuck_attempt_is_dropped() {
        let mut attempt = SubmissionAttempt::new(round(), result());
        assert!(!attempt.transition(SubmissionStatus::Dropped));
        assert!(attempt.transition(SubmissionStatus::Stuck));
        assert!(attempt.transition(SubmissionStatus::Dropped));
        assert!(!attempt.transition(SubmissionStatus::Pending));
        assert!(!attempt.transition(SubmissionStatus::Failed("late".into())));
        assert_eq!(attempt.status, SubmissionStatus::Dropped);
    }
}
