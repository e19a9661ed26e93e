// src/miner/mining_loop.rs
//! Top-level mining loop
//!
//! Fetches the round, searches it, submits the winner and starts over. The
//! search runs on the coordinator's pool via `spawn_blocking` while this
//! task keeps polling the chain and writing checkpoints, so a block change
//! reaches the workers without waiting for the search to end.

use crate::miner::algorithm::HashFunction;
use crate::miner::coordinator::{Coordinator, SearchOutcome, SearchReport};
use crate::miner::progress::{Checkpoint, ProgressStore};
use crate::miner::round::{RoundContext, RoundTracker};
use crate::network::signer::TransactionSigner;
use crate::network::submission::{SubmissionAttempt, SubmissionPipeline};
use crate::network::watcher::ChainWatcher;
use crate::network::{ChainOracle, LedgerClient};
use crate::stats::reporter::StatsReporter;
use crate::types::Round;
use crate::utils::error::MinerError;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Default delay between progress checkpoints
pub const DEFAULT_CHECKPOINT_INTERVAL: Duration = Duration::from_secs(5);

/// What one pass of the loop did
#[derive(Debug, Clone)]
pub enum RoundOutcome {
    /// The chain is still on the last block searched
    Unchanged,
    /// A newer block arrived during the search
    Cancelled,
    /// A winner was found but the chain moved on before submission
    Stale,
    /// A winner was submitted; the attempt is in a terminal state
    Submitted(SubmissionAttempt),
}

/// Drives rounds from the chain through search and submission
pub struct MiningLoop<O, L, H, S>
where
    O: ChainOracle,
    L: LedgerClient,
    H: HashFunction + ?Sized + 'static,
    S: TransactionSigner,
{
    watcher: ChainWatcher<O>,
    coordinator: Arc<Coordinator<H>>,
    pipeline: SubmissionPipeline<L>,
    signer: S,
    progress: ProgressStore,
    stats: Option<StatsReporter>,
    checkpoint_interval: Duration,
    last_block: Option<u64>,
}

impl<O, L, H, S> MiningLoop<O, L, H, S>
where
    O: ChainOracle,
    L: LedgerClient,
    H: HashFunction + ?Sized + 'static,
    S: TransactionSigner,
{
    /// Assembles the loop from its parts
    pub fn new(
        watcher: ChainWatcher<O>,
        coordinator: Arc<Coordinator<H>>,
        pipeline: SubmissionPipeline<L>,
        signer: S,
        progress: ProgressStore,
    ) -> Self {
        MiningLoop {
            watcher,
            coordinator,
            pipeline,
            signer,
            progress,
            stats: None,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            last_block: None,
        }
    }

    /// Counts won rounds in `stats`
    pub fn with_stats(mut self, stats: StatsReporter) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Sets the delay between progress checkpoints
    pub fn with_checkpoint_interval(mut self, interval: Duration) -> Self {
        self.checkpoint_interval = interval;
        self
    }

    /// Shared current-round reference, for cancelling on shutdown
    pub fn tracker(&self) -> Arc<RoundTracker> {
        self.watcher.tracker().clone()
    }

    /// Runs until an unrecoverable error
    pub async fn run(&mut self) -> Result<(), MinerError> {
        log::info!(
            "Mining with {} worker(s) as {}",
            self.coordinator.config().worker_count,
            self.signer.address()
        );
        loop {
            match self.run_round().await? {
                RoundOutcome::Unchanged => tokio::time::sleep(self.watcher.poll_interval()).await,
                RoundOutcome::Submitted(attempt) => log::info!(
                    "Submission for block {} ended {}",
                    attempt.round.block_number,
                    attempt.status
                ),
                RoundOutcome::Cancelled | RoundOutcome::Stale => {}
            }
        }
    }

    /// One pass: fetch the round, search it unless already searched, submit
    pub async fn run_round(&mut self) -> Result<RoundOutcome, MinerError> {
        let round = self.watcher.current_round().await;
        if self.last_block == Some(round.block_number) {
            return Ok(RoundOutcome::Unchanged);
        }
        self.last_block = Some(round.block_number);
        log::info!("Mining {}", round);

        let start_nonce = self.progress.resume_nonce(round.block_number);
        let ctx = self.coordinator.context_from(round, start_nonce);
        let tracker = self.watcher.tracker().clone();
        tracker.begin(ctx.clone());
        let report = self.search(ctx, start_nonce).await;
        tracker.finish();
        let report = report?;

        let result = match report.outcome {
            SearchOutcome::Found(result) => result,
            SearchOutcome::Cancelled => {
                log::info!(
                    "Round for block {} cancelled after {} hashes",
                    round.block_number,
                    report.hashes
                );
                return Ok(RoundOutcome::Cancelled);
            }
        };
        log::info!(
            "Found nonce {} for block {} (worker {}, {} hashes, {:?})",
            result.nonce,
            result.block_number,
            result.worker_id,
            report.hashes,
            result.elapsed
        );
        if let Some(stats) = &self.stats {
            stats.record_round_won();
        }
        if let Err(e) = self.progress.clear() {
            log::warn!("Could not clear progress file: {}", e);
        }

        // Fresh read so a block change since the last poll is seen.
        self.watcher.current_block().await;
        if !tracker.is_current(&round) {
            log::info!(
                "Dropping result for block {}: chain is at block {}",
                round.block_number,
                tracker.latest_block()
            );
            return Ok(RoundOutcome::Stale);
        }

        // A stalled broadcast is only rebuilt while the round is still current.
        let watcher = &self.watcher;
        let tracker = &tracker;
        let attempt = self
            .pipeline
            .submit_while(round, result, &self.signer, move || async move {
                watcher.current_block().await;
                tracker.is_current(&round)
            })
            .await;
        Ok(RoundOutcome::Submitted(attempt))
    }

    /// Runs the coordinator off the async runtime while watching the chain
    async fn search(
        &self,
        ctx: Arc<RoundContext>,
        start_nonce: u64,
    ) -> Result<SearchReport, MinerError> {
        let coordinator = self.coordinator.clone();
        let search_ctx = ctx.clone();
        let mut handle =
            tokio::task::spawn_blocking(move || coordinator.search(search_ctx, start_nonce));

        let mut checkpoints = tokio::time::interval(self.checkpoint_interval);
        checkpoints.set_missed_tick_behavior(MissedTickBehavior::Delay);
        checkpoints.tick().await;

        let watch = self.watcher.watch_round(&ctx);
        tokio::pin!(watch);
        let mut watching = true;

        loop {
            tokio::select! {
                report = &mut handle => return Ok(report?),
                _ = &mut watch, if watching => watching = false,
                _ = checkpoints.tick() => self.checkpoint(ctx.round(), ctx.watermark()),
            }
        }
    }

    fn checkpoint(&self, round: &Round, last_nonce: u64) {
        if !self.progress.is_enabled() {
            return;
        }
        let checkpoint = Checkpoint {
            block_number: round.block_number,
            last_nonce,
        };
        match self.progress.save(&checkpoint) {
            Ok(()) => log::debug!("Checkpoint: block {} nonce {}", round.block_number, last_nonce),
            Err(e) => log::warn!("Could not write progress file: {}", e),
        }
    }
}
