// src/miner/coordinator.rs
//! Mining coordinator
//!
//! Fans a round out over a dedicated worker pool, waits for the first
//! winner or for cancellation, and stops every worker before returning.
//! The pool is separate from the async runtime so network waits and hash
//! throughput never compete for the same threads.

use crate::miner::algorithm::HashFunction;
use crate::miner::round::RoundContext;
use crate::miner::worker::{NonceAssignment, Worker, WorkerReport, WorkerState};
use crate::stats::reporter::HashCounter;
use crate::types::{MiningResult, Round};
use crate::utils::error::MinerError;
use crossbeam_channel::RecvTimeoutError;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How often the coordinator re-checks the round while waiting for workers
const JOIN_POLL: Duration = Duration::from_millis(20);

/// Search parameters
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorConfig {
    /// Number of parallel workers
    pub worker_count: usize,
    /// Hashes between cancellation checks
    pub check_interval: u64,
    /// Grace period for workers to stop once the round is cancelled
    pub join_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        CoordinatorConfig {
            worker_count: 1,
            check_interval: 4096,
            join_timeout: Duration::from_secs(1),
        }
    }
}

/// How a search ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A worker found an accepted nonce for a round that is still valid
    Found(MiningResult),
    /// The round was invalidated or cancelled before a usable winner
    Cancelled,
}

/// Outcome plus the final state of every worker that reported back
#[derive(Debug, Clone)]
pub struct SearchReport {
    /// How the search ended
    pub outcome: SearchOutcome,
    /// Worker reports, ordered by worker id
    pub workers: Vec<WorkerReport>,
    /// Total hashes computed in the round
    pub hashes: u64,
}

impl SearchReport {
    /// The winning result, if any
    pub fn result(&self) -> Option<&MiningResult> {
        match &self.outcome {
            SearchOutcome::Found(result) => Some(result),
            SearchOutcome::Cancelled => None,
        }
    }
}

/// Coordinates parallel nonce search for one round at a time
pub struct Coordinator<H: HashFunction + ?Sized + 'static> {
    hasher: Arc<H>,
    pool: rayon::ThreadPool,
    config: CoordinatorConfig,
    counter: Option<HashCounter>,
}

impl<H: HashFunction + ?Sized + 'static> Coordinator<H> {
    /// Creates a coordinator with its own pool of `config.worker_count` threads
    pub fn new(hasher: Arc<H>, config: CoordinatorConfig) -> Result<Self, MinerError> {
        let config = CoordinatorConfig {
            worker_count: config.worker_count.max(1),
            ..config
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_count)
            .thread_name(|i| format!("pow-worker-{}", i))
            .build()?;

        Ok(Coordinator {
            hasher,
            pool,
            config,
            counter: None,
        })
    }

    /// Reports every worker's hashes to `counter` as well
    pub fn with_counter(mut self, counter: HashCounter) -> Self {
        self.counter = Some(counter);
        self
    }

    /// Search parameters in effect
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Creates the shared context for searching `round`
    pub fn context(&self, round: Round) -> Arc<RoundContext> {
        self.context_from(round, 0)
    }

    /// Creates the shared context for a search resumed at `start_nonce`
    pub fn context_from(&self, round: Round, start_nonce: u64) -> Arc<RoundContext> {
        Arc::new(RoundContext::starting_at(
            round,
            self.config.worker_count,
            start_nonce,
        ))
    }

    /// Searches `ctx`'s round from `start_nonce` until a winner or cancellation
    ///
    /// Blocks the calling thread. At most one result is ever returned; a
    /// result for a round invalidated before this returns is discarded.
    pub fn search(&self, ctx: Arc<RoundContext>, start_nonce: u64) -> SearchReport {
        let assignments = NonceAssignment::partition(start_nonce, ctx.worker_count());
        let expected = assignments.len();
        let (done_tx, done_rx) = crossbeam_channel::unbounded();

        log::debug!(
            "Searching {} with {} workers ({}) from nonce {}",
            ctx.round(),
            expected,
            self.hasher.name(),
            start_nonce
        );

        for assignment in &assignments {
            ctx.record_position(assignment.worker_id, assignment.start_nonce);
        }
        for assignment in assignments {
            let ctx = ctx.clone();
            let hasher = self.hasher.clone();
            let done = done_tx.clone();
            let counter = self.counter.clone();
            let check_interval = self.config.check_interval;

            self.pool.spawn(move || {
                let mut worker = Worker::new(hasher, assignment, check_interval);
                if let Some(counter) = counter {
                    worker = worker.with_counter(counter);
                }
                let report = worker.run(&ctx);
                let _ = done.send(report);
            });
        }
        drop(done_tx);

        let mut workers = Vec::with_capacity(expected);
        let mut cancelled_at: Option<Instant> = None;
        while workers.len() < expected {
            match done_rx.recv_timeout(JOIN_POLL) {
                Ok(report) => workers.push(report),
                Err(RecvTimeoutError::Timeout) => {
                    if !ctx.is_cancelled() {
                        continue;
                    }
                    let since = *cancelled_at.get_or_insert_with(Instant::now);
                    if since.elapsed() >= self.config.join_timeout {
                        log::warn!(
                            "{} of {} workers did not stop within {:?}, continuing without them",
                            expected - workers.len(),
                            expected,
                            self.config.join_timeout
                        );
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        ctx.cancel();
        workers.sort_by_key(|r| r.worker_id);

        let outcome = match ctx.result() {
            Some(result) if !ctx.is_invalidated() => SearchOutcome::Found(result.clone()),
            _ => SearchOutcome::Cancelled,
        };

        SearchReport {
            outcome,
            workers,
            hashes: ctx.hashes(),
        }
    }
}

/// Count of workers that ended in `state`
pub fn count_in_state(workers: &[WorkerReport], state: WorkerState) -> usize {
    workers.iter().filter(|w| w.state == state).count()
}
