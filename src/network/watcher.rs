// src/network/watcher.rs
//! Chain state polling
//!
//! Oracle reads never fail from the caller's point of view: a failed read
//! is logged and retried after a fixed backoff until it succeeds.

use crate::miner::round::{RoundContext, RoundTracker};
use crate::miner::target::TargetPolicy;
use crate::network::ChainOracle;
use crate::types::Round;
use crate::utils::error::MinerError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Polls the oracle for the current round and detects block changes
pub struct ChainWatcher<O: ChainOracle> {
    oracle: Arc<O>,
    policy: TargetPolicy,
    tracker: Arc<RoundTracker>,
    poll_interval: Duration,
    retry_backoff: Duration,
}

impl<O: ChainOracle> ChainWatcher<O> {
    /// Creates a watcher
    ///
    /// # Arguments
    /// * `oracle` - Contract reader
    /// * `policy` - Per-miner difficulty adjustment
    /// * `tracker` - Shared current-round reference this watcher writes to
    /// * `poll_interval` - Delay between block polls
    /// * `retry_backoff` - Delay before retrying a failed read
    pub fn new(
        oracle: Arc<O>,
        policy: TargetPolicy,
        tracker: Arc<RoundTracker>,
        poll_interval: Duration,
        retry_backoff: Duration,
    ) -> Self {
        ChainWatcher {
            oracle,
            policy,
            tracker,
            poll_interval,
            retry_backoff,
        }
    }

    /// The shared current-round reference
    pub fn tracker(&self) -> &Arc<RoundTracker> {
        &self.tracker
    }

    /// Delay between block polls
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Block number reported by the oracle, retried until it succeeds
    pub async fn current_block(&self) -> u64 {
        let block = self
            .retrying("currentBlock", || self.oracle.current_block())
            .await;
        self.tracker.observe_block(block);
        block
    }

    /// Difficulty reported by the oracle, retried until it succeeds
    pub async fn current_difficulty(&self) -> u64 {
        self.retrying("currentDifficulty", || self.oracle.current_difficulty())
            .await
    }

    /// Current block and difficulty as a round with this miner's difficulty
    pub async fn current_round(&self) -> Round {
        let block_number = self.current_block().await;
        let raw_difficulty = self.current_difficulty().await;
        self.policy.round(block_number, raw_difficulty)
    }

    /// Polls until the oracle reports a block above `known_block`
    pub async fn wait_for_new_block(&self, known_block: u64) -> u64 {
        loop {
            let block = self.current_block().await;
            if block > known_block {
                return block;
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Watches a search in progress
    ///
    /// Returns once the round is cancelled for any reason. A newer block
    /// invalidates `ctx` through the tracker, which stops its workers.
    pub async fn watch_round(&self, ctx: &RoundContext) {
        let block_number = ctx.round().block_number;
        while !ctx.is_cancelled() {
            tokio::time::sleep(self.poll_interval).await;
            if ctx.is_cancelled() {
                break;
            }
            let latest = self.current_block().await;
            if latest > block_number {
                // ctx is not necessarily the tracker's active round
                ctx.invalidate();
                break;
            }
        }
    }

    async fn retrying<F, Fut, T>(&self, what: &str, mut read: F) -> T
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, MinerError>>,
    {
        loop {
            match read().await {
                Ok(value) => return value,
                Err(e) if e.is_transient() => {
                    log::warn!("RPC error reading {}: {}. Retrying...", what, e);
                    tokio::time::sleep(self.retry_backoff).await;
                }
                Err(e) => {
                    log::error!("Node rejected {}: {}. Retrying...", what, e);
                    tokio::time::sleep(self.retry_backoff).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays scripted answers; the last block answer repeats forever
    struct ScriptedOracle {
        blocks: Mutex<VecDeque<Result<u64, MinerError>>>,
        last_block: Mutex<u64>,
        difficulty: u64,
        calls: AtomicUsize,
    }

    impl ScriptedOracle {
        fn new(blocks: Vec<Result<u64, MinerError>>, difficulty: u64) -> Self {
            ScriptedOracle {
                blocks: Mutex::new(blocks.into()),
                last_block: Mutex::new(0),
                difficulty,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ChainOracle for ScriptedOracle {
        async fn current_block(&self) -> Result<u64, MinerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.blocks.lock().unwrap().pop_front();
            match next {
                Some(Ok(block)) => {
                    *self.last_block.lock().unwrap() = block;
                    Ok(block)
                }
                Some(Err(e)) => Err(e),
                None => Ok(*self.last_block.lock().unwrap()),
            }
        }

        async fn current_difficulty(&self) -> Result<u64, MinerError> {
            Ok(self.difficulty)
        }
    }

    fn watcher(oracle: ScriptedOracle, identity: u64) -> ChainWatcher<ScriptedOracle> {
        ChainWatcher::new(
            Arc::new(oracle),
            TargetPolicy::new(identity),
            Arc::new(RoundTracker::new()),
            Duration::from_secs(1),
            Duration::from_secs(1),
        )
    }

    fn unreachable() -> MinerError {
        MinerError::ConnectionError("unreachable".into())
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried() {
        let watcher = watcher(
            ScriptedOracle::new(vec![Err(unreachable()), Err(unreachable()), Ok(500)], 50),
            3_456,
        );
        let round = watcher.current_round().await;
        assert_eq!(round.block_number, 500);
        assert_eq!(round.raw_difficulty, 50);
        assert_eq!(round.effective_difficulty, 16);
        assert_eq!(watcher.oracle.calls.load(Ordering::SeqCst), 3);
        assert_eq!(watcher.tracker().latest_block(), 500);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_a_higher_block() {
        let watcher = watcher(
            ScriptedOracle::new(vec![Ok(7), Ok(7), Err(unreachable()), Ok(7), Ok(8)], 10),
            0,
        );
        assert_eq!(watcher.wait_for_new_block(7).await, 8);
        assert_eq!(watcher.oracle.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn block_change_invalidates_watched_round() {
        let watcher = watcher(ScriptedOracle::new(vec![Ok(11), Ok(11), Ok(12)], 10), 0);
        let round = watcher.current_round().await;
        let ctx = Arc::new(RoundContext::new(round, 1));
        watcher.tracker().begin(ctx.clone());

        watcher.watch_round(&ctx).await;
        assert!(ctx.is_invalidated());
        assert!(!watcher.tracker().is_current(&round));
    }

    #[tokio::test(start_paused = true)]
    async fn watch_ends_when_round_is_cancelled() {
        let watcher = watcher(ScriptedOracle::new(vec![Ok(11)], 10), 0);
        let round = watcher.current_round().await;
        let ctx = RoundContext::new(round, 1);
        ctx.cancel();
        watcher.watch_round(&ctx).await;
        assert!(!ctx.is_invalidated());
    }
}
