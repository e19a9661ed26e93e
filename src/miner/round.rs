// src/miner/round.rs
//! Per-round shared state
//!
//! Every search gets its own [`RoundContext`], handed to each worker by
//! `Arc` at spawn time. Nothing here is process-global: a new round means a
//! new context, so a flag or result left over from a previous round can
//! never leak into the next one.

use crate::miner::target::acceptance_threshold;
use crate::types::{MiningResult, Round};
use alloy::primitives::U256;
use arc_swap::ArcSwapOption;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

/// Shared state for one round's search
pub struct RoundContext {
    round: Round,
    threshold: U256,
    /// Set once by the first winner, by invalidation, or by shutdown
    cancelled: AtomicBool,
    /// Set when a newer block makes this round stale
    invalidated: AtomicBool,
    /// First-write-wins result slot
    result: OnceLock<MiningResult>,
    /// Next nonce each worker will examine
    positions: Vec<AtomicU64>,
    hashes: AtomicU64,
    started: Instant,
}

impl RoundContext {
    /// Creates the context for `round` searched by `worker_count` workers
    pub fn new(round: Round, worker_count: usize) -> Self {
        Self::starting_at(round, worker_count, 0)
    }

    /// Like [`RoundContext::new`] for a search resumed at `start_nonce`
    ///
    /// Worker `i` starts at `start_nonce + i`, so the watermark never drops
    /// below `start_nonce` before every worker has reported.
    pub fn starting_at(round: Round, worker_count: usize, start_nonce: u64) -> Self {
        RoundContext {
            round,
            threshold: acceptance_threshold(round.effective_difficulty),
            cancelled: AtomicBool::new(false),
            invalidated: AtomicBool::new(false),
            result: OnceLock::new(),
            positions: (0..worker_count.max(1))
                .map(|i| AtomicU64::new(start_nonce.wrapping_add(i as u64)))
                .collect(),
            hashes: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    /// The round being searched
    pub fn round(&self) -> &Round {
        &self.round
    }

    /// Acceptance threshold derived from the round's effective difficulty
    pub fn threshold(&self) -> &U256 {
        &self.threshold
    }

    /// When the context was created
    pub fn started(&self) -> Instant {
        self.started
    }

    /// Number of worker slots
    pub fn worker_count(&self) -> usize {
        self.positions.len()
    }

    /// Stops the search. Returns true only for the call that flipped the flag.
    pub fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::SeqCst)
    }

    /// Whether workers should stop
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Marks the round stale and cancels it
    pub fn invalidate(&self) {
        self.invalidated.store(true, Ordering::SeqCst);
        self.cancel();
    }

    /// Whether a newer block superseded this round
    pub fn is_invalidated(&self) -> bool {
        self.invalidated.load(Ordering::SeqCst)
    }

    /// Offers a winning result
    ///
    /// Only the first offer on a still-valid round is kept; it also cancels
    /// the round. Later offers, or any offer after invalidation, are dropped
    /// and leave the stored result untouched.
    pub fn publish(&self, result: MiningResult) -> bool {
        if self.is_invalidated() || result.block_number != self.round.block_number {
            return false;
        }
        let won = self.result.set(result).is_ok();
        if won {
            self.cancel();
        }
        won
    }

    /// The published result, unless the round has since been invalidated
    pub fn result(&self) -> Option<&MiningResult> {
        if self.is_invalidated() {
            return None;
        }
        self.result.get()
    }

    /// Records the next nonce `worker_id` will examine
    pub fn record_position(&self, worker_id: usize, next_nonce: u64) {
        if let Some(slot) = self.positions.get(worker_id) {
            slot.store(next_nonce, Ordering::Relaxed);
        }
    }

    /// Every nonce below this value has been examined
    ///
    /// Each worker walks its slice in increasing order, so the minimum of
    /// their next positions is a safe resume point.
    pub fn watermark(&self) -> u64 {
        self.positions
            .iter()
            .map(|p| p.load(Ordering::Relaxed))
            .min()
            .unwrap_or(0)
    }

    /// Adds to the round's hash count
    pub fn add_hashes(&self, count: u64) {
        self.hashes.fetch_add(count, Ordering::Relaxed);
    }

    /// Hashes computed so far in this round
    pub fn hashes(&self) -> u64 {
        self.hashes.load(Ordering::Relaxed)
    }
}

/// Authoritative view of the chain's current round
///
/// Written by the chain watcher, read by the mining loop before every
/// submission. Holding the active context here lets a block change reach
/// the workers of the round it invalidates.
#[derive(Default)]
pub struct RoundTracker {
    latest_block: AtomicU64,
    active: ArcSwapOption<RoundContext>,
}

impl RoundTracker {
    /// Creates a tracker that has not seen any block yet
    pub fn new() -> Self {
        RoundTracker::default()
    }

    /// Highest block number observed so far
    pub fn latest_block(&self) -> u64 {
        self.latest_block.load(Ordering::SeqCst)
    }

    /// Records a block number from the oracle
    ///
    /// Returns true when it is newer than anything seen before; in that case
    /// an active round for an older block is invalidated.
    pub fn observe_block(&self, block_number: u64) -> bool {
        let previous = self.latest_block.fetch_max(block_number, Ordering::SeqCst);
        if block_number <= previous {
            return false;
        }
        if let Some(active) = self.active.load_full() {
            if active.round().block_number < block_number {
                log::info!(
                    "Block {} supersedes round for block {}",
                    block_number,
                    active.round().block_number
                );
                active.invalidate();
            }
        }
        true
    }

    /// Installs the context of the round about to be searched
    pub fn begin(&self, context: Arc<RoundContext>) {
        self.observe_block(context.round().block_number);
        self.active.store(Some(context));
    }

    /// Clears the active context once its search is over
    pub fn finish(&self) {
        self.active.store(None);
    }

    /// Whether `round` is still the chain's current round
    pub fn is_current(&self, round: &Round) -> bool {
        self.latest_block() == round.block_number
    }

    /// Cancels whatever is being searched, used on shutdown
    pub fn cancel_active(&self) {
        if let Some(active) = self.active.load_full() {
            active.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn round(block_number: u64) -> Round {
        Round {
            block_number,
            raw_difficulty: 8,
            effective_difficulty: 8,
        }
    }

    fn result(block_number: u64, nonce: u64) -> MiningResult {
        MiningResult {
            block_number,
            worker_id: 0,
            nonce,
            digest: [0u8; 32],
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn cancel_is_idempotent() {
        let ctx = RoundContext::new(round(1), 2);
        assert!(ctx.cancel());
        assert!(!ctx.cancel());
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn first_publish_wins() {
        let ctx = RoundContext::new(round(1), 2);
        assert!(ctx.publish(result(1, 5)));
        assert!(!ctx.publish(result(1, 9)));
        assert_eq!(ctx.result().map(|r| r.nonce), Some(5));
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn publish_after_invalidation_is_dropped() {
        let ctx = RoundContext::new(round(1), 2);
        ctx.invalidate();
        assert!(!ctx.publish(result(1, 5)));
        assert!(ctx.result().is_none());
    }

    #[test]
    fn invalidation_hides_an_earlier_winner() {
        let ctx = RoundContext::new(round(1), 1);
        assert!(ctx.publish(result(1, 5)));
        ctx.invalidate();
        assert!(ctx.result().is_none());
    }

    #[test]
    fn result_for_another_block_is_rejected() {
        let ctx = RoundContext::new(round(1), 1);
        assert!(!ctx.publish(result(2, 5)));
    }

    #[test]
    fn watermark_is_minimum_position() {
        let ctx = RoundContext::new(round(1), 3);
        ctx.record_position(0, 30);
        ctx.record_position(1, 13);
        ctx.record_position(2, 20);
        assert_eq!(ctx.watermark(), 13);
    }

    #[test]
    fn resumed_watermark_starts_at_resume_point() {
        let ctx = RoundContext::starting_at(round(1), 2, 1_000);
        assert_eq!(ctx.watermark(), 1_000);
        // Only worker 0 has reported; worker 1 still sits at its first nonce.
        ctx.record_position(0, 1_010);
        assert_eq!(ctx.watermark(), 1_001);
    }

    #[test]
    fn newer_block_invalidates_active_round() {
        let tracker = RoundTracker::new();
        let ctx = Arc::new(RoundContext::new(round(10), 1));
        tracker.begin(ctx.clone());
        assert!(tracker.is_current(ctx.round()));

        assert!(!tracker.observe_block(10));
        assert!(!ctx.is_invalidated());

        assert!(tracker.observe_block(11));
        assert!(ctx.is_invalidated());
        assert!(ctx.is_cancelled());
        assert!(!tracker.is_current(ctx.round()));
    }

    #[test]
    fn older_block_is_ignored() {
        let tracker = RoundTracker::new();
        assert!(tracker.observe_block(10));
        assert!(!tracker.observe_block(9));
        assert_eq!(tracker.latest_block(), 10);
    }
}
