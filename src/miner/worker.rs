// src/miner/worker.rs
//! Nonce search worker
//!
//! Each worker walks one slice of the nonce space, hashing until it finds a
//! digest below the round's threshold or the round is cancelled. The
//! cancellation flag is polled every `check_interval` hashes rather than
//! after each one, which keeps the hot loop to a hash and a compare.

use crate::miner::algorithm::HashFunction;
use crate::miner::round::RoundContext;
use crate::miner::target::accepts;
use crate::stats::reporter::{HashCounter, format_hash_rate};
use crate::types::MiningResult;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How often a worker logs its own hash rate
const RATE_LOG_INTERVAL: Duration = Duration::from_secs(1);

/// A worker's slice of the nonce space
///
/// Worker `i` of `N` examines `start + i, start + i + N, start + i + 2N, ...`.
/// Slices of different workers never overlap and together cover every
/// nonce from `start` upwards, each in increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonceAssignment {
    /// Index of the worker owning this slice
    pub worker_id: usize,
    /// First nonce of the slice
    pub start_nonce: u64,
    /// Distance between consecutive nonces of the slice
    pub stride: u64,
}

impl NonceAssignment {
    /// Splits the space above `start` into `worker_count` interleaved slices
    pub fn partition(start: u64, worker_count: usize) -> Vec<NonceAssignment> {
        let count = worker_count.max(1);
        (0..count)
            .map(|worker_id| NonceAssignment {
                worker_id,
                start_nonce: start.wrapping_add(worker_id as u64),
                stride: count as u64,
            })
            .collect()
    }

    /// The `k`-th nonce of this slice
    pub fn nth(&self, k: u64) -> u64 {
        self.start_nonce.wrapping_add(k.wrapping_mul(self.stride))
    }
}

/// Lifecycle of a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Created, not yet running
    Idle,
    /// Hashing its slice
    Searching,
    /// Found a nonce and won the round
    Found,
    /// Stopped by a sibling's win, round invalidation or shutdown
    Cancelled,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::Idle => write!(f, "idle"),
            WorkerState::Searching => write!(f, "searching"),
            WorkerState::Found => write!(f, "found"),
            WorkerState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Final report of a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    /// Worker index
    pub worker_id: usize,
    /// Terminal state
    pub state: WorkerState,
    /// Number of nonces hashed
    pub hashes: u64,
}

/// Searches one [`NonceAssignment`] for an accepted digest
pub struct Worker<H: HashFunction + ?Sized> {
    hasher: Arc<H>,
    assignment: NonceAssignment,
    check_interval: u64,
    counter: Option<HashCounter>,
    state: WorkerState,
}

impl<H: HashFunction + ?Sized> Worker<H> {
    /// Creates an idle worker
    ///
    /// # Arguments
    /// * `hasher` - PoW hash function
    /// * `assignment` - Slice of the nonce space to walk
    /// * `check_interval` - Hashes between cancellation checks
    pub fn new(hasher: Arc<H>, assignment: NonceAssignment, check_interval: u64) -> Self {
        Worker {
            hasher,
            assignment,
            check_interval: check_interval.max(1),
            counter: None,
            state: WorkerState::Idle,
        }
    }

    /// Also reports hash counts to a process-wide counter
    pub fn with_counter(mut self, counter: HashCounter) -> Self {
        self.counter = Some(counter);
        self
    }

    /// Current state
    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// The slice this worker walks
    pub fn assignment(&self) -> &NonceAssignment {
        &self.assignment
    }

    /// Runs until a winner is published or the round is cancelled
    pub fn run(&mut self, ctx: &RoundContext) -> WorkerReport {
        let id = self.assignment.worker_id;
        let block_number = ctx.round().block_number;
        let threshold = *ctx.threshold();
        let stride = self.assignment.stride;

        self.state = WorkerState::Searching;
        let mut nonce = self.assignment.start_nonce;
        let mut hashes = 0u64;
        let mut last_log = Instant::now();
        let mut logged_hashes = 0u64;

        'search: loop {
            if ctx.is_cancelled() {
                self.state = WorkerState::Cancelled;
                break;
            }
            ctx.record_position(id, nonce);

            for _ in 0..self.check_interval {
                let digest = self.hasher.digest(block_number, nonce);
                hashes += 1;

                if accepts(&digest, &threshold) {
                    let result = MiningResult {
                        block_number,
                        worker_id: id,
                        nonce,
                        digest,
                        elapsed: ctx.started().elapsed(),
                    };
                    self.state = if ctx.publish(result) {
                        log::debug!("Worker {} found nonce {}", id, nonce);
                        WorkerState::Found
                    } else {
                        WorkerState::Cancelled
                    };
                    break 'search;
                }
                nonce = nonce.wrapping_add(stride);
            }

            self.flush_hashes(ctx, hashes - logged_hashes);
            logged_hashes = hashes;

            if last_log.elapsed() >= RATE_LOG_INTERVAL {
                let rate = hashes as f64 / ctx.started().elapsed().as_secs_f64().max(1e-9);
                log::debug!("Worker {} hash rate: {}", id, format_hash_rate(rate));
                last_log = Instant::now();
            }
        }

        self.flush_hashes(ctx, hashes - logged_hashes);
        WorkerReport {
            worker_id: id,
            state: self.state,
            hashes,
        }
    }

    fn flush_hashes(&self, ctx: &RoundContext, count: u64) {
        if count == 0 {
            return;
        }
        ctx.add_hashes(count);
        if let Some(counter) = &self.counter {
            counter.add(count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Digest, Round};
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Accepts exactly one nonce and records everything it was asked to hash
    struct ScriptedHash {
        winning_nonce: Option<u64>,
        seen: Mutex<Vec<u64>>,
    }

    impl HashFunction for ScriptedHash {
        fn digest(&self, _block_number: u64, nonce: u64) -> Digest {
            self.seen.lock().unwrap().push(nonce);
            if Some(nonce) == self.winning_nonce {
                [0u8; 32]
            } else {
                [0xff; 32]
            }
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    fn round() -> Round {
        Round {
            block_number: 5,
            raw_difficulty: 8,
            effective_difficulty: 8,
        }
    }

    #[test]
    fn partition_is_disjoint_and_covering() {
        let workers = 4;
        let per_worker = 250u64;
        let slices = NonceAssignment::partition(1_000, workers);
        let mut seen = HashSet::new();

        for slice in &slices {
            let nonces: Vec<u64> = (0..per_worker).map(|k| slice.nth(k)).collect();
            assert!(nonces.windows(2).all(|w| w[0] < w[1]));
            for n in nonces {
                assert!(seen.insert(n), "nonce {} examined twice", n);
            }
        }
        let expected: HashSet<u64> = (1_000..1_000 + workers as u64 * per_worker).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn partition_with_zero_workers_uses_one() {
        let slices = NonceAssignment::partition(0, 0);
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].stride, 1);
    }

    #[test]
    fn worker_finds_nonce_in_its_slice() {
        let hasher = Arc::new(ScriptedHash {
            winning_nonce: Some(42),
            seen: Mutex::new(Vec::new()),
        });
        let ctx = RoundContext::new(round(), 4);
        let assignment = NonceAssignment::partition(0, 4)[2];
        let mut worker = Worker::new(hasher.clone(), assignment, 3);
        assert_eq!(worker.state(), WorkerState::Idle);

        let report = worker.run(&ctx);
        assert_eq!(report.state, WorkerState::Found);
        assert_eq!(ctx.result().map(|r| r.nonce), Some(42));
        assert_eq!(ctx.result().map(|r| r.worker_id), Some(2));
        assert!(ctx.is_cancelled());

        let seen = hasher.seen.lock().unwrap().clone();
        let expected: Vec<u64> = (0..seen.len() as u64).map(|k| 2 + 4 * k).collect();
        assert_eq!(seen, expected);
        assert_eq!(report.hashes, seen.len() as u64);
        assert_eq!(ctx.hashes(), report.hashes);
    }

    #[test]
    fn cancelled_round_stops_before_hashing() {
        let hasher = Arc::new(ScriptedHash {
            winning_nonce: None,
            seen: Mutex::new(Vec::new()),
        });
        let ctx = RoundContext::new(round(), 1);
        ctx.cancel();
        let mut worker = Worker::new(hasher.clone(), NonceAssignment::partition(0, 1)[0], 16);

        let report = worker.run(&ctx);
        assert_eq!(report.state, WorkerState::Cancelled);
        assert_eq!(report.hashes, 0);
        assert!(hasher.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn sibling_win_stops_worker() {
        let hasher = Arc::new(ScriptedHash {
            winning_nonce: Some(0),
            seen: Mutex::new(Vec::new()),
        });
        let ctx = RoundContext::new(round(), 2);
        ctx.publish(MiningResult {
            block_number: 5,
            worker_id: 1,
            nonce: 99,
            digest: [0u8; 32],
            elapsed: Duration::ZERO,
        });
        let mut worker = Worker::new(hasher, NonceAssignment::partition(0, 1)[0], 1);
        let report = worker.run(&ctx);
        assert_eq!(report.state, WorkerState::Cancelled);
        assert_eq!(ctx.result().map(|r| r.nonce), Some(99));
    }
}
