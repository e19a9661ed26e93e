// src/stats/reporter.rs
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Snapshot of mining and submission statistics
#[derive(Debug, Clone, Default)]
pub struct MiningStats {
    /// Total number of hashes computed
    pub hashes_total: u64,
    /// Rounds in which a winning nonce was found
    pub rounds_won: u64,
    /// Submissions confirmed on chain
    pub submissions_confirmed: u64,
    /// Submissions that failed terminally
    pub submissions_failed: u64,
    /// Rebroadcasts after a stall
    pub resubmissions: u64,
    /// Average hashrate since start (hashes per second)
    pub avg_hashrate: f64,
}

/// Outcome of a submission step, sent by the submission pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionEvent {
    /// The transaction reached the required confirmation depth
    Confirmed,
    /// The transaction was rejected or reverted
    Failed,
    /// The transaction stalled and was rebuilt
    Resubmitted,
}

/// Cheap handle that workers use to report hashes
#[derive(Debug, Clone, Default)]
pub struct HashCounter(Arc<AtomicU64>);

impl HashCounter {
    /// Adds `count` hashes
    pub fn add(&self, count: u64) {
        self.0.fetch_add(count, Ordering::Relaxed);
    }

    /// Total reported so far
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Collects and periodically logs mining statistics
#[derive(Clone)]
pub struct StatsReporter {
    stats: Arc<MiningStatsAtomic>,
    /// Interval at which stats are reported
    report_interval: Duration,
}

/// Atomic version of MiningStats for thread-safe operations
struct MiningStatsAtomic {
    hashes: HashCounter,
    rounds_won: AtomicU64,
    confirmed: AtomicU64,
    failed: AtomicU64,
    resubmitted: AtomicU64,
    start_time: Instant,
}

impl StatsReporter {
    /// Creates a new StatsReporter with the specified reporting interval
    pub fn new(report_interval: Duration) -> Self {
        StatsReporter {
            stats: Arc::new(MiningStatsAtomic {
                hashes: HashCounter::default(),
                rounds_won: AtomicU64::new(0),
                confirmed: AtomicU64::new(0),
                failed: AtomicU64::new(0),
                resubmitted: AtomicU64::new(0),
                start_time: Instant::now(),
            }),
            report_interval,
        }
    }

    /// Counter handed to search workers
    pub fn hash_counter(&self) -> HashCounter {
        self.stats.hashes.clone()
    }

    /// Creates a sender for submission events
    ///
    /// Events are tallied on a background thread until every sender is dropped.
    pub fn submission_sender(&self) -> Sender<SubmissionEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.start_submission_listener(rx);
        tx
    }

    /// Records a round that produced a winner
    pub fn record_round_won(&self) {
        self.stats.rounds_won.fetch_add(1, Ordering::Relaxed);
    }

    /// Gets the current mining statistics
    pub fn get_stats(&self) -> MiningStats {
        let total_seconds = self.stats.start_time.elapsed().as_secs_f64();
        let hashes = self.stats.hashes.get();

        MiningStats {
            hashes_total: hashes,
            rounds_won: self.stats.rounds_won.load(Ordering::Relaxed),
            submissions_confirmed: self.stats.confirmed.load(Ordering::Relaxed),
            submissions_failed: self.stats.failed.load(Ordering::Relaxed),
            resubmissions: self.stats.resubmitted.load(Ordering::Relaxed),
            avg_hashrate: if total_seconds > 0.0 {
                hashes as f64 / total_seconds
            } else {
                0.0
            },
        }
    }

    /// Starts the periodic reporting of statistics on a background thread
    pub fn start_reporting(&self) {
        let reporter = self.clone();

        std::thread::spawn(move || {
            loop {
                std::thread::sleep(reporter.report_interval);
                let stats = reporter.get_stats();

                log::info!(
                    "Hashrate: {} | Rounds won: {} | Confirmed/Failed/Resubmitted: {}/{}/{}",
                    format_hash_rate(stats.avg_hashrate),
                    stats.rounds_won,
                    stats.submissions_confirmed,
                    stats.submissions_failed,
                    stats.resubmissions
                );
            }
        });
    }

    fn start_submission_listener(&self, receiver: Receiver<SubmissionEvent>) {
        let stats = self.stats.clone();

        std::thread::spawn(move || {
            for event in receiver {
                match event {
                    SubmissionEvent::Confirmed => stats.confirmed.fetch_add(1, Ordering::Relaxed),
                    SubmissionEvent::Failed => stats.failed.fetch_add(1, Ordering::Relaxed),
                    SubmissionEvent::Resubmitted => {
                        stats.resubmitted.fetch_add(1, Ordering::Relaxed)
                    }
                };
            }
        });
    }
}

/// Renders a hash rate as `H/s`, `kH/s` or `MH/s` with two decimals
pub fn format_hash_rate(rate: f64) -> String {
    if rate >= 1e6 {
        format!("{:.2} MH/s", rate / 1e6)
    } else if rate >= 1e3 {
        format!("{:.2} kH/s", rate / 1e3)
    } else {
        format!("{:.2} H/s", rate)
    }
}
