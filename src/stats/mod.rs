//! Statistics collection and reporting
//!
//! Tracks hashes examined, rounds won and submission outcomes, and logs
//! them periodically through [`StatsReporter`].

/// Statistics reporter implementation
pub mod reporter;

pub use reporter::{HashCounter, MiningStats, StatsReporter, SubmissionEvent, format_hash_rate};
