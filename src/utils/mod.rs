// src/utils/mod.rs
//! Error handling and logging shared by every other module

/// Error types and handling utilities
///
/// Contains the [`MinerError`] enum used as the error type of every fallible
/// operation in the crate.
pub mod error;

/// Logging configuration
pub mod logging;

pub use error::MinerError;
pub use logging::init_logging;
