// src/config/mod.rs
//! Configuration management for the miner
//!
//! This module handles all configuration-related functionality including:
//! - Loading and parsing configuration files
//! - Falling back to defaults when no file exists
//! - Generating configuration templates
//!
//! The configuration uses TOML format. Per-run identity (wallet, NFT index
//! and id) is given on the command line instead.

/// Core configuration implementation
///
/// Contains the [`Config`] struct that defines the miner's tunables and
/// their defaults.
pub mod config;

// Re-export key items for easy access
pub use config::{Config, DEFAULT_CONTRACT_ADDRESS, DEFAULT_RPC_URL};

use crate::utils::error::MinerError;
use std::path::Path;

/// Loads miner configuration, using the defaults when `path` does not exist
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err(MinerError)` - If the file exists but couldn't be read or parsed
pub fn load(path: &Path) -> Result<Config, MinerError> {
    Config::load_or_default(path)
}

/// Generates a commented configuration template
pub fn generate_template() -> String {
    Config::generate_template()
}
