// src/miner/progress.rs
//! Search progress checkpoints
//!
//! A checkpoint lets a restarted miner resume the current block's search
//! instead of rehashing nonces it already examined. It is only honoured for
//! the block it was written for.

use crate::utils::error::MinerError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted search position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Block the search belongs to
    pub block_number: u64,
    /// Every nonce below this one has been examined
    pub last_nonce: u64,
}

/// File-backed checkpoint storage; does nothing when no path is configured
#[derive(Debug, Clone, Default)]
pub struct ProgressStore {
    path: Option<PathBuf>,
}

impl ProgressStore {
    /// Creates a store writing to `path`, or a disabled one for `None`
    pub fn new(path: Option<PathBuf>) -> Self {
        ProgressStore { path }
    }

    /// Whether checkpoints are persisted at all
    pub fn is_enabled(&self) -> bool {
        self.path.is_some()
    }

    /// Reads the stored checkpoint
    ///
    /// A missing file is not an error. A corrupt one is logged and ignored.
    pub fn load(&self) -> Option<Checkpoint> {
        let path = self.path.as_ref()?;
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                log::warn!("Could not read progress file {}: {}", path.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(checkpoint) => Some(checkpoint),
            Err(e) => {
                log::warn!("Ignoring corrupt progress file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Nonce to start `block_number`'s search from
    ///
    /// Zero unless a checkpoint for exactly this block exists.
    pub fn resume_nonce(&self, block_number: u64) -> u64 {
        match self.load() {
            Some(checkpoint) if checkpoint.block_number == block_number => {
                log::info!(
                    "Resuming block {} from nonce {}",
                    block_number,
                    checkpoint.last_nonce
                );
                checkpoint.last_nonce
            }
            Some(checkpoint) => {
                log::debug!(
                    "Discarding checkpoint for block {} (current block {})",
                    checkpoint.block_number,
                    block_number
                );
                0
            }
            None => 0,
        }
    }

    /// Writes a checkpoint, replacing the file atomically
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), MinerError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let tmp = tmp_path(path);
        fs::write(&tmp, serde_json::to_vec(checkpoint)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Removes the checkpoint
    pub fn clear(&self) -> Result<(), MinerError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        match fs::remove_file(path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
