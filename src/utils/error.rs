// src/utils/error.rs
use crate::stats::reporter::SubmissionEvent;
use serde_json;
use std::io;
use thiserror::Error;
use url;

/// Main error type for the mining application
///
/// This enum represents all possible error conditions that can occur
/// while mining, talking to the ledger, or loading credentials and
/// configuration.
#[derive(Error, Debug)]
pub enum MinerError {
    /// Errors related to network connectivity
    #[error("Network connection error: {0}")]
    ConnectionError(String),

    /// The node answered with a JSON-RPC error object
    #[error("RPC error {code}: {message}")]
    RpcError {
        /// JSON-RPC error code reported by the node
        code: i64,
        /// Human readable message reported by the node
        message: String,
    },

    /// Errors in protocol handling or malformed responses
    #[error("Protocol violation: {0}")]
    ProtocolError(String),

    /// Standard I/O operation errors
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    /// HTTP request/response errors
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Configuration file or parameter errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Wallet file missing, unreadable, or the passphrase is wrong
    #[error("Credential error: {0}")]
    CredentialError(String),

    /// Transaction signing failures
    #[error("Signing error: {0}")]
    SigningError(String),

    /// Thread communication channel errors
    #[error("Thread communication error: {0}")]
    ChannelError(String),

    /// Async task execution errors
    #[error("Task execution error: {0}")]
    TaskError(String),
}

impl MinerError {
    /// Returns true for failures worth retrying on the next poll tick
    ///
    /// Transport and malformed-response errors are transient; an error
    /// object returned by the node is a definitive answer and is not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MinerError::ConnectionError(_)
                | MinerError::HttpError(_)
                | MinerError::ProtocolError(_)
                | MinerError::JsonError(_)
        )
    }
}

/// Converts crossbeam channel send errors for submission events into MinerError
impl From<crossbeam_channel::SendError<SubmissionEvent>> for MinerError {
    fn from(e: crossbeam_channel::SendError<SubmissionEvent>) -> Self {
        MinerError::ChannelError(format!("Submission event send failed: {}", e))
    }
}

/// Converts hex decoding errors into MinerError
///
/// Used when the node returns quantities or data that are not valid hex.
impl From<hex::FromHexError> for MinerError {
    fn from(e: hex::FromHexError) -> Self {
        MinerError::ProtocolError(format!("Hex conversion failed: {}", e))
    }
}

/// Converts async task join errors into MinerError
///
/// Used when the blocking search task panics or is aborted.
impl From<tokio::task::JoinError> for MinerError {
    fn from(e: tokio::task::JoinError) -> Self {
        MinerError::TaskError(format!("Async task failed: {}", e))
    }
}

/// Converts rayon pool construction failures into MinerError
impl From<rayon::ThreadPoolBuildError> for MinerError {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        MinerError::TaskError(format!("Worker pool creation failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_errors_are_not_transient() {
        let rejected = MinerError::RpcError {
            code: -32000,
            message: "nonce too low".into(),
        };
        assert!(!rejected.is_transient());
        assert!(MinerError::ConnectionError("refused".into()).is_transient());
        assert!(!MinerError::CredentialError("bad passphrase".into()).is_transient());
    }

    #[test]
    fn rpc_error_display_includes_code_and_message() {
        let err = MinerError::RpcError {
            code: -32000,
            message: "insufficient funds".into(),
        };
        assert_eq!(err.to_string(), "RPC error -32000: insufficient funds");
    }
}
