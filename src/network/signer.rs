// src/network/signer.rs
//! Wallet keystore and transaction signing
//!
//! Key material never leaves this module: the pipeline hands over an
//! [`UnsignedTransaction`] and gets raw EIP-2718 bytes back.

use crate::types::FeeModel;
use crate::utils::error::MinerError;
use alloy::consensus::{SignableTransaction, TxEip1559, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::primitives::{Address, Bytes, TxKind, U256};
use alloy::signers::local::PrivateKeySigner;
use std::env;
use std::fs;
use std::io::IsTerminal;
use std::path::Path;

/// Environment variable consulted for the wallet passphrase
pub const PASSWORD_ENV: &str = "COMMU_WALLET_PASSWORD";

/// A contract call ready to be signed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    /// Network the transaction is valid on
    pub chain_id: u64,
    /// Sender account nonce
    pub nonce: u64,
    /// Contract address
    pub to: Address,
    /// ABI-encoded call
    pub input: Bytes,
    /// Gas limit
    pub gas_limit: u64,
    /// Fee parameters
    pub fees: FeeModel,
}

/// Turns unsigned transactions into broadcastable bytes
pub trait TransactionSigner: Send + Sync {
    /// Address the signatures recover to
    fn address(&self) -> Address;

    /// Signs and encodes `tx`
    fn sign_transaction(&self, tx: &UnsignedTransaction) -> Result<Bytes, MinerError>;
}

/// Signer backed by a decrypted Web3 secret-storage keystore
pub struct KeystoreSigner {
    inner: PrivateKeySigner,
}

impl KeystoreSigner {
    /// Decrypts the keystore at `path`
    ///
    /// A missing file or a wrong passphrase is a [`MinerError::CredentialError`].
    pub fn open(path: &Path, password: &str) -> Result<Self, MinerError> {
        if !path.is_file() {
            return Err(MinerError::CredentialError(format!(
                "wallet file not found: {}",
                path.display()
            )));
        }
        let inner = PrivateKeySigner::decrypt_keystore(path, password).map_err(|e| {
            MinerError::CredentialError(format!(
                "could not unlock wallet {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(KeystoreSigner { inner })
    }

    /// Wraps an already available key
    pub fn from_signer(inner: PrivateKeySigner) -> Self {
        KeystoreSigner { inner }
    }
}

impl TransactionSigner for KeystoreSigner {
    fn address(&self) -> Address {
        self.inner.address()
    }

    fn sign_transaction(&self, tx: &UnsignedTransaction) -> Result<Bytes, MinerError> {
        let envelope: TxEnvelope = match tx.fees {
            FeeModel::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => {
                let mut unsigned = TxEip1559 {
                    chain_id: tx.chain_id,
                    nonce: tx.nonce,
                    gas_limit: tx.gas_limit,
                    max_fee_per_gas,
                    max_priority_fee_per_gas,
                    to: TxKind::Call(tx.to),
                    value: U256::ZERO,
                    access_list: Default::default(),
                    input: tx.input.clone(),
                };
                let signature = self
                    .inner
                    .sign_transaction_sync(&mut unsigned)
                    .map_err(|e| MinerError::SigningError(e.to_string()))?;
                unsigned.into_signed(signature).into()
            }
            FeeModel::Legacy { gas_price } => {
                let mut unsigned = TxLegacy {
                    chain_id: Some(tx.chain_id),
                    nonce: tx.nonce,
                    gas_price,
                    gas_limit: tx.gas_limit,
                    to: TxKind::Call(tx.to),
                    value: U256::ZERO,
                    input: tx.input.clone(),
                };
                let signature = self
                    .inner
                    .sign_transaction_sync(&mut unsigned)
                    .map_err(|e| MinerError::SigningError(e.to_string()))?;
                unsigned.into_signed(signature).into()
            }
        };
        Ok(envelope.encoded_2718().into())
    }
}

/// Reads the `address` field of a keystore without decrypting it
pub fn keystore_address(path: &Path) -> Result<String, MinerError> {
    let raw = fs::read_to_string(path).map_err(|e| {
        MinerError::CredentialError(format!("could not read wallet {}: {}", path.display(), e))
    })?;
    let json: serde_json::Value = serde_json::from_str(&raw).map_err(|e| {
        MinerError::CredentialError(format!("wallet {} is not JSON: {}", path.display(), e))
    })?;
    json["address"]
        .as_str()
        .map(|address| format!("0x{}", address.trim_start_matches("0x")))
        .ok_or_else(|| {
            MinerError::CredentialError(format!("wallet {} has no address", path.display()))
        })
}

/// Resolves the wallet passphrase
///
/// Order: `password_file`, then [`PASSWORD_ENV`], then a hidden prompt when
/// stdin is a terminal.
pub fn read_passphrase(password_file: Option<&Path>) -> Result<String, MinerError> {
    if let Some(path) = password_file {
        let raw = fs::read_to_string(path).map_err(|e| {
            MinerError::CredentialError(format!(
                "could not read password file {}: {}",
                path.display(),
                e
            ))
        })?;
        return Ok(raw.trim_end_matches(['\r', '\n']).to_string());
    }

    if let Ok(password) = env::var(PASSWORD_ENV) {
        if !password.is_empty() {
            return Ok(password);
        }
    }

    if !std::io::stdin().is_terminal() {
        return Err(MinerError::CredentialError(format!(
            "no passphrase: pass --password-file or set {}",
            PASSWORD_ENV
        )));
    }
    rpassword::prompt_password("Unlock wallet: ")
        .map_err(|e| MinerError::CredentialError(format!("could not read passphrase: {}", e)))
}
