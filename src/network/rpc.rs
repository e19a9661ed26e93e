// src/network/rpc.rs
use crate::network::contract::{self, current_block_call, current_difficulty_call};
use crate::network::{ChainOracle, LedgerClient, Receipt};
use crate::utils::error::MinerError;
use alloy::primitives::{Address, B256, Bytes};
use reqwest::Client;
use serde_json::{Value, json};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// JSON-RPC client for an Ethereum-compatible node
///
/// Reads the mining contract through `eth_call` and provides the account,
/// fee and receipt queries the submission pipeline relies on.
pub struct RpcClient {
    /// Node endpoint
    url: String,
    /// Mining contract address
    contract: Address,
    /// HTTP client for making RPC requests
    client: Client,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Creates a client for `url` reading the contract at `contract`
    ///
    /// # Arguments
    /// * `url` - HTTP(S) JSON-RPC endpoint
    /// * `contract` - Mining contract address
    /// * `timeout` - Per-request timeout
    pub fn new(url: &str, contract: Address, timeout: Duration) -> Result<Self, MinerError> {
        url::Url::parse(url)?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(RpcClient {
            url: url.to_string(),
            contract,
            client,
            next_id: AtomicU64::new(1),
        })
    }

    /// Mining contract address
    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Makes an RPC call to the node
    ///
    /// # Returns
    /// * `Ok(Value)` - The `result` member of the response (may be `null`)
    /// * `Err(MinerError::RpcError)` - The node answered with an error object
    /// * `Err(MinerError)` - Transport or decoding failure
    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value, MinerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let response: Value = self
            .client
            .post(&self.url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": method,
                "params": params
            }))
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    MinerError::ConnectionError(format!("{}: {}", self.url, e))
                } else {
                    MinerError::HttpError(e)
                }
            })?
            .json()
            .await?;

        take_result(response)
    }

    /// `eth_call` against the mining contract at the latest block
    async fn call_contract(&self, data: Bytes) -> Result<Bytes, MinerError> {
        let result = self
            .rpc_call(
                "eth_call",
                json!([{ "to": self.contract.to_string(), "data": to_hex(&data) }, "latest"]),
            )
            .await?;
        parse_bytes(&result)
    }

    async fn read_uint(&self, data: Bytes) -> Result<u64, MinerError> {
        let raw = self.call_contract(data).await?;
        contract::to_u64(contract::decode_uint(&raw)?)
    }
}

impl ChainOracle for RpcClient {
    async fn current_block(&self) -> Result<u64, MinerError> {
        self.read_uint(current_block_call()).await
    }

    async fn current_difficulty(&self) -> Result<u64, MinerError> {
        self.read_uint(current_difficulty_call()).await
    }
}

impl LedgerClient for RpcClient {
    async fn chain_id(&self) -> Result<u64, MinerError> {
        parse_quantity(&self.rpc_call("eth_chainId", json!([])).await?)
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, MinerError> {
        let result = self
            .rpc_call(
                "eth_getTransactionCount",
                json!([address.to_string(), "latest"]),
            )
            .await?;
        parse_quantity(&result)
    }

    async fn gas_price(&self) -> Result<u128, MinerError> {
        parse_quantity_u128(&self.rpc_call("eth_gasPrice", json!([])).await?)
    }

    async fn max_priority_fee(&self) -> Result<u128, MinerError> {
        parse_quantity_u128(&self.rpc_call("eth_maxPriorityFeePerGas", json!([])).await?)
    }

    async fn estimate_gas(
        &self,
        from: Address,
        to: Address,
        data: &Bytes,
    ) -> Result<u64, MinerError> {
        let result = self
            .rpc_call(
                "eth_estimateGas",
                json!([{
                    "from": from.to_string(),
                    "to": to.to_string(),
                    "data": to_hex(data)
                }]),
            )
            .await?;
        parse_quantity(&result)
    }

    async fn send_raw_transaction(&self, raw: &Bytes) -> Result<B256, MinerError> {
        let result = self
            .rpc_call("eth_sendRawTransaction", json!([to_hex(raw)]))
            .await?;
        parse_hash(&result)
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<Receipt>, MinerError> {
        let result = self
            .rpc_call("eth_getTransactionReceipt", json!([to_hex(hash.as_slice())]))
            .await?;
        parse_receipt(&result)
    }

    async fn block_number(&self) -> Result<u64, MinerError> {
        parse_quantity(&self.rpc_call("eth_blockNumber", json!([])).await?)
    }
}

/// Extracts `result`, turning a JSON-RPC `error` member into [`MinerError::RpcError`]
fn take_result(mut response: Value) -> Result<Value, MinerError> {
    if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
        return Err(MinerError::RpcError {
            code: error["code"].as_i64().unwrap_or_default(),
            message: error["message"]
                .as_str()
                .unwrap_or("unknown error")
                .to_string(),
        });
    }
    response
        .get_mut("result")
        .map(Value::take)
        .ok_or_else(|| MinerError::ProtocolError("Missing result member".to_string()))
}

/// `0x`-prefixed lowercase hex, the encoding JSON-RPC expects for data
fn to_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

fn as_hex_str(value: &Value) -> Result<&str, MinerError> {
    value
        .as_str()
        .ok_or_else(|| MinerError::ProtocolError(format!("Expected hex string, got {}", value)))
}

/// Parses a `0x`-prefixed hex quantity into `u64`
fn parse_quantity(value: &Value) -> Result<u64, MinerError> {
    let text = as_hex_str(value)?;
    let digits = text.trim_start_matches("0x");
    u64::from_str_radix(if digits.is_empty() { "0" } else { digits }, 16)
        .map_err(|e| MinerError::ProtocolError(format!("Invalid quantity {}: {}", text, e)))
}

/// Parses a `0x`-prefixed hex quantity into `u128`
fn parse_quantity_u128(value: &Value) -> Result<u128, MinerError> {
    let text = as_hex_str(value)?;
    let digits = text.trim_start_matches("0x");
    u128::from_str_radix(if digits.is_empty() { "0" } else { digits }, 16)
        .map_err(|e| MinerError::ProtocolError(format!("Invalid quantity {}: {}", text, e)))
}

fn parse_bytes(value: &Value) -> Result<Bytes, MinerError> {
    let text = as_hex_str(value)?;
    Ok(hex::decode(text.trim_start_matches("0x"))?.into())
}

fn parse_hash(value: &Value) -> Result<B256, MinerError> {
    let text = as_hex_str(value)?;
    B256::from_str(text)
        .map_err(|e| MinerError::ProtocolError(format!("Invalid transaction hash {}: {}", text, e)))
}

/// `null` means not yet included
fn parse_receipt(value: &Value) -> Result<Option<Receipt>, MinerError> {
    if value.is_null() {
        return Ok(None);
    }
    // Some nodes return a receipt for a pending transaction with a null block
    if value["blockNumber"].is_null() {
        return Ok(None);
    }
    let block_number = parse_quantity(&value["blockNumber"])?;
    let success = match &value["status"] {
        Value::Null => true,
        status => parse_quantity(status)? == 1,
    };
    Ok(Some(Receipt {
        block_number,
        success,
    }))
}
