// src/network/contract.rs
//! ABI of the mining contract

use crate::types::MiningResult;
use crate::utils::error::MinerError;
use alloy::primitives::{Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

sol! {
    /// Mining contract: exposes the round and accepts solutions
    interface CommuMining {
        function currentBlock() external view returns (uint256);
        function currentDifficulty() external view returns (uint256);
        function submitPoW(uint256 index, uint256 nftId, uint256 nonce, string hash) external;
    }
}

/// Calldata for `currentBlock()`
pub fn current_block_call() -> Bytes {
    CommuMining::currentBlockCall {}.abi_encode().into()
}

/// Calldata for `currentDifficulty()`
pub fn current_difficulty_call() -> Bytes {
    CommuMining::currentDifficultyCall {}.abi_encode().into()
}

/// Calldata for `submitPoW(index, nftId, nonce, "0x<digest>")`
pub fn submit_pow_call(nft_index: u64, nft_id: u64, result: &MiningResult) -> Bytes {
    CommuMining::submitPoWCall {
        index: U256::from(nft_index),
        nftId: U256::from(nft_id),
        nonce: U256::from(result.nonce),
        hash: result.digest_hex(),
    }
    .abi_encode()
    .into()
}

/// Decodes a single `uint256` return word
pub fn decode_uint(data: &[u8]) -> Result<U256, MinerError> {
    if data.len() < 32 {
        return Err(MinerError::ProtocolError(format!(
            "expected a 32-byte word, got {} bytes",
            data.len()
        )));
    }
    U256::try_from_be_slice(&data[..32])
        .ok_or_else(|| MinerError::ProtocolError("uint256 out of range".into()))
}

/// Narrows a contract value to `u64`
pub fn to_u64(value: U256) -> Result<u64, MinerError> {
    let limbs = value.as_limbs();
    if limbs[1..].iter().any(|limb| *limb != 0) {
        return Err(MinerError::ProtocolError(format!(
            "value {} does not fit in 64 bits",
            value
        )));
    }
    Ok(limbs[0])
}
