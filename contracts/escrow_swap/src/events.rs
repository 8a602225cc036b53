//! Event encoding shared by the simulator and the log-scanning helpers.
//!
//! All event parameters live in the data section as 32-byte words, with a
//! single topic per event, matching the contract ABI:
//!
//! - `New(uint256 swapID, bytes32 claimKey, bytes32 refundKey)`
//! - `Ready(uint256 swapID)`
//! - `Claimed(uint256 swapID, bytes32 s)`
//! - `Refunded(uint256 swapID, bytes32 s)`
//!
//! The revealed scalar `s` is big-endian (EVM byte order); converting it to
//! an ed25519 key is the caller's job via [`ScalarBE::to_le`].

use alloy_primitives::{keccak256, Address, B256, U256};
use swap_crypto::ScalarBE;
use thiserror::Error;

use crate::state::SwapId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLog {
    pub address: Address,
    pub topic: B256,
    pub data: Vec<u8>,
    pub block_number: u64,
    pub log_index: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LogError {
    #[error("log has unexpected topic")]
    WrongTopic,
    #[error("log data is too short")]
    TruncatedData,
    #[error("got zero secret from contract log")]
    ZeroSecret,
}

pub fn new_topic() -> B256 {
    keccak256("New(uint256,bytes32,bytes32)")
}

pub fn ready_topic() -> B256 {
    keccak256("Ready(uint256)")
}

pub fn claimed_topic() -> B256 {
    keccak256("Claimed(uint256,bytes32)")
}

pub fn refunded_topic() -> B256 {
    keccak256("Refunded(uint256,bytes32)")
}

pub fn encode_new_data(swap_id: SwapId, claim_key: B256, refund_key: B256) -> Vec<u8> {
    let mut data = Vec::with_capacity(96);
    data.extend_from_slice(&swap_id.to_be_bytes::<32>());
    data.extend_from_slice(claim_key.as_slice());
    data.extend_from_slice(refund_key.as_slice());
    data
}

pub fn encode_id_data(swap_id: SwapId) -> Vec<u8> {
    swap_id.to_be_bytes::<32>().to_vec()
}

pub fn encode_secret_data(swap_id: SwapId, secret: &ScalarBE) -> Vec<u8> {
    let mut data = Vec::with_capacity(64);
    data.extend_from_slice(&swap_id.to_be_bytes::<32>());
    data.extend_from_slice(&secret.to_bytes());
    data
}

/// Reads the swap id from any of the four event payloads; every event puts
/// it in the first data word.
pub fn swap_id_from_log(log: &EventLog) -> Result<SwapId, LogError> {
    if log.data.len() < 32 {
        return Err(LogError::TruncatedData);
    }
    Ok(U256::from_be_slice(&log.data[..32]))
}

pub fn swap_id_from_new_log(log: &EventLog) -> Result<SwapId, LogError> {
    if log.topic != new_topic() {
        return Err(LogError::WrongTopic);
    }
    swap_id_from_log(log)
}

pub fn swap_id_matches(log: &EventLog, swap_id: SwapId) -> bool {
    swap_id_from_log(log).is_ok_and(|id| id == swap_id)
}

pub fn claim_refund_keys_from_new_log(log: &EventLog) -> Result<(B256, B256), LogError> {
    if log.topic != new_topic() {
        return Err(LogError::WrongTopic);
    }
    if log.data.len() < 96 {
        return Err(LogError::TruncatedData);
    }
    Ok((
        B256::from_slice(&log.data[32..64]),
        B256::from_slice(&log.data[64..96]),
    ))
}

/// Extracts the revealed secret from a `Claimed` or `Refunded` log. The
/// contract can never emit an all-zero scalar; seeing one means the log is
/// corrupt and must not be turned into a spend key.
pub fn secret_from_log(log: &EventLog) -> Result<ScalarBE, LogError> {
    if log.topic != claimed_topic() && log.topic != refunded_topic() {
        return Err(LogError::WrongTopic);
    }
    if log.data.len() < 64 {
        return Err(LogError::TruncatedData);
    }
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&log.data[32..64]);
    let secret = ScalarBE::from_bytes(bytes);
    if secret.is_zero() {
        return Err(LogError::ZeroSecret);
    }
    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_with(topic: B256, data: Vec<u8>) -> EventLog {
        EventLog {
            address: Address::ZERO,
            topic,
            data,
            block_number: 1,
            log_index: 0,
        }
    }

    #[test]
    fn new_log_roundtrips() {
        let id = U256::from(7u64);
        let claim_key = B256::repeat_byte(0xaa);
        let refund_key = B256::repeat_byte(0xbb);
        let log = log_with(new_topic(), encode_new_data(id, claim_key, refund_key));

        assert_eq!(swap_id_from_new_log(&log).unwrap(), id);
        assert!(swap_id_matches(&log, id));
        assert!(!swap_id_matches(&log, U256::from(8u64)));
        assert_eq!(
            claim_refund_keys_from_new_log(&log).unwrap(),
            (claim_key, refund_key)
        );
    }

    #[test]
    fn secret_roundtrips_through_log_data() {
        let secret = ScalarBE::from_bytes([3u8; 32]);
        let log = log_with(claimed_topic(), encode_secret_data(U256::from(1u64), &secret));
        assert_eq!(secret_from_log(&log).unwrap(), secret);
    }

    #[test]
    fn rejects_zero_secret() {
        let secret = ScalarBE::from_bytes([0u8; 32]);
        let log = log_with(
            refunded_topic(),
            encode_secret_data(U256::from(1u64), &secret),
        );
        assert_eq!(secret_from_log(&log).unwrap_err(), LogError::ZeroSecret);
    }

    #[test]
    fn rejects_wrong_topic() {
        let log = log_with(ready_topic(), encode_id_data(U256::from(1u64)));
        assert_eq!(secret_from_log(&log).unwrap_err(), LogError::WrongTopic);
        assert_eq!(
            swap_id_from_new_log(&log).unwrap_err(),
            LogError::WrongTopic
        );
    }

    #[test]
    fn topics_are_distinct() {
        let topics = [new_topic(), ready_topic(), claimed_topic(), refunded_topic()];
        for (i, a) in topics.iter().enumerate() {
            for b in &topics[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
