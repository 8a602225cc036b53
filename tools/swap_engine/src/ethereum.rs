//! Narrow interface to the contract chain. RPC plumbing lives behind this
//! trait; the engine only needs transaction submission, the swap record,
//! event logs and the chain clock. Timeouts are always compared against
//! [`EthereumClient::block_timestamp`], never the local clock.

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use escrow_swap::{EventLog, Swap, SwapId};
use swap_crypto::ScalarBE;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EthereumError {
    #[error("transaction reverted: {0}")]
    Revert(String),
    #[error("rpc error: {0}")]
    Rpc(String),
}

impl EthereumError {
    /// `"swap is already completed"` in an exit handler is a benign signal
    /// that the counterparty moved first; callers inspect the logs instead
    /// of failing.
    pub fn is_swap_completed_revert(&self) -> bool {
        matches!(self, EthereumError::Revert(reason)
            if reason.contains(escrow_swap::REVERT_SWAP_COMPLETED))
    }
}

#[derive(Debug, Clone)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub logs: Vec<EventLog>,
}

#[async_trait]
pub trait EthereumClient: Send + Sync {
    /// Address of the signing key this client submits transactions with.
    fn address(&self) -> Address;

    async fn block_timestamp(&self) -> Result<u64, EthereumError>;

    async fn code_at(&self, address: Address) -> Result<Vec<u8>, EthereumError>;

    async fn balance(&self) -> Result<U256, EthereumError>;

    #[allow(clippy::too_many_arguments)]
    async fn new_swap(
        &self,
        contract: Address,
        claim_key: B256,
        refund_key: B256,
        claimer: Address,
        timeout_duration: u64,
        value: U256,
    ) -> Result<TxReceipt, EthereumError>;

    async fn set_ready(&self, contract: Address, swap_id: SwapId)
        -> Result<TxReceipt, EthereumError>;

    async fn claim(
        &self,
        contract: Address,
        swap_id: SwapId,
        secret: ScalarBE,
    ) -> Result<TxReceipt, EthereumError>;

    async fn refund(
        &self,
        contract: Address,
        swap_id: SwapId,
        secret: ScalarBE,
    ) -> Result<TxReceipt, EthereumError>;

    async fn swap(&self, contract: Address, swap_id: SwapId) -> Result<Swap, EthereumError>;

    async fn filter_logs(
        &self,
        contract: Address,
        topic: B256,
    ) -> Result<Vec<EventLog>, EthereumError>;
}
