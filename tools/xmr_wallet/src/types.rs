use jsonrpc_core::types::error::Error as RpcError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XmrWalletError {
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error("unlocked balance {available} piconero is below required {required}")]
    UnlockedBalanceTooLow { available: u64, required: u64 },
    #[error("transfer returned no transaction hash")]
    MissingTxHash,
}

pub type Result<T> = std::result::Result<T, XmrWalletError>;
