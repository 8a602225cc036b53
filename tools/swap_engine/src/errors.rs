use thiserror::Error;

use crate::ethereum::EthereumError;

/// Protocol and validation failures of a swap session. Validation errors
/// are unrecoverable for the swap and trigger the exit path appropriate to
/// the current stage.
#[derive(Debug, Error)]
pub enum SwapError {
    #[error("received unexpected message type")]
    UnexpectedMessageType,
    #[error("did not receive counterparty public spend or view key")]
    MissingKeys,
    #[error("public key in message does not match the DLEQ proof")]
    KeyProofMismatch,
    #[error("got empty contract address")]
    MissingContractAddress,
    #[error("protocol already in progress")]
    ProtocolAlreadyInProgress,
    #[error("amount provided by peer is too low: got {got}, expected {expected}")]
    AmountProvidedTooLow { got: f64, expected: f64 },
    #[error("unlocked balance is lower than the amount to be provided: got {got}, need {need}")]
    UnlockedBalanceTooLow { got: u64, need: u64 },
    #[error("reported shared address does not match derived address: reported {reported}, derived {derived}")]
    SharedAddressMismatch { reported: String, derived: String },
    #[error("locked XMR amount is too low: got {got} piconero, expected {expected}")]
    LockedAmountTooLow { got: u64, expected: u64 },
    #[error("cannot find New log in receipt")]
    CannotFindNewLog,
    #[error("unexpected swap ID was emitted by New log")]
    UnexpectedSwapId,
    #[error("contract claim key is not expected: got {got}, expected {expected}")]
    ClaimKeyMismatch { got: String, expected: String },
    #[error("contract refund key is not expected: got {got}, expected {expected}")]
    RefundKeyMismatch { got: String, expected: String },
    #[error("contract does not hold the expected balance: got {got}, expected {expected}")]
    ContractValueTooLow { got: String, expected: String },
    #[error("contract claimer is not our address")]
    WrongClaimer,
    #[error("given contract address does not contain correct code")]
    InvalidSwapContract,
    #[error("past t1, can no longer claim")]
    PastClaimTime,
    #[error("no refund logs found")]
    NoRefundLogsFound,
    #[error("no claim logs found")]
    NoClaimLogsFound,
    #[error("peer connection closed")]
    PeerClosed,
    #[error("swap cancelled")]
    Cancelled,

    #[error(transparent)]
    Crypto(#[from] swap_crypto::CryptoError),
    #[error(transparent)]
    Log(#[from] escrow_swap::LogError),
    #[error(transparent)]
    Ethereum(#[from] EthereumError),
    #[error("monero wallet error: {0}")]
    Monero(#[from] anyhow::Error),
    #[error("checkpoint i/o: {0}")]
    Checkpoint(#[from] std::io::Error),
    #[error("checkpoint encoding: {0}")]
    CheckpointEncode(#[from] serde_json::Error),
}
