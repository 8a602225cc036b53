use thiserror::Error;

/// Typed revert reasons of the escrow contract. The `Display` string is
/// exactly the reason the contract puts in the revert payload, so matching
/// on either side is equivalent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("swap is already completed")]
    AlreadyCompleted,
    #[error("swap with given id does not exist")]
    UnknownSwap,
    #[error("only the swap owner can call this function")]
    NotOwner,
    #[error("only the swap claimer can claim")]
    NotClaimer,
    #[error("swap is already ready")]
    AlreadyReady,
    #[error("too early to claim")]
    TooEarlyToClaim,
    #[error("too late to claim")]
    TooLateToClaim,
    #[error("it is the claimer's turn, unable to refund")]
    NotTimeToRefund,
    #[error("provided secret does not match the expected public key")]
    InvalidSecret,
    #[error("value must be non-zero")]
    ZeroValue,
    #[error("timeout duration must be non-zero")]
    ZeroTimeout,
}

impl ContractError {
    pub fn revert_reason(&self) -> String {
        self.to_string()
    }
}
