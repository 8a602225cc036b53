use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// Contract-assigned swap identifier.
pub type SwapId = U256;

/// Mirror of the on-chain swap record.
///
/// `timeout0`/`timeout1` are absolute chain timestamps with
/// `t1 - creation = 2 * (t0 - creation)`; together with `is_ready` they
/// carve the claim and refund windows so that at any instant exactly one
/// party can make progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swap {
    pub owner: Address,
    pub claimer: Address,
    pub pub_key_claim: B256,
    pub pub_key_refund: B256,
    pub timeout0: u64,
    pub timeout1: u64,
    pub value: U256,
    pub is_ready: bool,
    pub completed: bool,
}

impl Swap {
    /// The claimer may act once the contract is ready or t0 has passed,
    /// and only before t1.
    pub fn claim_window_open(&self, now: u64) -> bool {
        (self.is_ready || now >= self.timeout0) && now < self.timeout1
    }

    /// The owner may act after t1, or before t0 while the contract has not
    /// been marked ready.
    pub fn refund_window_open(&self, now: u64) -> bool {
        now >= self.timeout1 || (now < self.timeout0 && !self.is_ready)
    }
}
