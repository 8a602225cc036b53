//! Off-chain model of the on-chain swap escrow.
//!
//! The contract is the single source of truth for dispute resolution; this
//! crate mirrors its state transitions, timeout windows, revert reasons and
//! event encoding so that the role state machines and the recovery engine
//! can validate what they observe on chain. [`SimulatedEscrow`] executes
//! the identical rules against an in-memory ledger with a manual clock.

pub mod events;
pub mod simulator;
pub mod state;

mod errors;

pub use errors::ContractError;
pub use events::{
    claim_refund_keys_from_new_log, claimed_topic, new_topic, ready_topic, refunded_topic,
    secret_from_log, swap_id_from_log, swap_id_from_new_log, swap_id_matches, EventLog, LogError,
};
pub use simulator::SimulatedEscrow;
pub use state::{Swap, SwapId};

/// Runtime-code prefix shared by all deployments of the escrow contract;
/// role B compares it against `eth_getCode` before trusting an address.
pub const DEPLOYED_CODE_PREFIX: &[u8] = &[0x60, 0x80, 0x60, 0x40, 0x52, 0x34, 0x80, 0x15];

pub const REVERT_SWAP_COMPLETED: &str = "swap is already completed";
