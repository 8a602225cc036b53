//! Per-swap protocol engine for trustless XMR/ETH atomic swaps.
//!
//! Two role state machines drive a swap over a duplex message stream: the
//! ETH provider ([`alice`]) deploys and controls the escrow contract, the
//! XMR provider ([`bob`]) locks coins on the shared spend/view key pair.
//! The contract is the single source of truth for dispute resolution; both
//! exits and the [`recovery`] engine resolve ambiguity by scanning its
//! logs, never by retrying blind.

pub mod alice;
pub mod amounts;
pub mod bob;
pub mod checkpoint;
pub mod config;
pub mod ethereum;
pub mod messages;
pub mod monero_client;
pub mod recovery;
pub mod session;
pub mod sim;
pub mod status;

mod errors;

pub use alice::{Alice, AliceSwap};
pub use amounts::{EtherAmount, MoneroAmount};
pub use bob::{Bob, BobSwap};
pub use checkpoint::{Checkpoint, CheckpointFile, PrivateKeyInfo};
pub use config::{EngineConfig, Environment};
pub use errors::SwapError;
pub use ethereum::{EthereumClient, EthereumError, TxReceipt};
pub use messages::{ExpectedMessage, Message, SendKeysMessage};
pub use monero_client::{MoneroClient, XmrTransfer};
pub use recovery::{Recoverer, RecoveryKind, RecoveryResult};
pub use session::CancelToken;
pub use status::Status;
