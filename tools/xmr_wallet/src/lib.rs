//! Monero wallet integration for the swap engine.
//!
//! Auditor notes:
//! - RPC access is a thin wrapper over `monero-rpc`; no wallet logic is
//!   reimplemented here.
//! - Read-only calls are retried with backoff; transfers and sweeps are
//!   issued exactly once.

pub mod rpc;
pub mod types;
pub mod watcher;

pub use rpc::{Balance, RetryConfig, TransferReceipt, XmrWallet};
pub use types::{Result, XmrWalletError};
pub use watcher::{LockWatcher, WatcherConfig, WatcherEvent};
