//! Confirmation tracking for the swap lock transfer.
//!
//! Role B waits for its own lock to confirm before notifying the
//! counterparty; role A can reuse the same watcher over a view-only wallet
//! on the shared address. A shallow reorg clears the observed lock so the
//! confirmation count restarts from the re-included height.

use monero_rpc::TransferHeight;
use tracing::{debug, warn};

use crate::rpc::XmrWallet;
use crate::types::Result;

#[derive(Debug, Clone, Copy)]
pub struct WatcherConfig {
    pub confirmations_required: u64,
    pub reorg_buffer: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            confirmations_required: 1,
            reorg_buffer: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherEvent {
    NoLockObserved,
    LockInPool {
        amount: u64,
    },
    AwaitingConfirmations {
        observed_height: u64,
        current_height: u64,
        remaining: u64,
    },
    Confirmed {
        observed_height: u64,
        confirmations: u64,
    },
    ReorgDetected {
        previous_height: u64,
        current_height: u64,
    },
}

pub struct LockWatcher {
    config: WatcherConfig,
    expected_address: String,
    expected_amount: u64,
    last_seen_height: Option<u64>,
    lock_height: Option<u64>,
}

impl LockWatcher {
    pub fn new(config: WatcherConfig, expected_address: String, expected_amount: u64) -> Self {
        Self {
            config,
            expected_address,
            expected_amount,
            last_seen_height: None,
            lock_height: None,
        }
    }

    pub fn observe_lock(&mut self, height: u64) {
        if self.lock_height.map_or(true, |current| height < current) {
            debug!(lock_height = height, "observed lock height");
            self.lock_height = Some(height);
        }
    }

    pub fn update_height(&mut self, current_height: u64) -> Option<WatcherEvent> {
        if let Some(previous) = self.last_seen_height {
            if current_height + self.config.reorg_buffer < previous {
                warn!(
                    previous_height = previous,
                    current_height, "reorg detected; clearing observed lock height"
                );
                self.last_seen_height = Some(current_height);
                self.lock_height = None;
                return Some(WatcherEvent::ReorgDetected {
                    previous_height: previous,
                    current_height,
                });
            }
        }
        self.last_seen_height = Some(current_height);
        None
    }

    pub fn evaluate(&self, current_height: u64) -> WatcherEvent {
        match self.lock_height {
            None => WatcherEvent::NoLockObserved,
            Some(observed_height) => {
                let confirmations = current_height.saturating_sub(observed_height);
                if confirmations >= self.config.confirmations_required {
                    WatcherEvent::Confirmed {
                        observed_height,
                        confirmations,
                    }
                } else {
                    WatcherEvent::AwaitingConfirmations {
                        observed_height,
                        current_height,
                        remaining: self.config.confirmations_required - confirmations,
                    }
                }
            }
        }
    }

    /// One refresh-and-scan round. Returns `None` when no matching transfer
    /// is visible yet.
    pub async fn poll_for_lock(&mut self, wallet: &XmrWallet) -> Result<Option<WatcherEvent>> {
        let current_height = wallet.height().await?;
        if let Some(event) = self.update_height(current_height) {
            return Ok(Some(event));
        }

        wallet.refresh(self.last_seen_height).await?;
        for transfer in wallet.incoming_transfers().await? {
            if transfer.address.to_string() != self.expected_address {
                continue;
            }
            let amount = transfer.amount.as_pico();
            if amount < self.expected_amount {
                continue;
            }
            match transfer.height {
                TransferHeight::InPool => {
                    debug!(amount, "lock transfer in pool");
                    return Ok(Some(WatcherEvent::LockInPool { amount }));
                }
                TransferHeight::Confirmed(height) => {
                    self.observe_lock(height.get());
                    return Ok(Some(self.evaluate(current_height)));
                }
            }
        }

        Ok(None)
    }
}
