//! Session plumbing shared by both roles: cancellation, cancellable
//! sleeps and contract-log scanning.

use std::sync::Arc;

use alloy_primitives::{Address, B256};
use escrow_swap::{secret_from_log, swap_id_matches, EventLog, SwapId};
use rand::RngCore;
use swap_crypto::ScalarBE;
use tokio::sync::watch;
use tokio::time::{sleep, Duration};

use crate::errors::SwapError;
use crate::ethereum::EthereumClient;

/// Cancellation handle for one swap session. Cancelling aborts every
/// suspension point: chain polls, confirmation waits and the t0/t1 sleeps.
#[derive(Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender kept alive by self; unreachable in practice.
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Sleeps for `duration` unless the token fires first. Returns `true` when
/// cancelled.
pub async fn sleep_or_cancel(token: &CancelToken, duration: Duration) -> bool {
    tokio::select! {
        _ = sleep(duration) => false,
        _ = token.cancelled() => true,
    }
}

/// Earliest log with the given topic matching the swap id; ties within a
/// block resolve by log index.
pub async fn find_log_for_swap<E: EthereumClient + ?Sized>(
    eth: &E,
    contract: Address,
    topic: B256,
    swap_id: SwapId,
) -> Result<Option<EventLog>, SwapError> {
    let logs = eth.filter_logs(contract, topic).await?;
    Ok(logs
        .into_iter()
        .filter(|log| swap_id_matches(log, swap_id))
        .min_by_key(|log| (log.block_number, log.log_index)))
}

/// Random identifier for a session's checkpoint file and wallet names.
pub(crate) fn session_id() -> u64 {
    let mut bytes = [0u8; 8];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    u64::from_be_bytes(bytes)
}

/// Scans for a `Claimed`/`Refunded` log of this swap and extracts the
/// revealed secret.
pub async fn find_revealed_secret<E: EthereumClient + ?Sized>(
    eth: &E,
    contract: Address,
    topic: B256,
    swap_id: SwapId,
) -> Result<Option<ScalarBE>, SwapError> {
    match find_log_for_swap(eth, contract, topic, swap_id).await? {
        Some(log) => Ok(Some(secret_from_log(&log)?)),
        None => Ok(None),
    }
}
