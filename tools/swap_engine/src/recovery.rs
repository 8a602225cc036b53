//! Stateless recovery engine.
//!
//! Reconstructs the tail of either role's state machine from a persisted
//! secret scalar, the contract address and the swap id, then drives it to
//! a terminal outcome. Operations are idempotent: a rerun observes the
//! terminal state on chain and reports it instead of acting again.

use std::sync::Arc;

use alloy_primitives::{Address, B256};
use escrow_swap::{claimed_topic, refunded_topic, SwapId};
use serde::Serialize;
use swap_crypto::{
    keys_and_proof_from_secret, sum_private_spend_keys, sum_private_view_keys, KeysAndProof,
    PrivateKeyPair, PrivateSpendKey, ScalarLE,
};
use tracing::{debug, info, warn};

use crate::checkpoint::CheckpointFile;
use crate::config::EngineConfig;
use crate::errors::SwapError;
use crate::ethereum::EthereumClient;
use crate::monero_client::MoneroClient;
use crate::session::{find_log_for_swap, find_revealed_secret};

const COMPLETED_SCAN_ROUNDS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryKind {
    /// The asset owed to us was claimed (ETH for role B, XMR for role A).
    Claimed,
    /// Our ETH came back via `refund` (role A).
    Refunded,
    /// Our XMR came back through the counterparty's refund (role B).
    Reclaimed,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecoveryResult {
    pub kind: RecoveryKind,
    pub tx_hash: Option<B256>,
    pub xmr_address: Option<String>,
}

pub struct Recoverer<E, M> {
    eth: Arc<E>,
    xmr: Arc<M>,
    cfg: EngineConfig,
}

impl<E: EthereumClient, M: MoneroClient> Recoverer<E, M> {
    pub fn new(eth: Arc<E>, xmr: Arc<M>, cfg: EngineConfig) -> Self {
        Self { eth, xmr, cfg }
    }

    /// Role A recovery: sweep the shared XMR wallet if the counterparty
    /// claimed, refund the ETH otherwise.
    pub async fn claim_or_refund(
        &self,
        secret: ScalarLE,
        contract: Address,
        swap_id: SwapId,
    ) -> Result<RecoveryResult, SwapError> {
        let keys = keys_and_proof_from_secret(secret)?;
        let mut completed_rounds = 0;

        loop {
            if let Some(revealed) =
                find_revealed_secret(&*self.eth, contract, claimed_topic(), swap_id).await?
            {
                let other = PrivateSpendKey::from_scalar_le(&revealed.to_le())?;
                let (address, tx) = self.sweep_shared(&keys, &other, "alice-recover").await?;
                info!(%address, %tx, "recovered XMR from counterparty claim");
                return Ok(RecoveryResult {
                    kind: RecoveryKind::Claimed,
                    tx_hash: None,
                    xmr_address: Some(address),
                });
            }

            let swap = self.eth.swap(contract, swap_id).await?;
            let now = self.eth.block_timestamp().await?;

            if swap.completed {
                if find_log_for_swap(&*self.eth, contract, refunded_topic(), swap_id)
                    .await?
                    .is_some()
                {
                    // Our refund already landed in an earlier run.
                    return Ok(RecoveryResult {
                        kind: RecoveryKind::Refunded,
                        tx_hash: None,
                        xmr_address: None,
                    });
                }
                completed_rounds += 1;
                if completed_rounds >= COMPLETED_SCAN_ROUNDS {
                    return Err(SwapError::NoClaimLogsFound);
                }
            } else if swap.refund_window_open(now) {
                match self
                    .eth
                    .refund(contract, swap_id, keys.dleq_proof.secret().to_be())
                    .await
                {
                    Ok(receipt) => {
                        info!(tx = %receipt.tx_hash, "refunded ETH");
                        return Ok(RecoveryResult {
                            kind: RecoveryKind::Refunded,
                            tx_hash: Some(receipt.tx_hash),
                            xmr_address: None,
                        });
                    }
                    Err(err) if err.is_swap_completed_revert() => {
                        warn!("refund reverted: swap completed concurrently; re-scanning logs");
                    }
                    Err(err) => return Err(err.into()),
                }
            } else {
                debug!(now, t1 = swap.timeout1, "refund window closed; waiting");
            }

            tokio::time::sleep(self.cfg.poll_interval).await;
        }
    }

    /// Role B recovery: reclaim the shared XMR wallet if the counterparty
    /// refunded, claim the ETH while the window is open otherwise. Past t1
    /// the claim would revert, so it is skipped and the `Refunded` log is
    /// awaited instead.
    pub async fn claim_or_reclaim(
        &self,
        secret: ScalarLE,
        contract: Address,
        swap_id: SwapId,
    ) -> Result<RecoveryResult, SwapError> {
        let keys = keys_and_proof_from_secret(secret)?;
        let mut completed_rounds = 0;

        loop {
            if let Some(revealed) =
                find_revealed_secret(&*self.eth, contract, refunded_topic(), swap_id).await?
            {
                let other = PrivateSpendKey::from_scalar_le(&revealed.to_le())?;
                let (address, tx) = self.sweep_shared(&keys, &other, "bob-recover").await?;
                info!(%address, %tx, "reclaimed XMR after counterparty refund");
                return Ok(RecoveryResult {
                    kind: RecoveryKind::Reclaimed,
                    tx_hash: None,
                    xmr_address: Some(address),
                });
            }

            let swap = self.eth.swap(contract, swap_id).await?;
            let now = self.eth.block_timestamp().await?;

            if swap.completed {
                if find_log_for_swap(&*self.eth, contract, claimed_topic(), swap_id)
                    .await?
                    .is_some()
                {
                    // Our claim already landed in an earlier run.
                    return Ok(RecoveryResult {
                        kind: RecoveryKind::Claimed,
                        tx_hash: None,
                        xmr_address: None,
                    });
                }
                completed_rounds += 1;
                if completed_rounds >= COMPLETED_SCAN_ROUNDS {
                    return Err(SwapError::NoRefundLogsFound);
                }
            } else if now >= swap.timeout1 {
                debug!(now, t1 = swap.timeout1, "past t1; waiting for counterparty refund");
            } else if swap.is_ready || now >= swap.timeout0 {
                match self
                    .eth
                    .claim(contract, swap_id, keys.dleq_proof.secret().to_be())
                    .await
                {
                    Ok(receipt) => {
                        info!(tx = %receipt.tx_hash, "claimed ETH");
                        return Ok(RecoveryResult {
                            kind: RecoveryKind::Claimed,
                            tx_hash: Some(receipt.tx_hash),
                            xmr_address: None,
                        });
                    }
                    Err(err) if err.is_swap_completed_revert() => {
                        warn!("claim reverted: swap completed concurrently; re-scanning logs");
                    }
                    Err(err) => return Err(err.into()),
                }
            } else {
                debug!(now, t0 = swap.timeout0, "claim window not open yet; waiting");
            }

            tokio::time::sleep(self.cfg.poll_interval).await;
        }
    }

    /// Rebuilds the shared wallet directly from both revealed secrets.
    pub async fn wallet_from_secrets(
        &self,
        secret_a: ScalarLE,
        secret_b: ScalarLE,
    ) -> Result<String, SwapError> {
        let a = PrivateSpendKey::from_scalar_le(&secret_a)?;
        let b = PrivateSpendKey::from_scalar_le(&secret_b)?;
        let shared = PrivateKeyPair::new(
            sum_private_spend_keys(&a, &b),
            sum_private_view_keys(&a.view_key(), &b.view_key()),
        );
        let address = self
            .xmr
            .open_shared_wallet(
                "swap-recovered",
                &shared,
                self.cfg.env.monero_network(),
                None,
            )
            .await?;
        Ok(address)
    }

    async fn sweep_shared(
        &self,
        ours: &KeysAndProof,
        other_spend: &PrivateSpendKey,
        wallet_name: &str,
    ) -> Result<(String, String), SwapError> {
        let shared = PrivateKeyPair::new(
            sum_private_spend_keys(ours.key_pair.spend_key(), other_spend),
            sum_private_view_keys(ours.key_pair.view_key(), &other_spend.view_key()),
        );

        // Persist before touching the wallet; a crash here must not lose
        // the only copy of the shared key.
        CheckpointFile::new(self.cfg.recovery_checkpoint_path())
            .write_shared_swap_keys(&shared, self.cfg.env)?;

        let destination = self.xmr.primary_address().await?;
        let address = self
            .xmr
            .open_shared_wallet(
                wallet_name,
                &shared,
                self.cfg.env.monero_network(),
                None,
            )
            .await?;
        let tx = self.xmr.sweep_all(&destination).await?;
        Ok((address, tx))
    }
}
