//! Role A: the ETH provider.
//!
//! Flow: exchange keys, watch the counterparty lock XMR on the shared
//! address, deploy the escrow swap, mark it ready, then either observe the
//! claim (and sweep the shared XMR wallet with the revealed secret) or
//! refund after t1. Every decision on an ambiguous error defers to the
//! contract's observed state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use alloy_primitives::{Address, B256};
use escrow_swap::{
    claim_refund_keys_from_new_log, claimed_topic, new_topic, refunded_topic, swap_id_from_new_log,
    SwapId,
};
use swap_crypto::{
    generate_keys_and_proof, sum_private_spend_keys, sum_private_view_keys, sum_public_key_pairs,
    KeysAndProof, PrivateKeyPair, PrivateSpendKey, ScalarBE,
};
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, info, warn};

use crate::amounts::{EtherAmount, MoneroAmount};
use crate::checkpoint::CheckpointFile;
use crate::config::EngineConfig;
use crate::errors::SwapError;
use crate::ethereum::EthereumClient;
use crate::messages::{CounterpartyKeys, ExpectedMessage, Message, SendKeysMessage};
use crate::monero_client::MoneroClient;
use crate::session::{find_log_for_swap, find_revealed_secret, session_id, sleep_or_cancel, CancelToken};
use crate::status::Status;

/// Role instance; at most one swap session is active at a time.
pub struct Alice<E, M> {
    eth: Arc<E>,
    xmr: Arc<M>,
    cfg: EngineConfig,
    contract: Address,
    busy: Arc<AtomicBool>,
}

impl<E: EthereumClient, M: MoneroClient> Alice<E, M> {
    pub fn new(eth: Arc<E>, xmr: Arc<M>, cfg: EngineConfig, contract: Address) -> Self {
        Self {
            eth,
            xmr,
            cfg,
            contract,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Starts a session providing `provides` ETH for `desired` XMR.
    pub fn new_swap(
        &self,
        provides: EtherAmount,
        desired: MoneroAmount,
        outbox: mpsc::Sender<Message>,
    ) -> Result<AliceSwap<E, M>, SwapError> {
        if self.busy.swap(true, Ordering::SeqCst) {
            return Err(SwapError::ProtocolAlreadyInProgress);
        }

        let session_id = session_id();
        info!(
            session_id,
            %provides,
            %desired,
            rate = crate::amounts::exchange_rate(desired, provides),
            "starting swap as ETH provider"
        );
        let checkpoint = CheckpointFile::new(self.cfg.checkpoint_path("alice", session_id));
        let (status_tx, _) = watch::channel(Status::Ongoing);

        Ok(AliceSwap {
            eth: self.eth.clone(),
            xmr: self.xmr.clone(),
            cfg: self.cfg.clone(),
            contract: self.contract,
            provides,
            desired,
            outbox,
            cancel: CancelToken::new(),
            status: status_tx,
            busy: self.busy.clone(),
            session_id,
            inner: Mutex::new(AliceInner {
                next_expected: ExpectedMessage::Keys,
                keys: None,
                own_xmr_address: None,
                bob_keys: None,
                swap_id: None,
                timeout1: None,
                checkpoint,
                exit_status: None,
            }),
        })
    }
}

pub struct AliceSwap<E, M> {
    eth: Arc<E>,
    xmr: Arc<M>,
    cfg: EngineConfig,
    contract: Address,
    provides: EtherAmount,
    desired: MoneroAmount,
    outbox: mpsc::Sender<Message>,
    cancel: CancelToken,
    status: watch::Sender<Status>,
    busy: Arc<AtomicBool>,
    session_id: u64,
    inner: Mutex<AliceInner>,
}

struct AliceInner {
    next_expected: ExpectedMessage,
    keys: Option<KeysAndProof>,
    own_xmr_address: Option<String>,
    bob_keys: Option<CounterpartyKeys>,
    swap_id: Option<SwapId>,
    timeout1: Option<u64>,
    checkpoint: CheckpointFile,
    exit_status: Option<Status>,
}

impl<E: EthereumClient, M: MoneroClient> AliceSwap<E, M> {
    pub fn status(&self) -> Status {
        *self.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<Status> {
        self.status.subscribe()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Generates and persists this side's key material and returns the
    /// opening `SendKeys` message.
    pub async fn send_keys_message(&self) -> Result<Message, SwapError> {
        let mut inner = self.inner.lock().await;
        if inner.keys.is_none() {
            let keys = generate_keys_and_proof()?;
            inner.checkpoint.write_keys(&keys.key_pair, self.cfg.env)?;
            inner.own_xmr_address = Some(self.xmr.primary_address().await?);
            inner.keys = Some(keys);
        }
        let keys = inner.keys.as_ref().ok_or(SwapError::MissingKeys)?;
        let msg =
            SendKeysMessage::build(keys, self.provides.as_ether(), self.eth.address());
        Ok(Message::SendKeys(msg))
    }

    /// Processes one peer message. On error the caller is expected to run
    /// [`AliceSwap::exit`], which picks abort or refund for the current
    /// stage.
    pub async fn handle_message(&self, msg: Message) -> Result<(), SwapError> {
        let mut inner = self.inner.lock().await;
        if !msg.matches(inner.next_expected) {
            warn!(got = msg.kind(), expected = ?inner.next_expected, "out-of-order message");
            return Err(SwapError::UnexpectedMessageType);
        }

        match msg {
            Message::SendKeys(m) => self.handle_send_keys(&mut inner, m),
            Message::NotifyXmrLocked { address, tx_hash } => {
                self.handle_xmr_locked(&mut inner, address, tx_hash).await
            }
            Message::NotifyReady => self.handle_notify_ready(&mut inner).await,
            Message::NotifyClaimed { tx_hash } => {
                debug!(%tx_hash, "counterparty reports claim");
                Ok(())
            }
            Message::NotifyEthLocked { .. } => Err(SwapError::UnexpectedMessageType),
        }
    }

    fn handle_send_keys(
        &self,
        inner: &mut AliceInner,
        msg: SendKeysMessage,
    ) -> Result<(), SwapError> {
        if msg.provided_amount + f64::EPSILON < self.desired.as_xmr() {
            return Err(SwapError::AmountProvidedTooLow {
                got: msg.provided_amount,
                expected: self.desired.as_xmr(),
            });
        }

        let bob = msg.verify()?;
        info!(peer_eth = %bob.eth_address, "verified counterparty DLEQ proof");
        inner.bob_keys = Some(bob);
        inner.next_expected = ExpectedMessage::XmrLocked;
        Ok(())
    }

    async fn handle_xmr_locked(
        &self,
        inner: &mut AliceInner,
        address: String,
        tx_hash: String,
    ) -> Result<(), SwapError> {
        let keys = inner.keys.as_ref().ok_or(SwapError::MissingKeys)?;
        let bob = inner.bob_keys.clone().ok_or(SwapError::MissingKeys)?;

        // The reported address must be the one derived from the summed
        // public keys, otherwise the lock is not spendable by s_A + s_B.
        let shared_public = sum_public_key_pairs(&keys.key_pair.public(), &bob.public_pair);
        let derived = shared_public
            .address(self.cfg.env.monero_network())?
            .to_string();
        if derived != address {
            return Err(SwapError::SharedAddressMismatch {
                reported: address,
                derived,
            });
        }

        let shared_view = sum_private_view_keys(keys.key_pair.view_key(), &bob.private_view);
        let view_wallet = format!("alice-view-{}", self.session_id);
        let locked = self
            .xmr
            .view_balance(&view_wallet, &derived, &shared_view, None)
            .await?;
        if locked < self.desired.as_piconero() {
            return Err(SwapError::LockedAmountTooLow {
                got: locked,
                expected: self.desired.as_piconero(),
            });
        }
        info!(amount_piconero = locked, address = %derived, xmr_tx = %tx_hash, "counterparty locked XMR");

        let claim_key = B256::from(bob.secp256k1.keccak256());
        let refund_key = B256::from(keys.secp256k1_public.keccak256());
        let receipt = self
            .eth
            .new_swap(
                self.contract,
                claim_key,
                refund_key,
                bob.eth_address,
                self.cfg.timeout_duration,
                self.provides.as_wei(),
            )
            .await?;

        let new_log = receipt
            .logs
            .iter()
            .find(|log| log.topic == new_topic() && log.address == self.contract)
            .ok_or(SwapError::CannotFindNewLog)?;
        let swap_id = swap_id_from_new_log(new_log)?;
        inner.swap_id = Some(swap_id);

        let (log_claim, log_refund) = claim_refund_keys_from_new_log(new_log)?;
        if log_claim != claim_key {
            return Err(SwapError::ClaimKeyMismatch {
                got: log_claim.to_string(),
                expected: claim_key.to_string(),
            });
        }
        if log_refund != refund_key {
            return Err(SwapError::RefundKeyMismatch {
                got: log_refund.to_string(),
                expected: refund_key.to_string(),
            });
        }

        // Defensive re-read of the stored record before telling the peer.
        let swap = self.eth.swap(self.contract, swap_id).await?;
        if swap.value < self.provides.as_wei() {
            return Err(SwapError::ContractValueTooLow {
                got: swap.value.to_string(),
                expected: self.provides.as_wei().to_string(),
            });
        }
        if swap.pub_key_claim != claim_key || swap.pub_key_refund != refund_key {
            return Err(SwapError::ClaimKeyMismatch {
                got: swap.pub_key_claim.to_string(),
                expected: claim_key.to_string(),
            });
        }
        info!(
            %swap_id,
            tx = %receipt.tx_hash,
            t0 = swap.timeout0,
            t1 = swap.timeout1,
            "created swap on escrow contract"
        );
        inner.timeout1 = Some(swap.timeout1);
        inner.checkpoint.write_contract_swap(self.contract, swap_id, &swap)?;

        self.send(Message::NotifyEthLocked {
            contract_address: self.contract,
            swap_id,
        })
        .await?;
        inner.next_expected = ExpectedMessage::Ready;
        Ok(())
    }

    async fn handle_notify_ready(&self, inner: &mut AliceInner) -> Result<(), SwapError> {
        let swap_id = inner.swap_id.ok_or(SwapError::UnexpectedMessageType)?;
        let receipt = self.eth.set_ready(self.contract, swap_id).await?;
        info!(tx = %receipt.tx_hash, "marked swap ready");
        inner.next_expected = ExpectedMessage::None;
        Ok(())
    }

    /// Step 7: concurrently watch for the `Claimed` log and the t1
    /// deadline, both measured in chain time.
    pub async fn await_outcome(&self) -> Result<Status, SwapError> {
        let (swap_id, timeout1) = {
            let inner = self.inner.lock().await;
            match (inner.swap_id, inner.timeout1) {
                (Some(id), Some(t1)) => (id, t1),
                _ => return Err(SwapError::UnexpectedMessageType),
            }
        };

        loop {
            if self.cancel.is_cancelled() {
                return self.exit().await;
            }

            if let Some(secret) =
                find_revealed_secret(&*self.eth, self.contract, claimed_topic(), swap_id).await?
            {
                let mut inner = self.inner.lock().await;
                return self.complete_with_claim_secret(&mut inner, secret).await;
            }

            let now = self.eth.block_timestamp().await?;
            if now >= timeout1 {
                let mut inner = self.inner.lock().await;
                return self.refund_and_finish(&mut inner, swap_id).await;
            }

            if sleep_or_cancel(&self.cancel, self.cfg.poll_interval).await {
                return self.exit().await;
            }
        }
    }

    /// Exit entry point: peer disconnect or user abort. Non-reentrant; a
    /// second call returns the outcome of the first.
    pub async fn exit(&self) -> Result<Status, SwapError> {
        let mut inner = self.inner.lock().await;
        if let Some(status) = inner.exit_status {
            return Ok(status);
        }
        debug!(stage = ?inner.next_expected, "exiting swap");

        match inner.swap_id {
            // Nothing on chain yet: clean abort.
            None => Ok(self.finish(&mut inner, Status::CompletedAbort)),
            Some(swap_id) => self.exit_with_contract(&mut inner, swap_id).await,
        }
    }

    /// ETH is locked in the contract: keep preferring the observed state
    /// (a `Claimed` log) and refund as soon as the window allows.
    async fn exit_with_contract(
        &self,
        inner: &mut AliceInner,
        swap_id: SwapId,
    ) -> Result<Status, SwapError> {
        loop {
            if let Some(secret) =
                find_revealed_secret(&*self.eth, self.contract, claimed_topic(), swap_id).await?
            {
                return self.complete_with_claim_secret(inner, secret).await;
            }

            let swap = self.eth.swap(self.contract, swap_id).await?;
            if swap.completed {
                // No Claimed log, so this must be our refund landing from
                // an earlier attempt.
                if find_log_for_swap(&*self.eth, self.contract, refunded_topic(), swap_id)
                    .await?
                    .is_some()
                {
                    return Ok(self.finish(inner, Status::CompletedRefund));
                }
                return Err(SwapError::NoClaimLogsFound);
            }

            let now = self.eth.block_timestamp().await?;
            if swap.refund_window_open(now) {
                return self.refund_and_finish(inner, swap_id).await;
            }

            debug!(now, t1 = swap.timeout1, "refund window closed; waiting");
            tokio::time::sleep(self.cfg.poll_interval).await;
        }
    }

    async fn refund_and_finish(
        &self,
        inner: &mut AliceInner,
        swap_id: SwapId,
    ) -> Result<Status, SwapError> {
        let keys = inner.keys.as_ref().ok_or(SwapError::MissingKeys)?;
        let secret = keys.dleq_proof.secret().to_be();

        match self.eth.refund(self.contract, swap_id, secret).await {
            Ok(receipt) => {
                info!(tx = %receipt.tx_hash, "refunded ETH");
                Ok(self.finish(inner, Status::CompletedRefund))
            }
            Err(err) if err.is_swap_completed_revert() => {
                warn!("refund reverted: counterparty already claimed; sweeping XMR instead");
                let secret =
                    find_revealed_secret(&*self.eth, self.contract, claimed_topic(), swap_id)
                        .await?
                        .ok_or(SwapError::NoClaimLogsFound)?;
                self.complete_with_claim_secret(inner, secret).await
            }
            Err(err) => Err(err.into()),
        }
    }

    /// The counterparty claimed, revealing `s_B` in EVM byte order.
    /// Reversed, summed with `s_A`, it is the spend key of the shared
    /// wallet.
    async fn complete_with_claim_secret(
        &self,
        inner: &mut AliceInner,
        secret: ScalarBE,
    ) -> Result<Status, SwapError> {
        let bob_spend = PrivateSpendKey::from_scalar_le(&secret.to_le())?;
        let keys = inner.keys.as_ref().ok_or(SwapError::MissingKeys)?;

        let spend = sum_private_spend_keys(keys.key_pair.spend_key(), &bob_spend);
        let view = sum_private_view_keys(keys.key_pair.view_key(), &bob_spend.view_key());
        let shared = PrivateKeyPair::new(spend, view);
        inner.checkpoint.write_shared_swap_keys(&shared, self.cfg.env)?;

        let destination = inner.own_xmr_address.clone().ok_or_else(|| {
            SwapError::Monero(anyhow::anyhow!("own XMR address was not recorded"))
        })?;
        let wallet_name = format!("alice-swap-{}", self.session_id);
        let shared_address = self
            .xmr
            .open_shared_wallet(
                &wallet_name,
                &shared,
                self.cfg.env.monero_network(),
                None,
            )
            .await?;
        let sweep_tx = self.xmr.sweep_all(&destination).await?;
        info!(address = %shared_address, tx = %sweep_tx, "swept shared XMR wallet");

        Ok(self.finish(inner, Status::CompletedSuccess))
    }

    fn finish(&self, inner: &mut AliceInner, status: Status) -> Status {
        inner.exit_status = Some(status);
        inner.next_expected = ExpectedMessage::None;
        self.status.send_replace(status);
        self.busy.store(false, Ordering::SeqCst);
        self.cancel.cancel();
        info!(%status, "swap finished");
        status
    }

    async fn send(&self, msg: Message) -> Result<(), SwapError> {
        self.outbox
            .send(msg)
            .await
            .map_err(|_| SwapError::PeerClosed)
    }
}
