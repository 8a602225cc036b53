//! Role B: the XMR provider.
//!
//! Flow: exchange keys, lock XMR on the shared address and wait for a
//! confirmation, verify the deployed escrow swap (code prefix, `New` log,
//! both commitments, value), notify ready, then claim the ETH inside the
//! claim window. Once XMR is locked every abort path goes through the
//! contract logs: a `Refunded` log reveals `s_A` and hands back the shared
//! wallet.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use alloy_primitives::Address;
use escrow_swap::{
    claim_refund_keys_from_new_log, claimed_topic, new_topic, refunded_topic, swap_id_matches,
    SwapId, DEPLOYED_CODE_PREFIX,
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

/// Rounds of log scanning tolerated while the contract says completed but
/// neither log is visible yet.
const COMPLETED_SCAN_ROUNDS: usize = 3;

pub struct Bob<E, M> {
    eth: Arc<E>,
    xmr: Arc<M>,
    cfg: EngineConfig,
    busy: Arc<AtomicBool>,
}

impl<E: EthereumClient, M: MoneroClient> Bob<E, M> {
    pub fn new(eth: Arc<E>, xmr: Arc<M>, cfg: EngineConfig) -> Self {
        Self {
            eth,
            xmr,
            cfg,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Starts a session providing `provides` XMR for `desired` ETH.
    pub fn new_swap(
        &self,
        provides: MoneroAmount,
        desired: EtherAmount,
        outbox: mpsc::Sender<Message>,
    ) -> Result<BobSwap<E, M>, SwapError> {
        if self.busy.swap(true, Ordering::SeqCst) {
            return Err(SwapError::ProtocolAlreadyInProgress);
        }

        let session_id = session_id();
        info!(
            session_id,
            %provides,
            %desired,
            rate = crate::amounts::exchange_rate(provides, desired),
            "starting swap as XMR provider"
        );
        let checkpoint = CheckpointFile::new(self.cfg.checkpoint_path("bob", session_id));
        let (status_tx, _) = watch::channel(Status::Ongoing);

        Ok(BobSwap {
            eth: self.eth.clone(),
            xmr: self.xmr.clone(),
            cfg: self.cfg.clone(),
            provides,
            desired,
            outbox,
            cancel: CancelToken::new(),
            status: status_tx,
            busy: self.busy.clone(),
            session_id,
            inner: Mutex::new(BobInner {
                next_expected: ExpectedMessage::Keys,
                keys: None,
                own_xmr_address: None,
                alice_keys: None,
                contract_address: None,
                swap_id: None,
                shared_address: None,
                lock_tx: None,
                checkpoint,
                exit_status: None,
            }),
        })
    }
}

pub struct BobSwap<E, M> {
    eth: Arc<E>,
    xmr: Arc<M>,
    cfg: EngineConfig,
    provides: MoneroAmount,
    desired: EtherAmount,
    outbox: mpsc::Sender<Message>,
    cancel: CancelToken,
    status: watch::Sender<Status>,
    busy: Arc<AtomicBool>,
    session_id: u64,
    inner: Mutex<BobInner>,
}

impl<E, M> std::fmt::Debug for BobSwap<E, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BobSwap")
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

struct BobInner {
    next_expected: ExpectedMessage,
    keys: Option<KeysAndProof>,
    own_xmr_address: Option<String>,
    alice_keys: Option<CounterpartyKeys>,
    contract_address: Option<Address>,
    swap_id: Option<SwapId>,
    shared_address: Option<String>,
    lock_tx: Option<String>,
    checkpoint: CheckpointFile,
    exit_status: Option<Status>,
}

impl<E: EthereumClient, M: MoneroClient> BobSwap<E, M> {
    pub fn status(&self) -> Status {
        *self.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<Status> {
        self.status.subscribe()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Processes one peer message. On error the caller is expected to run
    /// [`BobSwap::exit`].
    pub async fn handle_message(&self, msg: Message) -> Result<(), SwapError> {
        let mut inner = self.inner.lock().await;
        if !msg.matches(inner.next_expected) {
            warn!(got = msg.kind(), expected = ?inner.next_expected, "out-of-order message");
            return Err(SwapError::UnexpectedMessageType);
        }

        match msg {
            Message::SendKeys(m) => self.handle_send_keys(&mut inner, m).await,
            Message::NotifyEthLocked {
                contract_address,
                swap_id,
            } => {
                self.handle_eth_locked(&mut inner, contract_address, swap_id)
                    .await
            }
            Message::NotifyClaimed { tx_hash } => {
                debug!(%tx_hash, "counterparty reports claim");
                Ok(())
            }
            Message::NotifyXmrLocked { .. } | Message::NotifyReady => {
                Err(SwapError::UnexpectedMessageType)
            }
        }
    }

    /// Key exchange and XMR lock. Replies with our own `SendKeys`, then
    /// locks the offered amount on the shared address, waits for
    /// confirmation and sends `NotifyXmrLocked`.
    async fn handle_send_keys(
        &self,
        inner: &mut BobInner,
        msg: SendKeysMessage,
    ) -> Result<(), SwapError> {
        if msg.provided_amount + f64::EPSILON < self.desired.as_ether() {
            return Err(SwapError::AmountProvidedTooLow {
                got: msg.provided_amount,
                expected: self.desired.as_ether(),
            });
        }

        let alice = msg.verify()?;
        info!(peer_eth = %alice.eth_address, "verified counterparty DLEQ proof");

        // Check before locking: the transfer must not fail midway for lack
        // of funds.
        let unlocked = self.xmr.unlocked_balance().await?;
        if unlocked < self.provides.as_piconero() {
            return Err(SwapError::UnlockedBalanceTooLow {
                got: unlocked,
                need: self.provides.as_piconero(),
            });
        }

        let keys = generate_keys_and_proof()?;
        inner.checkpoint.write_keys(&keys.key_pair, self.cfg.env)?;
        inner.own_xmr_address = Some(self.xmr.primary_address().await?);

        let reply = SendKeysMessage::build(&keys, self.provides.as_xmr(), self.eth.address());
        self.send(Message::SendKeys(reply)).await?;

        let shared_public = sum_public_key_pairs(&keys.key_pair.public(), &alice.public_pair);
        let shared_address = shared_public
            .address(self.cfg.env.monero_network())?
            .to_string();
        inner.keys = Some(keys);
        inner.alice_keys = Some(alice);

        info!(
            address = %shared_address,
            amount_piconero = self.provides.as_piconero(),
            "locking XMR on shared address"
        );
        let transfer = self
            .xmr
            .transfer(&shared_address, self.provides.as_piconero())
            .await?;
        info!(tx = %transfer.tx_hash, fee = transfer.fee, "locked XMR");
        inner
            .checkpoint
            .write_xmr_lock(&shared_address, &transfer.tx_hash)?;
        inner.shared_address = Some(shared_address.clone());
        inner.lock_tx = Some(transfer.tx_hash.clone());

        self.wait_for_confirmations().await?;
        self.xmr.refresh().await?;

        self.send(Message::NotifyXmrLocked {
            address: shared_address,
            tx_hash: transfer.tx_hash,
        })
        .await?;
        inner.next_expected = ExpectedMessage::EthLocked;
        Ok(())
    }

    async fn wait_for_confirmations(&self) -> Result<(), SwapError> {
        let start = self.xmr.height().await?;
        let target = start + self.cfg.xmr_confirmations;
        loop {
            let height = self.xmr.height().await?;
            if height >= target {
                debug!(height, "lock confirmed");
                return Ok(());
            }
            debug!(height, target, "waiting for XMR confirmations");
            if sleep_or_cancel(&self.cancel, self.cfg.poll_interval).await {
                return Err(SwapError::Cancelled);
            }
        }
    }

    /// Contract verification per the `NotifyEthLocked` report.
    async fn handle_eth_locked(
        &self,
        inner: &mut BobInner,
        contract_address: Address,
        swap_id: SwapId,
    ) -> Result<(), SwapError> {
        if contract_address == Address::ZERO {
            return Err(SwapError::MissingContractAddress);
        }
        let keys = inner.keys.as_ref().ok_or(SwapError::MissingKeys)?;
        let alice = inner.alice_keys.as_ref().ok_or(SwapError::MissingKeys)?;

        let code = self.eth.code_at(contract_address).await?;
        if !code.starts_with(DEPLOYED_CODE_PREFIX) {
            return Err(SwapError::InvalidSwapContract);
        }

        let logs = self.eth.filter_logs(contract_address, new_topic()).await?;
        let new_log = logs
            .iter()
            .find(|log| swap_id_matches(log, swap_id))
            .ok_or(SwapError::CannotFindNewLog)?;

        let (claim_key, refund_key) = claim_refund_keys_from_new_log(new_log)?;
        let ours = alloy_primitives::B256::from(keys.secp256k1_public.keccak256());
        if claim_key != ours {
            return Err(SwapError::ClaimKeyMismatch {
                got: claim_key.to_string(),
                expected: ours.to_string(),
            });
        }
        let theirs = alloy_primitives::B256::from(alice.secp256k1.keccak256());
        if refund_key != theirs {
            return Err(SwapError::RefundKeyMismatch {
                got: refund_key.to_string(),
                expected: theirs.to_string(),
            });
        }

        let swap = self.eth.swap(contract_address, swap_id).await?;
        if swap.claimer != self.eth.address() {
            return Err(SwapError::WrongClaimer);
        }
        if swap.value < self.desired.as_wei() {
            return Err(SwapError::ContractValueTooLow {
                got: swap.value.to_string(),
                expected: self.desired.as_wei().to_string(),
            });
        }

        info!(
            contract = %contract_address,
            %swap_id,
            t0 = swap.timeout0,
            t1 = swap.timeout1,
            "verified escrow swap"
        );
        inner.contract_address = Some(contract_address);
        inner.swap_id = Some(swap_id);
        inner
            .checkpoint
            .write_contract_swap(contract_address, swap_id, &swap)?;

        self.send(Message::NotifyReady).await?;
        inner.next_expected = ExpectedMessage::None;
        Ok(())
    }

    /// Step 7: wait for the claim window, then claim the ETH with `s_B` in
    /// EVM byte order.
    pub async fn await_outcome(&self) -> Result<Status, SwapError> {
        let (contract, swap_id) = {
            let inner = self.inner.lock().await;
            match (inner.contract_address, inner.swap_id) {
                (Some(contract), Some(id)) => (contract, id),
                _ => return Err(SwapError::UnexpectedMessageType),
            }
        };

        loop {
            if self.cancel.is_cancelled() {
                return self.exit().await;
            }

            let swap = self.eth.swap(contract, swap_id).await?;
            let now = self.eth.block_timestamp().await?;

            if swap.completed {
                let mut inner = self.inner.lock().await;
                return self.resolve_completed(&mut inner, contract, swap_id).await;
            }
            if now >= swap.timeout1 {
                warn!(now, t1 = swap.timeout1, "past t1, can no longer claim");
                let mut inner = self.inner.lock().await;
                return self.reclaim_after_refund(&mut inner, contract, swap_id).await;
            }
            if swap.is_ready || now >= swap.timeout0 {
                let mut inner = self.inner.lock().await;
                return self.claim_and_finish(&mut inner, contract, swap_id).await;
            }

            debug!(now, t0 = swap.timeout0, "waiting for ready or t0");
            if sleep_or_cancel(&self.cancel, self.cfg.poll_interval).await {
                return self.exit().await;
            }
        }
    }

    async fn claim_and_finish(
        &self,
        inner: &mut BobInner,
        contract: Address,
        swap_id: SwapId,
    ) -> Result<Status, SwapError> {
        let keys = inner.keys.as_ref().ok_or(SwapError::MissingKeys)?;
        let secret = keys.dleq_proof.secret().to_be();

        match self.eth.claim(contract, swap_id, secret).await {
            Ok(receipt) => {
                info!(tx = %receipt.tx_hash, "claimed ETH");
                // Informational; the peer observes the log either way.
                let _ = self.outbox.try_send(Message::NotifyClaimed {
                    tx_hash: receipt.tx_hash.to_string(),
                });
                Ok(self.finish(inner, Status::CompletedSuccess))
            }
            Err(err) if err.is_swap_completed_revert() => {
                warn!("claim reverted: swap already completed; inspecting logs");
                self.resolve_completed(inner, contract, swap_id).await
            }
            Err(err) => Err(err.into()),
        }
    }

    /// The contract is completed: decide from the logs whether that was our
    /// claim or the counterparty's refund.
    async fn resolve_completed(
        &self,
        inner: &mut BobInner,
        contract: Address,
        swap_id: SwapId,
    ) -> Result<Status, SwapError> {
        for _ in 0..COMPLETED_SCAN_ROUNDS {
            if let Some(secret) =
                find_revealed_secret(&*self.eth, contract, refunded_topic(), swap_id).await?
            {
                return self.reclaim_monero(inner, secret).await;
            }
            if find_log_for_swap(&*self.eth, contract, claimed_topic(), swap_id)
                .await?
                .is_some()
            {
                // Our own claim landed; nothing left to do.
                return Ok(self.finish(inner, Status::CompletedSuccess));
            }
            tokio::time::sleep(self.cfg.poll_interval).await;
        }
        Err(SwapError::NoRefundLogsFound)
    }

    /// Past t1 the only path back is the counterparty's refund revealing
    /// `s_A`; wait for it, then reclaim the shared wallet.
    async fn reclaim_after_refund(
        &self,
        inner: &mut BobInner,
        contract: Address,
        swap_id: SwapId,
    ) -> Result<Status, SwapError> {
        loop {
            if let Some(secret) =
                find_revealed_secret(&*self.eth, contract, refunded_topic(), swap_id).await?
            {
                return self.reclaim_monero(inner, secret).await;
            }
            debug!("no Refunded log yet; waiting for counterparty refund");
            if sleep_or_cancel(&self.cancel, self.cfg.poll_interval).await {
                return Err(SwapError::Cancelled);
            }
        }
    }

    /// `s_A` revealed by the refund plus our own `s_B` reconstruct the
    /// shared spend key; the view key sum follows deterministically.
    async fn reclaim_monero(
        &self,
        inner: &mut BobInner,
        secret: ScalarBE,
    ) -> Result<Status, SwapError> {
        let alice_spend = PrivateSpendKey::from_scalar_le(&secret.to_le())?;
        let keys = inner.keys.as_ref().ok_or(SwapError::MissingKeys)?;

        let spend = sum_private_spend_keys(&alice_spend, keys.key_pair.spend_key());
        let view = sum_private_view_keys(&alice_spend.view_key(), keys.key_pair.view_key());
        let shared = PrivateKeyPair::new(spend, view);
        inner.checkpoint.write_shared_swap_keys(&shared, self.cfg.env)?;

        let destination = inner.own_xmr_address.clone().ok_or_else(|| {
            SwapError::Monero(anyhow::anyhow!("own XMR address was not recorded"))
        })?;
        let wallet_name = format!("bob-swap-{}", self.session_id);
        let reclaim_address = self
            .xmr
            .open_shared_wallet(
                &wallet_name,
                &shared,
                self.cfg.env.monero_network(),
                None,
            )
            .await?;
        let sweep_tx = self.xmr.sweep_all(&destination).await?;
        info!(address = %reclaim_address, tx = %sweep_tx, "reclaimed shared XMR wallet");

        Ok(self.finish(inner, Status::CompletedRefund))
    }

    /// Exit entry point. Before the lock this is a clean abort; after it,
    /// funds are recovered through the contract's observed state.
    pub async fn exit(&self) -> Result<Status, SwapError> {
        let mut inner = self.inner.lock().await;
        if let Some(status) = inner.exit_status {
            return Ok(status);
        }
        debug!(stage = ?inner.next_expected, "exiting swap");

        if inner.lock_tx.is_none() {
            return Ok(self.finish(&mut inner, Status::CompletedAbort));
        }

        let (contract, swap_id) = match (inner.contract_address, inner.swap_id) {
            (Some(contract), Some(id)) => (contract, id),
            _ => {
                // Locked but never saw a contract. There is nothing on
                // chain to scan; recovery needs the counterparty's refund,
                // which will never come. Documented limitation.
                warn!(
                    shared_address = inner.shared_address.as_deref().unwrap_or("unknown"),
                    "XMR locked but no contract observed; shared wallet is unrecoverable"
                );
                return Ok(self.finish(&mut inner, Status::CompletedAbort));
            }
        };

        loop {
            if let Some(secret) =
                find_revealed_secret(&*self.eth, contract, refunded_topic(), swap_id).await?
            {
                return self.reclaim_monero(&mut inner, secret).await;
            }

            let swap = self.eth.swap(contract, swap_id).await?;
            let now = self.eth.block_timestamp().await?;

            if swap.completed {
                return self.resolve_completed(&mut inner, contract, swap_id).await;
            }
            if now < swap.timeout1 && (swap.is_ready || now >= swap.timeout0) {
                return self.claim_and_finish(&mut inner, contract, swap_id).await;
            }

            debug!(now, "claim window closed; waiting on contract state");
            tokio::time::sleep(self.cfg.poll_interval).await;
        }
    }

    fn finish(&self, inner: &mut BobInner, status: Status) -> Status {
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
