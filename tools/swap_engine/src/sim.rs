//! Simulator-backed chain clients.
//!
//! [`SimulatedEthereum`] runs the escrow rules from `escrow_swap` against
//! an in-memory ledger with a manual clock; [`SimulatedMonero`] models a
//! shared Monero network as an address-to-balance map. Integration tests
//! drive both role machines end to end against these, which exercises the
//! real cross-curve key derivation: the address role B locks to must equal
//! the address derived from the summed private keys, or the sweep finds
//! nothing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use alloy_primitives::{keccak256, Address, B256, U256};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use escrow_swap::{ContractError, EventLog, SimulatedEscrow, Swap, SwapId};
use swap_crypto::{PrivateKeyPair, PrivateViewKey, ScalarBE};

use crate::ethereum::{EthereumClient, EthereumError, TxReceipt};
use crate::monero_client::{MoneroClient, XmrTransfer};

/// One party's signer over a shared [`SimulatedEscrow`].
pub struct SimulatedEthereum {
    escrow: Arc<Mutex<SimulatedEscrow>>,
    signer: Address,
    tx_counter: AtomicU64,
}

impl SimulatedEthereum {
    pub fn new(escrow: Arc<Mutex<SimulatedEscrow>>, signer: Address) -> Self {
        Self {
            escrow,
            signer,
            tx_counter: AtomicU64::new(0),
        }
    }

    fn next_tx_hash(&self) -> B256 {
        let nonce = self.tx_counter.fetch_add(1, Ordering::SeqCst);
        let mut preimage = [0u8; 28];
        preimage[..20].copy_from_slice(self.signer.as_slice());
        preimage[20..].copy_from_slice(&nonce.to_be_bytes());
        keccak256(preimage)
    }

    fn check_contract(&self, contract: Address) -> Result<(), EthereumError> {
        let escrow = self.lock();
        if escrow.address() != contract {
            return Err(EthereumError::Rpc(format!(
                "no contract deployed at {contract}"
            )));
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimulatedEscrow> {
        self.escrow.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn receipt(&self, log: Option<EventLog>) -> TxReceipt {
        TxReceipt {
            tx_hash: self.next_tx_hash(),
            logs: log.into_iter().collect(),
        }
    }
}

fn revert(err: ContractError) -> EthereumError {
    EthereumError::Revert(err.revert_reason())
}

#[async_trait]
impl EthereumClient for SimulatedEthereum {
    fn address(&self) -> Address {
        self.signer
    }

    async fn block_timestamp(&self) -> Result<u64, EthereumError> {
        Ok(self.lock().now())
    }

    async fn code_at(&self, address: Address) -> Result<Vec<u8>, EthereumError> {
        let escrow = self.lock();
        if escrow.address() == address {
            Ok(escrow.deployed_code())
        } else {
            Ok(Vec::new())
        }
    }

    async fn balance(&self) -> Result<U256, EthereumError> {
        Ok(self.lock().paid_to(self.signer))
    }

    async fn new_swap(
        &self,
        contract: Address,
        claim_key: B256,
        refund_key: B256,
        claimer: Address,
        timeout_duration: u64,
        value: U256,
    ) -> Result<TxReceipt, EthereumError> {
        self.check_contract(contract)?;
        let mut escrow = self.lock();
        escrow
            .new_swap(
                self.signer,
                claimer,
                claim_key,
                refund_key,
                timeout_duration,
                value,
            )
            .map_err(revert)?;
        let log = escrow.logs().last().cloned();
        drop(escrow);
        Ok(self.receipt(log))
    }

    async fn set_ready(
        &self,
        contract: Address,
        swap_id: SwapId,
    ) -> Result<TxReceipt, EthereumError> {
        self.check_contract(contract)?;
        let mut escrow = self.lock();
        escrow.set_ready(self.signer, swap_id).map_err(revert)?;
        let log = escrow.logs().last().cloned();
        drop(escrow);
        Ok(self.receipt(log))
    }

    async fn claim(
        &self,
        contract: Address,
        swap_id: SwapId,
        secret: ScalarBE,
    ) -> Result<TxReceipt, EthereumError> {
        self.check_contract(contract)?;
        let mut escrow = self.lock();
        escrow.claim(self.signer, swap_id, secret).map_err(revert)?;
        let log = escrow.logs().last().cloned();
        drop(escrow);
        Ok(self.receipt(log))
    }

    async fn refund(
        &self,
        contract: Address,
        swap_id: SwapId,
        secret: ScalarBE,
    ) -> Result<TxReceipt, EthereumError> {
        self.check_contract(contract)?;
        let mut escrow = self.lock();
        escrow.refund(self.signer, swap_id, secret).map_err(revert)?;
        let log = escrow.logs().last().cloned();
        drop(escrow);
        Ok(self.receipt(log))
    }

    async fn swap(&self, contract: Address, swap_id: SwapId) -> Result<Swap, EthereumError> {
        self.check_contract(contract)?;
        self.lock().swap(swap_id).map_err(revert)
    }

    async fn filter_logs(
        &self,
        contract: Address,
        topic: B256,
    ) -> Result<Vec<EventLog>, EthereumError> {
        self.check_contract(contract)?;
        Ok(self.lock().logs_by_topic(topic))
    }
}

/// Shared in-memory Monero "network": confirmed balances per address and a
/// height that advances on every poll, so confirmation waits make
/// progress without a block scheduler.
pub struct SimulatedMoneroNetwork {
    inner: Mutex<MoneroNetworkState>,
}

struct MoneroNetworkState {
    height: u64,
    balances: HashMap<String, u64>,
    tx_counter: u64,
}

impl SimulatedMoneroNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(MoneroNetworkState {
                height: 100,
                balances: HashMap::new(),
                tx_counter: 0,
            }),
        })
    }

    pub fn fund(&self, address: &str, piconero: u64) {
        let mut state = self.lock();
        *state.balances.entry(address.to_string()).or_default() += piconero;
    }

    pub fn balance_of(&self, address: &str) -> u64 {
        self.lock().balances.get(address).copied().unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MoneroNetworkState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// One party's wallet over the shared network.
pub struct SimulatedMonero {
    network: Arc<SimulatedMoneroNetwork>,
    own_address: String,
    current_wallet: Mutex<String>,
}

impl SimulatedMonero {
    pub fn new(network: Arc<SimulatedMoneroNetwork>, own_address: &str, funds: u64) -> Self {
        network.fund(own_address, funds);
        Self {
            network,
            own_address: own_address.to_string(),
            current_wallet: Mutex::new(own_address.to_string()),
        }
    }

    fn current(&self) -> String {
        self.current_wallet
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl MoneroClient for SimulatedMonero {
    async fn unlocked_balance(&self) -> Result<u64> {
        Ok(self.network.balance_of(&self.current()))
    }

    async fn primary_address(&self) -> Result<String> {
        Ok(self.current())
    }

    async fn transfer(&self, destination: &str, amount_piconero: u64) -> Result<XmrTransfer> {
        let mut state = self.network.lock();
        let from = self.current();
        let available = state.balances.get(&from).copied().unwrap_or(0);
        if available < amount_piconero {
            return Err(anyhow!("not enough money"));
        }
        *state.balances.entry(from).or_default() -= amount_piconero;
        *state.balances.entry(destination.to_string()).or_default() += amount_piconero;
        state.height += 1;
        state.tx_counter += 1;
        Ok(XmrTransfer {
            tx_hash: format!("xmr-tx-{:04}", state.tx_counter),
            fee: 0,
        })
    }

    async fn height(&self) -> Result<u64> {
        let mut state = self.network.lock();
        state.height += 1;
        Ok(state.height)
    }

    async fn refresh(&self) -> Result<()> {
        Ok(())
    }

    async fn view_balance(
        &self,
        _wallet_name: &str,
        address: &str,
        _view_key: &PrivateViewKey,
        _restore_height: Option<u64>,
    ) -> Result<u64> {
        Ok(self.network.balance_of(address))
    }

    async fn open_shared_wallet(
        &self,
        _wallet_name: &str,
        key_pair: &PrivateKeyPair,
        network: monero::Network,
        _restore_height: Option<u64>,
    ) -> Result<String> {
        let address = key_pair.address(network)?.to_string();
        *self
            .current_wallet
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = address.clone();
        Ok(address)
    }

    async fn sweep_all(&self, destination: &str) -> Result<String> {
        let mut state = self.network.lock();
        let from = self.current();
        let amount = state.balances.remove(&from).unwrap_or(0);
        if amount == 0 {
            return Err(anyhow!("no balance to sweep"));
        }
        *state.balances.entry(destination.to_string()).or_default() += amount;
        state.tx_counter += 1;
        let tx = format!("xmr-sweep-{:04}", state.tx_counter);
        drop(state);

        // Restore the primary wallet after a sweep so a second session can
        // reuse this client.
        *self
            .current_wallet
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = self.own_address.clone();
        Ok(tx)
    }
}
