//! In-memory escrow executing the exact contract rules against a manual
//! clock. Integration tests and local tooling run both role machines
//! against it instead of a chain node.

use std::collections::HashMap;

use alloy_primitives::{Address, B256, U256};
use swap_crypto::{ScalarBE, Secp256k1PublicKey};
use tracing::debug;

use crate::errors::ContractError;
use crate::events::{
    claimed_topic, encode_id_data, encode_new_data, encode_secret_data, new_topic, ready_topic,
    refunded_topic, EventLog,
};
use crate::state::{Swap, SwapId};
use crate::DEPLOYED_CODE_PREFIX;

pub struct SimulatedEscrow {
    address: Address,
    now: u64,
    block_number: u64,
    next_id: u64,
    swaps: HashMap<SwapId, Swap>,
    logs: Vec<EventLog>,
    payouts: HashMap<Address, U256>,
}

impl SimulatedEscrow {
    pub fn new(address: Address, genesis_time: u64) -> Self {
        Self {
            address,
            now: genesis_time,
            block_number: 1,
            next_id: 0,
            swaps: HashMap::new(),
            logs: Vec::new(),
            payouts: HashMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn advance_time(&mut self, secs: u64) {
        self.now += secs;
        self.block_number += 1;
    }

    pub fn deployed_code(&self) -> Vec<u8> {
        let mut code = DEPLOYED_CODE_PREFIX.to_vec();
        code.extend_from_slice(&[0u8; 24]);
        code
    }

    pub fn new_swap(
        &mut self,
        caller: Address,
        claimer: Address,
        claim_key: B256,
        refund_key: B256,
        timeout_duration: u64,
        value: U256,
    ) -> Result<SwapId, ContractError> {
        if value.is_zero() {
            return Err(ContractError::ZeroValue);
        }
        if timeout_duration == 0 {
            return Err(ContractError::ZeroTimeout);
        }

        let id = U256::from(self.next_id);
        self.next_id += 1;

        let swap = Swap {
            owner: caller,
            claimer,
            pub_key_claim: claim_key,
            pub_key_refund: refund_key,
            timeout0: self.now + timeout_duration,
            timeout1: self.now + 2 * timeout_duration,
            value,
            is_ready: false,
            completed: false,
        };
        debug!(swap_id = %id, t0 = swap.timeout0, t1 = swap.timeout1, "new swap created");
        self.swaps.insert(id, swap);
        self.push_log(new_topic(), encode_new_data(id, claim_key, refund_key));
        Ok(id)
    }

    pub fn set_ready(&mut self, caller: Address, id: SwapId) -> Result<(), ContractError> {
        let swap = self.swaps.get_mut(&id).ok_or(ContractError::UnknownSwap)?;
        if swap.completed {
            return Err(ContractError::AlreadyCompleted);
        }
        if swap.owner != caller {
            return Err(ContractError::NotOwner);
        }
        if swap.is_ready {
            return Err(ContractError::AlreadyReady);
        }
        swap.is_ready = true;
        self.push_log(ready_topic(), encode_id_data(id));
        Ok(())
    }

    pub fn claim(
        &mut self,
        caller: Address,
        id: SwapId,
        secret: ScalarBE,
    ) -> Result<(), ContractError> {
        let now = self.now;
        let swap = self.swaps.get_mut(&id).ok_or(ContractError::UnknownSwap)?;
        if swap.completed {
            return Err(ContractError::AlreadyCompleted);
        }
        if swap.claimer != caller {
            return Err(ContractError::NotClaimer);
        }
        if now >= swap.timeout1 {
            return Err(ContractError::TooLateToClaim);
        }
        if !swap.is_ready && now < swap.timeout0 {
            return Err(ContractError::TooEarlyToClaim);
        }
        verify_secret(&secret, swap.pub_key_claim)?;

        swap.completed = true;
        let (claimer, value) = (swap.claimer, swap.value);
        debug!(swap_id = %id, "swap claimed");
        self.push_log(claimed_topic(), encode_secret_data(id, &secret));
        *self.payouts.entry(claimer).or_default() += value;
        Ok(())
    }

    pub fn refund(
        &mut self,
        caller: Address,
        id: SwapId,
        secret: ScalarBE,
    ) -> Result<(), ContractError> {
        let now = self.now;
        let swap = self.swaps.get_mut(&id).ok_or(ContractError::UnknownSwap)?;
        if swap.completed {
            return Err(ContractError::AlreadyCompleted);
        }
        if swap.owner != caller {
            return Err(ContractError::NotOwner);
        }
        if !(now >= swap.timeout1 || (now < swap.timeout0 && !swap.is_ready)) {
            return Err(ContractError::NotTimeToRefund);
        }
        verify_secret(&secret, swap.pub_key_refund)?;

        swap.completed = true;
        let (owner, value) = (swap.owner, swap.value);
        debug!(swap_id = %id, "swap refunded");
        self.push_log(refunded_topic(), encode_secret_data(id, &secret));
        *self.payouts.entry(owner).or_default() += value;
        Ok(())
    }

    pub fn swap(&self, id: SwapId) -> Result<Swap, ContractError> {
        self.swaps
            .get(&id)
            .cloned()
            .ok_or(ContractError::UnknownSwap)
    }

    pub fn is_ready(&self, id: SwapId) -> Result<bool, ContractError> {
        Ok(self.swap(id)?.is_ready)
    }

    pub fn logs_by_topic(&self, topic: B256) -> Vec<EventLog> {
        self.logs
            .iter()
            .filter(|log| log.topic == topic)
            .cloned()
            .collect()
    }

    pub fn logs(&self) -> &[EventLog] {
        &self.logs
    }

    /// Total value paid out to an address by claims and refunds.
    pub fn paid_to(&self, address: Address) -> U256 {
        self.payouts.get(&address).copied().unwrap_or_default()
    }

    fn push_log(&mut self, topic: B256, data: Vec<u8>) {
        let log_index = self.logs.len() as u64;
        self.logs.push(EventLog {
            address: self.address,
            topic,
            data,
            block_number: self.block_number,
            log_index,
        });
    }
}

fn verify_secret(secret: &ScalarBE, commitment: B256) -> Result<(), ContractError> {
    let public = Secp256k1PublicKey::from_secret(secret).map_err(|_| ContractError::InvalidSecret)?;
    if B256::from(public.keccak256()) != commitment {
        return Err(ContractError::InvalidSecret);
    }
    Ok(())
}
