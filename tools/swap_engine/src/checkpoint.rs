//! Per-swap checkpoint persistence.
//!
//! One JSON file per session, rewritten atomically (temp file, fsync,
//! rename) before every irreversible on-chain action. A crash between the
//! XMR lock and the peer receiving `NotifyXmrLocked` is only recoverable
//! because this file already holds the private key material.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use alloy_primitives::Address;
use escrow_swap::{Swap, SwapId};
use serde::{Deserialize, Serialize};
use swap_crypto::PrivateKeyPair;

use crate::config::Environment;
use crate::errors::SwapError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrivateKeyInfo {
    pub private_spend_key: String,
    pub private_view_key: String,
    pub environment: String,
}

impl PrivateKeyInfo {
    pub fn from_key_pair(keys: &PrivateKeyPair, env: Environment) -> Self {
        Self {
            private_spend_key: keys.spend_key().hex(),
            private_view_key: keys.view_key().hex(),
            environment: env.label().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Checkpoint {
    pub contract_address: Option<Address>,
    pub contract_swap_id: Option<SwapId>,
    pub contract_swap: Option<Swap>,
    pub xmr_lock_address: Option<String>,
    pub xmr_lock_tx: Option<String>,
    pub private_key_info: Option<PrivateKeyInfo>,
    pub shared_swap_private_key: Option<PrivateKeyInfo>,
}

pub struct CheckpointFile {
    path: PathBuf,
}

impl CheckpointFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Checkpoint, SwapError> {
        if !self.path.exists() {
            return Ok(Checkpoint::default());
        }
        let raw = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Read-modify-write with an atomic replace of the file contents.
    pub fn update(&self, apply: impl FnOnce(&mut Checkpoint)) -> Result<(), SwapError> {
        let mut contents = self.load()?;
        apply(&mut contents);
        self.write_atomic(&contents)
    }

    pub fn write_keys(&self, keys: &PrivateKeyPair, env: Environment) -> Result<(), SwapError> {
        self.update(|contents| {
            contents.private_key_info = Some(PrivateKeyInfo::from_key_pair(keys, env));
        })
    }

    pub fn write_contract_swap(
        &self,
        address: Address,
        swap_id: SwapId,
        swap: &Swap,
    ) -> Result<(), SwapError> {
        self.update(|contents| {
            contents.contract_address = Some(address);
            contents.contract_swap_id = Some(swap_id);
            contents.contract_swap = Some(swap.clone());
        })
    }

    pub fn write_xmr_lock(&self, address: &str, tx_hash: &str) -> Result<(), SwapError> {
        self.update(|contents| {
            contents.xmr_lock_address = Some(address.to_string());
            contents.xmr_lock_tx = Some(tx_hash.to_string());
        })
    }

    pub fn write_shared_swap_keys(
        &self,
        keys: &PrivateKeyPair,
        env: Environment,
    ) -> Result<(), SwapError> {
        self.update(|contents| {
            contents.shared_swap_private_key = Some(PrivateKeyInfo::from_key_pair(keys, env));
        })
    }

    fn write_atomic(&self, contents: &Checkpoint) -> Result<(), SwapError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_vec_pretty(contents)?;

        let tmp = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&json)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{B256, U256};
    use swap_crypto::PrivateSpendKey;

    fn sample_swap() -> Swap {
        Swap {
            owner: Address::repeat_byte(0x0a),
            claimer: Address::repeat_byte(0x0b),
            pub_key_claim: B256::repeat_byte(0x01),
            pub_key_refund: B256::repeat_byte(0x02),
            timeout0: 100,
            timeout1: 200,
            value: U256::from(1u64),
            is_ready: false,
            completed: false,
        }
    }

    #[test]
    fn persisting_then_reloading_is_bit_equal() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = CheckpointFile::new(dir.path().join("swap.json"));

        let keys = PrivateSpendKey::random().as_key_pair();
        file.write_keys(&keys, Environment::Stagenet).unwrap();
        file.write_contract_swap(Address::repeat_byte(0xee), U256::from(3u64), &sample_swap())
            .unwrap();
        file.write_xmr_lock("4Address", "txhash").unwrap();

        let loaded = file.load().unwrap();
        let info = loaded.private_key_info.expect("keys persisted");
        assert_eq!(info.private_spend_key, keys.spend_key().hex());
        assert_eq!(info.private_view_key, keys.view_key().hex());
        assert_eq!(info.environment, "stagenet");
        assert_eq!(loaded.contract_swap, Some(sample_swap()));
        assert_eq!(loaded.contract_swap_id, Some(U256::from(3u64)));
    }

    #[test]
    fn updates_preserve_earlier_fields() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = CheckpointFile::new(dir.path().join("swap.json"));

        let keys = PrivateSpendKey::random().as_key_pair();
        file.write_keys(&keys, Environment::Development).unwrap();
        file.write_shared_swap_keys(&keys, Environment::Development)
            .unwrap();

        let loaded = file.load().unwrap();
        assert!(loaded.private_key_info.is_some());
        assert!(loaded.shared_swap_private_key.is_some());
    }

    #[test]
    fn no_temp_file_is_left_behind() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = CheckpointFile::new(dir.path().join("swap.json"));
        file.update(|_| {}).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("swap.json")]);
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = CheckpointFile::new(dir.path().join("absent.json"));
        assert_eq!(file.load().unwrap(), Checkpoint::default());
    }
}
