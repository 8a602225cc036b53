use std::collections::HashMap;
use std::str::FromStr;

use anyhow::anyhow;
use monero_rpc::{
    monero::{Address, Amount, PrivateKey},
    GenerateFromKeysArgs, GetTransfersCategory, GetTransfersSelector, GotTransfer,
    RpcClientBuilder, SweepAllArgs, TransferOptions, TransferPriority, WalletClient,
};
use tracing::{debug, info};

use crate::rpc::retry::{call_once, retry_read};
use crate::rpc::RetryConfig;
use crate::types::{Result, XmrWalletError};

/// Total and unlocked balance of the open wallet, in piconero.
#[derive(Debug, Clone, Copy)]
pub struct Balance {
    pub total: u64,
    pub unlocked: u64,
}

#[derive(Debug, Clone)]
pub struct TransferReceipt {
    pub tx_hash: String,
    pub fee: u64,
}

pub struct XmrWallet {
    client: WalletClient,
    retry: RetryConfig,
}

impl XmrWallet {
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_config(url, RetryConfig::from_env()).await
    }

    pub async fn connect_with_config(url: &str, retry: RetryConfig) -> Result<Self> {
        debug!(rpc_url = url, "connecting to monero-wallet-rpc");
        let rpc_client = RpcClientBuilder::new().build(url)?;
        Ok(Self {
            client: rpc_client.wallet(),
            retry,
        })
    }

    pub async fn create_wallet(
        &self,
        filename: &str,
        password: Option<&str>,
        language: &str,
    ) -> Result<()> {
        debug!(wallet = filename, "creating wallet");
        let filename = filename.to_string();
        let password = password.map(str::to_string);
        let language = language.to_string();
        retry_read("create_wallet", &self.retry, || async {
            self.client
                .create_wallet(filename.clone(), password.clone(), language.clone())
                .await?;
            Ok(())
        })
        .await
    }

    pub async fn open_wallet(&self, filename: &str, password: Option<&str>) -> Result<()> {
        debug!(wallet = filename, "opening wallet");
        let filename = filename.to_string();
        let password = password.map(str::to_string);
        retry_read("open_wallet", &self.retry, || async {
            self.client
                .open_wallet(filename.clone(), password.clone())
                .await?;
            Ok(())
        })
        .await
    }

    pub async fn close_wallet(&self) -> Result<()> {
        retry_read("close_wallet", &self.retry, || async {
            self.client.close_wallet().await?;
            Ok(())
        })
        .await
    }

    pub async fn balance(&self, account_index: u32) -> Result<Balance> {
        retry_read("get_balance", &self.retry, || async {
            let balance = self.client.get_balance(account_index.into(), None).await?;
            Ok(Balance {
                total: balance.balance.as_pico(),
                unlocked: balance.unlocked_balance.as_pico(),
            })
        })
        .await
    }

    pub async fn primary_address(&self) -> Result<String> {
        retry_read("get_address", &self.retry, || async {
            let addresses = self.client.get_address(0, None).await?;
            Ok(addresses.address.to_string())
        })
        .await
    }

    pub async fn refresh(&self, start_height: Option<u64>) -> Result<()> {
        retry_read("refresh", &self.retry, || async {
            self.client.refresh(start_height).await?;
            Ok(())
        })
        .await
    }

    pub async fn height(&self) -> Result<u64> {
        retry_read("get_height", &self.retry, || async {
            let height = self.client.get_height().await?;
            Ok(height.get())
        })
        .await
    }

    pub async fn incoming_transfers(&self) -> Result<Vec<GotTransfer>> {
        retry_read("get_transfers", &self.retry, || async {
            let mut selector = GetTransfersSelector::default();
            let mut categories = HashMap::new();
            categories.insert(GetTransfersCategory::In, true);
            selector.category_selector = categories;
            let transfers = self.client.get_transfers(selector).await?;
            let mut results = Vec::new();
            for values in transfers.values() {
                results.extend(values.clone());
            }
            Ok(results)
        })
        .await
    }

    /// Sends `amount_piconero` to `destination`. Never retried: if the
    /// outcome is unclear the caller must inspect the chain, not resend.
    pub async fn transfer(
        &self,
        destination: &str,
        account_index: u32,
        amount_piconero: u64,
    ) -> Result<TransferReceipt> {
        let address = parse_address(destination)?;
        info!(amount_piconero, "sending transfer");

        let mut destinations = HashMap::new();
        destinations.insert(address, Amount::from_pico(amount_piconero));
        let options = TransferOptions {
            account_index: Some(account_index),
            subaddr_indices: None,
            mixin: None,
            ring_size: None,
            unlock_time: None,
            payment_id: None,
            do_not_relay: None,
        };

        call_once("transfer", &self.retry, async {
            let data = self
                .client
                .transfer(destinations, TransferPriority::Default, options)
                .await?;
            let tx_hash = data.tx_hash.to_string();
            if tx_hash.is_empty() {
                return Err(XmrWalletError::MissingTxHash);
            }
            Ok(TransferReceipt {
                tx_hash,
                fee: data.fee.as_pico(),
            })
        })
        .await
    }

    /// Restores a wallet file from raw spend/view keys. A `None` spend key
    /// produces a view-only wallet.
    pub async fn import_keys(
        &self,
        filename: &str,
        spend_key_bytes: Option<[u8; 32]>,
        view_key_bytes: [u8; 32],
        address: &str,
        restore_height: Option<u64>,
    ) -> Result<()> {
        debug!(wallet = filename, view_only = spend_key_bytes.is_none(), "importing keys");
        // Validate once up front so a bad key fails before any RPC.
        parse_address(address)?;
        if let Some(bytes) = spend_key_bytes.as_ref() {
            parse_private_key(bytes, "spend")?;
        }
        parse_private_key(&view_key_bytes, "view")?;

        retry_read("generate_from_keys", &self.retry, || async {
            let spendkey = spend_key_bytes
                .as_ref()
                .map(|bytes| parse_private_key(bytes, "spend"))
                .transpose()?;
            let args = GenerateFromKeysArgs {
                restore_height,
                filename: filename.to_string(),
                address: parse_address(address)?,
                spendkey,
                viewkey: parse_private_key(&view_key_bytes, "view")?,
                password: String::new(),
                autosave_current: Some(true),
            };
            self.client.generate_from_keys(args).await?;
            Ok(())
        })
        .await
    }

    /// Sweeps the full balance of the open wallet to `destination`. Never
    /// retried.
    pub async fn sweep_all(&self, destination: &str) -> Result<String> {
        let address = parse_address(destination)?;
        info!("sweeping wallet balance");

        call_once("sweep_all", &self.retry, async {
            let args = SweepAllArgs {
                address,
                account_index: 0,
                subaddr_indices: None,
                priority: TransferPriority::Default,
                mixin: 15,
                ring_size: 16,
                unlock_time: 0,
                get_tx_keys: Some(true),
                below_amount: None,
                do_not_relay: None,
                get_tx_hex: None,
                get_tx_metadata: None,
            };
            let result = self.client.sweep_all(args).await?;
            result
                .tx_hash_list
                .first()
                .map(|hash| hash.to_string())
                .ok_or(XmrWalletError::MissingTxHash)
        })
        .await
    }
}

fn parse_address(value: &str) -> Result<Address> {
    Address::from_str(value).map_err(|err| anyhow!("invalid address: {err}").into())
}

fn parse_private_key(bytes: &[u8; 32], label: &str) -> Result<PrivateKey> {
    PrivateKey::from_slice(bytes).map_err(|err| anyhow!("invalid {label} key: {err}").into())
}
