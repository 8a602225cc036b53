//! Narrow interface to the privacy-chain wallet. The engine treats the
//! wallet RPC as opaque: balances, transfers, wallet restoration from keys
//! and sweeps, nothing else.

use anyhow::Result;
use async_trait::async_trait;
use swap_crypto::{PrivateKeyPair, PrivateViewKey};
use xmr_wallet::XmrWallet;

#[derive(Debug, Clone)]
pub struct XmrTransfer {
    pub tx_hash: String,
    pub fee: u64,
}

#[async_trait]
pub trait MoneroClient: Send + Sync {
    async fn unlocked_balance(&self) -> Result<u64>;

    async fn primary_address(&self) -> Result<String>;

    async fn transfer(&self, destination: &str, amount_piconero: u64) -> Result<XmrTransfer>;

    async fn height(&self) -> Result<u64>;

    async fn refresh(&self) -> Result<()>;

    /// Balance of an address as seen through a view-only wallet restored
    /// from the shared view key.
    async fn view_balance(
        &self,
        wallet_name: &str,
        address: &str,
        view_key: &PrivateViewKey,
        restore_height: Option<u64>,
    ) -> Result<u64>;

    /// Restores a spendable wallet from the shared key pair and makes it
    /// the open wallet; returns its primary address.
    async fn open_shared_wallet(
        &self,
        wallet_name: &str,
        key_pair: &PrivateKeyPair,
        network: monero::Network,
        restore_height: Option<u64>,
    ) -> Result<String>;

    /// Sweeps the full balance of the open wallet.
    async fn sweep_all(&self, destination: &str) -> Result<String>;
}

#[async_trait]
impl MoneroClient for XmrWallet {
    async fn unlocked_balance(&self) -> Result<u64> {
        Ok(self.balance(0).await?.unlocked)
    }

    async fn primary_address(&self) -> Result<String> {
        Ok(XmrWallet::primary_address(self).await?)
    }

    async fn transfer(&self, destination: &str, amount_piconero: u64) -> Result<XmrTransfer> {
        let receipt = XmrWallet::transfer(self, destination, 0, amount_piconero).await?;
        Ok(XmrTransfer {
            tx_hash: receipt.tx_hash,
            fee: receipt.fee,
        })
    }

    async fn height(&self) -> Result<u64> {
        Ok(XmrWallet::height(self).await?)
    }

    async fn refresh(&self) -> Result<()> {
        Ok(XmrWallet::refresh(self, None).await?)
    }

    async fn view_balance(
        &self,
        wallet_name: &str,
        address: &str,
        view_key: &PrivateViewKey,
        restore_height: Option<u64>,
    ) -> Result<u64> {
        self.import_keys(
            wallet_name,
            None,
            view_key.scalar().to_bytes(),
            address,
            restore_height,
        )
        .await?;
        XmrWallet::refresh(self, restore_height).await?;
        Ok(self.balance(0).await?.total)
    }

    async fn open_shared_wallet(
        &self,
        wallet_name: &str,
        key_pair: &PrivateKeyPair,
        network: monero::Network,
        restore_height: Option<u64>,
    ) -> Result<String> {
        let address = key_pair.address(network)?.to_string();
        self.import_keys(
            wallet_name,
            Some(key_pair.spend_key().scalar().to_bytes()),
            key_pair.view_key().scalar().to_bytes(),
            &address,
            restore_height,
        )
        .await?;
        XmrWallet::refresh(self, restore_height).await?;
        Ok(address)
    }

    async fn sweep_all(&self, destination: &str) -> Result<String> {
        Ok(XmrWallet::sweep_all(self, destination).await?)
    }
}
