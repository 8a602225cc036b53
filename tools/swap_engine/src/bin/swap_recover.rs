//! Recovery front-end: rebuilds the shared swap wallet from persisted
//! secrets or a checkpoint file.
//!
//! Exit codes: 0 success, 1 invalid argument, 2 on-chain revert,
//! 3 cryptographic validation failure, 4 checkpoint I/O error.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use swap_crypto::{
    sum_private_spend_keys, sum_private_view_keys, PrivateKeyPair, PrivateSpendKey, PrivateViewKey,
};
use swap_engine::monero_client::MoneroClient;
use swap_engine::{CheckpointFile, Environment};
use xmr_wallet::XmrWallet;

#[derive(Parser)]
#[command(name = "swap-recover", version, about = "Recover funds from an interrupted atomic swap")]
struct Cli {
    /// monero-wallet-rpc endpoint
    #[arg(long, default_value = "http://127.0.0.1:18083/json_rpc")]
    monero_endpoint: String,
    /// mainnet, stagenet or development
    #[arg(long, default_value = "stagenet")]
    env: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild the shared swap wallet from both revealed secret scalars
    WalletFromSecrets {
        /// ETH-provider secret, hex, ed25519 little-endian
        #[arg(long)]
        secret_a: String,
        /// XMR-provider secret, hex, ed25519 little-endian
        #[arg(long)]
        secret_b: String,
    },
    /// Rebuild the shared swap wallet from a checkpoint's stored shared key
    WalletFromCheckpoint {
        #[arg(long)]
        checkpoint: PathBuf,
    },
    /// Print the non-secret swap state recorded in a checkpoint file
    Show {
        #[arg(long)]
        checkpoint: PathBuf,
    },
}

enum RecoverError {
    InvalidArgument(String),
    Revert(String),
    Crypto(String),
    Io(String),
}

impl RecoverError {
    fn exit_code(&self) -> i32 {
        match self {
            RecoverError::InvalidArgument(_) => 1,
            RecoverError::Revert(_) => 2,
            RecoverError::Crypto(_) => 3,
            RecoverError::Io(_) => 4,
        }
    }

    fn message(&self) -> &str {
        match self {
            RecoverError::InvalidArgument(msg)
            | RecoverError::Revert(msg)
            | RecoverError::Crypto(msg)
            | RecoverError::Io(msg) => msg,
        }
    }
}

impl From<swap_crypto::CryptoError> for RecoverError {
    fn from(err: swap_crypto::CryptoError) -> Self {
        RecoverError::Crypto(err.to_string())
    }
}

impl From<swap_engine::SwapError> for RecoverError {
    fn from(err: swap_engine::SwapError) -> Self {
        use swap_engine::{EthereumError, SwapError};
        match err {
            SwapError::Crypto(inner) => RecoverError::Crypto(inner.to_string()),
            SwapError::Ethereum(EthereumError::Revert(reason)) => RecoverError::Revert(reason),
            SwapError::Ethereum(inner) => RecoverError::Io(inner.to_string()),
            SwapError::Checkpoint(inner) => RecoverError::Io(inner.to_string()),
            SwapError::CheckpointEncode(inner) => RecoverError::Io(inner.to_string()),
            other => RecoverError::InvalidArgument(other.to_string()),
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            process::exit(1);
        }
    };

    match run(cli).await {
        Ok(()) => {}
        Err(err) => {
            error!("{}", err.message());
            process::exit(err.exit_code());
        }
    }
}

async fn run(cli: Cli) -> Result<(), RecoverError> {
    let env: Environment = cli
        .env
        .parse()
        .map_err(RecoverError::InvalidArgument)?;

    match cli.command {
        Command::WalletFromSecrets { secret_a, secret_b } => {
            let a = PrivateSpendKey::from_hex(&secret_a)?;
            let b = PrivateSpendKey::from_hex(&secret_b)?;
            let shared = PrivateKeyPair::new(
                sum_private_spend_keys(&a, &b),
                sum_private_view_keys(&a.view_key(), &b.view_key()),
            );
            let address = open_wallet(&cli.monero_endpoint, env, &shared).await?;
            println!("{address}");
            Ok(())
        }
        Command::WalletFromCheckpoint { checkpoint } => {
            let contents = CheckpointFile::new(checkpoint).load()?;
            let info = contents.shared_swap_private_key.ok_or_else(|| {
                RecoverError::InvalidArgument(
                    "checkpoint holds no shared swap key; use wallet-from-secrets".to_string(),
                )
            })?;
            let shared = PrivateKeyPair::new(
                PrivateSpendKey::from_hex(&info.private_spend_key)?,
                PrivateViewKey::from_hex(&info.private_view_key)?,
            );
            let address = open_wallet(&cli.monero_endpoint, env, &shared).await?;
            println!("{address}");
            Ok(())
        }
        Command::Show { checkpoint } => {
            let contents = CheckpointFile::new(checkpoint).load()?;
            let contract = contents
                .contract_address
                .map(|address| address.to_string())
                .unwrap_or_else(|| "-".to_string());
            let swap_id = contents
                .contract_swap_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("contract address: {contract}");
            println!("swap id:          {swap_id}");
            println!(
                "xmr lock:         {}",
                contents.xmr_lock_address.as_deref().unwrap_or("-")
            );
            println!(
                "session keys:     {}",
                if contents.private_key_info.is_some() { "present" } else { "absent" }
            );
            println!(
                "shared swap key:  {}",
                if contents.shared_swap_private_key.is_some() { "present" } else { "absent" }
            );
            if let Some(swap) = contents.contract_swap {
                println!(
                    "contract swap:    t0={} t1={} ready={} completed={}",
                    swap.timeout0, swap.timeout1, swap.is_ready, swap.completed
                );
            }
            Ok(())
        }
    }
}

async fn open_wallet(
    endpoint: &str,
    env: Environment,
    shared: &PrivateKeyPair,
) -> Result<String, RecoverError> {
    let wallet = XmrWallet::connect(endpoint)
        .await
        .map_err(|err| RecoverError::Io(err.to_string()))?;
    MoneroClient::open_shared_wallet(
        &wallet,
        "swap-recovered",
        shared,
        env.monero_network(),
        None,
    )
    .await
    .map_err(|err| RecoverError::Io(err.to_string()))
}
