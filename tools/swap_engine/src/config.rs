use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which Monero network the swap settles on. Development targets a regtest
/// daemon, which uses mainnet address prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Mainnet,
    Stagenet,
    Development,
}

impl Environment {
    pub fn monero_network(&self) -> monero::Network {
        match self {
            Environment::Mainnet | Environment::Development => monero::Network::Mainnet,
            Environment::Stagenet => monero::Network::Stagenet,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Environment::Mainnet => "mainnet",
            Environment::Stagenet => "stagenet",
            Environment::Development => "development",
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "mainnet" => Ok(Environment::Mainnet),
            "stagenet" => Ok(Environment::Stagenet),
            "dev" | "development" | "regtest" => Ok(Environment::Development),
            other => Err(format!(
                "invalid environment {other:?} (expected mainnet/stagenet/development)"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub env: Environment,
    /// Contract timeout duration D in seconds; t0 = creation + D,
    /// t1 = creation + 2D.
    pub timeout_duration: u64,
    /// Confirmations required on the XMR lock before notifying the peer.
    pub xmr_confirmations: u64,
    /// Interval between chain polls at every suspension point.
    pub poll_interval: Duration,
    /// Directory for checkpoint files.
    pub basepath: PathBuf,
}

impl EngineConfig {
    pub fn new(env: Environment, basepath: PathBuf) -> Self {
        Self {
            env,
            timeout_duration: read_env_u64("SWAP_TIMEOUT_DURATION_SECS", 3600),
            xmr_confirmations: read_env_u64("SWAP_XMR_CONFIRMATIONS", 1),
            poll_interval: Duration::from_millis(read_env_u64("SWAP_POLL_INTERVAL_MS", 1000)),
            basepath,
        }
    }

    pub fn checkpoint_path(&self, role: &str, swap_id: u64) -> PathBuf {
        self.basepath.join(format!("{role}-swap-{swap_id}.json"))
    }

    pub fn recovery_checkpoint_path(&self) -> PathBuf {
        self.basepath.join("recovery.json")
    }
}

fn read_env_u64(key: &str, fallback: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parses_aliases() {
        assert_eq!("regtest".parse::<Environment>(), Ok(Environment::Development));
        assert_eq!("Stagenet".parse::<Environment>(), Ok(Environment::Stagenet));
        assert!("ropsten".parse::<Environment>().is_err());
    }

    #[test]
    fn development_uses_mainnet_address_prefixes() {
        assert_eq!(
            Environment::Development.monero_network(),
            monero::Network::Mainnet
        );
    }
}
