//! Bounded retry for read-only wallet RPC calls.
//!
//! Only reads go through [`retry_read`]; transfers and sweeps are sent
//! exactly once so a transient error can never double-spend.

use std::time::Duration;

use rand::Rng;
use tokio::time::{sleep, timeout};
use tracing::warn;

use crate::types::Result;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub timeout: Duration,
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(6_000),
            max_retries: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            jitter_ms: 250,
        }
    }
}

impl RetryConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            timeout: Duration::from_millis(read_env_u64(
                "SWAP_XMR_RPC_TIMEOUT_MS",
                default.timeout.as_millis() as u64,
            )),
            max_retries: read_env_u64("SWAP_XMR_RPC_MAX_RETRIES", default.max_retries as u64)
                as usize,
            base_delay: Duration::from_millis(read_env_u64(
                "SWAP_XMR_RPC_BASE_DELAY_MS",
                default.base_delay.as_millis() as u64,
            )),
            max_delay: Duration::from_millis(read_env_u64(
                "SWAP_XMR_RPC_MAX_DELAY_MS",
                default.max_delay.as_millis() as u64,
            )),
            jitter_ms: read_env_u64("SWAP_XMR_RPC_JITTER_MS", default.jitter_ms),
        }
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt as u32));
        let capped = std::cmp::min(exp, self.max_delay);
        let jitter = if self.jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=self.jitter_ms))
        };
        capped + jitter
    }
}

fn read_env_u64(key: &str, fallback: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(fallback)
}

/// Runs a read-only call with a per-attempt timeout and exponential
/// backoff between attempts.
pub async fn retry_read<T, F, Fut>(
    label: &'static str,
    config: &RetryConfig,
    mut action: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let attempts = config.max_retries.saturating_add(1);
    for attempt in 0..attempts {
        match timeout(config.timeout, action()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(err)) => {
                if attempt + 1 >= attempts {
                    return Err(err);
                }
                warn!(attempt = attempt + 1, %err, "RPC error on {label}; retrying");
            }
            Err(_) => {
                if attempt + 1 >= attempts {
                    return Err(anyhow::anyhow!("RPC timeout for {label}").into());
                }
                warn!(attempt = attempt + 1, "RPC timeout on {label}; retrying");
            }
        }
        sleep(config.backoff(attempt)).await;
    }

    Err(anyhow::anyhow!("RPC retry exhausted for {label}").into())
}

/// Runs a state-changing call exactly once, bounded by the configured
/// timeout.
pub async fn call_once<T, Fut>(label: &'static str, config: &RetryConfig, action: Fut) -> Result<T>
where
    Fut: std::future::Future<Output = Result<T>>,
{
    match timeout(config.timeout, action).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!("RPC timeout for {label}").into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn fast_config() -> RetryConfig {
        RetryConfig {
            timeout: Duration::from_millis(50),
            max_retries: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            jitter_ms: 0,
        }
    }

    #[tokio::test]
    async fn read_retries_until_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let result = retry_read("test", &fast_config(), move || {
            let calls = calls_clone.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) + 1 < 3 {
                    Err(anyhow::anyhow!("fail").into())
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn read_times_out_and_exhausts_retries() {
        let config = RetryConfig {
            timeout: Duration::from_millis(5),
            max_retries: 1,
            ..fast_config()
        };
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let result = retry_read("timeout", &config, move || {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                sleep(Duration::from_millis(20)).await;
                Ok::<_, crate::types::XmrWalletError>(())
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn write_is_never_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let result: Result<()> = call_once("transfer", &fast_config(), async move {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            Err(anyhow::anyhow!("fail").into())
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
