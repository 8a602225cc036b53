use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

pub const PICONERO_PER_XMR: u64 = 1_000_000_000_000;

/// XMR amount in piconero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MoneroAmount(u64);

impl MoneroAmount {
    pub fn from_piconero(piconero: u64) -> Self {
        Self(piconero)
    }

    pub fn from_xmr(xmr: f64) -> Self {
        Self((xmr * PICONERO_PER_XMR as f64).round() as u64)
    }

    pub fn as_piconero(&self) -> u64 {
        self.0
    }

    pub fn as_xmr(&self) -> f64 {
        self.0 as f64 / PICONERO_PER_XMR as f64
    }
}

impl std::fmt::Display for MoneroAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} XMR", self.as_xmr())
    }
}

/// ETH amount in wei.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EtherAmount(U256);

impl EtherAmount {
    pub fn from_wei(wei: U256) -> Self {
        Self(wei)
    }

    /// Converts with micro-ether precision, enough for offer amounts.
    pub fn from_ether(ether: f64) -> Self {
        let micro = (ether * 1e6).round() as u128;
        Self(U256::from(micro) * U256::from(1_000_000_000_000u64))
    }

    pub fn as_wei(&self) -> U256 {
        self.0
    }

    pub fn as_ether(&self) -> f64 {
        let wei: u128 = self.0.try_into().unwrap_or(u128::MAX);
        wei as f64 / 1e18
    }
}

impl std::fmt::Display for EtherAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ETH", self.as_ether())
    }
}

/// XMR per ETH implied by an offer.
pub fn exchange_rate(provides: MoneroAmount, desired: EtherAmount) -> f64 {
    provides.as_xmr() / desired.as_ether()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monero_conversions_roundtrip() {
        let amount = MoneroAmount::from_xmr(3.33);
        assert_eq!(amount.as_piconero(), 3_330_000_000_000);
        assert!((amount.as_xmr() - 3.33).abs() < 1e-9);
    }

    #[test]
    fn ether_conversions_roundtrip() {
        let amount = EtherAmount::from_ether(3.33);
        assert_eq!(
            amount.as_wei(),
            U256::from(3_330_000_000_000_000_000u128)
        );
        assert!((amount.as_ether() - 3.33).abs() < 1e-9);
    }

    #[test]
    fn exchange_rate_is_xmr_per_eth() {
        let rate = exchange_rate(MoneroAmount::from_xmr(200.0), EtherAmount::from_ether(100.0));
        assert!((rate - 2.0).abs() < 1e-9);
    }
}
