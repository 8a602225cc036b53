//! Monero key material: spend and view keys, their public halves, and the
//! componentwise sums that form the shared swap wallet.

use curve25519_dalek::constants::ED25519_BASEPOINT_POINT;
use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use curve25519_dalek::scalar::Scalar as EdScalar;
use sha3::{Digest, Keccak256};

use crate::hexutil;
use crate::scalar::ScalarLE;
use crate::CryptoError;

/// An ed25519 private spend key.
#[derive(Clone)]
pub struct PrivateSpendKey(EdScalar);

/// An ed25519 private view key, deterministically derivable from the spend
/// key by hashing.
#[derive(Clone)]
pub struct PrivateViewKey(EdScalar);

/// The public halves of a spend/view key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKeyPair {
    spend: EdwardsPoint,
    view: EdwardsPoint,
}

/// A full private spend/view key pair.
#[derive(Clone)]
pub struct PrivateKeyPair {
    spend: PrivateSpendKey,
    view: PrivateViewKey,
}

impl PrivateSpendKey {
    pub fn random() -> Self {
        // 252-bit samples are always canonical, so reduction is a no-op.
        Self(EdScalar::from_bytes_mod_order(ScalarLE::random().to_bytes()))
    }

    pub fn from_scalar_le(scalar: &ScalarLE) -> Result<Self, CryptoError> {
        if scalar.is_zero() {
            return Err(CryptoError::ZeroSecret);
        }
        Ok(Self(scalar.as_ed25519()?))
    }

    pub fn from_hex(value: &str) -> Result<Self, CryptoError> {
        Self::from_scalar_le(&ScalarLE::from_hex(value)?)
    }

    /// Derives the view key as the Keccak-256 hash of the spend key bytes,
    /// reduced into the group.
    pub fn view_key(&self) -> PrivateViewKey {
        let hash: [u8; 32] = Keccak256::digest(self.0.to_bytes()).into();
        PrivateViewKey(EdScalar::from_bytes_mod_order(hash))
    }

    pub fn public(&self) -> EdwardsPoint {
        ED25519_BASEPOINT_POINT * self.0
    }

    pub fn scalar(&self) -> EdScalar {
        self.0
    }

    pub fn scalar_le(&self) -> ScalarLE {
        ScalarLE::from(self.0)
    }

    /// Expands the spend key into a full key pair with the derived view key.
    pub fn as_key_pair(&self) -> PrivateKeyPair {
        PrivateKeyPair {
            spend: self.clone(),
            view: self.view_key(),
        }
    }

    pub fn hex(&self) -> String {
        hexutil::hex_encode(&self.0.to_bytes())
    }
}

impl std::fmt::Debug for PrivateSpendKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateSpendKey(..)")
    }
}

impl PrivateViewKey {
    pub fn from_hex(value: &str) -> Result<Self, CryptoError> {
        let scalar = ScalarLE::from_hex(value)?;
        Ok(Self(scalar.as_ed25519()?))
    }

    pub fn public(&self) -> EdwardsPoint {
        ED25519_BASEPOINT_POINT * self.0
    }

    pub fn scalar(&self) -> EdScalar {
        self.0
    }

    pub fn hex(&self) -> String {
        hexutil::hex_encode(&self.0.to_bytes())
    }
}

impl std::fmt::Debug for PrivateViewKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateViewKey(..)")
    }
}

impl PublicKeyPair {
    pub fn new(spend: EdwardsPoint, view: EdwardsPoint) -> Self {
        Self { spend, view }
    }

    pub fn from_compressed(spend: [u8; 32], view: [u8; 32]) -> Result<Self, CryptoError> {
        Ok(Self {
            spend: decompress_checked(&spend)?,
            view: decompress_checked(&view)?,
        })
    }

    pub fn spend(&self) -> &EdwardsPoint {
        &self.spend
    }

    pub fn view(&self) -> &EdwardsPoint {
        &self.view
    }

    pub fn spend_compressed(&self) -> [u8; 32] {
        self.spend.compress().to_bytes()
    }

    pub fn view_compressed(&self) -> [u8; 32] {
        self.view.compress().to_bytes()
    }

    /// Standard-address encoding of this key pair for the given network.
    pub fn address(&self, network: monero::Network) -> Result<monero::Address, CryptoError> {
        let spend = monero::PublicKey::from_slice(&self.spend_compressed())
            .map_err(|err| CryptoError::InvalidMoneroKey(err.to_string()))?;
        let view = monero::PublicKey::from_slice(&self.view_compressed())
            .map_err(|err| CryptoError::InvalidMoneroKey(err.to_string()))?;
        Ok(monero::Address::standard(network, spend, view))
    }
}

impl std::fmt::Debug for PublicKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicKeyPair")
            .field("spend", &hexutil::hex_encode(&self.spend_compressed()))
            .field("view", &hexutil::hex_encode(&self.view_compressed()))
            .finish()
    }
}

impl PrivateKeyPair {
    pub fn new(spend: PrivateSpendKey, view: PrivateViewKey) -> Self {
        Self { spend, view }
    }

    pub fn spend_key(&self) -> &PrivateSpendKey {
        &self.spend
    }

    pub fn view_key(&self) -> &PrivateViewKey {
        &self.view
    }

    pub fn public(&self) -> PublicKeyPair {
        PublicKeyPair {
            spend: self.spend.public(),
            view: self.view.public(),
        }
    }

    pub fn address(&self, network: monero::Network) -> Result<monero::Address, CryptoError> {
        self.public().address(network)
    }
}

/// Sum of two private spend keys; spend authority over the shared wallet
/// requires both halves.
pub fn sum_private_spend_keys(a: &PrivateSpendKey, b: &PrivateSpendKey) -> PrivateSpendKey {
    PrivateSpendKey(a.0 + b.0)
}

pub fn sum_private_view_keys(a: &PrivateViewKey, b: &PrivateViewKey) -> PrivateViewKey {
    PrivateViewKey(a.0 + b.0)
}

/// Componentwise point addition of two public pairs; the result is the
/// public side of the shared swap wallet.
pub fn sum_public_key_pairs(a: &PublicKeyPair, b: &PublicKeyPair) -> PublicKeyPair {
    PublicKeyPair {
        spend: a.spend + b.spend,
        view: a.view + b.view,
    }
}

fn decompress_checked(bytes: &[u8; 32]) -> Result<EdwardsPoint, CryptoError> {
    let point = CompressedEdwardsY(*bytes)
        .decompress()
        .ok_or(CryptoError::InvalidPoint)?;
    if point.is_small_order() {
        return Err(CryptoError::SmallOrderPoint);
    }
    Ok(point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use curve25519_dalek::traits::Identity;

    #[test]
    fn view_key_is_deterministic() {
        let spend = PrivateSpendKey::random();
        assert_eq!(spend.view_key().hex(), spend.view_key().hex());
    }

    #[test]
    fn private_sum_matches_public_sum() {
        let a = PrivateSpendKey::random().as_key_pair();
        let b = PrivateSpendKey::random().as_key_pair();

        let spend_sum = sum_private_spend_keys(a.spend_key(), b.spend_key());
        let view_sum = sum_private_view_keys(a.view_key(), b.view_key());
        let shared = PrivateKeyPair::new(spend_sum, view_sum);

        let public_sum = sum_public_key_pairs(&a.public(), &b.public());
        assert_eq!(shared.public(), public_sum);
    }

    #[test]
    fn shared_addresses_agree_between_parties() {
        let a = PrivateSpendKey::random().as_key_pair();
        let b = PrivateSpendKey::random().as_key_pair();

        let from_public = sum_public_key_pairs(&a.public(), &b.public())
            .address(monero::Network::Mainnet)
            .unwrap();
        let from_private = PrivateKeyPair::new(
            sum_private_spend_keys(a.spend_key(), b.spend_key()),
            sum_private_view_keys(a.view_key(), b.view_key()),
        )
        .address(monero::Network::Mainnet)
        .unwrap();

        assert_eq!(from_public.to_string(), from_private.to_string());
    }

    #[test]
    fn rejects_small_order_public_keys() {
        let identity = EdwardsPoint::identity().compress().to_bytes();
        let valid = PrivateSpendKey::random().public().compress().to_bytes();
        let err = PublicKeyPair::from_compressed(identity, valid).unwrap_err();
        assert!(matches!(err, CryptoError::SmallOrderPoint));
    }

    #[test]
    fn spend_key_hex_roundtrips() {
        let spend = PrivateSpendKey::random();
        let decoded = PrivateSpendKey::from_hex(&spend.hex()).unwrap();
        assert_eq!(spend.hex(), decoded.hex());
    }
}
