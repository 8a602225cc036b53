//! Byte-order-tagged scalar types.
//!
//! The same 256-bit secret is used as an ed25519 spend key (canonical
//! little-endian) and as a secp256k1 key revealed through the EVM
//! (big-endian). Conversions between the two worlds must go through
//! [`ScalarLE::to_be`] / [`ScalarBE::to_le`], which makes an implicit
//! reversal a type error.

use curve25519_dalek::scalar::Scalar as EdScalar;
use k256::elliptic_curve::PrimeField;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroize;

use crate::hexutil;
use crate::CryptoError;

/// Scalar in ed25519 canonical little-endian byte order.
#[derive(Clone, PartialEq, Eq, Zeroize)]
#[zeroize(drop)]
pub struct ScalarLE([u8; 32]);

/// Scalar in EVM canonical big-endian byte order, as emitted by the
/// contract's `Claimed`/`Refunded` logs.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ScalarBE([u8; 32]);

impl ScalarLE {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Samples a uniformly random 252-bit scalar, valid under both group
    /// orders. Zero is rejected and re-sampled.
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        loop {
            OsRng.fill_bytes(&mut bytes);
            bytes[31] &= 0x0f;
            if bytes != [0u8; 32] {
                return Self(bytes);
            }
        }
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    pub fn to_be(&self) -> ScalarBE {
        let mut bytes = self.0;
        bytes.reverse();
        ScalarBE(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Interprets the bytes as a canonical ed25519 scalar. Fails on
    /// non-canonical encodings rather than silently reducing.
    pub fn as_ed25519(&self) -> Result<EdScalar, CryptoError> {
        Option::from(EdScalar::from_canonical_bytes(self.0))
            .ok_or(CryptoError::NonCanonicalScalar)
    }

    /// Interprets the same integer as a secp256k1 scalar. Any value below
    /// the ed25519 group order is also below the secp256k1 order, so this
    /// only fails on corrupted input.
    pub fn as_secp256k1(&self) -> Result<k256::Scalar, CryptoError> {
        self.to_be().as_secp256k1()
    }

    pub fn hex(&self) -> String {
        hexutil::hex_encode(&self.0)
    }

    pub fn from_hex(value: &str) -> Result<Self, CryptoError> {
        Ok(Self(hexutil::decode_hex_32(value, "scalar")?))
    }
}

impl From<EdScalar> for ScalarLE {
    fn from(scalar: EdScalar) -> Self {
        Self(scalar.to_bytes())
    }
}

impl std::fmt::Debug for ScalarLE {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ScalarLE(..)")
    }
}

impl ScalarBE {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    pub fn to_le(&self) -> ScalarLE {
        let mut bytes = self.0;
        bytes.reverse();
        ScalarLE::from_bytes(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn as_secp256k1(&self) -> Result<k256::Scalar, CryptoError> {
        Option::from(k256::Scalar::from_repr(self.0.into()))
            .ok_or(CryptoError::InvalidSecpScalar)
    }

    pub fn hex(&self) -> String {
        hexutil::hex_encode(&self.0)
    }
}

impl From<k256::Scalar> for ScalarBE {
    fn from(scalar: k256::Scalar) -> Self {
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&scalar.to_bytes());
        Self(bytes)
    }
}

impl std::fmt::Debug for ScalarBE {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ScalarBE(0x{})", self.hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversal_roundtrips() {
        let scalar = ScalarLE::random();
        assert_eq!(scalar.to_be().to_le(), scalar);
    }

    #[test]
    fn random_scalars_are_canonical_on_both_curves() {
        for _ in 0..16 {
            let scalar = ScalarLE::random();
            scalar.as_ed25519().unwrap();
            scalar.as_secp256k1().unwrap();
        }
    }

    #[test]
    fn random_scalar_is_nonzero() {
        assert!(!ScalarLE::random().is_zero());
    }

    #[test]
    fn byte_orders_differ() {
        let mut bytes = [0u8; 32];
        bytes[0] = 1;
        let le = ScalarLE::from_bytes(bytes);
        let be = le.to_be();
        assert_eq!(be.to_bytes()[31], 1);
        assert_eq!(be.to_bytes()[0], 0);
    }
}
