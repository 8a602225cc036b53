//! secp256k1 public keys and their on-chain commitments.

use k256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use k256::elliptic_curve::Group;
use k256::{AffinePoint, EncodedPoint, ProjectivePoint};
use sha3::{Digest, Keccak256};

use crate::hexutil;
use crate::scalar::ScalarBE;
use crate::CryptoError;

/// An affine secp256k1 public key. The contract never sees the key itself,
/// only `keccak256(x || y)`; the preimage is revealed by `claim`/`refund`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Secp256k1PublicKey {
    x: [u8; 32],
    y: [u8; 32],
}

impl Secp256k1PublicKey {
    pub fn new(x: [u8; 32], y: [u8; 32]) -> Self {
        Self { x, y }
    }

    pub fn from_affine(point: &AffinePoint) -> Result<Self, CryptoError> {
        let encoded = point.to_encoded_point(false);
        let x = encoded.x().ok_or(CryptoError::InvalidSecpPoint)?;
        let y = encoded.y().ok_or(CryptoError::InvalidSecpPoint)?;
        Ok(Self {
            x: (*x).into(),
            y: (*y).into(),
        })
    }

    /// Derives the public key of a secret in EVM byte order, as the contract
    /// does when checking a revealed scalar against a commitment.
    pub fn from_secret(secret: &ScalarBE) -> Result<Self, CryptoError> {
        let scalar = secret.as_secp256k1()?;
        let point = ProjectivePoint::GENERATOR * scalar;
        if bool::from(point.is_identity()) {
            return Err(CryptoError::ZeroSecret);
        }
        Self::from_affine(&point.to_affine())
    }

    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let encoded =
            EncodedPoint::from_bytes(bytes).map_err(|_| CryptoError::InvalidSecpPoint)?;
        let point: AffinePoint = Option::from(AffinePoint::from_encoded_point(&encoded))
            .ok_or(CryptoError::InvalidSecpPoint)?;
        Self::from_affine(&point)
    }

    pub fn x(&self) -> [u8; 32] {
        self.x
    }

    pub fn y(&self) -> [u8; 32] {
        self.y
    }

    pub fn to_affine(&self) -> Result<AffinePoint, CryptoError> {
        let encoded = EncodedPoint::from_affine_coordinates(&self.x.into(), &self.y.into(), false);
        Option::from(AffinePoint::from_encoded_point(&encoded))
            .ok_or(CryptoError::InvalidSecpPoint)
    }

    pub fn sec1_compressed(&self) -> Result<[u8; 33], CryptoError> {
        let encoded = self.to_affine()?.to_encoded_point(true);
        let mut out = [0u8; 33];
        out.copy_from_slice(encoded.as_bytes());
        Ok(out)
    }

    /// The on-chain commitment: `keccak256(x || y)`.
    pub fn keccak256(&self) -> [u8; 32] {
        let mut hasher = Keccak256::new();
        hasher.update(self.x);
        hasher.update(self.y);
        hasher.finalize().into()
    }

    pub fn hex(&self) -> String {
        let mut out = hexutil::hex_encode(&self.x);
        out.push_str(&hexutil::hex_encode(&self.y));
        out
    }

    pub fn from_hex(value: &str) -> Result<Self, CryptoError> {
        let bytes = hexutil::decode_hex(value, "secp256k1 public key")?;
        if bytes.len() != 64 {
            return Err(CryptoError::InvalidLength {
                field: "secp256k1 public key",
                expected: 64,
                got: bytes.len(),
            });
        }
        let mut x = [0u8; 32];
        let mut y = [0u8; 32];
        x.copy_from_slice(&bytes[..32]);
        y.copy_from_slice(&bytes[32..]);
        // Reject coordinates that are not on the curve.
        let key = Self { x, y };
        key.to_affine()?;
        Ok(key)
    }
}

impl std::fmt::Debug for Secp256k1PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secp256k1PublicKey(0x{})", self.hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::ScalarLE;

    #[test]
    fn commitment_matches_known_vector() {
        // Claim vector from the contract test suite.
        let x = hexutil::decode_hex_32(
            "3AF1E1EFA4D1E1AD5CB9E3967E98E901DAFCD37C44CF0BFB6C216997F5EE51DF",
            "x",
        )
        .unwrap();
        let y = hexutil::decode_hex_32(
            "E4ACAC3E6F139E0C7DB2BD736824F51392BDA176965A1C59EB9C3C5FF9E85D7A",
            "y",
        )
        .unwrap();
        let secret = hexutil::decode_hex_32(
            "D30519BCAE8D180DBFCC94FE0B8383DC310185B0BE97B4365083EBCECCD75759",
            "secret",
        )
        .unwrap();

        let expected = Secp256k1PublicKey::new(x, y);
        let derived = Secp256k1PublicKey::from_secret(&ScalarBE::from_bytes(secret)).unwrap();
        assert_eq!(derived, expected);
        assert_eq!(derived.keccak256(), expected.keccak256());
    }

    #[test]
    fn hex_roundtrips() {
        let secret = ScalarLE::random();
        let key = Secp256k1PublicKey::from_secret(&secret.to_be()).unwrap();
        let decoded = Secp256k1PublicKey::from_hex(&key.hex()).unwrap();
        assert_eq!(key, decoded);
    }

    #[test]
    fn rejects_off_curve_coordinates() {
        let err = Secp256k1PublicKey::from_hex(&"11".repeat(64)).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidSecpPoint));
    }

    #[test]
    fn rejects_zero_secret() {
        let err = Secp256k1PublicKey::from_secret(&ScalarBE::from_bytes([0u8; 32])).unwrap_err();
        assert!(matches!(err, CryptoError::ZeroSecret));
    }
}
