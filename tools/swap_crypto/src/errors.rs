use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid DLEQ proof")]
    InvalidProof,
    #[error("secret scalar is zero")]
    ZeroSecret,
    #[error("secret does not fit in 252 bits")]
    OversizedSecret,
    #[error("invalid compressed point")]
    InvalidPoint,
    #[error("small-order point")]
    SmallOrderPoint,
    #[error("scalar is not canonical for the ed25519 group")]
    NonCanonicalScalar,
    #[error("invalid secp256k1 point encoding")]
    InvalidSecpPoint,
    #[error("invalid secp256k1 scalar encoding")]
    InvalidSecpScalar,
    #[error("invalid proof encoding: expected {expected} bytes, got {got}")]
    InvalidProofLength { expected: usize, got: usize },
    #[error("invalid hex for {field}: {reason}")]
    InvalidHex {
        field: &'static str,
        reason: String,
    },
    #[error("invalid length for {field}: expected {expected}, got {got}")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("invalid monero key: {0}")]
    InvalidMoneroKey(String),
}
