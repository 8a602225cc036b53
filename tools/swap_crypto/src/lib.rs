//! Cryptographic primitives for XMR/ETH atomic swaps.
//!
//! Auditor notes:
//! - Uses curve25519-dalek and k256 only for curve operations.
//! - Every cross-curve byte-order conversion goes through [`ScalarLE`] /
//!   [`ScalarBE`]; there is no implicit reversal anywhere else.

pub mod dleq;
pub mod hexutil;
pub mod keys;
pub mod scalar;
pub mod secp256k1;

mod errors;

pub use dleq::{
    generate_keys_and_proof, keys_and_proof_from_secret, verify_dleq, DleqProof, DleqTranscript,
    KeysAndProof, VerifiedKeys,
};
pub use errors::CryptoError;
pub use keys::{
    sum_private_spend_keys, sum_private_view_keys, sum_public_key_pairs, PrivateKeyPair,
    PrivateSpendKey, PrivateViewKey, PublicKeyPair,
};
pub use scalar::{ScalarBE, ScalarLE};
pub use secp256k1::Secp256k1PublicKey;

pub type Result<T> = std::result::Result<T, CryptoError>;
