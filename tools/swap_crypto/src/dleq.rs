//! Cross-group discrete-log-equality proofs between secp256k1 and ed25519.
//!
//! A same-challenge Schnorr check on each curve does not bind the two
//! witnesses together, so the proof decomposes the 252-bit secret into
//! bits and commits to every bit on both curves:
//!
//! 1. For each bit `b_i`, publish Pedersen commitments
//!    `C_G_i = b_i*G + r_i*G'` (secp256k1) and `C_H_i = b_i*H + s_i*H'`
//!    (ed25519), where `G'`/`H'` are second generators with unknown
//!    discrete log.
//! 2. For each bit, an OR-composed sigma protocol proves knowledge of the
//!    discrete log w.r.t. `G'` of `C_G_i` AND w.r.t. `H'` of `C_H_i`
//!    (bit is 0), or of `C_G_i - G` AND `C_H_i - H` (bit is 1). Both
//!    curves sit in the same branch, which forces the bits to be equal.
//! 3. The published blinder sums `r = sum(2^i * r_i)` and
//!    `s = sum(2^i * s_i)` let the verifier check
//!    `sum(2^i * C_G_i) - r*G' == x*G` and the ed25519 analogue.
//! 4. A Schnorr proof of knowledge per public key shows it has only a
//!    basepoint component, so the blinder sums cannot hide anything.
//!
//! The OR challenges are 31 bytes and split by XOR, making them canonical
//! scalars under both group orders regardless of the order they reduce in.

use std::sync::OnceLock;

use blake2::{Blake2s256, Digest};
use curve25519_dalek::constants::ED25519_BASEPOINT_POINT;
use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use curve25519_dalek::scalar::Scalar as EdScalar;
use curve25519_dalek::traits::Identity;
use k256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use k256::elliptic_curve::Field;
use k256::{AffinePoint, EncodedPoint, ProjectivePoint};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::hexutil;
use crate::keys::{PrivateKeyPair, PrivateSpendKey};
use crate::scalar::{ScalarBE, ScalarLE};
use crate::secp256k1::Secp256k1PublicKey;
use crate::CryptoError;

const DLEQ_DOMAIN_TAG: &[u8] = b"DLEQ";
const DL_PROOF_TAG_ED25519: &[u8] = b"DLEQ-dl-ed25519";
const DL_PROOF_TAG_SECP256K1: &[u8] = b"DLEQ-dl-secp256k1";

/// The ed25519 group order is just above 2^252, so equal bit
/// representations across both curves exist only for 252-bit scalars.
pub const COMMITMENT_BITS: usize = 252;

const BIT_PROOF_LEN: usize = 33 + 32 + 31 + 31 + 33 + 33 + 32 + 32 + 32 + 32 + 32 + 32;
const HEADER_LEN: usize = 32 + 33 + 32 + 32 + 32 + 32 + 33 + 32;

/// Serialized transcript length: header (publics, blinder sums, two
/// proofs of discrete log) plus 252 bitwise proofs.
pub const TRANSCRIPT_LEN: usize = HEADER_LEN + COMMITMENT_BITS * BIT_PROOF_LEN;

/// A 31-byte challenge. XOR-splitting keeps both halves below 2^248,
/// which is canonical under the ed25519 and the secp256k1 group order
/// alike.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Challenge([u8; 31]);

impl Challenge {
    fn random() -> Self {
        let mut bytes = [0u8; 31];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    fn from_hash(hash: &[u8; 32]) -> Self {
        let mut bytes = [0u8; 31];
        bytes.copy_from_slice(&hash[..31]);
        Self(bytes)
    }

    fn xor(&self, other: &Challenge) -> Challenge {
        let mut bytes = [0u8; 31];
        for (out, (a, b)) in bytes.iter_mut().zip(self.0.iter().zip(other.0.iter())) {
            *out = a ^ b;
        }
        Challenge(bytes)
    }

    fn as_ed25519(&self) -> EdScalar {
        let mut bytes = [0u8; 32];
        bytes[..31].copy_from_slice(&self.0);
        // Below 2^248, so reduction is a no-op.
        EdScalar::from_bytes_mod_order(bytes)
    }

    fn as_secp256k1(&self) -> Result<k256::Scalar, CryptoError> {
        let mut bytes = [0u8; 32];
        bytes[1..].copy_from_slice(&self.0);
        ScalarBE::from_bytes(bytes).as_secp256k1()
    }

    fn to_bytes(self) -> [u8; 31] {
        self.0
    }
}

impl std::fmt::Debug for Challenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Challenge(0x{})", hexutil::hex_encode(&self.0))
    }
}

/// One bit's commitments on both curves and the two-branch OR proof that
/// they open to the same bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitProof {
    pub secp256k1_commitment: [u8; 33],
    pub ed25519_commitment: [u8; 32],
    pub challenge_0: Challenge,
    pub challenge_1: Challenge,
    pub secp256k1_announcement_0: [u8; 33],
    pub secp256k1_announcement_1: [u8; 33],
    pub ed25519_announcement_0: [u8; 32],
    pub ed25519_announcement_1: [u8; 32],
    /// Big-endian secp256k1 scalars.
    pub secp256k1_response_0: [u8; 32],
    pub secp256k1_response_1: [u8; 32],
    /// Little-endian ed25519 scalars.
    pub ed25519_response_0: [u8; 32],
    pub ed25519_response_1: [u8; 32],
}

/// Schnorr proof of knowledge of the discrete log of an ed25519 point
/// w.r.t. the basepoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdDlProof {
    pub nonce: [u8; 32],
    pub response: [u8; 32],
}

/// Schnorr proof of knowledge of the discrete log of a secp256k1 point
/// w.r.t. the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecpDlProof {
    pub nonce: [u8; 33],
    pub response: [u8; 32],
}

/// The public, wire-encodable part of a DLEQ proof.
#[derive(Clone, PartialEq, Eq)]
pub struct DleqTranscript {
    pub ed25519_public: [u8; 32],
    pub secp256k1_public: [u8; 33],
    /// `sum(2^i * s_i)` mod the ed25519 order, little-endian.
    pub ed25519_blinder_sum: [u8; 32],
    /// `sum(2^i * r_i)` mod the secp256k1 order, big-endian.
    pub secp256k1_blinder_sum: [u8; 32],
    pub ed25519_proof_of_dl: EdDlProof,
    pub secp256k1_proof_of_dl: SecpDlProof,
    pub bits: Vec<BitProof>,
}

impl std::fmt::Debug for DleqTranscript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DleqTranscript")
            .field(
                "ed25519_public",
                &hexutil::hex_encode(&self.ed25519_public),
            )
            .field(
                "secp256k1_public",
                &hexutil::hex_encode(&self.secp256k1_public),
            )
            .field("bits", &self.bits.len())
            .finish_non_exhaustive()
    }
}

/// A proof together with the secret it commits to. The secret is only read
/// during claim/refund, which is a deliberate reveal.
pub struct DleqProof {
    secret: ScalarLE,
    transcript: DleqTranscript,
}

/// The two public keys recovered from a verified transcript.
#[derive(Debug, Clone)]
pub struct VerifiedKeys {
    ed25519: EdwardsPoint,
    secp256k1: Secp256k1PublicKey,
}

impl DleqProof {
    /// Proves with fresh randomness.
    pub fn prove() -> Result<Self, CryptoError> {
        Self::prove_with_secret(ScalarLE::random())
    }

    /// Re-proves from a persisted secret; used by the recovery engine.
    pub fn prove_with_secret(secret: ScalarLE) -> Result<Self, CryptoError> {
        if secret.is_zero() {
            return Err(CryptoError::ZeroSecret);
        }
        let secret_bytes = secret.to_bytes();
        if secret_bytes[31] & 0xf0 != 0 {
            return Err(CryptoError::OversizedSecret);
        }

        let x_ed = secret.as_ed25519()?;
        let x_secp = secret.as_secp256k1()?;
        let public_ed = ED25519_BASEPOINT_POINT * x_ed;
        let public_secp = ProjectivePoint::GENERATOR * x_secp;

        let g_prime = *secp256k1_g_prime();
        let h_prime = *ed25519_h_prime();

        // Prover-side scratch for one bit: the blinders and the real
        // branch's nonces, needed again once the challenge is known.
        struct BitSecrets {
            bit: u8,
            blinder_secp: k256::Scalar,
            blinder_ed: EdScalar,
            nonce_secp: k256::Scalar,
            nonce_ed: EdScalar,
            cheat_challenge: Challenge,
        }

        let mut secrets = Vec::with_capacity(COMMITMENT_BITS);
        let mut bits = Vec::with_capacity(COMMITMENT_BITS);

        for i in 0..COMMITMENT_BITS {
            let bit = bit_of(&secret_bytes, i);

            let blinder_secp = k256::Scalar::random(&mut OsRng);
            let blinder_ed = EdScalar::random(&mut OsRng);

            let mut commitment_secp = g_prime * blinder_secp;
            let mut commitment_ed = h_prime * blinder_ed;
            if bit == 1 {
                commitment_secp += ProjectivePoint::GENERATOR;
                commitment_ed += ED25519_BASEPOINT_POINT;
            }

            // Statements for the branch we cheat on: the commitment minus
            // the wrong bit's basepoint contribution.
            let cheat_stmt_secp = if bit == 1 {
                commitment_secp
            } else {
                commitment_secp - ProjectivePoint::GENERATOR
            };
            let cheat_stmt_ed = if bit == 1 {
                commitment_ed
            } else {
                commitment_ed - ED25519_BASEPOINT_POINT
            };

            // Real branch: honest announcements.
            let nonce_secp = k256::Scalar::random(&mut OsRng);
            let nonce_ed = EdScalar::random(&mut OsRng);
            let announce_secp = g_prime * nonce_secp;
            let announce_ed = h_prime * nonce_ed;

            // Cheated branch: pick challenge and responses first, derive
            // the announcements backwards.
            let cheat_challenge = Challenge::random();
            let cheat_response_secp = k256::Scalar::random(&mut OsRng);
            let cheat_response_ed = EdScalar::random(&mut OsRng);
            let cheat_announce_secp =
                g_prime * cheat_response_secp - cheat_stmt_secp * cheat_challenge.as_secp256k1()?;
            let cheat_announce_ed =
                h_prime * cheat_response_ed - cheat_stmt_ed * cheat_challenge.as_ed25519();

            // The real branch's challenge and responses stay zeroed until
            // the overall challenge is known.
            let zero = Challenge([0u8; 31]);
            let proof = if bit == 1 {
                BitProof {
                    secp256k1_commitment: compress_secp_projective(&commitment_secp),
                    ed25519_commitment: commitment_ed.compress().to_bytes(),
                    challenge_0: cheat_challenge,
                    challenge_1: zero,
                    secp256k1_announcement_0: compress_secp_projective(&cheat_announce_secp),
                    secp256k1_announcement_1: compress_secp_projective(&announce_secp),
                    ed25519_announcement_0: cheat_announce_ed.compress().to_bytes(),
                    ed25519_announcement_1: announce_ed.compress().to_bytes(),
                    secp256k1_response_0: ScalarBE::from(cheat_response_secp).to_bytes(),
                    secp256k1_response_1: [0u8; 32],
                    ed25519_response_0: cheat_response_ed.to_bytes(),
                    ed25519_response_1: [0u8; 32],
                }
            } else {
                BitProof {
                    secp256k1_commitment: compress_secp_projective(&commitment_secp),
                    ed25519_commitment: commitment_ed.compress().to_bytes(),
                    challenge_0: zero,
                    challenge_1: cheat_challenge,
                    secp256k1_announcement_0: compress_secp_projective(&announce_secp),
                    secp256k1_announcement_1: compress_secp_projective(&cheat_announce_secp),
                    ed25519_announcement_0: announce_ed.compress().to_bytes(),
                    ed25519_announcement_1: cheat_announce_ed.compress().to_bytes(),
                    secp256k1_response_0: [0u8; 32],
                    secp256k1_response_1: ScalarBE::from(cheat_response_secp).to_bytes(),
                    ed25519_response_0: [0u8; 32],
                    ed25519_response_1: cheat_response_ed.to_bytes(),
                }
            };

            bits.push(proof);
            secrets.push(BitSecrets {
                bit,
                blinder_secp,
                blinder_ed,
                nonce_secp,
                nonce_ed,
                cheat_challenge,
            });
        }

        let challenge = compute_bit_challenge(
            &public_secp_bytes(&public_secp),
            &public_ed.compress().to_bytes(),
            &bits,
        );

        for (proof, scratch) in bits.iter_mut().zip(secrets.iter()) {
            let real_challenge = challenge.xor(&scratch.cheat_challenge);
            let response_secp =
                scratch.nonce_secp + real_challenge.as_secp256k1()? * scratch.blinder_secp;
            let response_ed = scratch.nonce_ed + real_challenge.as_ed25519() * scratch.blinder_ed;

            if scratch.bit == 1 {
                proof.challenge_1 = real_challenge;
                proof.secp256k1_response_1 = ScalarBE::from(response_secp).to_bytes();
                proof.ed25519_response_1 = response_ed.to_bytes();
            } else {
                proof.challenge_0 = real_challenge;
                proof.secp256k1_response_0 = ScalarBE::from(response_secp).to_bytes();
                proof.ed25519_response_0 = response_ed.to_bytes();
            }
        }

        // Weighted blinder sums via Horner, highest bit first.
        let mut blinder_sum_secp = k256::Scalar::ZERO;
        let mut blinder_sum_ed = EdScalar::ZERO;
        for scratch in secrets.iter().rev() {
            blinder_sum_secp = blinder_sum_secp + blinder_sum_secp + scratch.blinder_secp;
            blinder_sum_ed = blinder_sum_ed + blinder_sum_ed + scratch.blinder_ed;
        }

        let ed25519_proof_of_dl = prove_ed25519_dl(&x_ed, &public_ed);
        let secp256k1_proof_of_dl = prove_secp256k1_dl(&x_secp, &public_secp)?;

        Ok(Self {
            secret,
            transcript: DleqTranscript {
                ed25519_public: public_ed.compress().to_bytes(),
                secp256k1_public: public_secp_bytes(&public_secp),
                ed25519_blinder_sum: blinder_sum_ed.to_bytes(),
                secp256k1_blinder_sum: ScalarBE::from(blinder_sum_secp).to_bytes(),
                ed25519_proof_of_dl,
                secp256k1_proof_of_dl,
                bits,
            },
        })
    }

    /// Revealing the secret is what hands the counterparty spend authority;
    /// callers only do this inside claim/refund transactions.
    pub fn secret(&self) -> ScalarLE {
        self.secret.clone()
    }

    pub fn transcript(&self) -> &DleqTranscript {
        &self.transcript
    }
}

impl std::fmt::Debug for DleqProof {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DleqProof")
            .field("transcript", &self.transcript)
            .finish_non_exhaustive()
    }
}

/// Verifies a transcript and returns the two public keys it binds.
pub fn verify_dleq(transcript: &DleqTranscript) -> Result<VerifiedKeys, CryptoError> {
    if transcript.bits.len() != COMMITMENT_BITS {
        return Err(CryptoError::InvalidProof);
    }

    let public_ed = decompress_checked(&transcript.ed25519_public)?;
    // Torsion components would survive the commitment arithmetic; the
    // spend key must live in the prime-order subgroup.
    if !public_ed.is_torsion_free() {
        return Err(CryptoError::SmallOrderPoint);
    }
    let public_secp = parse_secp_point(&transcript.secp256k1_public)?;

    let g_prime = *secp256k1_g_prime();
    let h_prime = *ed25519_h_prime();

    // Aggregate the bit commitments with Horner and strip the blinders:
    // what remains must be exactly the public keys.
    let mut commitments_secp = Vec::with_capacity(COMMITMENT_BITS);
    let mut commitments_ed = Vec::with_capacity(COMMITMENT_BITS);
    for bit in &transcript.bits {
        commitments_secp.push(ProjectivePoint::from(parse_secp_point(
            &bit.secp256k1_commitment,
        )?));
        commitments_ed.push(decompress(&bit.ed25519_commitment)?);
    }

    let mut sum_secp = ProjectivePoint::IDENTITY;
    let mut sum_ed = EdwardsPoint::identity();
    for (c_secp, c_ed) in commitments_secp.iter().zip(commitments_ed.iter()).rev() {
        sum_secp = sum_secp + sum_secp + c_secp;
        sum_ed = sum_ed + sum_ed + c_ed;
    }

    let blinder_sum_secp = ScalarBE::from_bytes(transcript.secp256k1_blinder_sum)
        .as_secp256k1()
        .map_err(|_| CryptoError::InvalidProof)?;
    let blinder_sum_ed =
        Option::<EdScalar>::from(EdScalar::from_canonical_bytes(transcript.ed25519_blinder_sum))
            .ok_or(CryptoError::InvalidProof)?;

    if sum_secp - g_prime * blinder_sum_secp != ProjectivePoint::from(public_secp) {
        return Err(CryptoError::InvalidProof);
    }
    if sum_ed - h_prime * blinder_sum_ed != public_ed {
        return Err(CryptoError::InvalidProof);
    }

    // The public keys must have no G'/H' component of their own.
    verify_ed25519_dl(&transcript.ed25519_proof_of_dl, &public_ed)?;
    verify_secp256k1_dl(&transcript.secp256k1_proof_of_dl, &public_secp)?;

    let challenge = compute_bit_challenge(
        &transcript.secp256k1_public,
        &transcript.ed25519_public,
        &transcript.bits,
    );

    for (i, bit) in transcript.bits.iter().enumerate() {
        if bit.challenge_0.xor(&bit.challenge_1) != challenge {
            return Err(CryptoError::InvalidProof);
        }

        let commitment_secp = &commitments_secp[i];
        let commitment_ed = &commitments_ed[i];

        for branch in 0..2u8 {
            let (c, announce_secp, announce_ed, response_secp, response_ed) = if branch == 0 {
                (
                    bit.challenge_0,
                    &bit.secp256k1_announcement_0,
                    &bit.ed25519_announcement_0,
                    &bit.secp256k1_response_0,
                    &bit.ed25519_response_0,
                )
            } else {
                (
                    bit.challenge_1,
                    &bit.secp256k1_announcement_1,
                    &bit.ed25519_announcement_1,
                    &bit.secp256k1_response_1,
                    &bit.ed25519_response_1,
                )
            };

            let stmt_secp = if branch == 1 {
                *commitment_secp - ProjectivePoint::GENERATOR
            } else {
                *commitment_secp
            };
            let stmt_ed = if branch == 1 {
                commitment_ed - ED25519_BASEPOINT_POINT
            } else {
                *commitment_ed
            };

            let z_secp = ScalarBE::from_bytes(*response_secp)
                .as_secp256k1()
                .map_err(|_| CryptoError::InvalidProof)?;
            let z_ed = Option::<EdScalar>::from(EdScalar::from_canonical_bytes(*response_ed))
                .ok_or(CryptoError::InvalidProof)?;

            let expected_secp =
                ProjectivePoint::from(parse_secp_point(announce_secp)?) + stmt_secp * c.as_secp256k1()?;
            if g_prime * z_secp != expected_secp {
                return Err(CryptoError::InvalidProof);
            }

            let expected_ed = decompress(announce_ed)? + stmt_ed * c.as_ed25519();
            if h_prime * z_ed != expected_ed {
                return Err(CryptoError::InvalidProof);
            }
        }
    }

    Ok(VerifiedKeys {
        ed25519: public_ed,
        secp256k1: Secp256k1PublicKey::from_affine(&public_secp)?,
    })
}

impl VerifiedKeys {
    pub fn ed25519_public_key(&self) -> &EdwardsPoint {
        &self.ed25519
    }

    pub fn secp256k1_public_key(&self) -> &Secp256k1PublicKey {
        &self.secp256k1
    }
}

impl DleqTranscript {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(TRANSCRIPT_LEN);
        out.extend_from_slice(&self.ed25519_public);
        out.extend_from_slice(&self.secp256k1_public);
        out.extend_from_slice(&self.ed25519_blinder_sum);
        out.extend_from_slice(&self.secp256k1_blinder_sum);
        out.extend_from_slice(&self.ed25519_proof_of_dl.nonce);
        out.extend_from_slice(&self.ed25519_proof_of_dl.response);
        out.extend_from_slice(&self.secp256k1_proof_of_dl.nonce);
        out.extend_from_slice(&self.secp256k1_proof_of_dl.response);
        for bit in &self.bits {
            out.extend_from_slice(&bit.secp256k1_commitment);
            out.extend_from_slice(&bit.ed25519_commitment);
            out.extend_from_slice(&bit.challenge_0.to_bytes());
            out.extend_from_slice(&bit.challenge_1.to_bytes());
            out.extend_from_slice(&bit.secp256k1_announcement_0);
            out.extend_from_slice(&bit.secp256k1_announcement_1);
            out.extend_from_slice(&bit.ed25519_announcement_0);
            out.extend_from_slice(&bit.ed25519_announcement_1);
            out.extend_from_slice(&bit.secp256k1_response_0);
            out.extend_from_slice(&bit.secp256k1_response_1);
            out.extend_from_slice(&bit.ed25519_response_0);
            out.extend_from_slice(&bit.ed25519_response_1);
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != TRANSCRIPT_LEN {
            return Err(CryptoError::InvalidProofLength {
                expected: TRANSCRIPT_LEN,
                got: bytes.len(),
            });
        }

        let mut offset = 0;
        let ed25519_public = take::<32>(bytes, &mut offset);
        let secp256k1_public = take::<33>(bytes, &mut offset);
        let ed25519_blinder_sum = take::<32>(bytes, &mut offset);
        let secp256k1_blinder_sum = take::<32>(bytes, &mut offset);
        let ed25519_proof_of_dl = EdDlProof {
            nonce: take::<32>(bytes, &mut offset),
            response: take::<32>(bytes, &mut offset),
        };
        let secp256k1_proof_of_dl = SecpDlProof {
            nonce: take::<33>(bytes, &mut offset),
            response: take::<32>(bytes, &mut offset),
        };

        let mut bits = Vec::with_capacity(COMMITMENT_BITS);
        for _ in 0..COMMITMENT_BITS {
            bits.push(BitProof {
                secp256k1_commitment: take::<33>(bytes, &mut offset),
                ed25519_commitment: take::<32>(bytes, &mut offset),
                challenge_0: Challenge(take::<31>(bytes, &mut offset)),
                challenge_1: Challenge(take::<31>(bytes, &mut offset)),
                secp256k1_announcement_0: take::<33>(bytes, &mut offset),
                secp256k1_announcement_1: take::<33>(bytes, &mut offset),
                ed25519_announcement_0: take::<32>(bytes, &mut offset),
                ed25519_announcement_1: take::<32>(bytes, &mut offset),
                secp256k1_response_0: take::<32>(bytes, &mut offset),
                secp256k1_response_1: take::<32>(bytes, &mut offset),
                ed25519_response_0: take::<32>(bytes, &mut offset),
                ed25519_response_1: take::<32>(bytes, &mut offset),
            });
        }

        Ok(Self {
            ed25519_public,
            secp256k1_public,
            ed25519_blinder_sum,
            secp256k1_blinder_sum,
            ed25519_proof_of_dl,
            secp256k1_proof_of_dl,
            bits,
        })
    }

    pub fn hex(&self) -> String {
        hexutil::hex_encode(&self.to_bytes())
    }

    pub fn from_hex(value: &str) -> Result<Self, CryptoError> {
        Self::from_bytes(&hexutil::decode_hex(value, "dleq transcript")?)
    }
}

fn take<const N: usize>(bytes: &[u8], offset: &mut usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[*offset..*offset + N]);
    *offset += N;
    out
}

/// Everything a role needs at session start: the DLEQ proof, the derived
/// Monero key pair and the secp256k1 public key of the same secret.
pub struct KeysAndProof {
    pub dleq_proof: DleqProof,
    pub key_pair: PrivateKeyPair,
    pub secp256k1_public: Secp256k1PublicKey,
}

pub fn generate_keys_and_proof() -> Result<KeysAndProof, CryptoError> {
    let dleq_proof = DleqProof::prove()?;
    keys_and_proof_from(dleq_proof)
}

/// Rebuilds the full key material from a persisted secret.
pub fn keys_and_proof_from_secret(secret: ScalarLE) -> Result<KeysAndProof, CryptoError> {
    let dleq_proof = DleqProof::prove_with_secret(secret)?;
    keys_and_proof_from(dleq_proof)
}

fn keys_and_proof_from(dleq_proof: DleqProof) -> Result<KeysAndProof, CryptoError> {
    let secret = dleq_proof.secret();
    let key_pair = PrivateSpendKey::from_scalar_le(&secret)?.as_key_pair();
    let secp256k1_public = Secp256k1PublicKey::from_secret(&secret.to_be())?;
    Ok(KeysAndProof {
        dleq_proof,
        key_pair,
        secp256k1_public,
    })
}

fn bit_of(bytes: &[u8; 32], index: usize) -> u8 {
    (bytes[index / 8] >> (index % 8)) & 1
}

/// Fiat-Shamir challenge over both public keys, all bit commitments and
/// all OR announcements, truncated to 31 bytes.
fn compute_bit_challenge(
    secp256k1_public: &[u8; 33],
    ed25519_public: &[u8; 32],
    bits: &[BitProof],
) -> Challenge {
    let mut hasher = Blake2s256::new();
    hasher.update(DLEQ_DOMAIN_TAG);
    hasher.update(secp256k1_public);
    hasher.update(ed25519_public);
    for bit in bits {
        hasher.update(bit.secp256k1_commitment);
        hasher.update(bit.ed25519_commitment);
        hasher.update(bit.secp256k1_announcement_0);
        hasher.update(bit.secp256k1_announcement_1);
        hasher.update(bit.ed25519_announcement_0);
        hasher.update(bit.ed25519_announcement_1);
    }
    let hash: [u8; 32] = hasher.finalize().into();
    Challenge::from_hash(&hash)
}

fn prove_ed25519_dl(secret: &EdScalar, public: &EdwardsPoint) -> EdDlProof {
    let nonce = EdScalar::random(&mut OsRng);
    let commitment = ED25519_BASEPOINT_POINT * nonce;
    let challenge = dl_challenge(
        DL_PROOF_TAG_ED25519,
        &commitment.compress().to_bytes(),
        &public.compress().to_bytes(),
    );
    let response = nonce + challenge.as_ed25519() * secret;
    EdDlProof {
        nonce: commitment.compress().to_bytes(),
        response: response.to_bytes(),
    }
}

fn verify_ed25519_dl(proof: &EdDlProof, public: &EdwardsPoint) -> Result<(), CryptoError> {
    let commitment = decompress(&proof.nonce)?;
    let response = Option::<EdScalar>::from(EdScalar::from_canonical_bytes(proof.response))
        .ok_or(CryptoError::InvalidProof)?;
    let challenge = dl_challenge(
        DL_PROOF_TAG_ED25519,
        &proof.nonce,
        &public.compress().to_bytes(),
    );
    let expected = commitment + public * challenge.as_ed25519();
    if ED25519_BASEPOINT_POINT * response != expected {
        return Err(CryptoError::InvalidProof);
    }
    Ok(())
}

fn prove_secp256k1_dl(
    secret: &k256::Scalar,
    public: &ProjectivePoint,
) -> Result<SecpDlProof, CryptoError> {
    let nonce = k256::Scalar::random(&mut OsRng);
    let commitment = ProjectivePoint::GENERATOR * nonce;
    let challenge = dl_challenge(
        DL_PROOF_TAG_SECP256K1,
        &compress_secp_projective(&commitment),
        &public_secp_bytes(public),
    );
    let response = nonce + challenge.as_secp256k1()? * secret;
    Ok(SecpDlProof {
        nonce: compress_secp_projective(&commitment),
        response: ScalarBE::from(response).to_bytes(),
    })
}

fn verify_secp256k1_dl(proof: &SecpDlProof, public: &AffinePoint) -> Result<(), CryptoError> {
    let commitment = ProjectivePoint::from(parse_secp_point(&proof.nonce)?);
    let response = ScalarBE::from_bytes(proof.response)
        .as_secp256k1()
        .map_err(|_| CryptoError::InvalidProof)?;
    let challenge = dl_challenge(
        DL_PROOF_TAG_SECP256K1,
        &proof.nonce,
        &compress_secp(public),
    );
    let expected = commitment + ProjectivePoint::from(*public) * challenge.as_secp256k1()?;
    if ProjectivePoint::GENERATOR * response != expected {
        return Err(CryptoError::InvalidProof);
    }
    Ok(())
}

fn dl_challenge(tag: &[u8], commitment: &[u8], public: &[u8]) -> Challenge {
    let mut hasher = Blake2s256::new();
    hasher.update(tag);
    hasher.update(commitment);
    hasher.update(public);
    let hash: [u8; 32] = hasher.finalize().into();
    Challenge::from_hash(&hash)
}

/// Second ed25519 generator with unknown discrete log, derived by hashing
/// to a point and clearing the cofactor.
fn ed25519_h_prime() -> &'static EdwardsPoint {
    static H_PRIME: OnceLock<EdwardsPoint> = OnceLock::new();
    H_PRIME.get_or_init(|| {
        let mut counter = 0u32;
        loop {
            let mut hasher = Blake2s256::new();
            hasher.update(b"DLEQ-generator-ed25519");
            hasher.update(counter.to_le_bytes());
            let candidate: [u8; 32] = hasher.finalize().into();
            if let Some(point) = CompressedEdwardsY(candidate).decompress() {
                let point = point.mul_by_cofactor();
                if point != EdwardsPoint::identity() {
                    return point;
                }
            }
            counter += 1;
        }
    })
}

/// Second secp256k1 generator with unknown discrete log, derived by
/// hashing to an x-coordinate.
fn secp256k1_g_prime() -> &'static ProjectivePoint {
    static G_PRIME: OnceLock<ProjectivePoint> = OnceLock::new();
    G_PRIME.get_or_init(|| {
        let mut counter = 0u32;
        loop {
            let mut hasher = Blake2s256::new();
            hasher.update(b"DLEQ-generator-secp256k1");
            hasher.update(counter.to_le_bytes());
            let candidate: [u8; 32] = hasher.finalize().into();
            let mut sec1 = [0u8; 33];
            sec1[0] = 0x02;
            sec1[1..].copy_from_slice(&candidate);
            if let Ok(encoded) = EncodedPoint::from_bytes(sec1) {
                if let Some(point) =
                    Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
                {
                    return ProjectivePoint::from(point);
                }
            }
            counter += 1;
        }
    })
}

fn public_secp_bytes(point: &ProjectivePoint) -> [u8; 33] {
    compress_secp(&point.to_affine())
}

fn compress_secp(point: &AffinePoint) -> [u8; 33] {
    let encoded = point.to_encoded_point(true);
    let mut out = [0u8; 33];
    out.copy_from_slice(encoded.as_bytes());
    out
}

fn compress_secp_projective(point: &ProjectivePoint) -> [u8; 33] {
    compress_secp(&point.to_affine())
}

fn parse_secp_point(bytes: &[u8; 33]) -> Result<AffinePoint, CryptoError> {
    let encoded = EncodedPoint::from_bytes(bytes).map_err(|_| CryptoError::InvalidSecpPoint)?;
    Option::from(AffinePoint::from_encoded_point(&encoded)).ok_or(CryptoError::InvalidSecpPoint)
}

fn decompress(bytes: &[u8; 32]) -> Result<EdwardsPoint, CryptoError> {
    CompressedEdwardsY(*bytes)
        .decompress()
        .ok_or(CryptoError::InvalidPoint)
}

fn decompress_checked(bytes: &[u8; 32]) -> Result<EdwardsPoint, CryptoError> {
    let point = decompress(bytes)?;
    if point.is_small_order() {
        return Err(CryptoError::SmallOrderPoint);
    }
    Ok(point)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_valid_proof() {
        let proof = DleqProof::prove().unwrap();
        let keys = verify_dleq(proof.transcript()).unwrap();

        let secret = proof.secret();
        let expected_ed = ED25519_BASEPOINT_POINT * secret.as_ed25519().unwrap();
        assert_eq!(*keys.ed25519_public_key(), expected_ed);

        let expected_secp = Secp256k1PublicKey::from_secret(&secret.to_be()).unwrap();
        assert_eq!(*keys.secp256k1_public_key(), expected_secp);
    }

    #[test]
    fn proving_with_persisted_secret_reproduces_public_keys() {
        let first = DleqProof::prove().unwrap();
        let second = DleqProof::prove_with_secret(first.secret()).unwrap();
        assert_eq!(
            first.transcript().ed25519_public,
            second.transcript().ed25519_public
        );
        assert_eq!(
            first.transcript().secp256k1_public,
            second.transcript().secp256k1_public
        );
        verify_dleq(second.transcript()).unwrap();
    }

    /// The attack the proof system exists to prevent: a prover who knows
    /// two unrelated discrete logs runs the honest prover machinery per
    /// curve, committing to the bits of `x_ed` on ed25519 and the bits of
    /// `x_secp` on secp256k1. Wherever the bits differ there is no OR
    /// branch in which both statements hold, so one side's response
    /// cannot satisfy its equation.
    #[test]
    fn rejects_distinct_witnesses_across_curves() {
        let (secret_ed, secret_secp) = distinct_secrets();

        // Sanity: with a single witness the same mechanics yield an
        // honest proof, so a rejection below is the cross-curve binding
        // at work and nothing else.
        let honest = forge_cross_witness_transcript(&secret_ed, &secret_ed);
        verify_dleq(&honest).unwrap();

        let forged = forge_cross_witness_transcript(&secret_ed, &secret_secp);
        assert!(matches!(
            verify_dleq(&forged),
            Err(CryptoError::InvalidProof)
        ));
    }

    #[test]
    fn rejects_grafted_secp256k1_side() {
        // Splicing the secp256k1 half of one honest proof onto the
        // ed25519 half of another must not verify either.
        let a = DleqProof::prove().unwrap();
        let b = DleqProof::prove().unwrap();

        let mut grafted = a.transcript().clone();
        let other = b.transcript();
        grafted.secp256k1_public = other.secp256k1_public;
        grafted.secp256k1_blinder_sum = other.secp256k1_blinder_sum;
        grafted.secp256k1_proof_of_dl = other.secp256k1_proof_of_dl.clone();
        for (bit, donor) in grafted.bits.iter_mut().zip(other.bits.iter()) {
            bit.secp256k1_commitment = donor.secp256k1_commitment;
            bit.secp256k1_announcement_0 = donor.secp256k1_announcement_0;
            bit.secp256k1_announcement_1 = donor.secp256k1_announcement_1;
            bit.secp256k1_response_0 = donor.secp256k1_response_0;
            bit.secp256k1_response_1 = donor.secp256k1_response_1;
        }

        assert!(matches!(
            verify_dleq(&grafted),
            Err(CryptoError::InvalidProof)
        ));
    }

    #[test]
    fn rejects_tampered_response() {
        let proof = DleqProof::prove().unwrap();
        let mut transcript = proof.transcript().clone();
        transcript.bits[7].ed25519_response_0[0] ^= 0x42;
        assert!(matches!(
            verify_dleq(&transcript),
            Err(CryptoError::InvalidProof)
        ));
    }

    #[test]
    fn rejects_tampered_challenge_split() {
        let proof = DleqProof::prove().unwrap();
        let mut transcript = proof.transcript().clone();
        let mut bytes = transcript.bits[3].challenge_0.to_bytes();
        bytes[0] ^= 0x01;
        transcript.bits[3].challenge_0 = Challenge(bytes);
        assert!(matches!(
            verify_dleq(&transcript),
            Err(CryptoError::InvalidProof)
        ));
    }

    #[test]
    fn rejects_swapped_public_key() {
        let proof = DleqProof::prove().unwrap();
        let other = DleqProof::prove().unwrap();
        let mut transcript = proof.transcript().clone();
        transcript.ed25519_public = other.transcript().ed25519_public;
        assert!(matches!(
            verify_dleq(&transcript),
            Err(CryptoError::InvalidProof)
        ));
    }

    #[test]
    fn rejects_zero_secret() {
        let err = DleqProof::prove_with_secret(ScalarLE::from_bytes([0u8; 32])).unwrap_err();
        assert!(matches!(err, CryptoError::ZeroSecret));
    }

    #[test]
    fn rejects_oversized_secret() {
        let mut bytes = [0u8; 32];
        bytes[31] = 0x10;
        bytes[0] = 1;
        let err = DleqProof::prove_with_secret(ScalarLE::from_bytes(bytes)).unwrap_err();
        assert!(matches!(err, CryptoError::OversizedSecret));
    }

    #[test]
    fn transcript_bytes_roundtrip() {
        let proof = DleqProof::prove().unwrap();
        let bytes = proof.transcript().to_bytes();
        assert_eq!(bytes.len(), TRANSCRIPT_LEN);
        let decoded = DleqTranscript::from_bytes(&bytes).unwrap();
        assert_eq!(*proof.transcript(), decoded);

        let hex = proof.transcript().hex();
        assert_eq!(DleqTranscript::from_hex(&hex).unwrap(), decoded);
    }

    #[test]
    fn rejects_truncated_transcript() {
        let proof = DleqProof::prove().unwrap();
        let bytes = proof.transcript().to_bytes();
        let err = DleqTranscript::from_bytes(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidProofLength { .. }));
    }

    #[test]
    fn generators_are_independent_of_the_basepoints() {
        assert_ne!(*ed25519_h_prime(), ED25519_BASEPOINT_POINT);
        assert_ne!(*secp256k1_g_prime(), ProjectivePoint::GENERATOR);
        assert!(!ed25519_h_prime().is_small_order());
    }

    fn distinct_secrets() -> (ScalarLE, ScalarLE) {
        loop {
            let a = ScalarLE::random();
            let b = ScalarLE::random();
            if a != b {
                return (a, b);
            }
        }
    }

    /// Runs the complete honest prover flow, except that the ed25519 side
    /// commits to `secret_ed` and the secp256k1 side to `secret_secp`.
    /// Where the bits agree the OR proof is fully honest; where they
    /// differ the forger takes the ed25519 bit's branch and answers the
    /// secp256k1 statement with its blinder anyway, exactly what a cheat
    /// would have to submit.
    fn forge_cross_witness_transcript(
        secret_ed: &ScalarLE,
        secret_secp: &ScalarLE,
    ) -> DleqTranscript {
        let ed_bytes = secret_ed.to_bytes();
        let secp_bytes = secret_secp.to_bytes();

        let x_ed = secret_ed.as_ed25519().unwrap();
        let x_secp = secret_secp.as_secp256k1().unwrap();
        let public_ed = ED25519_BASEPOINT_POINT * x_ed;
        let public_secp = ProjectivePoint::GENERATOR * x_secp;

        let g_prime = *secp256k1_g_prime();
        let h_prime = *ed25519_h_prime();

        struct Scratch {
            branch: u8,
            blinder_secp: k256::Scalar,
            blinder_ed: EdScalar,
            nonce_secp: k256::Scalar,
            nonce_ed: EdScalar,
            cheat_challenge: Challenge,
        }

        let mut scratch = Vec::new();
        let mut bits = Vec::new();

        for i in 0..COMMITMENT_BITS {
            let bit_ed = bit_of(&ed_bytes, i);
            let bit_secp = bit_of(&secp_bytes, i);
            // The forger follows the ed25519 witness's branch.
            let branch = bit_ed;

            let blinder_secp = k256::Scalar::random(&mut OsRng);
            let blinder_ed = EdScalar::random(&mut OsRng);

            let mut commitment_secp = g_prime * blinder_secp;
            if bit_secp == 1 {
                commitment_secp += ProjectivePoint::GENERATOR;
            }
            let mut commitment_ed = h_prime * blinder_ed;
            if bit_ed == 1 {
                commitment_ed += ED25519_BASEPOINT_POINT;
            }

            let cheat_stmt_secp = if branch == 1 {
                commitment_secp
            } else {
                commitment_secp - ProjectivePoint::GENERATOR
            };
            let cheat_stmt_ed = if branch == 1 {
                commitment_ed
            } else {
                commitment_ed - ED25519_BASEPOINT_POINT
            };

            let nonce_secp = k256::Scalar::random(&mut OsRng);
            let nonce_ed = EdScalar::random(&mut OsRng);
            let announce_secp = g_prime * nonce_secp;
            let announce_ed = h_prime * nonce_ed;

            let cheat_challenge = Challenge::random();
            let cheat_response_secp = k256::Scalar::random(&mut OsRng);
            let cheat_response_ed = EdScalar::random(&mut OsRng);
            let cheat_announce_secp = g_prime * cheat_response_secp
                - cheat_stmt_secp * cheat_challenge.as_secp256k1().unwrap();
            let cheat_announce_ed =
                h_prime * cheat_response_ed - cheat_stmt_ed * cheat_challenge.as_ed25519();

            let zero = Challenge([0u8; 31]);
            let proof = if branch == 1 {
                BitProof {
                    secp256k1_commitment: compress_secp_projective(&commitment_secp),
                    ed25519_commitment: commitment_ed.compress().to_bytes(),
                    challenge_0: cheat_challenge,
                    challenge_1: zero,
                    secp256k1_announcement_0: compress_secp_projective(&cheat_announce_secp),
                    secp256k1_announcement_1: compress_secp_projective(&announce_secp),
                    ed25519_announcement_0: cheat_announce_ed.compress().to_bytes(),
                    ed25519_announcement_1: announce_ed.compress().to_bytes(),
                    secp256k1_response_0: ScalarBE::from(cheat_response_secp).to_bytes(),
                    secp256k1_response_1: [0u8; 32],
                    ed25519_response_0: cheat_response_ed.to_bytes(),
                    ed25519_response_1: [0u8; 32],
                }
            } else {
                BitProof {
                    secp256k1_commitment: compress_secp_projective(&commitment_secp),
                    ed25519_commitment: commitment_ed.compress().to_bytes(),
                    challenge_0: zero,
                    challenge_1: cheat_challenge,
                    secp256k1_announcement_0: compress_secp_projective(&announce_secp),
                    secp256k1_announcement_1: compress_secp_projective(&cheat_announce_secp),
                    ed25519_announcement_0: announce_ed.compress().to_bytes(),
                    ed25519_announcement_1: cheat_announce_ed.compress().to_bytes(),
                    secp256k1_response_0: [0u8; 32],
                    secp256k1_response_1: ScalarBE::from(cheat_response_secp).to_bytes(),
                    ed25519_response_0: [0u8; 32],
                    ed25519_response_1: cheat_response_ed.to_bytes(),
                }
            };

            bits.push(proof);
            scratch.push(Scratch {
                branch,
                blinder_secp,
                blinder_ed,
                nonce_secp,
                nonce_ed,
                cheat_challenge,
            });
        }

        let challenge = compute_bit_challenge(
            &public_secp_bytes(&public_secp),
            &public_ed.compress().to_bytes(),
            &bits,
        );

        for (proof, s) in bits.iter_mut().zip(scratch.iter()) {
            let real_challenge = challenge.xor(&s.cheat_challenge);
            let response_secp =
                s.nonce_secp + real_challenge.as_secp256k1().unwrap() * s.blinder_secp;
            let response_ed = s.nonce_ed + real_challenge.as_ed25519() * s.blinder_ed;

            if s.branch == 1 {
                proof.challenge_1 = real_challenge;
                proof.secp256k1_response_1 = ScalarBE::from(response_secp).to_bytes();
                proof.ed25519_response_1 = response_ed.to_bytes();
            } else {
                proof.challenge_0 = real_challenge;
                proof.secp256k1_response_0 = ScalarBE::from(response_secp).to_bytes();
                proof.ed25519_response_0 = response_ed.to_bytes();
            }
        }

        let mut blinder_sum_secp = k256::Scalar::ZERO;
        let mut blinder_sum_ed = EdScalar::ZERO;
        for s in scratch.iter().rev() {
            blinder_sum_secp = blinder_sum_secp + blinder_sum_secp + s.blinder_secp;
            blinder_sum_ed = blinder_sum_ed + blinder_sum_ed + s.blinder_ed;
        }

        DleqTranscript {
            ed25519_public: public_ed.compress().to_bytes(),
            secp256k1_public: public_secp_bytes(&public_secp),
            ed25519_blinder_sum: blinder_sum_ed.to_bytes(),
            secp256k1_blinder_sum: ScalarBE::from(blinder_sum_secp).to_bytes(),
            ed25519_proof_of_dl: prove_ed25519_dl(&x_ed, &public_ed),
            secp256k1_proof_of_dl: prove_secp256k1_dl(&x_secp, &public_secp).unwrap(),
            bits,
        }
    }
}
