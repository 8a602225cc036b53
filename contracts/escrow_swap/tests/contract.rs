use alloy_primitives::{Address, B256, U256};
use swap_crypto::hexutil::decode_hex_32;
use swap_crypto::{ScalarBE, ScalarLE, Secp256k1PublicKey};

use escrow_swap::{
    claimed_topic, new_topic, refunded_topic, secret_from_log, swap_id_from_new_log,
    swap_id_matches, ContractError, SimulatedEscrow,
};

const TIMEOUT_DURATION: u64 = 60;
const GENESIS: u64 = 1_600_000_000;

fn owner() -> Address {
    Address::repeat_byte(0xa1)
}

fn claimer() -> Address {
    Address::repeat_byte(0xb2)
}

fn escrow() -> SimulatedEscrow {
    SimulatedEscrow::new(Address::repeat_byte(0xee), GENESIS)
}

fn random_keypair() -> (ScalarBE, B256) {
    let secret = ScalarLE::random().to_be();
    let public = Secp256k1PublicKey::from_secret(&secret).expect("keygen");
    (secret, B256::from(public.keccak256()))
}

fn one_ether() -> U256 {
    U256::from(10u64).pow(U256::from(18u64))
}

#[test]
fn new_swap_emits_new_log_with_commitments() {
    let mut contract = escrow();
    let claim_key = B256::repeat_byte(0x11);
    let refund_key = B256::repeat_byte(0x22);

    let id = contract
        .new_swap(
            owner(),
            claimer(),
            claim_key,
            refund_key,
            TIMEOUT_DURATION,
            one_ether(),
        )
        .expect("new_swap");

    let logs = contract.logs_by_topic(new_topic());
    assert_eq!(logs.len(), 1);
    assert_eq!(swap_id_from_new_log(&logs[0]).unwrap(), id);
    assert!(swap_id_matches(&logs[0], id));

    let swap = contract.swap(id).unwrap();
    assert_eq!(swap.timeout0, GENESIS + TIMEOUT_DURATION);
    assert_eq!(swap.timeout1, GENESIS + 2 * TIMEOUT_DURATION);
    assert_eq!(swap.value, one_ether());
    assert!(!swap.is_ready);
    assert!(!swap.completed);
}

#[test]
fn claim_with_known_vector() {
    // Fixed secret/public-key pair; the commitment must open to the same
    // secret the claim transaction reveals.
    let secret = ScalarBE::from_bytes(
        decode_hex_32(
            "D30519BCAE8D180DBFCC94FE0B8383DC310185B0BE97B4365083EBCECCD75759",
            "secret",
        )
        .unwrap(),
    );
    let public = Secp256k1PublicKey::from_secret(&secret).unwrap();
    let commitment = B256::from(public.keccak256());

    let mut contract = escrow();
    let id = contract
        .new_swap(
            owner(),
            claimer(),
            commitment,
            B256::ZERO,
            TIMEOUT_DURATION,
            one_ether(),
        )
        .unwrap();

    contract.set_ready(owner(), id).unwrap();
    contract.claim(claimer(), id, secret).unwrap();

    let swap = contract.swap(id).unwrap();
    assert!(swap.completed);
    assert_eq!(contract.paid_to(claimer()), one_ether());
}

#[test]
fn claim_with_random_dleq_secret() {
    let (secret, commitment) = random_keypair();

    let mut contract = escrow();
    let id = contract
        .new_swap(
            owner(),
            claimer(),
            commitment,
            B256::ZERO,
            TIMEOUT_DURATION,
            one_ether(),
        )
        .unwrap();

    contract.set_ready(owner(), id).unwrap();
    contract.claim(claimer(), id, secret).unwrap();

    let logs = contract.logs_by_topic(claimed_topic());
    assert_eq!(logs.len(), 1);
    assert_eq!(secret_from_log(&logs[0]).unwrap(), secret);
}

#[test]
fn refund_before_t0_without_ready() {
    let (secret, commitment) = random_keypair();

    let mut contract = escrow();
    let id = contract
        .new_swap(
            owner(),
            claimer(),
            B256::ZERO,
            commitment,
            TIMEOUT_DURATION,
            one_ether(),
        )
        .unwrap();

    contract.refund(owner(), id, secret).unwrap();
    assert!(contract.swap(id).unwrap().completed);
    assert_eq!(contract.paid_to(owner()), one_ether());

    let logs = contract.logs_by_topic(refunded_topic());
    assert_eq!(secret_from_log(&logs[0]).unwrap(), secret);
}

#[test]
fn refund_after_t1() {
    let (secret, commitment) = random_keypair();

    let mut contract = escrow();
    let id = contract
        .new_swap(
            owner(),
            claimer(),
            B256::ZERO,
            commitment,
            TIMEOUT_DURATION,
            one_ether(),
        )
        .unwrap();
    contract.set_ready(owner(), id).unwrap();

    // Ready blocks the owner until t1 has passed.
    assert_eq!(
        contract.refund(owner(), id, secret),
        Err(ContractError::NotTimeToRefund)
    );

    contract.advance_time(2 * TIMEOUT_DURATION + 1);
    contract.refund(owner(), id, secret).unwrap();
    assert!(contract.swap(id).unwrap().completed);
}

#[test]
fn claim_requires_ready_or_t0() {
    let (secret, commitment) = random_keypair();

    let mut contract = escrow();
    let id = contract
        .new_swap(
            owner(),
            claimer(),
            commitment,
            B256::ZERO,
            TIMEOUT_DURATION,
            one_ether(),
        )
        .unwrap();

    assert_eq!(
        contract.claim(claimer(), id, secret),
        Err(ContractError::TooEarlyToClaim)
    );

    // After t0 the claimer no longer needs ready.
    contract.advance_time(TIMEOUT_DURATION + 1);
    contract.claim(claimer(), id, secret).unwrap();
}

#[test]
fn claim_rejected_after_t1() {
    let (secret, commitment) = random_keypair();

    let mut contract = escrow();
    let id = contract
        .new_swap(
            owner(),
            claimer(),
            commitment,
            B256::ZERO,
            TIMEOUT_DURATION,
            one_ether(),
        )
        .unwrap();
    contract.set_ready(owner(), id).unwrap();

    contract.advance_time(2 * TIMEOUT_DURATION + 1);
    assert_eq!(
        contract.claim(claimer(), id, secret),
        Err(ContractError::TooLateToClaim)
    );
}

#[test]
fn claim_and_refund_are_mutually_exclusive() {
    let (claim_secret, claim_commitment) = random_keypair();
    let (refund_secret, refund_commitment) = random_keypair();

    let mut contract = escrow();
    let id = contract
        .new_swap(
            owner(),
            claimer(),
            claim_commitment,
            refund_commitment,
            TIMEOUT_DURATION,
            one_ether(),
        )
        .unwrap();

    contract.set_ready(owner(), id).unwrap();
    contract.claim(claimer(), id, claim_secret).unwrap();

    contract.advance_time(2 * TIMEOUT_DURATION + 1);
    assert_eq!(
        contract.refund(owner(), id, refund_secret),
        Err(ContractError::AlreadyCompleted)
    );
    assert_eq!(contract.paid_to(owner()), U256::ZERO);
}

#[test]
fn set_ready_reverts_on_second_call() {
    let (_, commitment) = random_keypair();

    let mut contract = escrow();
    let id = contract
        .new_swap(
            owner(),
            claimer(),
            commitment,
            B256::ZERO,
            TIMEOUT_DURATION,
            one_ether(),
        )
        .unwrap();

    contract.set_ready(owner(), id).unwrap();
    assert!(contract.is_ready(id).unwrap());
    assert_eq!(
        contract.set_ready(owner(), id),
        Err(ContractError::AlreadyReady)
    );
}

#[test]
fn only_named_parties_can_act() {
    let (secret, commitment) = random_keypair();

    let mut contract = escrow();
    let id = contract
        .new_swap(
            owner(),
            claimer(),
            commitment,
            commitment,
            TIMEOUT_DURATION,
            one_ether(),
        )
        .unwrap();

    assert_eq!(
        contract.set_ready(claimer(), id),
        Err(ContractError::NotOwner)
    );
    contract.set_ready(owner(), id).unwrap();
    assert_eq!(
        contract.claim(owner(), id, secret),
        Err(ContractError::NotClaimer)
    );
}

#[test]
fn wrong_secret_is_rejected() {
    let (_, commitment) = random_keypair();
    let (other_secret, _) = random_keypair();

    let mut contract = escrow();
    let id = contract
        .new_swap(
            owner(),
            claimer(),
            commitment,
            B256::ZERO,
            TIMEOUT_DURATION,
            one_ether(),
        )
        .unwrap();

    contract.set_ready(owner(), id).unwrap();
    assert_eq!(
        contract.claim(claimer(), id, other_secret),
        Err(ContractError::InvalidSecret)
    );
}

#[test]
fn multiple_interleaved_swaps() {
    let mut contract = escrow();
    let mut cases = Vec::new();

    for _ in 0..16 {
        let (secret, commitment) = random_keypair();
        let id = contract
            .new_swap(
                owner(),
                claimer(),
                commitment,
                B256::ZERO,
                TIMEOUT_DURATION,
                one_ether(),
            )
            .unwrap();
        cases.push((id, secret));
    }

    for (id, secret) in cases {
        contract.set_ready(owner(), id).unwrap();
        contract.claim(claimer(), id, secret).unwrap();
        assert!(contract.swap(id).unwrap().completed);
    }

    assert_eq!(contract.paid_to(claimer()), one_ether() * U256::from(16u64));
}

#[test]
fn unknown_swap_is_rejected() {
    let mut contract = escrow();
    let (secret, _) = random_keypair();
    assert_eq!(
        contract.claim(claimer(), U256::from(42u64), secret),
        Err(ContractError::UnknownSwap)
    );
}
