//! Peer messages exchanged over the swap stream, in logical order:
//! `SendKeys` (both directions), `NotifyXmrLocked` (B→A),
//! `NotifyEthLocked` (A→B), `NotifyReady` (B→A) and the informational
//! `NotifyClaimed`. Key material travels as hex strings; decoding and DLEQ
//! verification happen in [`SendKeysMessage::verify`], so a message that
//! parses is not yet a message that is trusted.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use swap_crypto::hexutil;
use swap_crypto::{
    verify_dleq, DleqTranscript, KeysAndProof, PrivateViewKey, PublicKeyPair, Secp256k1PublicKey,
};

use crate::errors::SwapError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    SendKeys(SendKeysMessage),
    NotifyXmrLocked {
        address: String,
        tx_hash: String,
    },
    NotifyEthLocked {
        contract_address: Address,
        swap_id: U256,
    },
    NotifyReady,
    NotifyClaimed {
        tx_hash: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendKeysMessage {
    pub provided_amount: f64,
    pub public_spend_key: String,
    pub private_view_key: String,
    pub dleq_proof: String,
    pub secp256k1_public_key: String,
    pub eth_address: Address,
}

/// Which message the state machine will accept next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedMessage {
    Keys,
    XmrLocked,
    EthLocked,
    Ready,
    /// Terminal: only the informational `NotifyClaimed` is tolerated.
    None,
}

/// The counterparty's verified key material: its public spend key and
/// secp256k1 key straight from the DLEQ proof, plus the private view key it
/// shares so both sides can watch the locked output.
#[derive(Debug, Clone)]
pub struct CounterpartyKeys {
    pub public_pair: PublicKeyPair,
    pub private_view: PrivateViewKey,
    pub secp256k1: Secp256k1PublicKey,
    pub eth_address: Address,
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::SendKeys(_) => "send_keys",
            Message::NotifyXmrLocked { .. } => "notify_xmr_locked",
            Message::NotifyEthLocked { .. } => "notify_eth_locked",
            Message::NotifyReady => "notify_ready",
            Message::NotifyClaimed { .. } => "notify_claimed",
        }
    }

    pub fn matches(&self, expected: ExpectedMessage) -> bool {
        match (self, expected) {
            (Message::SendKeys(_), ExpectedMessage::Keys)
            | (Message::NotifyXmrLocked { .. }, ExpectedMessage::XmrLocked)
            | (Message::NotifyEthLocked { .. }, ExpectedMessage::EthLocked)
            | (Message::NotifyReady, ExpectedMessage::Ready) => true,
            (Message::NotifyClaimed { .. }, ExpectedMessage::None) => true,
            _ => false,
        }
    }
}

impl SendKeysMessage {
    pub fn build(keys: &KeysAndProof, provided_amount: f64, eth_address: Address) -> Self {
        let public = keys.key_pair.public();
        Self {
            provided_amount,
            public_spend_key: hexutil::hex_encode(&public.spend_compressed()),
            private_view_key: keys.key_pair.view_key().hex(),
            dleq_proof: keys.dleq_proof.transcript().hex(),
            secp256k1_public_key: keys.secp256k1_public.hex(),
            eth_address,
        }
    }

    /// Verifies the DLEQ proof and cross-checks the separately transmitted
    /// keys against the proven ones.
    pub fn verify(&self) -> Result<CounterpartyKeys, SwapError> {
        if self.public_spend_key.is_empty()
            || self.private_view_key.is_empty()
            || self.dleq_proof.is_empty()
            || self.secp256k1_public_key.is_empty()
        {
            return Err(SwapError::MissingKeys);
        }

        let transcript = DleqTranscript::from_hex(&self.dleq_proof)?;
        let verified = verify_dleq(&transcript)?;

        let claimed_spend =
            hexutil::decode_hex_32(&self.public_spend_key, "public spend key")?;
        if claimed_spend != verified.ed25519_public_key().compress().to_bytes() {
            return Err(SwapError::KeyProofMismatch);
        }

        let claimed_secp = Secp256k1PublicKey::from_hex(&self.secp256k1_public_key)?;
        if claimed_secp != *verified.secp256k1_public_key() {
            return Err(SwapError::KeyProofMismatch);
        }

        let private_view = PrivateViewKey::from_hex(&self.private_view_key)?;
        let public_pair =
            PublicKeyPair::new(*verified.ed25519_public_key(), private_view.public());

        Ok(CounterpartyKeys {
            public_pair,
            private_view,
            secp256k1: claimed_secp,
            eth_address: self.eth_address,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swap_crypto::generate_keys_and_proof;

    fn sample_message() -> SendKeysMessage {
        let keys = generate_keys_and_proof().unwrap();
        SendKeysMessage::build(&keys, 3.33, Address::repeat_byte(0x11))
    }

    #[test]
    fn send_keys_verifies_and_roundtrips_via_json() {
        let msg = Message::SendKeys(sample_message());
        let json = serde_json::to_string(&msg).unwrap();
        let decoded: Message = serde_json::from_str(&json).unwrap();

        match decoded {
            Message::SendKeys(inner) => {
                let keys = inner.verify().unwrap();
                assert_eq!(keys.eth_address, Address::repeat_byte(0x11));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn verify_rejects_mismatched_spend_key() {
        let mut msg = sample_message();
        msg.public_spend_key = sample_message().public_spend_key;
        assert!(matches!(
            msg.verify(),
            Err(SwapError::KeyProofMismatch)
        ));
    }

    #[test]
    fn verify_rejects_empty_fields() {
        let mut msg = sample_message();
        msg.dleq_proof = String::new();
        assert!(matches!(msg.verify(), Err(SwapError::MissingKeys)));
    }

    #[test]
    fn expected_message_gates_dispatch() {
        let ready = Message::NotifyReady;
        assert!(ready.matches(ExpectedMessage::Ready));
        assert!(!ready.matches(ExpectedMessage::Keys));

        let claimed = Message::NotifyClaimed {
            tx_hash: "0xabc".to_string(),
        };
        assert!(claimed.matches(ExpectedMessage::None));
        assert!(!claimed.matches(ExpectedMessage::Ready));
    }
}
