//! In-memory transport for tests.
//!
//! Stands in for the mix network with trivially reversible "encryption":
//!
//! - ack key for a SURB is the SURB id reversed; an ack payload is the key
//!   followed by the plaintext.
//! - an inbound block is `ENC:` followed by the plaintext.
//! - a key lookup reply is `user:hexkey`.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::client::{Address, SessionIdentity};
use crate::core::{Transport, TransportError};
use crate::correlation::{MessageId, SurbId};
use crate::crypto::{AckKey, LinkKeypair, PublicKey};

use super::event::{
    EventSink, InboundBlock, KeyQueryResponse, SentCiphertext, SentQuery, TransportEvent,
};

const BLOCK_PREFIX: &[u8] = b"ENC:";

/// A recorded reliable send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SentRecord {
    pub recipient: String,
    pub provider: String,
    pub surb_id: SurbId,
    pub payload: Vec<u8>,
}

#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    sink: Mutex<Option<EventSink>>,
    sent: Mutex<Vec<SentRecord>>,
    unreliable: Mutex<Vec<(String, String, Vec<u8>)>>,
    queries: Mutex<Vec<(Address, MessageId)>>,
    fail_connect: AtomicBool,
    reject_sends: AtomicBool,
    query_via_surb: AtomicBool,
    shut_down: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Reject sends and key queries.
    pub fn set_reject_sends(&self, reject: bool) {
        self.reject_sends.store(reject, Ordering::SeqCst);
    }

    /// Answer key queries on a SURB instead of a service reply.
    pub fn set_query_via_surb(&self, via_surb: bool) {
        self.query_via_surb.store(via_surb, Ordering::SeqCst);
    }

    /// Push an event as if it came from the network.
    pub fn emit(&self, event: TransportEvent) -> bool {
        match self.sink.lock().unwrap().as_ref() {
            Some(sink) => sink.emit(event),
            None => false,
        }
    }

    pub fn sent(&self) -> Vec<SentRecord> {
        self.sent.lock().unwrap().clone()
    }

    pub fn unreliable(&self) -> Vec<(String, String, Vec<u8>)> {
        self.unreliable.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<(Address, MessageId)> {
        self.queries.lock().unwrap().clone()
    }

    pub fn last_query_id(&self) -> Option<MessageId> {
        self.queries.lock().unwrap().last().map(|(_, id)| *id)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    pub fn ack_key(surb_id: &SurbId) -> AckKey {
        let mut key = surb_id.as_bytes().to_vec();
        key.reverse();
        AckKey::new(key)
    }

    /// Build the ack payload the network would return for `surb_id`.
    pub fn seal_ack(surb_id: &SurbId, plaintext: &[u8]) -> Vec<u8> {
        let mut sealed = Self::ack_key(surb_id).as_bytes().to_vec();
        sealed.extend_from_slice(plaintext);
        sealed
    }

    pub fn seal_block(plaintext: &[u8]) -> Vec<u8> {
        [BLOCK_PREFIX, plaintext].concat()
    }

    pub fn key_reply(user: &str, key: &PublicKey) -> Vec<u8> {
        format!("{}:{}", user, key.to_hex()).into_bytes()
    }

    fn check_rejected(&self) -> Result<(), TransportError> {
        if self.reject_sends.load(Ordering::SeqCst) {
            return Err(TransportError::Rejected("mock transport refused".into()));
        }
        Ok(())
    }
}

impl Transport for MockTransport {
    fn connect(&self, _identity: &SessionIdentity, events: EventSink) -> Result<(), TransportError> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(TransportError::HandshakeFailed("mock provider refused link".into()));
        }
        *self.sink.lock().unwrap() = Some(events);
        Ok(())
    }

    fn send_ciphertext(
        &self,
        recipient: &str,
        provider: &str,
        surb_id: &SurbId,
        payload: &[u8],
    ) -> Result<SentCiphertext, TransportError> {
        self.check_rejected()?;
        self.sent.lock().unwrap().push(SentRecord {
            recipient: recipient.to_string(),
            provider: provider.to_string(),
            surb_id: *surb_id,
            payload: payload.to_vec(),
        });
        Ok(SentCiphertext {
            ack_key: Self::ack_key(surb_id),
            delivery_id: surb_id.as_bytes()[..4].to_vec(),
        })
    }

    fn send_unreliable(
        &self,
        recipient: &str,
        provider: &str,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        self.check_rejected()?;
        self.unreliable.lock().unwrap().push((
            recipient.to_string(),
            provider.to_string(),
            payload.to_vec(),
        ));
        Ok(())
    }

    fn decrypt_reply_payload(&self, ciphertext: &[u8], key: &AckKey) -> Result<Vec<u8>, TransportError> {
        ciphertext
            .strip_prefix(key.as_bytes())
            .map(<[u8]>::to_vec)
            .ok_or_else(|| TransportError::DecryptionFailed("ack key mismatch".into()))
    }

    fn decrypt_inbound_block(
        &self,
        ciphertext: &[u8],
        _private_key: &LinkKeypair,
    ) -> Result<InboundBlock, TransportError> {
        let payload = ciphertext
            .strip_prefix(BLOCK_PREFIX)
            .ok_or_else(|| TransportError::Malformed("missing block prefix".into()))?;
        Ok(InboundBlock {
            payload: payload.to_vec(),
            sender_key: None,
        })
    }

    fn query_key(&self, recipient: &Address) -> Result<SentQuery, TransportError> {
        self.check_rejected()?;
        let message_id = MessageId::generate();
        self.queries
            .lock()
            .unwrap()
            .push((recipient.clone(), message_id));
        let ack_key = self
            .query_via_surb
            .load(Ordering::SeqCst)
            .then(|| Self::ack_key(&SurbId::from_bytes(*message_id.as_bytes())));
        Ok(SentQuery {
            message_id,
            ack_key,
        })
    }

    fn parse_key_query_response(&self, payload: &[u8]) -> Result<KeyQueryResponse, TransportError> {
        let text = std::str::from_utf8(payload)
            .map_err(|_| TransportError::Malformed("key reply is not utf-8".into()))?;
        let (user, hex_key) = text
            .split_once(':')
            .ok_or_else(|| TransportError::Malformed("key reply missing separator".into()))?;
        let key = PublicKey::from_hex(hex_key)
            .map_err(|err| TransportError::Malformed(err.to_string()))?;
        Ok(KeyQueryResponse {
            user: user.to_string(),
            key,
        })
    }

    fn list_providers(&self) -> Result<Vec<String>, TransportError> {
        Ok(vec!["mix".to_string(), "panoramix.org".to_string()])
    }

    fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        self.sink.lock().unwrap().take();
    }
}
