//! Collaborator traits.
//!
//! The session core drives two external collaborators: the mix-network
//! transport (packet construction, decryption primitives, PKI) and the key
//! store that remembers correspondents' public keys.

use crate::client::{Address, SessionIdentity};
use crate::correlation::SurbId;
use crate::crypto::{AckKey, LinkKeypair, PublicKey};
use crate::transport::{EventSink, InboundBlock, KeyQueryResponse, SentCiphertext, SentQuery};

use super::error::{KeyStoreError, TransportError};

/// The mix-network transport.
///
/// All methods are called from the dispatcher task or from the session
/// façade and MUST NOT block for network round trips: sends enqueue and
/// return, and results come back as [`TransportEvent`](crate::transport::TransportEvent)s
/// through the [`EventSink`] handed to [`connect`](Transport::connect).
pub trait Transport: Send + Sync + 'static {
    /// Start the link handshake for `identity`.
    ///
    /// The transport keeps `events` and pushes every subsequent event into it
    /// in arrival order.
    fn connect(&self, identity: &SessionIdentity, events: EventSink) -> Result<(), TransportError>;

    /// Send `payload` with a SURB identified by `surb_id` attached.
    fn send_ciphertext(
        &self,
        recipient: &str,
        provider: &str,
        surb_id: &SurbId,
        payload: &[u8],
    ) -> Result<SentCiphertext, TransportError>;

    /// Send `payload` without requesting an acknowledgment.
    fn send_unreliable(
        &self,
        recipient: &str,
        provider: &str,
        payload: &[u8],
    ) -> Result<(), TransportError>;

    /// Decrypt an acknowledgment payload with its one-time key.
    fn decrypt_reply_payload(&self, ciphertext: &[u8], key: &AckKey) -> Result<Vec<u8>, TransportError>;

    /// Decrypt an inbound block with the session's private key.
    fn decrypt_inbound_block(
        &self,
        ciphertext: &[u8],
        private_key: &LinkKeypair,
    ) -> Result<InboundBlock, TransportError>;

    /// Send a key lookup for `recipient` to its provider.
    ///
    /// The reply arrives either as a service reply carrying the returned
    /// message id, or, when the transport returns an acknowledgment key, as
    /// an acknowledgment whose SURB id has the same bytes.
    fn query_key(&self, recipient: &Address) -> Result<SentQuery, TransportError>;

    /// Decode a key lookup reply payload.
    fn parse_key_query_response(&self, payload: &[u8]) -> Result<KeyQueryResponse, TransportError>;

    /// Names of the providers in the current PKI document.
    fn list_providers(&self) -> Result<Vec<String>, TransportError>;

    /// Tear down the link. No events are emitted afterwards.
    fn shutdown(&self);
}

/// Storage for correspondents' public keys.
pub trait KeyStore: Send + Sync + 'static {
    /// Remember `key` for `address`, replacing any previous key.
    fn set_recipient(&self, address: &str, key: PublicKey) -> Result<(), KeyStoreError>;

    /// Look up the key for `address`.
    fn get_recipient(&self, address: &str) -> Option<PublicKey>;

    /// Whether a key is known for `address`.
    fn has_recipient(&self, address: &str) -> bool {
        self.get_recipient(address).is_some()
    }
}
