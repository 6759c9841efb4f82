//! Events and values crossing the transport seam.

use tokio::sync::mpsc;

use crate::correlation::{MessageId, SurbId};
use crate::crypto::{AckKey, PublicKey};

/// An event emitted by the transport, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Link connectivity to the provider changed.
    ConnectionStatus {
        /// Whether the link is now up.
        is_connected: bool,
    },

    /// An encrypted message was fetched from the provider.
    MessageReceived {
        /// Sender handle as reported by the transport.
        sender: String,
        /// Transport-assigned message identifier.
        message_id: Vec<u8>,
        /// Encrypted inbound block.
        ciphertext: Vec<u8>,
    },

    /// A SURB acknowledgment arrived.
    AckReceived {
        /// SURB identifier; may be longer than [`SurbId::SIZE`].
        surb_id: Vec<u8>,
        /// Encrypted reply payload.
        payload: Vec<u8>,
    },

    /// A provider service replied to a query.
    ServiceReply {
        /// Identifier of the originating query; may be longer than [`MessageId::SIZE`].
        message_id: Vec<u8>,
        /// Reply payload, already decrypted by the transport.
        payload: Vec<u8>,
        /// Service-side error, if the query failed.
        error: Option<String>,
    },

    /// An event kind this core does not handle.
    Other {
        /// Event kind name, for logging.
        kind: String,
    },
}

impl TransportEvent {
    /// Short kind name for log output.
    pub fn kind(&self) -> &str {
        match self {
            TransportEvent::ConnectionStatus { .. } => "connection_status",
            TransportEvent::MessageReceived { .. } => "message_received",
            TransportEvent::AckReceived { .. } => "ack_received",
            TransportEvent::ServiceReply { .. } => "service_reply",
            TransportEvent::Other { kind } => kind.as_str(),
        }
    }
}

/// Handle the transport uses to deliver events to the session.
///
/// Cheap to clone; every clone feeds the same single-consumer queue.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<TransportEvent>,
}

impl EventSink {
    /// Create a sink and the receiver the dispatcher reads from.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Deliver an event.
    ///
    /// Returns `false` if the session is gone and the event was discarded.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Whether the receiving session has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Result of the transport's reliable send primitive.
#[derive(Debug, Clone)]
pub struct SentCiphertext {
    /// Key for decrypting the acknowledgment payload.
    pub ack_key: AckKey,
    /// Transport-assigned delivery identifier.
    pub delivery_id: Vec<u8>,
}

/// Result of the transport's key query primitive.
#[derive(Debug, Clone)]
pub struct SentQuery {
    /// Identifier the reply will carry.
    pub message_id: MessageId,
    /// Present when the reply comes back on a SURB keyed by `message_id`.
    pub ack_key: Option<AckKey>,
}

/// A decrypted inbound block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundBlock {
    /// Plaintext payload.
    pub payload: Vec<u8>,
    /// Sender's public key, when the block declares one.
    pub sender_key: Option<PublicKey>,
}

/// A parsed key lookup reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyQueryResponse {
    /// User handle the provider answered for.
    pub user: String,
    /// The user's public key.
    pub key: PublicKey,
}

/// Build an acknowledgment event from a typed SURB id.
impl From<(SurbId, Vec<u8>)> for TransportEvent {
    fn from((surb_id, payload): (SurbId, Vec<u8>)) -> Self {
        TransportEvent::AckReceived {
            surb_id: surb_id.as_bytes().to_vec(),
            payload,
        }
    }
}

impl TransportEvent {
    /// Build a service reply event for `message_id`.
    pub fn service_reply(message_id: MessageId, payload: Vec<u8>, error: Option<String>) -> Self {
        TransportEvent::ServiceReply {
            message_id: message_id.as_bytes().to_vec(),
            payload,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_delivers_in_order() {
        let (sink, mut rx) = EventSink::channel();
        assert!(sink.emit(TransportEvent::ConnectionStatus { is_connected: true }));
        assert!(sink.clone().emit(TransportEvent::ConnectionStatus { is_connected: false }));

        assert_eq!(
            rx.try_recv().unwrap(),
            TransportEvent::ConnectionStatus { is_connected: true }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            TransportEvent::ConnectionStatus { is_connected: false }
        );
    }

    #[test]
    fn test_sink_reports_closed_receiver() {
        let (sink, rx) = EventSink::channel();
        drop(rx);
        assert!(sink.is_closed());
        assert!(!sink.emit(TransportEvent::Other { kind: "x".into() }));
    }

    #[test]
    fn test_event_kind_names() {
        let ev: TransportEvent = (SurbId::generate(), vec![]).into();
        assert_eq!(ev.kind(), "ack_received");
        assert_eq!(TransportEvent::Other { kind: "pki".into() }.kind(), "pki");
    }
}
