//! Event dispatcher.
//!
//! The dispatcher task is the only reader of the transport's event stream and
//! the only owner of the two correlation tables. Callers reach it through a
//! command channel: a send or key query is handed to the task, which invokes
//! the transport primitive and registers the pending entry in one step. Any
//! event for that id is read from the event channel afterwards, so the entry
//! is always in place before it can be claimed.
//!
//! ```text
//!   Session ──Command──┐
//!                      ▼
//!   Transport ──Event──► Dispatcher ──► Inbox
//!                      │           ──► ConnectionSignal
//!                      │           ──► PendingQuery completion
//!                      └── sweep tick (expires stale entries)
//! ```

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use super::connection::ConnectionSignal;
use super::inbox::{InboundMessage, InboxSender};
use super::state::{Lifecycle, SessionState, wait_for_shutdown};
use super::stats::DispatchStats;
use crate::client::{Address, SessionConfig, SessionIdentity};
use crate::core::{KeyStore, SessionError, SessionResult, Transport};
use crate::correlation::{CorrelationTable, MessageId, SurbId};
use crate::crypto::AckKey;
use crate::transport::TransportEvent;

/// Request from the session façade to the dispatcher task.
#[derive(Debug)]
pub(crate) enum Command {
    /// Transmit a padded block and register its acknowledgment key.
    Send {
        recipient: String,
        provider: String,
        payload: Vec<u8>,
        reply: oneshot::Sender<SessionResult<SurbId>>,
    },
    /// Issue a key lookup and register its completion.
    Query {
        recipient: Address,
        completion: oneshot::Sender<SessionResult<()>>,
    },
}

/// An in-flight send awaiting its acknowledgment.
#[derive(Debug)]
struct PendingAck {
    key: AckKey,
    recipient: String,
}

/// An in-flight key query awaiting its reply.
#[derive(Debug)]
struct PendingQuery {
    recipient: Address,
    completion: oneshot::Sender<SessionResult<()>>,
}

/// Channels and shared state the dispatcher writes to.
#[derive(Debug, Clone)]
pub(crate) struct Sinks {
    pub inbox: InboxSender,
    pub connection: ConnectionSignal,
    pub lifecycle: Lifecycle,
    pub stats: Arc<DispatchStats>,
}

pub(crate) struct Dispatcher {
    identity: Arc<SessionIdentity>,
    config: SessionConfig,
    transport: Arc<dyn Transport>,
    key_store: Arc<dyn KeyStore>,
    pending_acks: CorrelationTable<SurbId, PendingAck>,
    pending_queries: CorrelationTable<MessageId, PendingQuery>,
    sinks: Sinks,
}

impl Dispatcher {
    pub(crate) fn new(
        identity: Arc<SessionIdentity>,
        config: SessionConfig,
        transport: Arc<dyn Transport>,
        key_store: Arc<dyn KeyStore>,
        sinks: Sinks,
    ) -> Self {
        Self {
            identity,
            config,
            transport,
            key_store,
            pending_acks: CorrelationTable::new("pending_acks"),
            pending_queries: CorrelationTable::new("pending_queries"),
            sinks,
        }
    }

    /// Run until shutdown or until the session drops its command channel.
    pub(crate) async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<TransportEvent>,
        mut commands: mpsc::UnboundedReceiver<Command>,
    ) {
        let shutdown = wait_for_shutdown(self.sinks.lifecycle.watch());
        tokio::pin!(shutdown);

        let period = self.config.sweep_interval;
        let mut sweep = tokio::time::interval_at(Instant::now() + period, period);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut events_open = true;
        debug!(address = %self.identity.address(), "dispatcher started");

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => break,

                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },

                event = events.recv(), if events_open => match event {
                    Some(event) => self.handle_event(event),
                    None => {
                        debug!("transport event stream closed");
                        events_open = false;
                    }
                },

                _ = sweep.tick() => self.sweep(Instant::now()),
            }
        }

        self.teardown();
    }

    // =========================================================================
    // Commands
    // =========================================================================

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Send {
                recipient,
                provider,
                payload,
                reply,
            } => {
                let result = self.handle_send(&recipient, &provider, &payload);
                if reply.send(result).is_err() {
                    trace!("send caller went away before the result");
                }
            }
            Command::Query {
                recipient,
                completion,
            } => self.handle_query(recipient, completion),
        }
    }

    fn handle_send(
        &mut self,
        recipient: &str,
        provider: &str,
        payload: &[u8],
    ) -> SessionResult<SurbId> {
        let mut surb_id = SurbId::generate();
        while self.pending_acks.contains(&surb_id) {
            surb_id = SurbId::generate();
        }

        let sent = self
            .transport
            .send_ciphertext(recipient, provider, &surb_id, payload)?;

        let pending = PendingAck {
            key: sent.ack_key,
            recipient: recipient.to_string(),
        };
        // Duplicates are logged by the table; the id was checked above.
        let _ = self.pending_acks.put(surb_id, pending);

        debug!(
            %surb_id,
            recipient,
            provider,
            delivery_id = %hex::encode(&sent.delivery_id),
            "sent block, awaiting ack"
        );
        Ok(surb_id)
    }

    fn handle_query(
        &mut self,
        recipient: Address,
        completion: oneshot::Sender<SessionResult<()>>,
    ) {
        let sent = match self.transport.query_key(&recipient) {
            Ok(sent) => sent,
            Err(err) => {
                warn!(%recipient, error = %err, "key query rejected by transport");
                let _ = completion.send(Err(err.into()));
                return;
            }
        };

        let query_id = sent.message_id;
        if self.pending_queries.contains(&query_id) {
            warn!(%query_id, %recipient, "key query id already pending");
            let _ = completion.send(Err(SessionError::QueryFailed(format!(
                "query id {} already pending",
                query_id
            ))));
            return;
        }

        if let Some(key) = sent.ack_key {
            let surb_id = SurbId::from_bytes(*query_id.as_bytes());
            let pending = PendingAck {
                key,
                recipient: recipient.to_string(),
            };
            let _ = self.pending_acks.put(surb_id, pending);
        }

        debug!(%query_id, %recipient, "key query sent");
        let _ = self.pending_queries.put(
            query_id,
            PendingQuery {
                recipient,
                completion,
            },
        );
    }

    // =========================================================================
    // Events
    // =========================================================================

    fn handle_event(&mut self, event: TransportEvent) {
        trace!(kind = event.kind(), "dispatching event");
        match event {
            TransportEvent::ConnectionStatus { is_connected } => {
                self.handle_connection_status(is_connected)
            }
            TransportEvent::MessageReceived {
                sender,
                message_id,
                ciphertext,
            } => self.handle_message(sender, message_id, &ciphertext),
            TransportEvent::AckReceived { surb_id, payload } => self.handle_ack(&surb_id, &payload),
            TransportEvent::ServiceReply {
                message_id,
                payload,
                error,
            } => self.handle_service_reply(&message_id, &payload, error),
            TransportEvent::Other { kind } => {
                debug!(%kind, "ignoring unhandled event");
                self.sinks.stats.event_ignored();
            }
        }
    }

    fn handle_connection_status(&mut self, is_connected: bool) {
        let next = if is_connected {
            SessionState::Connected
        } else {
            SessionState::Disconnected
        };
        if !self.sinks.lifecycle.transition(next) {
            debug!(state = ?self.sinks.lifecycle.current(), ?next, "connectivity signal left state unchanged");
        }
        let waiters = self.sinks.connection.publish(is_connected);
        info!(is_connected, waiters, "connectivity changed");
    }

    fn handle_message(&mut self, sender: String, message_id: Vec<u8>, ciphertext: &[u8]) {
        let block = match self
            .transport
            .decrypt_inbound_block(ciphertext, self.identity.link_key())
        {
            Ok(block) => block,
            Err(err) => {
                warn!(%sender, error = %err, "dropping undecryptable message");
                self.sinks.stats.message_dropped();
                return;
            }
        };

        debug!(%sender, len = block.payload.len(), "message received");
        let delivered = self.sinks.inbox.push(InboundMessage {
            sender,
            payload: block.payload,
            sender_key: block.sender_key,
            message_id,
        });
        if delivered {
            self.sinks.stats.message_delivered();
        }
    }

    fn handle_ack(&mut self, raw_id: &[u8], payload: &[u8]) {
        let Some(surb_id) = SurbId::truncate_from(raw_id) else {
            debug!(len = raw_id.len(), "ack with short surb id, dropping");
            self.sinks.stats.ack_unmatched();
            return;
        };
        let Some(pending) = self.pending_acks.claim(&surb_id) else {
            debug!(%surb_id, "unmatched ack, dropping");
            self.sinks.stats.ack_unmatched();
            return;
        };
        self.sinks.stats.ack_matched();

        let decrypted = self.transport.decrypt_reply_payload(payload, &pending.key);
        let query_id = MessageId::from_bytes(*surb_id.as_bytes());

        if let Some(query) = self.pending_queries.claim(&query_id) {
            let result = decrypted
                .map_err(SessionError::from)
                .and_then(|plaintext| self.resolve_key_reply(&query.recipient, &plaintext));
            self.complete_query(query_id, query, result);
            return;
        }

        match decrypted {
            Ok(plaintext) if plaintext.iter().all(|b| *b == 0) => {
                debug!(%surb_id, recipient = %pending.recipient, "ack: {} bytes of 0x00", plaintext.len());
            }
            Ok(plaintext) => {
                trace!(%surb_id, recipient = %pending.recipient, payload = %hex::encode(&plaintext), "ack");
            }
            Err(err) => {
                warn!(%surb_id, error = %err, "failed to decrypt ack payload");
            }
        }
    }

    fn handle_service_reply(&mut self, raw_id: &[u8], payload: &[u8], error: Option<String>) {
        let Some(query_id) = MessageId::truncate_from(raw_id) else {
            debug!(len = raw_id.len(), "service reply with short message id, dropping");
            return;
        };
        let Some(query) = self.pending_queries.claim(&query_id) else {
            debug!(%query_id, "unmatched service reply, dropping");
            return;
        };
        // A reply may also have registered a SURB under the same bytes.
        let _ = self
            .pending_acks
            .claim(&SurbId::from_bytes(*query_id.as_bytes()));

        let result = match error {
            Some(err) => Err(SessionError::QueryFailed(err)),
            None => self.resolve_key_reply(&query.recipient, payload),
        };
        self.complete_query(query_id, query, result);
    }

    /// Validate a key lookup reply and store the key.
    fn resolve_key_reply(&self, recipient: &Address, payload: &[u8]) -> SessionResult<()> {
        let reply = self.transport.parse_key_query_response(payload)?;
        if reply.user.to_lowercase() != recipient.user() {
            return Err(SessionError::QueryFailed(format!(
                "reply is for user {:?}, queried {:?}",
                reply.user,
                recipient.user()
            )));
        }
        self.key_store.set_recipient(&recipient.to_string(), reply.key)?;
        info!(%recipient, key = %reply.key, "recipient key stored");
        Ok(())
    }

    fn complete_query(&self, query_id: MessageId, query: PendingQuery, result: SessionResult<()>) {
        self.sinks.stats.query_completed();
        if let Err(err) = &result {
            debug!(%query_id, recipient = %query.recipient, error = %err, "key query failed");
        }
        if query.completion.send(result).is_err() {
            debug!(%query_id, "key query caller no longer waiting");
        }
    }

    // =========================================================================
    // Expiry
    // =========================================================================

    fn sweep(&mut self, now: Instant) {
        let acks = self.pending_acks.sweep_expired(now, self.config.ack_ttl);
        for (surb_id, ack) in &acks {
            debug!(%surb_id, recipient = %ack.recipient, "pending ack expired");
        }
        self.sinks.stats.acks_expired(acks.len());

        let ttl = self.config.query_ttl;
        let queries = self.pending_queries.sweep_expired(now, ttl);
        self.sinks.stats.queries_expired(queries.len());
        for (query_id, query) in queries {
            debug!(%query_id, recipient = %query.recipient, "pending query expired");
            let _ = self
                .pending_acks
                .claim(&SurbId::from_bytes(*query_id.as_bytes()));
            let _ = query.completion.send(Err(SessionError::Timeout(ttl)));
        }
    }

    fn teardown(&mut self) {
        self.sinks.lifecycle.transition(SessionState::ShutDown);

        let queries = self.pending_queries.drain();
        let released = queries.len();
        for (_, query) in queries {
            let _ = query.completion.send(Err(SessionError::Shutdown));
        }
        let discarded = self.pending_acks.drain().len();

        info!(
            pending_queries = released,
            pending_acks = discarded,
            "dispatcher stopped"
        );
    }

    #[cfg(test)]
    fn pending_acks_len(&self) -> usize {
        self.pending_acks.len()
    }

    #[cfg(test)]
    fn pending_queries_len(&self) -> usize {
        self.pending_queries.len()
    }
}
