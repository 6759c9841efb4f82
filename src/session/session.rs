//! Session façade.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::connection::ConnectionSignal;
use super::dispatcher::{Command, Dispatcher, Sinks};
use super::inbox::{Inbox, Received, inbox};
use super::state::{Lifecycle, SessionState, wait_for_shutdown};
use super::stats::{DispatchStats, StatsSnapshot};
use crate::client::{Address, MemoryKeyStore, SessionConfig, SessionIdentity};
use crate::core::{KeyStore, SessionError, SessionResult, Transport};
use crate::correlation::SurbId;
use crate::transport::EventSink;

/// A connected mix-network client session.
///
/// Every method takes `&self`; wrap the session in an [`Arc`] to share it
/// between tasks. Dropping the session shuts it down.
///
/// # Example
///
/// ```rust,ignore
/// let identity = SessionIdentity::new("bob", "mix", LinkKeypair::generate())?;
/// let session = Session::connect(identity, transport).await?;
///
/// session.wait_to_connect().await?;
/// session.query_key("alice@mix").await?;
/// session.send("alice@mix", "mix", b"hi").await?;
///
/// if let Received::Message(msg) = session.receive(Some(Duration::from_secs(5))).await? {
///     println!("{}: {:?}", msg.sender, msg.payload);
/// }
/// session.shutdown().await;
/// ```
pub struct Session {
    identity: Arc<SessionIdentity>,
    config: SessionConfig,
    transport: Arc<dyn Transport>,
    key_store: Arc<dyn KeyStore>,
    commands: mpsc::UnboundedSender<Command>,
    inbox: Inbox,
    connection: ConnectionSignal,
    lifecycle: Lifecycle,
    stats: Arc<DispatchStats>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    /// Establish a session with default configuration and an in-memory key store.
    pub async fn connect(
        identity: SessionIdentity,
        transport: Arc<dyn Transport>,
    ) -> SessionResult<Self> {
        Self::connect_with(
            identity,
            SessionConfig::default(),
            transport,
            Arc::new(MemoryKeyStore::new()),
        )
        .await
    }

    /// Establish a session.
    ///
    /// Starts the transport's link handshake and spawns the dispatcher. The
    /// session is in [`SessionState::Connecting`] until the transport reports
    /// connectivity; use [`wait_to_connect`](Self::wait_to_connect) to wait
    /// for it.
    pub async fn connect_with(
        identity: SessionIdentity,
        config: SessionConfig,
        transport: Arc<dyn Transport>,
        key_store: Arc<dyn KeyStore>,
    ) -> SessionResult<Self> {
        config.validate()?;

        let identity = Arc::new(identity);
        let lifecycle = Lifecycle::new();
        lifecycle.transition(SessionState::Connecting);

        let (sink, events) = EventSink::channel();
        if let Err(err) = transport.connect(&identity, sink) {
            warn!(address = %identity.address(), error = %err, "link handshake failed");
            lifecycle.transition(SessionState::ShutDown);
            return Err(err.into());
        }

        let (inbox_tx, inbox) = inbox();
        let connection = ConnectionSignal::new();
        let stats = Arc::new(DispatchStats::default());
        let (commands, commands_rx) = mpsc::unbounded_channel();

        let sinks = Sinks {
            inbox: inbox_tx,
            connection: connection.clone(),
            lifecycle: lifecycle.clone(),
            stats: stats.clone(),
        };
        let dispatcher = Dispatcher::new(
            identity.clone(),
            config.clone(),
            transport.clone(),
            key_store.clone(),
            sinks,
        );
        let handle = tokio::spawn(dispatcher.run(events, commands_rx));

        info!(address = %identity.address(), "session connecting");

        Ok(Self {
            identity,
            config,
            transport,
            key_store,
            commands,
            inbox,
            connection,
            lifecycle,
            stats,
            dispatcher: Mutex::new(Some(handle)),
        })
    }

    /// Send `payload` to `recipient` at `provider`, requesting an acknowledgment.
    ///
    /// Returns once the transport has accepted the block. The acknowledgment,
    /// if it ever arrives, is consumed by the dispatcher.
    pub async fn send(&self, recipient: &str, provider: &str, payload: &[u8]) -> SessionResult<SurbId> {
        self.ensure_open()?;
        check_destination(recipient, provider)?;
        let block = self.pad(payload)?;

        let (reply, result) = oneshot::channel();
        self.commands
            .send(Command::Send {
                recipient: recipient.to_string(),
                provider: provider.to_string(),
                payload: block,
                reply,
            })
            .map_err(|_| SessionError::Shutdown)?;

        result.await.unwrap_or(Err(SessionError::Shutdown))
    }

    /// Send `payload` without requesting an acknowledgment.
    pub fn send_unreliable(&self, recipient: &str, provider: &str, payload: &[u8]) -> SessionResult<()> {
        self.ensure_open()?;
        check_destination(recipient, provider)?;
        let block = self.pad(payload)?;
        self.transport.send_unreliable(recipient, provider, &block)?;
        debug!(recipient, provider, "sent block without ack");
        Ok(())
    }

    /// Pop the oldest inbound message.
    ///
    /// Waits indefinitely when `timeout` is `None` or zero; otherwise returns
    /// [`Received::Timeout`] once it elapses.
    pub async fn receive(&self, timeout: Option<Duration>) -> SessionResult<Received> {
        self.inbox.receive(timeout, self.lifecycle.watch()).await
    }

    /// Wait for the next connectivity signal.
    ///
    /// The waiter is registered when this method is called, not when the
    /// returned future is first polled. A signal published before the call is
    /// not observed.
    pub fn wait_to_connect(&self) -> impl Future<Output = SessionResult<()>> + Send + use<> {
        let waiter = self.connection.waiter();
        let lifecycle = self.lifecycle.watch();

        async move {
            tokio::select! {
                biased;
                _ = wait_for_shutdown(lifecycle) => Err(SessionError::Shutdown),
                signal = waiter.recv() => match signal {
                    Some(true) => Ok(()),
                    Some(false) => Err(SessionError::NotConnected),
                    None => Err(SessionError::Shutdown),
                },
            }
        }
    }

    /// Look up `recipient`'s public key with its provider.
    ///
    /// On success the key is in the key store. Returns
    /// [`SessionError::Timeout`] if no reply arrives within the configured
    /// key query timeout. A late reply still updates the key store until the
    /// dispatcher's expiry sweep drops the pending query after `query_ttl`.
    pub async fn query_key(&self, recipient: &str) -> SessionResult<()> {
        self.ensure_open()?;
        let recipient = Address::parse(recipient)?;

        let (completion, result) = oneshot::channel();
        self.commands
            .send(Command::Query {
                recipient: recipient.clone(),
                completion,
            })
            .map_err(|_| SessionError::Shutdown)?;

        let timeout = self.config.key_query_timeout;
        tokio::select! {
            biased;
            _ = wait_for_shutdown(self.lifecycle.watch()) => Err(SessionError::Shutdown),
            _ = tokio::time::sleep(timeout) => {
                debug!(%recipient, ?timeout, "key query timed out");
                Err(SessionError::Timeout(timeout))
            }
            outcome = result => outcome.unwrap_or(Err(SessionError::Shutdown)),
        }
    }

    /// Whether a key for `recipient` is in the key store.
    pub fn has_key(&self, recipient: &str) -> bool {
        match Address::parse(recipient) {
            Ok(address) => self.key_store.has_recipient(&address.to_string()),
            Err(_) => false,
        }
    }

    /// Providers listed in the current PKI document.
    pub fn list_providers(&self) -> SessionResult<Vec<String>> {
        self.ensure_open()?;
        Ok(self.transport.list_providers()?)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.lifecycle.current()
    }

    /// Session identity.
    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Dispatcher counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Tear down the session.
    ///
    /// Every blocked `receive`, `wait_to_connect` and `query_key` returns
    /// [`SessionError::Shutdown`]. Calling this more than once is harmless.
    pub async fn shutdown(&self) {
        if self.lifecycle.transition(SessionState::ShutDown) {
            info!(address = %self.identity.address(), "session shutting down");
            self.transport.shutdown();
        }

        let handle = self.dispatcher.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!(error = %err, "dispatcher task failed");
            }
        }
    }

    fn ensure_open(&self) -> SessionResult<()> {
        if self.lifecycle.current().permits_send() {
            Ok(())
        } else {
            Err(SessionError::Shutdown)
        }
    }

    /// Copy `payload` into a zero-filled block of the configured length.
    fn pad(&self, payload: &[u8]) -> SessionResult<Vec<u8>> {
        let max = self.config.block_length;
        if payload.len() > max {
            return Err(SessionError::PayloadTooLarge {
                size: payload.len(),
                max,
            });
        }
        let mut block = vec![0u8; max];
        block[..payload.len()].copy_from_slice(payload);
        Ok(block)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.lifecycle.transition(SessionState::ShutDown) {
            self.transport.shutdown();
        }
    }
}

fn check_destination(recipient: &str, provider: &str) -> SessionResult<()> {
    if recipient.is_empty() || provider.is_empty() {
        return Err(SessionError::InvalidAddress(
            "recipient and provider must be non-empty".into(),
        ));
    }
    Ok(())
}
