//! Session configuration.

use std::time::Duration;

use crate::core::{
    DEFAULT_ACK_TTL, DEFAULT_BLOCK_LENGTH, DEFAULT_SWEEP_INTERVAL, KEY_QUERY_TIMEOUT,
    SessionError,
};

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long `query_key` waits for the provider's reply.
    pub key_query_timeout: Duration,

    /// Age after which an unclaimed acknowledgment key is discarded.
    pub ack_ttl: Duration,

    /// Age after which a pending query is expired with a timeout.
    ///
    /// Must not be shorter than `key_query_timeout`.
    pub query_ttl: Duration,

    /// Interval of the dispatcher's expiry sweep.
    pub sweep_interval: Duration,

    /// Ciphertext block length outgoing payloads are padded to.
    pub block_length: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            key_query_timeout: KEY_QUERY_TIMEOUT,
            ack_ttl: DEFAULT_ACK_TTL,
            query_ttl: KEY_QUERY_TIMEOUT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            block_length: DEFAULT_BLOCK_LENGTH,
        }
    }
}

impl SessionConfig {
    /// Start a builder from the defaults.
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::new()
    }

    /// Check the configuration for values the session cannot run with.
    pub fn validate(&self) -> Result<(), SessionError> {
        let durations = [
            ("key_query_timeout", self.key_query_timeout),
            ("ack_ttl", self.ack_ttl),
            ("query_ttl", self.query_ttl),
            ("sweep_interval", self.sweep_interval),
        ];
        if let Some((name, _)) = durations.iter().find(|(_, d)| d.is_zero()) {
            return Err(SessionError::Config(format!("{} must be non-zero", name)));
        }
        if self.block_length == 0 {
            return Err(SessionError::Config("block_length must be non-zero".into()));
        }
        if self.query_ttl < self.key_query_timeout {
            return Err(SessionError::Config(format!(
                "query_ttl ({:?}) is shorter than key_query_timeout ({:?})",
                self.query_ttl, self.key_query_timeout
            )));
        }
        Ok(())
    }
}

/// Builder for [`SessionConfig`].
#[derive(Debug)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
    query_ttl_set: bool,
}

impl SessionConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self {
            config: SessionConfig::default(),
            query_ttl_set: false,
        }
    }

    /// Set the key query timeout.
    ///
    /// Unless set explicitly, the query TTL follows this value.
    pub fn key_query_timeout(mut self, timeout: Duration) -> Self {
        self.config.key_query_timeout = timeout;
        if !self.query_ttl_set {
            self.config.query_ttl = timeout;
        }
        self
    }

    /// Set the acknowledgment key TTL.
    pub fn ack_ttl(mut self, ttl: Duration) -> Self {
        self.config.ack_ttl = ttl;
        self
    }

    /// Set the pending query TTL.
    pub fn query_ttl(mut self, ttl: Duration) -> Self {
        self.config.query_ttl = ttl;
        self.query_ttl_set = true;
        self
    }

    /// Set the expiry sweep interval.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    /// Set the block length.
    pub fn block_length(mut self, len: usize) -> Self {
        self.config.block_length = len;
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<SessionConfig, SessionError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for SessionConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
