//! Error types for the session core.

use std::time::Duration;

use thiserror::Error;

/// Errors reported by the transport collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The transport refused to send.
    #[error("send rejected: {0}")]
    Rejected(String),

    /// The link handshake with the provider failed.
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    /// A ciphertext could not be decrypted.
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// A decrypted payload did not have the expected shape.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// The PKI document is not available yet.
    #[error("PKI document unavailable")]
    PkiUnavailable,

    /// The transport has been shut down.
    #[error("transport closed")]
    Closed,
}

/// Errors in key material handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// Key string is not valid hex.
    #[error("invalid hex encoding: {0}")]
    InvalidHex(String),

    /// Key has the wrong number of bytes.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },
}

impl From<hex::FromHexError> for KeyError {
    fn from(err: hex::FromHexError) -> Self {
        KeyError::InvalidHex(err.to_string())
    }
}

/// Errors from correlation table operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CorrelationError {
    /// The identifier is already present in the table.
    #[error("duplicate correlation id {0}")]
    Duplicate(String),
}

/// Error returned by a [`KeyStore`](crate::core::KeyStore) implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct KeyStoreError(pub String);

/// Errors surfaced by [`Session`](crate::session::Session) operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Transport failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Key material failure.
    #[error("key error: {0}")]
    Key(#[from] KeyError),

    /// User or provider handle is not usable.
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// Address is not of the form `user@provider`.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Configuration rejected by validation.
    #[error("configuration error: {0}")]
    Config(String),

    /// Payload does not fit in one block.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Payload size.
        size: usize,
        /// Block length.
        max: usize,
    },

    /// The next connectivity signal reported "disconnected".
    #[error("not connected")]
    NotConnected,

    /// A provider service query failed.
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// The key store refused the update.
    #[error("key store error: {0}")]
    KeyStore(#[from] KeyStoreError),

    /// No reply arrived in time. The reply may still arrive later.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The session has been shut down.
    #[error("session shut down")]
    Shutdown,
}

impl SessionError {
    /// Returns `true` if this error is a timeout rather than a failure.
    pub fn is_timeout(&self) -> bool {
        matches!(self, SessionError::Timeout(_))
    }
}

/// Result alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
