//! Session identity and address parsing.
//!
//! A session is established as `user@provider` with a link keypair. Peers are
//! addressed the same way.

use std::fmt;
use std::str::FromStr;

use crate::core::SessionError;
use crate::crypto::LinkKeypair;

/// A correspondent's mix-network address, `user@provider`.
///
/// The user part is case-insensitive and stored lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    user: String,
    provider: String,
}

impl Address {
    /// Build an address from its parts.
    pub fn new(user: &str, provider: &str) -> Result<Self, SessionError> {
        validate_handle("user", user).map_err(SessionError::InvalidAddress)?;
        validate_handle("provider", provider).map_err(SessionError::InvalidAddress)?;
        Ok(Self {
            user: user.to_lowercase(),
            provider: provider.to_string(),
        })
    }

    /// Parse `user@provider`.
    pub fn parse(address: &str) -> Result<Self, SessionError> {
        match address.split_once('@') {
            Some((user, provider)) if !provider.contains('@') => Self::new(user, provider),
            _ => Err(SessionError::InvalidAddress(format!(
                "expected user@provider, got {:?}",
                address
            ))),
        }
    }

    /// User handle (lower-cased).
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Provider handle.
    pub fn provider(&self) -> &str {
        &self.provider
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user, self.provider)
    }
}

impl FromStr for Address {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// The negotiated identity of a session.
///
/// Immutable for the lifetime of the session.
#[derive(Clone)]
pub struct SessionIdentity {
    user: String,
    provider: String,
    link_key: LinkKeypair,
}

impl SessionIdentity {
    /// Create an identity, validating both handles.
    pub fn new(user: &str, provider: &str, link_key: LinkKeypair) -> Result<Self, SessionError> {
        validate_handle("user", user).map_err(SessionError::InvalidIdentity)?;
        validate_handle("provider", provider).map_err(SessionError::InvalidIdentity)?;
        Ok(Self {
            user: user.to_string(),
            provider: provider.to_string(),
            link_key,
        })
    }

    /// User handle.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Provider handle.
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Link keypair.
    pub fn link_key(&self) -> &LinkKeypair {
        &self.link_key
    }

    /// The identity as `user@provider`.
    pub fn address(&self) -> String {
        format!("{}@{}", self.user, self.provider)
    }
}

impl fmt::Debug for SessionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionIdentity")
            .field("user", &self.user)
            .field("provider", &self.provider)
            .field("link_key", &self.link_key.public_key())
            .finish()
    }
}

fn validate_handle(what: &str, handle: &str) -> Result<(), String> {
    if handle.is_empty() {
        return Err(format!("{} handle is empty", what));
    }
    if handle.contains('@') {
        return Err(format!("{} handle {:?} contains '@'", what, handle));
    }
    if handle.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(format!("{} handle {:?} contains whitespace", what, handle));
    }
    Ok(())
}
