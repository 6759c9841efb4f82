//! # Mixlink
//!
//! Client-side session correlation core for mix-network messaging.
//!
//! A mix-network client sends fixed-size blocks through a chain of mixes and
//! learns about everything asynchronously: connectivity changes, inbound
//! messages, acknowledgments for its own sends, and replies from its
//! provider's services. Mixlink turns that single event stream into:
//!
//! - **Acknowledgment tracking**: one-time decryption keys registered per send,
//!   claimed at most once, expired when the ack never comes
//! - **Key queries**: provider key lookups with a fixed timeout, correlated
//!   with their (possibly late, possibly lost) replies
//! - **An inbox**: FIFO delivery of decoded messages to blocking receivers
//! - **Connectivity waits**: broadcast of the next connectivity change
//!
//! Packet construction, decryption primitives and the PKI are supplied by a
//! [`Transport`](crate::core::Transport) implementation.
//!
//! ## Modules
//!
//! - [`core`]: Collaborator traits, constants, and error types
//! - [`crypto`]: Link keypair, public keys, acknowledgment keys
//! - [`correlation`]: Correlation identifiers and the claim table
//! - [`transport`]: Events and values crossing the transport seam
//! - [`client`]: Configuration, identities, key storage
//! - [`session`]: The dispatcher and the [`Session`](session::Session) façade
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use mixlink::prelude::*;
//!
//! let identity = SessionIdentity::new("bob", "mix", LinkKeypair::generate())?;
//! let session = Session::connect(identity, transport).await?;
//!
//! session.wait_to_connect().await?;
//! match session.query_key("alice@mix").await {
//!     Ok(()) => assert!(session.has_key("alice@mix")),
//!     Err(e) if e.is_timeout() => { /* the reply may still arrive */ }
//!     Err(e) => return Err(e.into()),
//! }
//! session.send("alice@mix", "mix", b"hello").await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod client;
pub mod core;
pub mod correlation;
pub mod crypto;
pub mod session;
pub mod transport;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::client::*;
    pub use crate::core::*;
    pub use crate::correlation::{MessageId, SurbId};
    pub use crate::crypto::*;
    pub use crate::session::*;
    pub use crate::transport::*;
}

// Re-export commonly used items at crate root
pub use crate::client::{Address, MemoryKeyStore, SessionConfig, SessionIdentity};
pub use crate::core::{KeyStore, SessionError, SessionResult, Transport, TransportError};
pub use crate::crypto::{LinkKeypair, PublicKey};
pub use crate::session::{InboundMessage, Received, Session, SessionState};
