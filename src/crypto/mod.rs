//! Key material for the session core.
//!
//! The cryptographic transforms themselves (packet and reply-block
//! decryption) live in the transport; this module only holds keys.

mod keys;

pub use keys::{AckKey, LinkKeypair, PublicKey};
