//! Client-side configuration, identity, and key storage.

mod config;
mod identity;
mod keystore;

pub use config::*;
pub use identity::*;
pub use keystore::*;
