//! Transport seam.
//!
//! The mix-network transport is an external collaborator: it builds and
//! decrypts packets and talks to the PKI. This module holds the types that
//! cross the seam. The [`Transport`](crate::core::Transport) trait itself
//! lives in [`core`](crate::core).
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            Session façade               │
//! ├─────────────────────────────────────────┤
//! │          Event dispatcher               │
//! ├─────────────────────────────────────────┤
//! │    Transport seam (events, results)     │  ← This module
//! ├─────────────────────────────────────────┤
//! │       Mix-network transport / PKI       │
//! └─────────────────────────────────────────┘
//! ```

mod event;
#[cfg(test)]
pub(crate) mod mock;

pub use event::*;
