//! Session layer.
//!
//! A [`Session`] composes the transport with four pieces of state, all
//! written by a single dispatcher task:
//!
//! - the correlation tables for pending acknowledgments and key queries
//! - the inbox of decoded inbound messages
//! - the connectivity signal
//! - the lifecycle state, whose terminal state releases every waiter
//!
//! Callers only enqueue commands and wait on the results.

mod connection;
mod dispatcher;
mod inbox;
#[allow(clippy::module_inception)]
mod session;
mod state;
mod stats;

pub use connection::{ConnectionSignal, ConnectionWaiter};
pub use inbox::{InboundMessage, Received};
pub use session::Session;
pub use state::SessionState;
pub use stats::StatsSnapshot;
