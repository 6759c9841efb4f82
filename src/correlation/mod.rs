//! Correlation state: identifiers and the at-most-once claim table.
//!
//! Two tables are instantiated per session, both owned by the dispatcher:
//!
//! - acknowledgment keys, keyed by [`SurbId`]
//! - pending provider queries, keyed by [`MessageId`]

mod ids;
mod table;

pub use ids::{MessageId, SurbId};
pub use table::CorrelationTable;
