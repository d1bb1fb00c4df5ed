//! Append-only company event log.
//!
//! The production log store is an external collaborator; this module defines
//! its contract (conditional append, per-stream replay, per-shard reads) and
//! ships an in-memory implementation for tests and development.

mod contract;
mod in_memory;

pub use contract::{EventLog, EventLogError, PendingEvent, PersistedEvent};
pub use in_memory::InMemoryEventLog;
