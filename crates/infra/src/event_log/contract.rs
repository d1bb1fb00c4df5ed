use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use freightbook_core::{CompanyId, ExpectedVersion};
use freightbook_events::{Event, EventShards};

/// An event ready to be appended to a stream, not yet assigned a sequence
/// number or shard position. The log assigns both during append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingEvent {
    pub event_id: Uuid,
    pub company_id: CompanyId,
    pub aggregate_type: String,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

impl PendingEvent {
    /// Build a pending event from a typed domain event.
    ///
    /// Serializes the event to a JSON payload and captures the metadata
    /// needed to deserialize it again during replay.
    pub fn from_typed<E>(
        company_id: CompanyId,
        aggregate_type: impl Into<String>,
        event_id: Uuid,
        event: &E,
    ) -> Result<Self, EventLogError>
    where
        E: Event + Serialize,
    {
        let payload = serde_json::to_value(event).map_err(|e| {
            EventLogError::InvalidAppend(format!("payload serialization failed: {e}"))
        })?;

        Ok(Self {
            event_id,
            company_id,
            aggregate_type: aggregate_type.into(),
            event_type: event.event_type().to_string(),
            event_version: event.version(),
            occurred_at: event.occurred_at(),
            payload,
        })
    }
}

/// A durable event in the log.
///
/// `sequence_number` orders events within one company's stream (1, 2, 3, ...);
/// `shard_position` orders events within the shard journal the stream is
/// assigned to. Both are immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedEvent {
    pub event_id: Uuid,
    pub company_id: CompanyId,
    pub aggregate_type: String,

    /// Monotonically increasing position in the company's stream.
    pub sequence_number: u64,
    /// Shard this event was tagged with (a pure function of `company_id`).
    pub shard: u32,
    /// Monotonically increasing position within the shard journal.
    pub shard_position: u64,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

impl PersistedEvent {
    pub fn stream_version(&self) -> u64 {
        self.sequence_number
    }
}

/// Event log operation error.
#[derive(Debug, Error)]
pub enum EventLogError {
    /// Optimistic concurrency check failed (conditional append lost a race).
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    /// Invalid event data or stream state.
    #[error("invalid append: {0}")]
    InvalidAppend(String),

    /// The backing store could not be reached.
    #[error("event log unavailable: {0}")]
    Unavailable(String),
}

/// Append-only, sharded event log.
///
/// Events are organized into one stream per company id. Within a stream,
/// sequence numbers increase monotonically with no gaps; across streams, the
/// shard partitioner groups events into `[0, N)` journals so read-side
/// consumers can work in parallel while seeing each company's events in
/// order.
///
/// Implementations must:
/// - enforce optimistic concurrency against the current stream version
/// - assign sequence numbers starting at `current_version + 1`
/// - tag every event with `shards().shard_for(company_id)` and a
///   monotonically increasing position within that shard's journal
/// - persist a batch atomically (all events or none)
pub trait EventLog: Send + Sync {
    /// Shard space this log was created with. Fixed for the log's lifetime.
    fn shards(&self) -> EventShards;

    /// Conditionally append events to one company's stream.
    fn append(
        &self,
        events: Vec<PendingEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<PersistedEvent>, EventLogError>;

    /// Load the full stream for one company, in sequence order.
    ///
    /// Returns an empty vector if the stream does not exist yet.
    fn load_stream(&self, company_id: CompanyId) -> Result<Vec<PersistedEvent>, EventLogError>;

    /// Read up to `max` events from one shard journal, strictly after
    /// `after_position`, in shard order. Restartable from any position.
    fn read_shard(
        &self,
        shard: u32,
        after_position: u64,
        max: usize,
    ) -> Result<Vec<PersistedEvent>, EventLogError>;
}

impl<L> EventLog for Arc<L>
where
    L: EventLog + ?Sized,
{
    fn shards(&self) -> EventShards {
        (**self).shards()
    }

    fn append(
        &self,
        events: Vec<PendingEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<PersistedEvent>, EventLogError> {
        (**self).append(events, expected_version)
    }

    fn load_stream(&self, company_id: CompanyId) -> Result<Vec<PersistedEvent>, EventLogError> {
        (**self).load_stream(company_id)
    }

    fn read_shard(
        &self,
        shard: u32,
        after_position: u64,
        max: usize,
    ) -> Result<Vec<PersistedEvent>, EventLogError> {
        (**self).read_shard(shard, after_position, max)
    }
}
