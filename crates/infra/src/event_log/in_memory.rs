use std::collections::HashMap;
use std::sync::RwLock;

use freightbook_core::{CompanyId, ExpectedVersion};
use freightbook_events::EventShards;

use super::contract::{EventLog, EventLogError, PendingEvent, PersistedEvent};

#[derive(Debug, Default)]
struct Journal {
    streams: HashMap<CompanyId, Vec<PersistedEvent>>,
    shards: Vec<Vec<PersistedEvent>>,
}

/// In-memory append-only event log.
///
/// Intended for tests/dev. Streams and shard journals are kept consistent
/// under one lock so an append is atomic with respect to both views.
#[derive(Debug)]
pub struct InMemoryEventLog {
    shard_space: EventShards,
    inner: RwLock<Journal>,
}

impl InMemoryEventLog {
    pub fn new(shard_space: EventShards) -> Self {
        Self {
            shard_space,
            inner: RwLock::new(Journal {
                streams: HashMap::new(),
                shards: (0..shard_space.num_shards()).map(|_| Vec::new()).collect(),
            }),
        }
    }

    fn current_version(stream: &[PersistedEvent]) -> u64 {
        stream.last().map(|e| e.sequence_number).unwrap_or(0)
    }
}

impl Default for InMemoryEventLog {
    fn default() -> Self {
        Self::new(EventShards::default())
    }
}

impl EventLog for InMemoryEventLog {
    fn shards(&self) -> EventShards {
        self.shard_space
    }

    fn append(
        &self,
        events: Vec<PendingEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<PersistedEvent>, EventLogError> {
        if events.is_empty() {
            return Ok(vec![]);
        }

        // All events must target the same company stream.
        let company_id = events[0].company_id;
        let aggregate_type = events[0].aggregate_type.clone();

        for (idx, e) in events.iter().enumerate() {
            if e.company_id != company_id {
                return Err(EventLogError::InvalidAppend(format!(
                    "batch contains multiple company_ids (index {idx})"
                )));
            }
            if e.aggregate_type != aggregate_type {
                return Err(EventLogError::InvalidAppend(format!(
                    "batch contains multiple aggregate_types (index {idx})"
                )));
            }
        }

        let shard = self.shard_space.shard_for(&company_id);

        let mut journal = self
            .inner
            .write()
            .map_err(|_| EventLogError::Unavailable("lock poisoned".to_string()))?;

        let current = journal
            .streams
            .get(&company_id)
            .map(|s| Self::current_version(s))
            .unwrap_or(0);

        if !expected_version.matches(current) {
            return Err(EventLogError::Concurrency(format!(
                "expected {expected_version:?}, found {current}"
            )));
        }

        // Assign stream sequence numbers and shard positions, then append to
        // both views (append-only).
        let mut next_seq = current + 1;
        let mut next_pos = journal.shards[shard as usize].len() as u64 + 1;
        let mut committed = Vec::with_capacity(events.len());

        for e in events {
            let persisted = PersistedEvent {
                event_id: e.event_id,
                company_id: e.company_id,
                aggregate_type: e.aggregate_type,
                sequence_number: next_seq,
                shard,
                shard_position: next_pos,
                event_type: e.event_type,
                event_version: e.event_version,
                occurred_at: e.occurred_at,
                payload: e.payload,
            };
            next_seq += 1;
            next_pos += 1;

            journal.shards[shard as usize].push(persisted.clone());
            journal
                .streams
                .entry(company_id)
                .or_default()
                .push(persisted.clone());
            committed.push(persisted);
        }

        Ok(committed)
    }

    fn load_stream(&self, company_id: CompanyId) -> Result<Vec<PersistedEvent>, EventLogError> {
        let journal = self
            .inner
            .read()
            .map_err(|_| EventLogError::Unavailable("lock poisoned".to_string()))?;

        Ok(journal.streams.get(&company_id).cloned().unwrap_or_default())
    }

    fn read_shard(
        &self,
        shard: u32,
        after_position: u64,
        max: usize,
    ) -> Result<Vec<PersistedEvent>, EventLogError> {
        if shard >= self.shard_space.num_shards() {
            return Err(EventLogError::InvalidAppend(format!(
                "shard {shard} out of range (num_shards={})",
                self.shard_space.num_shards()
            )));
        }

        let journal = self
            .inner
            .read()
            .map_err(|_| EventLogError::Unavailable("lock poisoned".to_string()))?;

        // Shard positions are contiguous from 1, so the offset is an index.
        let slice = &journal.shards[shard as usize];
        let start = (after_position as usize).min(slice.len());
        Ok(slice[start..].iter().take(max).cloned().collect())
    }
}
