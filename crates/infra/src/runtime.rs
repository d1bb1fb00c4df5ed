//! Per-company command runtime.
//!
//! One runtime instance owns one company aggregate. All commands for an id go
//! through its runtime's mutex, which serializes the handle → append → apply
//! cycle and makes the conditional append a second line of defence rather
//! than the primary ordering mechanism.

use std::sync::{Arc, Mutex};

use thiserror::Error;
use uuid::Uuid;

use freightbook_company::{
    restore, snapshot, Company, CompanyCommand, CompanyEvent, CompanyState,
    COMPANY_AGGREGATE_TYPE,
};
use freightbook_core::{Aggregate, AggregateRoot, CompanyId, DomainError, ExpectedVersion};

use crate::event_log::{EventLog, EventLogError, PendingEvent};
use crate::snapshot_store::SnapshotStore;

/// Successful command outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandReply {
    /// Current state after the command (creates, updates, reads).
    State(CompanyState),
    /// Bare acknowledgement (deletes).
    Ack,
}

impl CommandReply {
    pub fn into_state(self) -> Option<CompanyState> {
        match self {
            CommandReply::State(state) => Some(state),
            CommandReply::Ack => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A concurrent writer won the conditional append.
    #[error("command lost a concurrency race: {0}")]
    Conflict(String),

    #[error("event log error: {0}")]
    Log(EventLogError),

    /// A stored payload could not be decoded during hydration.
    #[error("stored event could not be decoded: {0}")]
    Deserialize(String),

    #[error("runtime unavailable: {0}")]
    Unavailable(String),
}

impl From<EventLogError> for CommandError {
    fn from(err: EventLogError) -> Self {
        match err {
            EventLogError::Concurrency(msg) => CommandError::Conflict(msg),
            other => CommandError::Log(other),
        }
    }
}

struct Inner {
    company: Company,
    hydrated: bool,
}

/// Owns one company aggregate and the write path to its stream.
pub struct CompanyRuntime<L: EventLog> {
    id: CompanyId,
    log: L,
    snapshots: Option<Arc<dyn SnapshotStore>>,
    snapshot_every: Option<u64>,
    inner: Mutex<Inner>,
}

impl<L: EventLog> CompanyRuntime<L> {
    pub fn new(id: CompanyId, log: L) -> Self {
        Self {
            id,
            log,
            snapshots: None,
            snapshot_every: None,
            inner: Mutex::new(Inner {
                company: Company::empty(id),
                hydrated: false,
            }),
        }
    }

    /// Enable snapshotting every `every` events.
    pub fn with_snapshots(mut self, store: Arc<dyn SnapshotStore>, every: u64) -> Self {
        self.snapshots = Some(store);
        self.snapshot_every = Some(every.max(1));
        self
    }

    pub fn id(&self) -> CompanyId {
        self.id
    }

    /// Replay the stream (from a snapshot if one exists) into the aggregate.
    fn hydrate(&self, inner: &mut Inner) -> Result<(), CommandError> {
        let mut company = match self.snapshots.as_ref().and_then(|s| s.load(self.id)) {
            Some(snap) => restore(snap),
            None => Company::empty(self.id),
        };

        let stream = self.log.load_stream(self.id)?;
        let mut expected_seq = company.version() + 1;

        for persisted in &stream {
            // Snapshot already covers this prefix.
            if persisted.sequence_number <= company.version() {
                continue;
            }
            if persisted.company_id != self.id {
                return Err(CommandError::Deserialize(format!(
                    "stream for {} contains event for {}",
                    self.id, persisted.company_id
                )));
            }
            if persisted.sequence_number != expected_seq {
                return Err(CommandError::Deserialize(format!(
                    "stream for {} has a gap: expected sequence {expected_seq}, found {}",
                    self.id, persisted.sequence_number
                )));
            }

            let event: CompanyEvent = serde_json::from_value(persisted.payload.clone())
                .map_err(|e| {
                    CommandError::Deserialize(format!(
                        "event {} ({}) for {}: {e}",
                        persisted.event_id, persisted.event_type, self.id
                    ))
                })?;

            company.apply(&event);
            expected_seq += 1;
        }

        inner.company = company;
        inner.hydrated = true;
        Ok(())
    }

    /// Run one command through the aggregate and persist its events.
    ///
    /// Returns the post-command state (or a bare ack for deletes). Emitted
    /// events are appended with `ExpectedVersion::Exact` so a concurrent
    /// writer on the same stream surfaces as `Conflict` instead of silently
    /// interleaving.
    pub fn submit(&self, command: CompanyCommand) -> Result<CommandReply, CommandError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| CommandError::Unavailable("runtime lock poisoned".to_string()))?;

        if !inner.hydrated {
            self.hydrate(&mut inner)?;
        }

        let events = inner.company.handle(&command)?;

        if !events.is_empty() {
            let expected = ExpectedVersion::Exact(inner.company.version());
            let mut pending = Vec::with_capacity(events.len());
            for event in &events {
                pending.push(PendingEvent::from_typed(
                    self.id,
                    COMPANY_AGGREGATE_TYPE,
                    Uuid::now_v7(),
                    event,
                )?);
            }

            self.log.append(pending, expected)?;

            for event in &events {
                inner.company.apply(event);
            }

            tracing::debug!(
                company_id = %self.id,
                events = events.len(),
                version = inner.company.version(),
                "persisted company events"
            );

            self.maybe_snapshot(&inner);
        }

        let reply = match command {
            CompanyCommand::Delete(_) => CommandReply::Ack,
            _ => CommandReply::State(inner.company.state().clone()),
        };
        Ok(reply)
    }

    fn maybe_snapshot(&self, inner: &Inner) {
        let (Some(store), Some(every)) = (self.snapshots.as_ref(), self.snapshot_every) else {
            return;
        };
        let version = inner.company.version();
        if version > 0 && version % every == 0 {
            store.save(self.id, snapshot(inner.company.state(), version));
            tracing::debug!(company_id = %self.id, version, "saved company snapshot");
        }
    }
}
