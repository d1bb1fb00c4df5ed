//! `freightbook-infra` — infrastructure and application layer.
//!
//! Composes the company aggregate with an append-only event log, per-id
//! runtimes, and the sharded read-side projector that folds the log into a
//! queryable company directory.

pub mod config;
pub mod event_log;
pub mod projection;
pub mod read_store;
pub mod registry;
pub mod runtime;
pub mod service;
pub mod snapshot_store;
pub mod telemetry;


pub use config::ServiceConfig;
pub use event_log::{EventLog, EventLogError, InMemoryEventLog, PendingEvent, PersistedEvent};
pub use projection::{
    CompanyProjection, CursorError, CursorStore, InMemoryCursorStore, PostgresCursorStore,
    ProjectionFoldError, ProjectorConfig, ProjectorError, ProjectorHandle, ProjectorPool,
    ShardProjector, PROJECTION_NAME,
};
pub use read_store::{
    CompanyRecord, FieldPatch, InMemoryReadStore, Page, PostgresReadStore, ReadStore,
    ReadStoreError,
};
pub use registry::CompanyRegistry;
pub use runtime::{CommandError, CommandReply, CompanyRuntime};
pub use service::{CompanyPatch, CompanyPayload, CompanyService, ServiceError};
pub use snapshot_store::{InMemorySnapshotStore, SnapshotStore};
