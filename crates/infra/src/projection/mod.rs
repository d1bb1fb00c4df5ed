//! Read-side projection: fold company events into the directory.
//!
//! One worker per shard polls its shard journal, folds each event into the
//! read store, and only then advances a durable cursor. Delivery is therefore
//! at-least-once, which every fold tolerates by being idempotent.

mod cursor;
mod fold;
mod projector;

pub use cursor::{CursorError, CursorStore, InMemoryCursorStore, PostgresCursorStore};
pub use fold::{CompanyProjection, ProjectionFoldError, PROJECTION_NAME};
pub use projector::{
    ProjectorConfig, ProjectorError, ProjectorHandle, ProjectorPool, ShardProjector,
};
