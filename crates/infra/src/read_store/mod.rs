//! Read-side company directory.
//!
//! The projector folds company events into these stores; the service queries
//! them. All write operations are idempotent so at-least-once delivery from
//! the projector is safe.

mod postgres;
mod store;

pub use postgres::PostgresReadStore;
pub use store::{
    CompanyRecord, FieldPatch, InMemoryReadStore, Page, ReadStore, ReadStoreError,
};
