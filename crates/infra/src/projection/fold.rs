//! Fold company events into the read-side directory.

use thiserror::Error;

use freightbook_company::{CompanyEvent, CompanyUpdated, FieldUpdate, COMPANY_AGGREGATE_TYPE};

use crate::event_log::PersistedEvent;
use crate::read_store::{CompanyRecord, FieldPatch, ReadStore, ReadStoreError};

/// Cursor namespace for the company directory projection.
pub const PROJECTION_NAME: &str = "company.directory";

#[derive(Debug, Error)]
pub enum ProjectionFoldError {
    #[error("stored event could not be decoded: {0}")]
    Decode(String),

    #[error(transparent)]
    Store(#[from] ReadStoreError),
}

/// The company directory fold.
///
/// Every branch is idempotent (insert-or-replace, blind field writes, delete
/// of a possibly-absent row), so redelivering an already-folded event leaves
/// the store unchanged.
pub struct CompanyProjection<R: ReadStore> {
    store: R,
}

impl<R: ReadStore> CompanyProjection<R> {
    pub fn new(store: R) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &R {
        &self.store
    }

    /// Fold one persisted event into the directory.
    ///
    /// Events of other aggregate types are skipped; decode failures are
    /// surfaced so the projector stalls instead of silently dropping data.
    pub fn apply(&self, persisted: &PersistedEvent) -> Result<(), ProjectionFoldError> {
        if persisted.aggregate_type != COMPANY_AGGREGATE_TYPE {
            return Ok(());
        }

        let event: CompanyEvent =
            serde_json::from_value(persisted.payload.clone()).map_err(|e| {
                ProjectionFoldError::Decode(format!(
                    "event {} ({}): {e}",
                    persisted.event_id, persisted.event_type
                ))
            })?;

        match event {
            CompanyEvent::Created(e) => {
                self.store.upsert(CompanyRecord {
                    company_id: e.company_id,
                    name: e.name,
                    tax_id: e.tax_id,
                    mc: e.mc,
                    company_type: e.company_type,
                    contacts: e.contacts.unwrap_or_default(),
                    locations: e.locations.unwrap_or_default(),
                })?;
            }
            CompanyEvent::Updated(e) => {
                let patches = Self::patches_for(&e);
                self.store.update_fields(e.company_id, &patches)?;
            }
            CompanyEvent::Deleted(e) => {
                self.store.delete(e.company_id)?;
            }
        }

        Ok(())
    }

    /// Translate field instructions into directory writes. `Keep` produces no
    /// patch at all.
    fn patches_for(e: &CompanyUpdated) -> Vec<FieldPatch> {
        let mut patches = vec![FieldPatch::Name(e.name.clone())];

        match &e.tax_id {
            FieldUpdate::Keep => {}
            FieldUpdate::Clear => patches.push(FieldPatch::TaxId(None)),
            FieldUpdate::Set(v) => patches.push(FieldPatch::TaxId(Some(v.clone()))),
        }
        match &e.mc {
            FieldUpdate::Keep => {}
            FieldUpdate::Clear => patches.push(FieldPatch::Mc(None)),
            FieldUpdate::Set(v) => patches.push(FieldPatch::Mc(Some(v.clone()))),
        }
        match &e.company_type {
            FieldUpdate::Keep => {}
            FieldUpdate::Clear => patches.push(FieldPatch::CompanyType(None)),
            FieldUpdate::Set(v) => patches.push(FieldPatch::CompanyType(Some(*v))),
        }
        match &e.contacts {
            FieldUpdate::Keep => {}
            FieldUpdate::Clear => patches.push(FieldPatch::Contacts(vec![])),
            FieldUpdate::Set(v) => patches.push(FieldPatch::Contacts(v.clone())),
        }
        match &e.locations {
            FieldUpdate::Keep => {}
            FieldUpdate::Clear => patches.push(FieldPatch::Locations(vec![])),
            FieldUpdate::Set(v) => patches.push(FieldPatch::Locations(v.clone())),
        }

        patches
    }
}
