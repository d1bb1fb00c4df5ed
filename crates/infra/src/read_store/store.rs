use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use freightbook_company::{CompanyType, Contact, Location};
use freightbook_core::CompanyId;

/// Denormalized company row in the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub company_id: CompanyId,
    pub name: String,
    pub tax_id: Option<String>,
    pub mc: Option<String>,
    pub company_type: Option<CompanyType>,
    pub contacts: Vec<Contact>,
    pub locations: Vec<Location>,
}

/// A single-field write, applied blindly (last write wins).
#[derive(Debug, Clone, PartialEq)]
pub enum FieldPatch {
    Name(String),
    TaxId(Option<String>),
    Mc(Option<String>),
    CompanyType(Option<CompanyType>),
    Contacts(Vec<Contact>),
    Locations(Vec<Location>),
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub records: Vec<T>,
    pub page_number: u32,
    pub page_size: u32,
    /// Total matching records across all pages.
    pub total: u64,
}

#[derive(Debug, Error)]
pub enum ReadStoreError {
    #[error("read store unavailable: {0}")]
    Unavailable(String),

    #[error("read store serialization error: {0}")]
    Serialization(String),
}

/// Queryable company directory.
///
/// `upsert`, `update_fields`, and `delete` must all be idempotent:
/// re-applying the same operation leaves the store unchanged.
pub trait ReadStore: Send + Sync {
    /// Create backing tables/indexes if they do not exist. Called once at
    /// projector startup, before any fold.
    fn ensure_indexes(&self) -> Result<(), ReadStoreError>;

    fn get(&self, company_id: CompanyId) -> Result<Option<CompanyRecord>, ReadStoreError>;

    /// Insert or fully replace a record.
    fn upsert(&self, record: CompanyRecord) -> Result<(), ReadStoreError>;

    /// Apply field patches to an existing record.
    ///
    /// A missing record is a no-op, not an error: the projector may replay
    /// an update for a company whose delete already folded.
    fn update_fields(
        &self,
        company_id: CompanyId,
        patches: &[FieldPatch],
    ) -> Result<(), ReadStoreError>;

    fn delete(&self, company_id: CompanyId) -> Result<(), ReadStoreError>;

    /// List records ordered by id. Page numbers 0 and 1 both mean the first
    /// page; pages past the end are empty.
    fn list(&self, page_number: u32, page_size: u32) -> Result<Page<CompanyRecord>, ReadStoreError>;
}

impl<S: ReadStore + ?Sized> ReadStore for Arc<S> {
    fn ensure_indexes(&self) -> Result<(), ReadStoreError> {
        (**self).ensure_indexes()
    }

    fn get(&self, company_id: CompanyId) -> Result<Option<CompanyRecord>, ReadStoreError> {
        (**self).get(company_id)
    }

    fn upsert(&self, record: CompanyRecord) -> Result<(), ReadStoreError> {
        (**self).upsert(record)
    }

    fn update_fields(
        &self,
        company_id: CompanyId,
        patches: &[FieldPatch],
    ) -> Result<(), ReadStoreError> {
        (**self).update_fields(company_id, patches)
    }

    fn delete(&self, company_id: CompanyId) -> Result<(), ReadStoreError> {
        (**self).delete(company_id)
    }

    fn list(&self, page_number: u32, page_size: u32) -> Result<Page<CompanyRecord>, ReadStoreError> {
        (**self).list(page_number, page_size)
    }
}

/// BTreeMap-backed directory for tests and dev; iteration order doubles as
/// the stable listing order.
#[derive(Debug, Default)]
pub struct InMemoryReadStore {
    inner: RwLock<BTreeMap<CompanyId, CompanyRecord>>,
}

impl InMemoryReadStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<CompanyId, CompanyRecord>>, ReadStoreError> {
        self.inner
            .read()
            .map_err(|_| ReadStoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, BTreeMap<CompanyId, CompanyRecord>>, ReadStoreError> {
        self.inner
            .write()
            .map_err(|_| ReadStoreError::Unavailable("lock poisoned".to_string()))
    }
}

impl ReadStore for InMemoryReadStore {
    fn ensure_indexes(&self) -> Result<(), ReadStoreError> {
        Ok(())
    }

    fn get(&self, company_id: CompanyId) -> Result<Option<CompanyRecord>, ReadStoreError> {
        Ok(self.read()?.get(&company_id).cloned())
    }

    fn upsert(&self, record: CompanyRecord) -> Result<(), ReadStoreError> {
        self.write()?.insert(record.company_id, record);
        Ok(())
    }

    fn update_fields(
        &self,
        company_id: CompanyId,
        patches: &[FieldPatch],
    ) -> Result<(), ReadStoreError> {
        let mut guard = self.write()?;
        let Some(record) = guard.get_mut(&company_id) else {
            return Ok(());
        };

        for patch in patches {
            match patch {
                FieldPatch::Name(name) => record.name = name.clone(),
                FieldPatch::TaxId(tax_id) => record.tax_id = tax_id.clone(),
                FieldPatch::Mc(mc) => record.mc = mc.clone(),
                FieldPatch::CompanyType(ct) => record.company_type = *ct,
                FieldPatch::Contacts(contacts) => record.contacts = contacts.clone(),
                FieldPatch::Locations(locations) => record.locations = locations.clone(),
            }
        }
        Ok(())
    }

    fn delete(&self, company_id: CompanyId) -> Result<(), ReadStoreError> {
        self.write()?.remove(&company_id);
        Ok(())
    }

    fn list(&self, page_number: u32, page_size: u32) -> Result<Page<CompanyRecord>, ReadStoreError> {
        let guard = self.read()?;
        let total = guard.len() as u64;
        // Page 0 and page 1 are both the first page.
        let skip = page_number.saturating_sub(1) as usize * page_size as usize;
        let records = guard
            .values()
            .skip(skip)
            .take(page_size as usize)
            .cloned()
            .collect();

        Ok(Page {
            records,
            page_number,
            page_size,
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> CompanyRecord {
        CompanyRecord {
            company_id: CompanyId::new(),
            name: name.to_string(),
            tax_id: Some("1111".to_string()),
            mc: None,
            company_type: Some(CompanyType::Carrier),
            contacts: vec![],
            locations: vec![],
        }
    }

    #[test]
    fn upsert_replaces_and_is_idempotent() {
        let store = InMemoryReadStore::new();
        let rec = record("Acme");
        let id = rec.company_id;

        store.upsert(rec.clone()).unwrap();
        store.upsert(rec.clone()).unwrap();
        assert_eq!(store.get(id).unwrap().unwrap(), rec);

        let mut replaced = rec.clone();
        replaced.name = "Acme-2".to_string();
        store.upsert(replaced.clone()).unwrap();
        assert_eq!(store.get(id).unwrap().unwrap(), replaced);
    }

    #[test]
    fn update_fields_patches_only_named_fields() {
        let store = InMemoryReadStore::new();
        let rec = record("Acme");
        let id = rec.company_id;
        store.upsert(rec).unwrap();

        store
            .update_fields(
                id,
                &[
                    FieldPatch::Name("Acme-2".to_string()),
                    FieldPatch::TaxId(None),
                ],
            )
            .unwrap();

        let got = store.get(id).unwrap().unwrap();
        assert_eq!(got.name, "Acme-2");
        assert_eq!(got.tax_id, None, "explicit clear");
        assert_eq!(got.company_type, Some(CompanyType::Carrier), "untouched");
    }

    #[test]
    fn update_fields_on_missing_record_is_a_no_op() {
        let store = InMemoryReadStore::new();
        store
            .update_fields(CompanyId::new(), &[FieldPatch::Name("ghost".to_string())])
            .unwrap();
    }

    #[test]
    fn delete_is_idempotent() {
        let store = InMemoryReadStore::new();
        let rec = record("Acme");
        let id = rec.company_id;
        store.upsert(rec).unwrap();

        store.delete(id).unwrap();
        assert!(store.get(id).unwrap().is_none());
        store.delete(id).unwrap();
    }

    #[test]
    fn listing_pages_are_stable_and_page_zero_equals_page_one() {
        let store = InMemoryReadStore::new();
        for i in 0..5 {
            store.upsert(record(&format!("Company {i}"))).unwrap();
        }

        let zero = store.list(0, 2).unwrap();
        let one = store.list(1, 2).unwrap();
        assert_eq!(zero.records, one.records);
        assert_eq!(one.records.len(), 2);
        assert_eq!(one.total, 5);

        let two = store.list(2, 2).unwrap();
        assert_eq!(two.records.len(), 2);
        assert!(one.records.iter().all(|r| !two.records.contains(r)));

        let three = store.list(3, 2).unwrap();
        assert_eq!(three.records.len(), 1);

        let past = store.list(9, 2).unwrap();
        assert!(past.records.is_empty());
        assert_eq!(past.total, 5);
    }
}
