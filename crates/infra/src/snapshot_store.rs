//! Optional snapshot persistence for faster aggregate hydration.
//!
//! A snapshot is a pure optimization: losing one only means replaying the
//! stream from the beginning.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use freightbook_company::CompanySnapshot;
use freightbook_core::CompanyId;

pub trait SnapshotStore: Send + Sync {
    fn load(&self, company_id: CompanyId) -> Option<CompanySnapshot>;
    fn save(&self, company_id: CompanyId, snapshot: CompanySnapshot);
}

impl<S: SnapshotStore + ?Sized> SnapshotStore for Arc<S> {
    fn load(&self, company_id: CompanyId) -> Option<CompanySnapshot> {
        (**self).load(company_id)
    }

    fn save(&self, company_id: CompanyId, snapshot: CompanySnapshot) {
        (**self).save(company_id, snapshot)
    }
}

#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    inner: RwLock<HashMap<CompanyId, CompanySnapshot>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn load(&self, company_id: CompanyId) -> Option<CompanySnapshot> {
        let guard = self.inner.read().unwrap_or_else(|p| p.into_inner());
        guard.get(&company_id).cloned()
    }

    fn save(&self, company_id: CompanyId, snapshot: CompanySnapshot) {
        let mut guard = self.inner.write().unwrap_or_else(|p| p.into_inner());
        guard.insert(company_id, snapshot);
    }
}

#[cfg(test)]
mod tests {
    use freightbook_company::{snapshot, CompanyState};

    use super::*;

    #[test]
    fn save_then_load_round_trips() {
        let store = InMemorySnapshotStore::new();
        let id = CompanyId::new();
        let mut state = CompanyState::zero(id);
        state.name = "Acme".to_string();

        store.save(id, snapshot(&state, 3));
        let loaded = store.load(id).unwrap();
        assert_eq!(loaded.sequence_number, 3);
        assert_eq!(loaded.state.name, "Acme");

        assert!(store.load(CompanyId::new()).is_none());
    }
}
