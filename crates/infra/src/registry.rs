//! Registry of live company runtimes.
//!
//! Guarantees at most one runtime (and therefore one writer) per company id
//! within this process. Runtimes are created lazily on first use and can be
//! evicted at any time; a fresh runtime rehydrates from the log.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use freightbook_core::CompanyId;

use crate::config::ServiceConfig;
use crate::event_log::EventLog;
use crate::runtime::CompanyRuntime;
use crate::snapshot_store::SnapshotStore;

pub struct CompanyRegistry<L: EventLog + Clone> {
    log: L,
    snapshots: Option<Arc<dyn SnapshotStore>>,
    snapshot_every: Option<u64>,
    runtimes: Mutex<HashMap<CompanyId, Arc<CompanyRuntime<L>>>>,
}

impl<L: EventLog + Clone> CompanyRegistry<L> {
    pub fn new(log: L) -> Self {
        Self {
            log,
            snapshots: None,
            snapshot_every: None,
            runtimes: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_snapshots(mut self, store: Arc<dyn SnapshotStore>, every: u64) -> Self {
        self.snapshots = Some(store);
        self.snapshot_every = Some(every);
        self
    }

    /// Apply the configured snapshot policy. A `None` interval leaves
    /// snapshotting disabled and the store unused.
    pub fn with_snapshot_policy(self, store: Arc<dyn SnapshotStore>, config: &ServiceConfig) -> Self {
        match config.snapshot_every {
            Some(every) => self.with_snapshots(store, every),
            None => self,
        }
    }

    /// Get the runtime for `id`, creating it on first use.
    ///
    /// Creation happens under the registry lock, so two concurrent callers
    /// always receive the same instance.
    pub fn runtime_for(&self, id: CompanyId) -> Arc<CompanyRuntime<L>> {
        let mut runtimes = self.runtimes.lock().unwrap_or_else(|p| p.into_inner());
        Arc::clone(runtimes.entry(id).or_insert_with(|| {
            let mut runtime = CompanyRuntime::new(id, self.log.clone());
            if let (Some(store), Some(every)) = (self.snapshots.as_ref(), self.snapshot_every) {
                runtime = runtime.with_snapshots(Arc::clone(store), every);
            }
            Arc::new(runtime)
        }))
    }

    /// Drop the cached runtime for `id`.
    ///
    /// Safe at any time: the next command rehydrates from the log. Callers
    /// holding the old `Arc` keep a working runtime; only the cache forgets.
    pub fn evict(&self, id: CompanyId) {
        let mut runtimes = self.runtimes.lock().unwrap_or_else(|p| p.into_inner());
        runtimes.remove(&id);
    }

    pub fn live_count(&self) -> usize {
        let runtimes = self.runtimes.lock().unwrap_or_else(|p| p.into_inner());
        runtimes.len()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use freightbook_company::{CompanyCommand, CreateCompany};

    use super::*;
    use crate::event_log::InMemoryEventLog;

    fn create_cmd(name: &str) -> CompanyCommand {
        CompanyCommand::Create(CreateCompany {
            name: name.to_string(),
            tax_id: None,
            mc: None,
            company_type: None,
            contacts: None,
            locations: None,
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn same_id_yields_the_same_runtime() {
        let registry = CompanyRegistry::new(Arc::new(InMemoryEventLog::default()));
        let id = CompanyId::new();

        let a = registry.runtime_for(id);
        let b = registry.runtime_for(id);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.live_count(), 1);

        let other = registry.runtime_for(CompanyId::new());
        assert!(!Arc::ptr_eq(&a, &other));
        assert_eq!(registry.live_count(), 2);
    }

    #[test]
    fn evicted_runtime_rehydrates_from_the_log() {
        let registry = CompanyRegistry::new(Arc::new(InMemoryEventLog::default()));
        let id = CompanyId::new();

        registry.runtime_for(id).submit(create_cmd("Acme")).unwrap();
        registry.evict(id);
        assert_eq!(registry.live_count(), 0);

        let state = registry
            .runtime_for(id)
            .submit(CompanyCommand::GetInformation)
            .unwrap()
            .into_state()
            .unwrap();
        assert_eq!(state.name, "Acme");
    }
}
