//! Company snapshots.
//!
//! A snapshot captures state at a known stream sequence so hydration can skip
//! replaying the prefix. The log remains the source of truth: replay from the
//! snapshot's sequence must reconstruct identical state to a full replay.

use serde::{Deserialize, Serialize};

use crate::company::{Company, CompanyState};

/// Serialized state at a specific stream sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanySnapshot {
    pub state: CompanyState,
    pub sequence_number: u64,
}

/// Capture the aggregate's state at `sequence_number`.
pub fn snapshot(state: &CompanyState, sequence_number: u64) -> CompanySnapshot {
    CompanySnapshot {
        state: state.clone(),
        sequence_number,
    }
}

/// Rebuild an aggregate from a snapshot.
pub fn restore(snap: CompanySnapshot) -> Company {
    Company::from_snapshot(snap.state, snap.sequence_number)
}
