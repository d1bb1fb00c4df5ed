//! Company aggregate: commands, events, state machine, snapshots.
//!
//! A company is the unit of consistency: all commands against one id are
//! applied as ordered, atomic events, and current state is derivable purely
//! by replaying those events from sequence zero.

pub mod company;
pub mod snapshot;
pub mod update;
pub mod values;

pub use company::{
    Company, CompanyCommand, CompanyCreated, CompanyDeleted, CompanyEvent, CompanyLifecycle,
    CompanyState, CompanyUpdated, CreateCompany, DeleteCompany, UpdateCompany,
    COMPANY_AGGREGATE_TYPE,
};
pub use snapshot::{restore, snapshot, CompanySnapshot};
pub use update::FieldUpdate;
pub use values::{Address, CompanyType, Contact, ContactInfo, ContactInfoType, Location};
