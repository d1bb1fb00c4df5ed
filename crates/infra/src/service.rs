//! Application service: the command/query boundary for companies.
//!
//! Writes go through the registry to a per-id runtime; listings come from the
//! read-side directory. Boundary policy (mandatory identifiers, default page
//! size) is enforced here so the aggregate stays policy-free and keeps
//! accepting historical streams written under older rules.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use freightbook_company::{
    CompanyCommand, CompanyState, CompanyType, Contact, CreateCompany, DeleteCompany, FieldUpdate,
    Location, UpdateCompany,
};
use freightbook_core::{CompanyId, DomainError};

use crate::config::ServiceConfig;
use crate::event_log::EventLog;
use crate::read_store::{CompanyRecord, Page, ReadStore, ReadStoreError};
use crate::registry::CompanyRegistry;
use crate::runtime::{CommandError, CommandReply};

/// Create request payload.
#[derive(Debug, Clone)]
pub struct CompanyPayload {
    pub name: String,
    pub tax_id: Option<String>,
    pub mc: Option<String>,
    pub company_type: Option<CompanyType>,
    pub contacts: Option<Vec<Contact>>,
    pub locations: Option<Vec<Location>>,
}

/// Update request payload. Absent instructions default to `Keep`.
#[derive(Debug, Clone, Default)]
pub struct CompanyPatch {
    pub name: String,
    pub tax_id: FieldUpdate<String>,
    pub mc: FieldUpdate<String>,
    pub company_type: FieldUpdate<CompanyType>,
    pub contacts: FieldUpdate<Vec<Contact>>,
    pub locations: FieldUpdate<Vec<Location>>,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation failed for '{field}': {message}")]
    Validation { field: String, message: String },

    /// The company does not exist (or no longer accepts this operation).
    #[error("company not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl ServiceError {
    fn validation(field: &str, message: &str) -> Self {
        ServiceError::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

impl From<CommandError> for ServiceError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Domain(DomainError::Validation { field, message }) => {
                ServiceError::Validation { field, message }
            }
            // A command the aggregate's current phase rejects looks, from the
            // outside, like the company not being there.
            CommandError::Domain(DomainError::UnhandledInState { .. })
            | CommandError::Domain(DomainError::NotFound) => ServiceError::NotFound,
            CommandError::Domain(DomainError::InvalidId(message)) => ServiceError::Validation {
                field: "id".to_string(),
                message,
            },
            CommandError::Domain(DomainError::Conflict(message))
            | CommandError::Conflict(message) => ServiceError::Conflict(message),
            CommandError::Log(e) => ServiceError::Unavailable(e.to_string()),
            CommandError::Deserialize(message) | CommandError::Unavailable(message) => {
                ServiceError::Unavailable(message)
            }
        }
    }
}

impl From<ReadStoreError> for ServiceError {
    fn from(err: ReadStoreError) -> Self {
        ServiceError::Unavailable(err.to_string())
    }
}

pub struct CompanyService<L: EventLog + Clone> {
    registry: CompanyRegistry<L>,
    read_store: Arc<dyn ReadStore>,
    config: ServiceConfig,
}

impl<L: EventLog + Clone> CompanyService<L> {
    pub fn new(
        registry: CompanyRegistry<L>,
        read_store: Arc<dyn ReadStore>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            registry,
            read_store,
            config,
        }
    }

    /// Create a company under a freshly generated id.
    pub fn create_company(&self, payload: CompanyPayload) -> Result<CompanyState, ServiceError> {
        if payload.name.trim().is_empty() {
            return Err(ServiceError::validation("name", "name cannot be empty"));
        }
        if self.config.require_tax_id && payload.tax_id.as_deref().map_or(true, str::is_empty) {
            return Err(ServiceError::validation("tax_id", "tax_id is mandatory"));
        }
        if self.config.require_mc && payload.mc.as_deref().map_or(true, str::is_empty) {
            return Err(ServiceError::validation("mc", "mc is mandatory"));
        }

        let id = CompanyId::new();
        let command = CompanyCommand::Create(CreateCompany {
            name: payload.name,
            tax_id: payload.tax_id,
            mc: payload.mc,
            company_type: payload.company_type,
            contacts: payload.contacts,
            locations: payload.locations,
            occurred_at: Utc::now(),
        });

        let state = self.submit_expecting_state(id, command)?;
        info!(company_id = %id, "company created");
        Ok(state)
    }

    /// Current state of one company, from its event stream.
    pub fn get_company(&self, id: CompanyId) -> Result<CompanyState, ServiceError> {
        self.submit_expecting_state(id, CompanyCommand::GetInformation)
    }

    pub fn update_company(
        &self,
        id: CompanyId,
        patch: CompanyPatch,
    ) -> Result<CompanyState, ServiceError> {
        if patch.name.trim().is_empty() {
            return Err(ServiceError::validation("name", "name cannot be empty"));
        }

        let command = CompanyCommand::Update(UpdateCompany {
            name: patch.name,
            tax_id: patch.tax_id,
            mc: patch.mc,
            company_type: patch.company_type,
            contacts: patch.contacts,
            locations: patch.locations,
            occurred_at: Utc::now(),
        });

        self.submit_expecting_state(id, command)
    }

    /// Delete a company. Succeeds if it was already deleted.
    pub fn delete_company(&self, id: CompanyId) -> Result<(), ServiceError> {
        let runtime = self.registry.runtime_for(id);
        runtime.submit(CompanyCommand::Delete(DeleteCompany {
            occurred_at: Utc::now(),
        }))?;

        // The terminal phase means the runtime will never emit again.
        self.registry.evict(id);
        info!(company_id = %id, "company deleted");
        Ok(())
    }

    /// Page through the read-side directory.
    pub fn list_companies(
        &self,
        page_number: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<Page<CompanyRecord>, ServiceError> {
        let page_number = page_number.unwrap_or(1);
        let page_size = page_size
            .filter(|n| *n > 0)
            .unwrap_or(self.config.default_page_size);

        Ok(self.read_store.list(page_number, page_size)?)
    }

    fn submit_expecting_state(
        &self,
        id: CompanyId,
        command: CompanyCommand,
    ) -> Result<CompanyState, ServiceError> {
        let runtime = self.registry.runtime_for(id);
        match runtime.submit(command)? {
            CommandReply::State(state) => Ok(state),
            CommandReply::Ack => Err(ServiceError::Unavailable(
                "runtime acked a state-bearing command".to_string(),
            )),
        }
    }
}
