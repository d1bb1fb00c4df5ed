use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use freightbook_core::{Aggregate, AggregateRoot, CompanyId, DomainError};
use freightbook_events::Event;

use crate::update::FieldUpdate;
use crate::values::{CompanyType, Contact, Location};

/// Stream/aggregate type tag for company events.
pub const COMPANY_AGGREGATE_TYPE: &str = "company";

/// Lifecycle phase of a company aggregate.
///
/// `Uninitialized` (no events replayed) → `Active` (created) → `Deleted`
/// (terminal). Which commands are legal depends solely on this phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompanyLifecycle {
    Uninitialized,
    Active,
    Deleted,
}

impl CompanyLifecycle {
    fn name(self) -> &'static str {
        match self {
            CompanyLifecycle::Uninitialized => "uninitialized",
            CompanyLifecycle::Active => "active",
            CompanyLifecycle::Deleted => "deleted",
        }
    }
}

/// Materialized current view of one company.
///
/// Never persisted directly (snapshots aside); always derivable by replaying
/// the event stream from sequence zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyState {
    pub id: CompanyId,
    pub name: String,
    pub tax_id: Option<String>,
    pub mc: Option<String>,
    pub company_type: Option<CompanyType>,
    pub contacts: Option<Vec<Contact>>,
    pub locations: Option<Vec<Location>>,
    pub lifecycle: CompanyLifecycle,
}

impl CompanyState {
    /// The zero value seeded with the entity id (state at sequence 0).
    pub fn zero(id: CompanyId) -> Self {
        Self {
            id,
            name: String::new(),
            tax_id: None,
            mc: None,
            company_type: None,
            contacts: None,
            locations: None,
            lifecycle: CompanyLifecycle::Uninitialized,
        }
    }
}

/// Command: create a new company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCompany {
    pub name: String,
    pub tax_id: Option<String>,
    pub mc: Option<String>,
    pub company_type: Option<CompanyType>,
    pub contacts: Option<Vec<Contact>>,
    pub locations: Option<Vec<Location>>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: update an existing company.
///
/// `name` is required and always overwritten; every optional field carries an
/// explicit keep/clear/set instruction (omission on the wire means keep).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateCompany {
    pub name: String,
    #[serde(default)]
    pub tax_id: FieldUpdate<String>,
    #[serde(default)]
    pub mc: FieldUpdate<String>,
    #[serde(default)]
    pub company_type: FieldUpdate<CompanyType>,
    #[serde(default)]
    pub contacts: FieldUpdate<Vec<Contact>>,
    #[serde(default)]
    pub locations: FieldUpdate<Vec<Location>>,
    pub occurred_at: DateTime<Utc>,
}

/// Commands a company aggregate accepts.
///
/// Commands are transient: they exist only to produce events and are never
/// persisted. Get/Delete carry no payload beyond the target id, which is
/// bound by the runtime that owns the aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CompanyCommand {
    Create(CreateCompany),
    Update(UpdateCompany),
    GetInformation,
    Delete(DeleteCompany),
}

impl CompanyCommand {
    fn name(&self) -> &'static str {
        match self {
            CompanyCommand::Create(_) => "CreateCompany",
            CompanyCommand::Update(_) => "UpdateCompany",
            CompanyCommand::GetInformation => "GetCompanyInformation",
            CompanyCommand::Delete(_) => "DeleteCompany",
        }
    }
}

/// Event: a company came into existence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyCreated {
    pub company_id: CompanyId,
    pub name: String,
    pub tax_id: Option<String>,
    pub mc: Option<String>,
    pub company_type: Option<CompanyType>,
    pub contacts: Option<Vec<Contact>>,
    pub locations: Option<Vec<Location>>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: a company's fields changed.
///
/// Carries the submitted field instructions verbatim, including explicit
/// clears, so replay and the read-side fold apply exactly what was decided.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyUpdated {
    pub company_id: CompanyId,
    pub name: String,
    #[serde(default)]
    pub tax_id: FieldUpdate<String>,
    #[serde(default)]
    pub mc: FieldUpdate<String>,
    #[serde(default)]
    pub company_type: FieldUpdate<CompanyType>,
    #[serde(default)]
    pub contacts: FieldUpdate<Vec<Contact>>,
    #[serde(default)]
    pub locations: FieldUpdate<Vec<Location>>,
    pub occurred_at: DateTime<Utc>,
}

/// Command payload: delete a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteCompany {
    pub occurred_at: DateTime<Utc>,
}

/// Event: a company was deleted (terminal).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyDeleted {
    pub company_id: CompanyId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CompanyEvent {
    Created(CompanyCreated),
    Updated(CompanyUpdated),
    Deleted(CompanyDeleted),
}

impl CompanyEvent {
    pub fn company_id(&self) -> CompanyId {
        match self {
            CompanyEvent::Created(e) => e.company_id,
            CompanyEvent::Updated(e) => e.company_id,
            CompanyEvent::Deleted(e) => e.company_id,
        }
    }
}

impl Event for CompanyEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CompanyEvent::Created(_) => "company.created",
            CompanyEvent::Updated(_) => "company.updated",
            CompanyEvent::Deleted(_) => "company.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CompanyEvent::Created(e) => e.occurred_at,
            CompanyEvent::Updated(e) => e.occurred_at,
            CompanyEvent::Deleted(e) => e.occurred_at,
        }
    }
}

/// Aggregate root: one company, one event stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Company {
    state: CompanyState,
    version: u64,
}

impl Company {
    /// An empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: CompanyId) -> Self {
        Self {
            state: CompanyState::zero(id),
            version: 0,
        }
    }

    /// Rebuild an aggregate from a snapshot taken at `version`.
    ///
    /// Snapshots are an optimization, never authoritative: replaying the
    /// events after `version` must reconstruct the same state as a full
    /// replay from zero.
    pub fn from_snapshot(state: CompanyState, version: u64) -> Self {
        Self { state, version }
    }

    pub fn state(&self) -> &CompanyState {
        &self.state
    }

    pub fn lifecycle(&self) -> CompanyLifecycle {
        self.state.lifecycle
    }

    fn handle_create(&self, cmd: &CreateCompany) -> Result<Vec<CompanyEvent>, DomainError> {
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name", "name cannot be empty"));
        }

        Ok(vec![CompanyEvent::Created(CompanyCreated {
            company_id: self.state.id,
            name: cmd.name.clone(),
            tax_id: cmd.tax_id.clone(),
            mc: cmd.mc.clone(),
            company_type: cmd.company_type,
            contacts: cmd.contacts.clone(),
            locations: cmd.locations.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateCompany) -> Result<Vec<CompanyEvent>, DomainError> {
        Ok(vec![CompanyEvent::Updated(CompanyUpdated {
            company_id: self.state.id,
            name: cmd.name.clone(),
            tax_id: cmd.tax_id.clone(),
            mc: cmd.mc.clone(),
            company_type: cmd.company_type.clone(),
            contacts: cmd.contacts.clone(),
            locations: cmd.locations.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

impl AggregateRoot for Company {
    type Id = CompanyId;

    fn id(&self) -> &Self::Id {
        &self.state.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Aggregate for Company {
    type Command = CompanyCommand;
    type Event = CompanyEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CompanyEvent::Created(e) => {
                self.state = CompanyState {
                    id: e.company_id,
                    name: e.name.clone(),
                    tax_id: e.tax_id.clone(),
                    mc: e.mc.clone(),
                    company_type: e.company_type,
                    contacts: e.contacts.clone(),
                    locations: e.locations.clone(),
                    lifecycle: CompanyLifecycle::Active,
                };
            }
            CompanyEvent::Updated(e) => {
                self.state.name = e.name.clone();
                self.state.tax_id = e.tax_id.resolve(self.state.tax_id.take());
                self.state.mc = e.mc.resolve(self.state.mc.take());
                self.state.company_type = e.company_type.resolve(self.state.company_type.take());
                self.state.contacts = e.contacts.resolve(self.state.contacts.take());
                self.state.locations = e.locations.resolve(self.state.locations.take());
            }
            CompanyEvent::Deleted(_) => {
                // State is retained for the final read; only the phase moves.
                self.state.lifecycle = CompanyLifecycle::Deleted;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        let phase = self.state.lifecycle;
        match (phase, command) {
            (CompanyLifecycle::Uninitialized, CompanyCommand::Create(cmd)) => {
                self.handle_create(cmd)
            }
            (CompanyLifecycle::Active, CompanyCommand::Update(cmd)) => self.handle_update(cmd),
            // Read-only: the runtime replies with current state.
            (CompanyLifecycle::Active, CompanyCommand::GetInformation) => Ok(vec![]),
            (CompanyLifecycle::Active, CompanyCommand::Delete(cmd)) => {
                Ok(vec![CompanyEvent::Deleted(CompanyDeleted {
                    company_id: self.state.id,
                    occurred_at: cmd.occurred_at,
                })])
            }
            // Deleting an already-deleted company succeeds with no new event.
            (CompanyLifecycle::Deleted, CompanyCommand::Delete(_)) => Ok(vec![]),
            (_, cmd) => Err(DomainError::unhandled(cmd.name(), phase.name())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_id() -> CompanyId {
        CompanyId::new()
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn create_cmd(name: &str) -> CompanyCommand {
        CompanyCommand::Create(CreateCompany {
            name: name.to_string(),
            tax_id: Some("1111".to_string()),
            mc: Some("MC1".to_string()),
            company_type: Some(CompanyType::Carrier),
            contacts: Some(vec![]),
            locations: Some(vec![]),
            occurred_at: test_time(),
        })
    }

    fn update_cmd(name: &str) -> UpdateCompany {
        UpdateCompany {
            name: name.to_string(),
            tax_id: FieldUpdate::Keep,
            mc: FieldUpdate::Keep,
            company_type: FieldUpdate::Keep,
            contacts: FieldUpdate::Keep,
            locations: FieldUpdate::Keep,
            occurred_at: test_time(),
        }
    }

    fn delete_cmd() -> CompanyCommand {
        CompanyCommand::Delete(DeleteCompany {
            occurred_at: test_time(),
        })
    }

    fn created_company(name: &str) -> Company {
        let mut company = Company::empty(test_id());
        let events = company.handle(&create_cmd(name)).unwrap();
        for e in &events {
            company.apply(e);
        }
        company
    }

    #[test]
    fn create_emits_created_event_and_activates() {
        let company = Company::empty(test_id());
        let events = company.handle(&create_cmd("Acme")).unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            CompanyEvent::Created(e) => {
                assert_eq!(e.company_id, *company.id());
                assert_eq!(e.name, "Acme");
                assert_eq!(e.tax_id.as_deref(), Some("1111"));
                assert_eq!(e.mc.as_deref(), Some("MC1"));
            }
            other => panic!("expected Created event, got {other:?}"),
        }

        let mut company = company;
        company.apply(&events[0]);
        assert_eq!(company.lifecycle(), CompanyLifecycle::Active);
        assert_eq!(company.state().name, "Acme");
        assert_eq!(company.version(), 1);
    }

    #[test]
    fn create_rejects_empty_name() {
        let company = Company::empty(test_id());
        let cmd = CompanyCommand::Create(CreateCompany {
            name: "   ".to_string(),
            tax_id: None,
            mc: None,
            company_type: None,
            contacts: None,
            locations: None,
            occurred_at: test_time(),
        });

        let err = company.handle(&cmd).unwrap_err();
        match err {
            DomainError::Validation { field, .. } => assert_eq!(field, "name"),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn commands_before_create_are_unhandled() {
        let company = Company::empty(test_id());

        for cmd in [
            CompanyCommand::Update(update_cmd("x")),
            CompanyCommand::GetInformation,
            delete_cmd(),
        ] {
            let err = company.handle(&cmd).unwrap_err();
            match err {
                DomainError::UnhandledInState { state, .. } => {
                    assert_eq!(state, "uninitialized");
                }
                other => panic!("expected UnhandledInState, got {other:?}"),
            }
        }
    }

    #[test]
    fn create_on_active_company_is_unhandled() {
        let company = created_company("Acme");
        let err = company.handle(&create_cmd("Acme again")).unwrap_err();
        match err {
            DomainError::UnhandledInState { command, state } => {
                assert_eq!(command, "CreateCompany");
                assert_eq!(state, "active");
            }
            other => panic!("expected UnhandledInState, got {other:?}"),
        }
    }

    #[test]
    fn get_is_read_only() {
        let company = created_company("Acme");
        let events = company.handle(&CompanyCommand::GetInformation).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn update_carries_field_instructions_verbatim() {
        let mut company = created_company("Acme");

        let cmd = UpdateCompany {
            name: "Acme-2".to_string(),
            tax_id: FieldUpdate::Set("2222".to_string()),
            mc: FieldUpdate::Clear,
            company_type: FieldUpdate::Keep,
            contacts: FieldUpdate::Keep,
            locations: FieldUpdate::Keep,
            occurred_at: test_time(),
        };
        let events = company.handle(&CompanyCommand::Update(cmd)).unwrap();
        assert_eq!(events.len(), 1);

        company.apply(&events[0]);
        assert_eq!(company.state().name, "Acme-2");
        assert_eq!(company.state().tax_id.as_deref(), Some("2222"));
        assert_eq!(company.state().mc, None, "explicit clear removes the value");
        assert_eq!(
            company.state().company_type,
            Some(CompanyType::Carrier),
            "keep leaves the value untouched"
        );
    }

    #[test]
    fn overwrite_update_replaces_every_field() {
        let mut company = created_company("Acme");

        // Callers that send the whole record each time build every
        // instruction with `overwrite`: present fields set, absent clear.
        let cmd = UpdateCompany {
            name: "Acme-2".to_string(),
            tax_id: FieldUpdate::overwrite(Some("2222".to_string())),
            mc: FieldUpdate::overwrite(None),
            company_type: FieldUpdate::overwrite(Some(CompanyType::Broker)),
            contacts: FieldUpdate::overwrite(None),
            locations: FieldUpdate::overwrite(None),
            occurred_at: test_time(),
        };
        let events = company.handle(&CompanyCommand::Update(cmd)).unwrap();
        company.apply(&events[0]);

        assert_eq!(company.state().tax_id.as_deref(), Some("2222"));
        assert_eq!(company.state().mc, None);
        assert_eq!(company.state().company_type, Some(CompanyType::Broker));
        assert_eq!(company.state().contacts, None);
        assert_eq!(company.state().locations, None);
    }

    #[test]
    fn delete_is_terminal_and_idempotent() {
        let mut company = created_company("Acme");

        let events = company.handle(&delete_cmd()).unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            CompanyEvent::Deleted(e) => assert_eq!(e.company_id, *company.id()),
            other => panic!("expected Deleted event, got {other:?}"),
        }
        company.apply(&events[0]);
        assert_eq!(company.lifecycle(), CompanyLifecycle::Deleted);
        // State is retained for the final read.
        assert_eq!(company.state().name, "Acme");

        // Second delete: success, no new event.
        let events = company.handle(&delete_cmd()).unwrap();
        assert!(events.is_empty());

        // Anything else after delete is rejected.
        for cmd in [
            CompanyCommand::Update(update_cmd("x")),
            CompanyCommand::GetInformation,
        ] {
            let err = company.handle(&cmd).unwrap_err();
            match err {
                DomainError::UnhandledInState { state, .. } => assert_eq!(state, "deleted"),
                other => panic!("expected UnhandledInState, got {other:?}"),
            }
        }
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let company = created_company("Acme");
        let before = company.clone();

        let _ = company.handle(&CompanyCommand::Update(update_cmd("Changed")));
        let _ = company.handle(&delete_cmd());

        assert_eq!(company, before);
    }

    #[test]
    fn replay_from_scratch_matches_live_state() {
        let id = test_id();
        let mut live = Company::empty(id);
        let mut history = Vec::new();

        for cmd in [
            create_cmd("Acme"),
            CompanyCommand::Update(UpdateCompany {
                name: "Acme-2".to_string(),
                tax_id: FieldUpdate::Set("2222".to_string()),
                mc: FieldUpdate::Keep,
                company_type: FieldUpdate::Clear,
                contacts: FieldUpdate::Keep,
                locations: FieldUpdate::Keep,
                occurred_at: test_time(),
            }),
            delete_cmd(),
        ] {
            let events = live.handle(&cmd).unwrap();
            for e in &events {
                live.apply(e);
                history.push(e.clone());
            }
        }

        let mut replayed = Company::empty(id);
        for e in &history {
            replayed.apply(e);
        }

        assert_eq!(replayed, live);
        assert_eq!(replayed.version(), history.len() as u64);
    }

    #[test]
    fn acme_scenario_produces_one_event_per_mutation() {
        let mut company = Company::empty(test_id());

        let events = company.handle(&create_cmd("Acme")).unwrap();
        assert_eq!(events.len(), 1);
        company.apply(&events[0]);
        assert_eq!(company.state().name, "Acme");
        assert_eq!(company.state().tax_id.as_deref(), Some("1111"));

        let events = company
            .handle(&CompanyCommand::Update(UpdateCompany {
                name: "Acme-2".to_string(),
                tax_id: FieldUpdate::Set("2222".to_string()),
                mc: FieldUpdate::Keep,
                company_type: FieldUpdate::Keep,
                contacts: FieldUpdate::Keep,
                locations: FieldUpdate::Keep,
                occurred_at: test_time(),
            }))
            .unwrap();
        assert_eq!(events.len(), 1);
        company.apply(&events[0]);
        assert_eq!(company.state().name, "Acme-2");
        assert_eq!(company.state().tax_id.as_deref(), Some("2222"));

        let events = company.handle(&delete_cmd()).unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], CompanyEvent::Deleted(_)));
        company.apply(&events[0]);

        let err = company.handle(&CompanyCommand::GetInformation).unwrap_err();
        assert!(matches!(err, DomainError::UnhandledInState { .. }));
    }

    #[test]
    fn events_serialize_round_trip() {
        let id = test_id();
        let event = CompanyEvent::Updated(CompanyUpdated {
            company_id: id,
            name: "Acme".to_string(),
            tax_id: FieldUpdate::Clear,
            mc: FieldUpdate::Set("MC9".to_string()),
            company_type: FieldUpdate::Keep,
            contacts: FieldUpdate::Set(vec![Contact {
                first_name: Some("Jane".to_string()),
                ..Default::default()
            }]),
            locations: FieldUpdate::Keep,
            occurred_at: test_time(),
        });

        let json = serde_json::to_value(&event).unwrap();
        let back: CompanyEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
