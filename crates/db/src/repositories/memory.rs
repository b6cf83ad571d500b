use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;

use timeclerk_core::audit::AuditEvent;
use timeclerk_core::domain::account::{Account, AccountId};
use timeclerk_core::domain::project::{Project, ProjectId, ProjectMembership, ProjectRole};
use timeclerk_core::domain::timesheet::{Timesheet, TimesheetEntry, TimesheetId};

use super::{
    AccountRepository, AuditLog, ProjectRepository, RepositoryError, TimesheetFilter,
    TimesheetRepository,
};

#[derive(Default)]
pub struct InMemoryTimesheetRepository {
    timesheets: RwLock<HashMap<String, Timesheet>>,
    entries: RwLock<HashMap<String, Vec<TimesheetEntry>>>,
}

#[async_trait::async_trait]
impl TimesheetRepository for InMemoryTimesheetRepository {
    async fn find_by_id(&self, id: &TimesheetId) -> Result<Option<Timesheet>, RepositoryError> {
        let timesheets = self.timesheets.read().await;
        Ok(timesheets.get(&id.0).cloned())
    }

    async fn save(&self, timesheet: Timesheet) -> Result<(), RepositoryError> {
        let mut timesheets = self.timesheets.write().await;
        timesheets.insert(timesheet.id.0.clone(), timesheet);
        Ok(())
    }

    async fn list(&self, filter: &TimesheetFilter) -> Result<Vec<Timesheet>, RepositoryError> {
        let timesheets = self.timesheets.read().await;
        let mut matching: Vec<Timesheet> = timesheets
            .values()
            .filter(|timesheet| {
                filter.status.map_or(true, |status| timesheet.status == status)
                    && filter
                        .account_id
                        .as_ref()
                        .map_or(true, |account_id| &timesheet.account_id == account_id)
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.week_start.cmp(&a.week_start).then(a.id.0.cmp(&b.id.0)));
        Ok(matching)
    }

    async fn list_entries(
        &self,
        id: &TimesheetId,
    ) -> Result<Vec<TimesheetEntry>, RepositoryError> {
        let entries = self.entries.read().await;
        Ok(entries.get(&id.0).cloned().unwrap_or_default())
    }

    async fn save_entry(&self, entry: TimesheetEntry) -> Result<(), RepositoryError> {
        let mut entries = self.entries.write().await;
        let for_timesheet = entries.entry(entry.timesheet_id.0.clone()).or_default();
        for_timesheet.retain(|existing| existing.id != entry.id);
        for_timesheet.push(entry);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryAccountRepository {
    accounts: RwLock<HashMap<String, Account>>,
}

#[async_trait::async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, RepositoryError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(&id.0).cloned())
    }

    async fn save(&self, account: Account) -> Result<(), RepositoryError> {
        let mut accounts = self.accounts.write().await;
        accounts.insert(account.id.0.clone(), account);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryProjectRepository {
    projects: RwLock<HashMap<String, Project>>,
    members: RwLock<Vec<ProjectMembership>>,
}

#[async_trait::async_trait]
impl ProjectRepository for InMemoryProjectRepository {
    async fn save(&self, project: Project) -> Result<(), RepositoryError> {
        let mut projects = self.projects.write().await;
        projects.insert(project.id.0.clone(), project);
        Ok(())
    }

    async fn save_member(&self, membership: ProjectMembership) -> Result<(), RepositoryError> {
        let mut members = self.members.write().await;
        members.retain(|existing| {
            existing.project_id != membership.project_id
                || existing.account_id != membership.account_id
        });
        members.push(membership);
        Ok(())
    }

    async fn managed_project_ids(
        &self,
        account_id: &AccountId,
    ) -> Result<HashSet<ProjectId>, RepositoryError> {
        let members = self.members.read().await;
        Ok(members
            .iter()
            .filter(|membership| {
                &membership.account_id == account_id && membership.role == ProjectRole::Manager
            })
            .map(|membership| membership.project_id.clone())
            .collect())
    }
}

/// Audit sink that keeps events in memory, with an accessor for assertions.
#[derive(Default)]
pub struct InMemoryAuditLog {
    events: RwLock<Vec<AuditEvent>>,
    fail: bool,
}

impl InMemoryAuditLog {
    /// A sink whose every `record` call fails, for exercising best-effort
    /// audit paths.
    pub fn failing() -> Self {
        Self { events: RwLock::new(Vec::new()), fail: true }
    }

    pub async fn recorded(&self) -> Vec<AuditEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait::async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn record(&self, event: AuditEvent) -> Result<(), RepositoryError> {
        if self.fail {
            return Err(RepositoryError::Database(sqlx::Error::PoolClosed));
        }
        let mut events = self.events.write().await;
        events.push(event);
        Ok(())
    }
}
