use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use timeclerk_core::audit::AuditEvent;
use timeclerk_core::domain::account::{Account, AccountId};
use timeclerk_core::domain::project::{Project, ProjectId, ProjectMembership};
use timeclerk_core::domain::timesheet::{Timesheet, TimesheetEntry, TimesheetId, TimesheetStatus};

pub mod account;
pub mod audit;
pub mod memory;
pub mod project;
pub mod timesheet;

pub use account::SqlAccountRepository;
pub use audit::SqlAuditLog;
pub use memory::{
    InMemoryAccountRepository, InMemoryAuditLog, InMemoryProjectRepository,
    InMemoryTimesheetRepository,
};
pub use project::SqlProjectRepository;
pub use timesheet::SqlTimesheetRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Listing filter. `None` fields match everything.
#[derive(Clone, Debug, Default)]
pub struct TimesheetFilter {
    pub status: Option<TimesheetStatus>,
    pub account_id: Option<AccountId>,
}

#[async_trait]
pub trait TimesheetRepository: Send + Sync {
    async fn find_by_id(&self, id: &TimesheetId) -> Result<Option<Timesheet>, RepositoryError>;
    async fn save(&self, timesheet: Timesheet) -> Result<(), RepositoryError>;
    async fn list(&self, filter: &TimesheetFilter) -> Result<Vec<Timesheet>, RepositoryError>;
    async fn list_entries(
        &self,
        id: &TimesheetId,
    ) -> Result<Vec<TimesheetEntry>, RepositoryError>;
    async fn save_entry(&self, entry: TimesheetEntry) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, RepositoryError>;
    async fn save(&self, account: Account) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn save(&self, project: Project) -> Result<(), RepositoryError>;
    async fn save_member(&self, membership: ProjectMembership) -> Result<(), RepositoryError>;

    /// Projects the account manages, resolved in one indexed query.
    async fn managed_project_ids(
        &self,
        account_id: &AccountId,
    ) -> Result<HashSet<ProjectId>, RepositoryError>;
}

#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(&self, event: AuditEvent) -> Result<(), RepositoryError>;
}

// Row decoding helpers shared by the SQL repositories. Dates are stored as
// `YYYY-MM-DD`, timestamps as RFC 3339.

pub(crate) fn parse_date(column: &str, value: String) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|error| {
        RepositoryError::Decode(format!("invalid date in `{column}`: `{value}` ({error})"))
    })
}

pub(crate) fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}

pub(crate) fn parse_optional_timestamp(
    column: &str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    value.map(|timestamp| parse_timestamp(column, timestamp)).transpose()
}
