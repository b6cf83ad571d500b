pub mod approvals;
pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;

pub use approvals::{check_decision, ApproverAuthority, DecisionAction};
pub use audit::AuditEvent;
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::account::{Account, AccountId};
pub use domain::project::{Project, ProjectId, ProjectMembership, ProjectRole};
pub use domain::timesheet::{
    touched_projects, Timesheet, TimesheetEntry, TimesheetId, TimesheetStatus,
};
pub use errors::WorkflowError;
