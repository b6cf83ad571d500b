use thiserror::Error;

use crate::domain::timesheet::TimesheetStatus;

/// Failure taxonomy for the approval workflow.
///
/// Interface layers map variants onto HTTP statuses; the bulk path records a
/// variant's display string as the per-item failure reason, so the messages
/// here are part of the wire contract.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Authentication(String),
    #[error("{0}")]
    Authorization(String),
    #[error("Timesheet not found: {0}")]
    NotFound(String),
    #[error("Timesheet is {status}, not submitted")]
    InvalidState { status: TimesheetStatus },
    #[error("persistence failure: {0}")]
    Repository(String),
}

impl WorkflowError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication(message.into())
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization(message.into())
    }
}
