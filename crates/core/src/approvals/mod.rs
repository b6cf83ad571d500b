//! Decision authority for timesheet approval.
//!
//! Two kinds of actor may decide a submitted timesheet: an org admin, whose
//! authority is unconditional, and a project manager, whose authority covers
//! exactly the projects they manage. A manager may only decide a timesheet
//! when their managed set covers every project its entries touch.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::project::ProjectId;
use crate::domain::timesheet::{Timesheet, TimesheetStatus};
use crate::errors::WorkflowError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApproverAuthority {
    OrgAdmin,
    ProjectManager(HashSet<ProjectId>),
}

impl ApproverAuthority {
    /// Whether this authority extends over every project in `touched`.
    ///
    /// An empty touched set is covered by anyone; a timesheet without
    /// entries has no project to gate on.
    pub fn covers(&self, touched: &HashSet<ProjectId>) -> bool {
        match self {
            Self::OrgAdmin => true,
            Self::ProjectManager(managed) => {
                touched.iter().all(|project| managed.contains(project))
            }
        }
    }

    pub fn manages_anything(&self) -> bool {
        match self {
            Self::OrgAdmin => true,
            Self::ProjectManager(managed) => !managed.is_empty(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionAction {
    Approve,
    Reject,
}

impl DecisionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "approve" => Some(Self::Approve),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }
}

impl fmt::Display for DecisionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gate a decision on one timesheet. State is checked before authority, so a
/// covering manager hitting a draft still sees the state error.
pub fn check_decision(
    timesheet: &Timesheet,
    authority: &ApproverAuthority,
    touched: &HashSet<ProjectId>,
) -> Result<(), WorkflowError> {
    if timesheet.status != TimesheetStatus::Submitted {
        return Err(WorkflowError::InvalidState { status: timesheet.status });
    }
    if !authority.covers(touched) {
        return Err(WorkflowError::authorization(format!(
            "manager does not manage every project on timesheet `{}`",
            timesheet.id.0
        )));
    }
    Ok(())
}
