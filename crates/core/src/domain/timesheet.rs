use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::account::AccountId;
use crate::domain::project::ProjectId;
use crate::errors::WorkflowError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimesheetId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimesheetStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
}

impl TimesheetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "submitted" => Some(Self::Submitted),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for TimesheetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logged line of work inside a timesheet, tied to a single project.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimesheetEntry {
    pub id: String,
    pub timesheet_id: TimesheetId,
    pub project_id: ProjectId,
    pub work_date: NaiveDate,
    pub hours: Decimal,
    pub billable: bool,
}

/// A weekly record of an account's logged work.
///
/// `approval_comments` and `rejection_comments` are mutually exclusive:
/// applying a decision sets the field for that decision and clears the other,
/// so a record never carries both.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Timesheet {
    pub id: TimesheetId,
    pub account_id: AccountId,
    pub week_start: NaiveDate,
    pub status: TimesheetStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_by: Option<AccountId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approval_comments: Option<String>,
    pub rejection_comments: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Timesheet {
    pub fn can_transition_to(&self, next: TimesheetStatus) -> bool {
        matches!(
            (self.status, next),
            (TimesheetStatus::Draft, TimesheetStatus::Submitted)
                | (TimesheetStatus::Submitted, TimesheetStatus::Approved)
                | (TimesheetStatus::Submitted, TimesheetStatus::Rejected)
                | (TimesheetStatus::Rejected, TimesheetStatus::Draft)
                | (TimesheetStatus::Rejected, TimesheetStatus::Submitted)
        )
    }

    /// Approves a submitted timesheet. Whitespace-only comments are treated
    /// as absent.
    pub fn approve(
        &mut self,
        decided_by: AccountId,
        comments: Option<String>,
    ) -> Result<(), WorkflowError> {
        if self.status != TimesheetStatus::Submitted {
            return Err(WorkflowError::InvalidState { status: self.status });
        }

        let now = Utc::now();
        self.status = TimesheetStatus::Approved;
        self.approved_by = Some(decided_by);
        self.approved_at = Some(now);
        self.approval_comments = comments.filter(|value| !value.trim().is_empty());
        self.rejection_comments = None;
        self.updated_at = now;
        Ok(())
    }

    /// Rejects a submitted timesheet. Rejections always carry a comment; the
    /// boundary enforces non-emptiness before this is reached.
    pub fn reject(
        &mut self,
        decided_by: AccountId,
        comments: String,
    ) -> Result<(), WorkflowError> {
        if self.status != TimesheetStatus::Submitted {
            return Err(WorkflowError::InvalidState { status: self.status });
        }

        let now = Utc::now();
        self.status = TimesheetStatus::Rejected;
        self.approved_by = Some(decided_by);
        self.approved_at = Some(now);
        self.rejection_comments = Some(comments);
        self.approval_comments = None;
        self.updated_at = now;
        Ok(())
    }
}

/// The set of projects a timesheet's entries touch. Manager authority must
/// cover every element of this set.
pub fn touched_projects(entries: &[TimesheetEntry]) -> HashSet<ProjectId> {
    entries.iter().map(|entry| entry.project_id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use crate::domain::account::AccountId;
    use crate::domain::project::ProjectId;
    use crate::errors::WorkflowError;

    use super::{touched_projects, Timesheet, TimesheetEntry, TimesheetId, TimesheetStatus};

    fn timesheet(status: TimesheetStatus) -> Timesheet {
        Timesheet {
            id: TimesheetId("ts-1".to_string()),
            account_id: AccountId("acct-emp-001".to_string()),
            week_start: NaiveDate::from_ymd_opt(2025, 1, 13).expect("valid date"),
            status,
            submitted_at: None,
            approved_by: None,
            approved_at: None,
            approval_comments: None,
            rejection_comments: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn entry(id: &str, project_id: &str) -> TimesheetEntry {
        TimesheetEntry {
            id: id.to_string(),
            timesheet_id: TimesheetId("ts-1".to_string()),
            project_id: ProjectId(project_id.to_string()),
            work_date: NaiveDate::from_ymd_opt(2025, 1, 13).expect("valid date"),
            hours: Decimal::new(80, 1),
            billable: true,
        }
    }

    #[test]
    fn approve_stamps_decision_fields() {
        let mut timesheet = timesheet(TimesheetStatus::Submitted);
        timesheet
            .approve(AccountId("acct-mgr-001".to_string()), Some("Looks good".to_string()))
            .expect("submitted -> approved");

        assert_eq!(timesheet.status, TimesheetStatus::Approved);
        assert_eq!(timesheet.approved_by, Some(AccountId("acct-mgr-001".to_string())));
        assert!(timesheet.approved_at.is_some());
        assert_eq!(timesheet.approval_comments.as_deref(), Some("Looks good"));
    }

    #[test]
    fn approve_clears_stale_rejection_comments() {
        let mut timesheet = timesheet(TimesheetStatus::Submitted);
        timesheet.rejection_comments = Some("Missing Friday hours".to_string());

        timesheet.approve(AccountId("acct-mgr-001".to_string()), None).expect("approve");

        assert_eq!(timesheet.rejection_comments, None);
        assert_eq!(timesheet.approval_comments, None);
    }

    #[test]
    fn reject_clears_stale_approval_comments() {
        let mut timesheet = timesheet(TimesheetStatus::Submitted);
        timesheet.approval_comments = Some("ok".to_string());

        timesheet
            .reject(AccountId("acct-mgr-001".to_string()), "Wrong project".to_string())
            .expect("reject");

        assert_eq!(timesheet.status, TimesheetStatus::Rejected);
        assert_eq!(timesheet.approval_comments, None);
        assert_eq!(timesheet.rejection_comments.as_deref(), Some("Wrong project"));
    }

    #[test]
    fn decisions_are_refused_outside_submitted() {
        for status in [TimesheetStatus::Draft, TimesheetStatus::Approved, TimesheetStatus::Rejected]
        {
            let mut sheet = timesheet(status);
            let error = sheet
                .approve(AccountId("acct-mgr-001".to_string()), None)
                .expect_err("non-submitted approve should fail");
            assert_eq!(error, WorkflowError::InvalidState { status });
            assert_eq!(sheet.status, status, "refused decision must not mutate status");
        }
    }

    #[test]
    fn draft_decision_reason_matches_bulk_contract() {
        let mut sheet = timesheet(TimesheetStatus::Draft);
        let error = sheet
            .reject(AccountId("acct-mgr-001".to_string()), "no".to_string())
            .expect_err("draft reject should fail");
        assert_eq!(error.to_string(), "Timesheet is draft, not submitted");
    }

    #[test]
    fn whitespace_approval_comments_are_dropped() {
        let mut sheet = timesheet(TimesheetStatus::Submitted);
        sheet
            .approve(AccountId("acct-mgr-001".to_string()), Some("   ".to_string()))
            .expect("approve");
        assert_eq!(sheet.approval_comments, None);
    }

    #[test]
    fn lifecycle_permits_resubmission_after_rejection() {
        let sheet = timesheet(TimesheetStatus::Rejected);
        assert!(sheet.can_transition_to(TimesheetStatus::Submitted));
        assert!(sheet.can_transition_to(TimesheetStatus::Draft));
        assert!(!sheet.can_transition_to(TimesheetStatus::Approved));
    }

    #[test]
    fn touched_projects_dedupes_across_entries() {
        let entries =
            vec![entry("e-1", "proj-alpha"), entry("e-2", "proj-alpha"), entry("e-3", "proj-beta")];

        let touched = touched_projects(&entries);

        assert_eq!(touched.len(), 2);
        assert!(touched.contains(&ProjectId("proj-alpha".to_string())));
        assert!(touched.contains(&ProjectId("proj-beta".to_string())));
    }
}
