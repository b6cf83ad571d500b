//! Application service for timesheet approval decisions.
//!
//! Both the single and bulk endpoints funnel into [`ApprovalService`], which
//! owns the full decision sequence: resolve the acting manager's authority,
//! gate on timesheet state and project coverage, apply the transition, then
//! fire the best-effort side effects (audit record, owner notification).
//! Side effects never change the outcome of a decision that already
//! persisted.

use std::sync::Arc;

use serde_json::json;
use tracing::{error, info, warn};

use timeclerk_core::approvals::{check_decision, ApproverAuthority, DecisionAction};
use timeclerk_core::audit::AuditEvent;
use timeclerk_core::domain::account::{Account, AccountId};
use timeclerk_core::domain::timesheet::{
    touched_projects, Timesheet, TimesheetEntry, TimesheetId, TimesheetStatus,
};
use timeclerk_core::errors::WorkflowError;
use timeclerk_db::repositories::{
    AccountRepository, AuditLog, ProjectRepository, RepositoryError, TimesheetFilter,
    TimesheetRepository,
};
use timeclerk_notify::{Dispatcher, NotificationMessage};

/// A single approve/reject request, already shape-validated by the boundary.
#[derive(Clone, Debug)]
pub struct DecisionCommand {
    pub timesheet_id: TimesheetId,
    pub action: DecisionAction,
    pub manager_id: AccountId,
    pub approval_comments: Option<String>,
    pub rejection_comments: Option<String>,
}

/// A bulk request. `comments` applies to every timesheet in the batch and is
/// required for both actions.
#[derive(Clone, Debug)]
pub struct BulkDecisionCommand {
    pub timesheet_ids: Vec<TimesheetId>,
    pub action: DecisionAction,
    pub manager_id: AccountId,
    pub comments: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkItemSuccess {
    pub timesheet_id: TimesheetId,
    pub status: TimesheetStatus,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkItemFailure {
    pub timesheet_id: TimesheetId,
    pub reason: String,
}

/// Per-item results of a bulk run. Every input id lands in exactly one of
/// the two lists.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    pub succeeded: Vec<BulkItemSuccess>,
    pub failed: Vec<BulkItemFailure>,
}

impl BulkOutcome {
    pub fn summary(&self, action: DecisionAction) -> String {
        format!("Bulk {action}: {} succeeded, {} failed", self.succeeded.len(), self.failed.len())
    }
}

pub struct ApprovalService {
    timesheets: Arc<dyn TimesheetRepository>,
    accounts: Arc<dyn AccountRepository>,
    projects: Arc<dyn ProjectRepository>,
    audit: Arc<dyn AuditLog>,
    notifier: Dispatcher,
}

impl ApprovalService {
    pub fn new(
        timesheets: Arc<dyn TimesheetRepository>,
        accounts: Arc<dyn AccountRepository>,
        projects: Arc<dyn ProjectRepository>,
        audit: Arc<dyn AuditLog>,
        notifier: Dispatcher,
    ) -> Self {
        Self { timesheets, accounts, projects, audit, notifier }
    }

    /// Applies one approve/reject decision.
    pub async fn decide(&self, command: DecisionCommand) -> Result<Timesheet, WorkflowError> {
        let (actor, authority) = self.resolve_actor(&command.manager_id).await?;
        self.apply_decision(
            &command.timesheet_id,
            command.action,
            &actor,
            &authority,
            command.approval_comments,
            command.rejection_comments,
        )
        .await
    }

    /// Applies one decision to each timesheet in the batch, sequentially and
    /// in input order. Authority is resolved once up front; a manager who
    /// manages nothing is refused before any item is attempted. Individual
    /// failures are collected per item and never abort the rest of the batch.
    pub async fn decide_bulk(
        &self,
        command: BulkDecisionCommand,
    ) -> Result<BulkOutcome, WorkflowError> {
        let (actor, authority) = self.resolve_actor(&command.manager_id).await?;
        if !authority.manages_anything() {
            return Err(WorkflowError::authorization("manager does not manage any projects"));
        }

        let mut outcome = BulkOutcome::default();
        for timesheet_id in &command.timesheet_ids {
            let (approval_comments, rejection_comments) = match command.action {
                DecisionAction::Approve => (Some(command.comments.clone()), None),
                DecisionAction::Reject => (None, Some(command.comments.clone())),
            };

            let applied = self
                .apply_decision(
                    timesheet_id,
                    command.action,
                    &actor,
                    &authority,
                    approval_comments,
                    rejection_comments,
                )
                .await;

            match applied {
                Ok(updated) => outcome.succeeded.push(BulkItemSuccess {
                    timesheet_id: timesheet_id.clone(),
                    status: updated.status,
                }),
                Err(error) => outcome.failed.push(BulkItemFailure {
                    timesheet_id: timesheet_id.clone(),
                    reason: error.to_string(),
                }),
            }
        }

        info!(
            event_name = "bulk_decision_completed",
            action = %command.action,
            actor = %actor.id.0,
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "bulk decision completed"
        );

        Ok(outcome)
    }

    pub async fn get_timesheet(
        &self,
        timesheet_id: &TimesheetId,
    ) -> Result<(Timesheet, Vec<TimesheetEntry>), WorkflowError> {
        let timesheet = self
            .timesheets
            .find_by_id(timesheet_id)
            .await
            .map_err(repository_error)?
            .ok_or_else(|| WorkflowError::NotFound(timesheet_id.0.clone()))?;
        let entries =
            self.timesheets.list_entries(timesheet_id).await.map_err(repository_error)?;
        Ok((timesheet, entries))
    }

    pub async fn list_timesheets(
        &self,
        filter: &TimesheetFilter,
    ) -> Result<Vec<Timesheet>, WorkflowError> {
        self.timesheets.list(filter).await.map_err(repository_error)
    }

    /// Looks up the acting account and derives its approval authority: org
    /// admins approve anything, everyone else is bounded by the projects
    /// they manage.
    async fn resolve_actor(
        &self,
        manager_id: &AccountId,
    ) -> Result<(Account, ApproverAuthority), WorkflowError> {
        let account = self
            .accounts
            .find_by_id(manager_id)
            .await
            .map_err(repository_error)?
            .ok_or_else(|| {
                WorkflowError::authorization(format!(
                    "account `{}` has no approval authority",
                    manager_id.0
                ))
            })?;

        let authority = if account.admin {
            ApproverAuthority::OrgAdmin
        } else {
            let managed =
                self.projects.managed_project_ids(&account.id).await.map_err(repository_error)?;
            ApproverAuthority::ProjectManager(managed)
        };

        Ok((account, authority))
    }

    async fn apply_decision(
        &self,
        timesheet_id: &TimesheetId,
        action: DecisionAction,
        actor: &Account,
        authority: &ApproverAuthority,
        approval_comments: Option<String>,
        rejection_comments: Option<String>,
    ) -> Result<Timesheet, WorkflowError> {
        let mut timesheet = self
            .timesheets
            .find_by_id(timesheet_id)
            .await
            .map_err(repository_error)?
            .ok_or_else(|| WorkflowError::NotFound(timesheet_id.0.clone()))?;

        let entries =
            self.timesheets.list_entries(timesheet_id).await.map_err(repository_error)?;
        check_decision(&timesheet, authority, &touched_projects(&entries))?;

        match action {
            DecisionAction::Approve => {
                timesheet.approve(actor.id.clone(), approval_comments)?;
            }
            DecisionAction::Reject => {
                let comments = rejection_comments
                    .filter(|value| !value.trim().is_empty())
                    .ok_or_else(|| {
                        WorkflowError::validation("rejectionComments is required when rejecting")
                    })?;
                timesheet.reject(actor.id.clone(), comments)?;
            }
        }

        self.timesheets.save(timesheet.clone()).await.map_err(repository_error)?;

        self.record_decision_audit(&timesheet, action, actor).await;
        self.notify_owner(&timesheet, actor).await;

        info!(
            event_name = "timesheet_decision_applied",
            timesheet_id = %timesheet.id.0,
            action = %action,
            actor = %actor.id.0,
            status = %timesheet.status,
            "timesheet decision applied"
        );

        Ok(timesheet)
    }

    async fn record_decision_audit(
        &self,
        timesheet: &Timesheet,
        action: DecisionAction,
        actor: &Account,
    ) {
        let event = AuditEvent::new(
            actor.id.clone(),
            Some(timesheet.id.clone()),
            "timesheet_decision_applied",
            json!({
                "action": action.as_str(),
                "status": timesheet.status.as_str(),
                "week_start": timesheet.week_start,
            }),
        );

        if let Err(error) = self.audit.record(event).await {
            error!(
                event_name = "audit_record_failed",
                timesheet_id = %timesheet.id.0,
                actor = %actor.id.0,
                error = %error,
                "audit record failed; decision already persisted"
            );
        }
    }

    /// Hands the owner notification to the dispatcher. The spawned delivery
    /// never feeds back into the decision result; a missing owner is logged
    /// and skipped.
    async fn notify_owner(&self, timesheet: &Timesheet, actor: &Account) {
        let owner = match self.accounts.find_by_id(&timesheet.account_id).await {
            Ok(Some(owner)) => owner,
            Ok(None) => {
                warn!(
                    timesheet_id = %timesheet.id.0,
                    account_id = %timesheet.account_id.0,
                    "timesheet owner not found; skipping notification"
                );
                return;
            }
            Err(error) => {
                warn!(
                    timesheet_id = %timesheet.id.0,
                    error = %error,
                    "owner lookup failed; skipping notification"
                );
                return;
            }
        };

        let message = match timesheet.status {
            TimesheetStatus::Approved => NotificationMessage::approved(
                owner.email,
                owner.display_name,
                timesheet.week_start,
                actor.display_name.clone(),
            ),
            TimesheetStatus::Rejected => NotificationMessage::rejected(
                owner.email,
                owner.display_name,
                timesheet.week_start,
                actor.display_name.clone(),
                timesheet.rejection_comments.clone().unwrap_or_default(),
            ),
            _ => return,
        };

        let _ = self.notifier.dispatch(message);
    }
}

fn repository_error(error: RepositoryError) -> WorkflowError {
    WorkflowError::Repository(error.to_string())
}
