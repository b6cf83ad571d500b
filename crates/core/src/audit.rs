use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::account::AccountId;
use crate::domain::timesheet::TimesheetId;

/// A single immutable fact about something that happened in the workflow.
///
/// Events are recorded best-effort: a failed write is logged and never blocks
/// the decision that produced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: String,
    pub occurred_at: DateTime<Utc>,
    pub actor: AccountId,
    pub timesheet_id: Option<TimesheetId>,
    pub event_type: String,
    pub detail: serde_json::Value,
}

impl AuditEvent {
    pub fn new(
        actor: AccountId,
        timesheet_id: Option<TimesheetId>,
        event_type: impl Into<String>,
        detail: serde_json::Value,
    ) -> Self {
        let id = format!("AUD-{}", &Uuid::new_v4().simple().to_string()[..12]);
        Self {
            id,
            occurred_at: Utc::now(),
            actor,
            timesheet_id,
            event_type: event_type.into(),
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::domain::account::AccountId;
    use crate::domain::timesheet::TimesheetId;

    use super::AuditEvent;

    #[test]
    fn new_events_get_prefixed_ids() {
        let event = AuditEvent::new(
            AccountId("acct-mgr-001".to_string()),
            Some(TimesheetId("ts-1".to_string())),
            "timesheet_decision_applied",
            json!({"action": "approve"}),
        );

        assert!(event.id.starts_with("AUD-"));
        assert_eq!(event.id.len(), "AUD-".len() + 12);
        assert_eq!(event.event_type, "timesheet_decision_applied");
    }

    #[test]
    fn detail_round_trips_through_serde() {
        let event = AuditEvent::new(
            AccountId("acct-admin-001".to_string()),
            None,
            "bulk_decision_completed",
            json!({"succeeded": 2, "failed": 1}),
        );

        let encoded = serde_json::to_string(&event).expect("serialize");
        let decoded: AuditEvent = serde_json::from_str(&encoded).expect("deserialize");
        assert_eq!(decoded, event);
    }
}
