use timeclerk_core::audit::AuditEvent;

use super::{AuditLog, RepositoryError};
use crate::DbPool;

pub struct SqlAuditLog {
    pool: DbPool,
}

impl SqlAuditLog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AuditLog for SqlAuditLog {
    async fn record(&self, event: AuditEvent) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO audit_event (id, occurred_at, actor, timesheet_id, event_type, detail)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.id)
        .bind(event.occurred_at.to_rfc3339())
        .bind(&event.actor.0)
        .bind(event.timesheet_id.as_ref().map(|id| id.0.as_str()))
        .bind(&event.event_type)
        .bind(event.detail.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use sqlx::Row;

    use timeclerk_core::audit::AuditEvent;
    use timeclerk_core::domain::account::AccountId;
    use timeclerk_core::domain::timesheet::TimesheetId;

    use super::SqlAuditLog;
    use crate::migrations;
    use crate::repositories::AuditLog;
    use crate::{connect_with_settings, DbPool};

    #[tokio::test]
    async fn record_persists_event_with_json_detail() {
        let pool = setup_pool().await;
        let log = SqlAuditLog::new(pool.clone());

        let event = AuditEvent::new(
            AccountId("acct-mgr-001".to_string()),
            Some(TimesheetId("ts-1".to_string())),
            "timesheet_decision_applied",
            json!({"action": "approve"}),
        );
        log.record(event.clone()).await.expect("record event");

        let row = sqlx::query(
            "SELECT actor, timesheet_id, event_type, detail FROM audit_event WHERE id = ?",
        )
        .bind(&event.id)
        .fetch_one(&pool)
        .await
        .expect("load event");

        assert_eq!(row.get::<String, _>("actor"), "acct-mgr-001");
        assert_eq!(row.get::<Option<String>, _>("timesheet_id"), Some("ts-1".to_string()));
        assert_eq!(row.get::<String, _>("event_type"), "timesheet_decision_applied");
        assert_eq!(row.get::<String, _>("detail"), "{\"action\":\"approve\"}");

        pool.close().await;
    }

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }
}
