use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

/// Number of migration versions recorded as applied. Zero on a database
/// that has never been migrated.
pub async fn applied_count(pool: &DbPool) -> Result<u64, sqlx::Error> {
    let ledger_exists: i64 = sqlx::query_scalar(
        "SELECT COUNT(1) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?;
    if ledger_exists == 0 {
        return Ok(0);
    }

    let applied: i64 =
        sqlx::query_scalar("SELECT COUNT(1) FROM _sqlx_migrations").fetch_one(pool).await?;
    Ok(applied.max(0) as u64)
}

/// Number of migration versions embedded in this build.
pub fn total_count() -> u64 {
    MIGRATOR.iter().filter(|migration| migration.migration_type.is_up_migration()).count() as u64
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::{applied_count, run_pending, total_count};
    use crate::{connect_with_settings, migrations::MIGRATOR};

    const MANAGED_SCHEMA_OBJECTS: &[&str] = &[
        "account",
        "project",
        "project_member",
        "timesheet",
        "timesheet_entry",
        "audit_event",
        "idx_timesheet_status",
        "idx_timesheet_account_id",
        "idx_timesheet_entry_timesheet_id",
        "idx_project_member_account_role",
        "idx_audit_event_timesheet_id",
    ];

    const BASELINE_TABLES: &[&str] =
        &["account", "project", "project_member", "timesheet", "timesheet_entry", "audit_event"];

    async fn table_count(pool: &sqlx::SqlitePool, name: &str) -> i64 {
        sqlx::query("SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name = ?1")
            .bind(name)
            .fetch_one(pool)
            .await
            .expect("check table")
            .get::<i64, _>("count")
    }

    #[tokio::test]
    async fn migrations_create_baseline_tables() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        for table in BASELINE_TABLES {
            assert_eq!(table_count(&pool, table).await, 1, "table `{table}` should exist");
        }
    }

    #[tokio::test]
    async fn migration_counts_track_apply_state() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");

        assert_eq!(applied_count(&pool).await.expect("count before migrate"), 0);
        assert!(total_count() >= 1, "at least the baseline migration should be embedded");

        run_pending(&pool).await.expect("run migrations");

        assert_eq!(applied_count(&pool).await.expect("count after migrate"), total_count());
    }

    #[tokio::test]
    async fn migrations_are_reversible() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        MIGRATOR.undo(&pool, 0).await.expect("undo migrations");

        assert_eq!(table_count(&pool, "timesheet").await, 0, "timesheet table should be removed");
    }

    #[tokio::test]
    async fn migrations_up_down_up_preserves_schema_signature() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        let baseline = managed_schema_signature(&pool).await;
        assert_eq!(
            baseline.len(),
            MANAGED_SCHEMA_OBJECTS.len(),
            "first apply should create every managed object",
        );

        MIGRATOR.undo(&pool, 0).await.expect("undo migrations");
        let after_undo = managed_schema_signature(&pool).await;
        assert!(after_undo.is_empty(), "full undo should drop every managed object");

        run_pending(&pool).await.expect("re-run migrations");
        let after_reapply = managed_schema_signature(&pool).await;
        assert_eq!(after_reapply, baseline, "reapplying should rebuild the identical schema");
    }

    /// Sorted (type, name, sql) rows for the tables and indexes the
    /// migrations own, ignoring sqlite-internal objects.
    async fn managed_schema_signature(pool: &sqlx::SqlitePool) -> Vec<(String, String, String)> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT type, name, IFNULL(sql, '')
             FROM sqlite_master
             WHERE type IN ('table', 'index')
             ORDER BY type, name",
        )
        .fetch_all(pool)
        .await
        .expect("load schema objects");

        rows.into_iter()
            .filter(|(_, name, _)| MANAGED_SCHEMA_OBJECTS.contains(&name.as_str()))
            .collect()
    }
}
