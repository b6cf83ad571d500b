use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Row};

use timeclerk_core::domain::account::AccountId;
use timeclerk_core::domain::project::ProjectId;
use timeclerk_core::domain::timesheet::{Timesheet, TimesheetEntry, TimesheetId, TimesheetStatus};

use super::{
    parse_date, parse_optional_timestamp, parse_timestamp, RepositoryError, TimesheetFilter,
    TimesheetRepository,
};
use crate::DbPool;

pub struct SqlTimesheetRepository {
    pool: DbPool,
}

impl SqlTimesheetRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl TimesheetRepository for SqlTimesheetRepository {
    async fn find_by_id(&self, id: &TimesheetId) -> Result<Option<Timesheet>, RepositoryError> {
        let row = sqlx::query(
            "SELECT
                id,
                account_id,
                week_start,
                status,
                submitted_at,
                approved_by,
                approved_at,
                approval_comments,
                rejection_comments,
                created_at,
                updated_at
             FROM timesheet
             WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(timesheet_from_row).transpose()
    }

    async fn save(&self, timesheet: Timesheet) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO timesheet (
                id,
                account_id,
                week_start,
                status,
                submitted_at,
                approved_by,
                approved_at,
                approval_comments,
                rejection_comments,
                created_at,
                updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                account_id = excluded.account_id,
                week_start = excluded.week_start,
                status = excluded.status,
                submitted_at = excluded.submitted_at,
                approved_by = excluded.approved_by,
                approved_at = excluded.approved_at,
                approval_comments = excluded.approval_comments,
                rejection_comments = excluded.rejection_comments,
                updated_at = excluded.updated_at",
        )
        .bind(&timesheet.id.0)
        .bind(&timesheet.account_id.0)
        .bind(timesheet.week_start.to_string())
        .bind(timesheet.status.as_str())
        .bind(timesheet.submitted_at.map(|value| value.to_rfc3339()))
        .bind(timesheet.approved_by.as_ref().map(|id| id.0.as_str()))
        .bind(timesheet.approved_at.map(|value| value.to_rfc3339()))
        .bind(timesheet.approval_comments.as_deref())
        .bind(timesheet.rejection_comments.as_deref())
        .bind(timesheet.created_at.to_rfc3339())
        .bind(timesheet.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, filter: &TimesheetFilter) -> Result<Vec<Timesheet>, RepositoryError> {
        let status = filter.status.map(|status| status.as_str().to_string());
        let account_id = filter.account_id.as_ref().map(|id| id.0.clone());

        let rows = sqlx::query(
            "SELECT
                id,
                account_id,
                week_start,
                status,
                submitted_at,
                approved_by,
                approved_at,
                approval_comments,
                rejection_comments,
                created_at,
                updated_at
             FROM timesheet
             WHERE (?1 IS NULL OR status = ?1)
               AND (?2 IS NULL OR account_id = ?2)
             ORDER BY week_start DESC, id ASC",
        )
        .bind(status)
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(timesheet_from_row).collect()
    }

    async fn list_entries(
        &self,
        id: &TimesheetId,
    ) -> Result<Vec<TimesheetEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT
                id,
                timesheet_id,
                project_id,
                work_date,
                hours,
                billable
             FROM timesheet_entry
             WHERE timesheet_id = ?
             ORDER BY work_date ASC, id ASC",
        )
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(entry_from_row).collect()
    }

    async fn save_entry(&self, entry: TimesheetEntry) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO timesheet_entry (
                id,
                timesheet_id,
                project_id,
                work_date,
                hours,
                billable
             ) VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                timesheet_id = excluded.timesheet_id,
                project_id = excluded.project_id,
                work_date = excluded.work_date,
                hours = excluded.hours,
                billable = excluded.billable",
        )
        .bind(&entry.id)
        .bind(&entry.timesheet_id.0)
        .bind(&entry.project_id.0)
        .bind(entry.work_date.to_string())
        .bind(entry.hours.to_string())
        .bind(i64::from(entry.billable))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn timesheet_from_row(row: SqliteRow) -> Result<Timesheet, RepositoryError> {
    let status_raw = row.try_get::<String, _>("status")?;
    let status = TimesheetStatus::parse(&status_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown timesheet status `{status_raw}`"))
    })?;

    Ok(Timesheet {
        id: TimesheetId(row.try_get("id")?),
        account_id: AccountId(row.try_get("account_id")?),
        week_start: parse_date("week_start", row.try_get("week_start")?)?,
        status,
        submitted_at: parse_optional_timestamp("submitted_at", row.try_get("submitted_at")?)?,
        approved_by: row.try_get::<Option<String>, _>("approved_by")?.map(AccountId),
        approved_at: parse_optional_timestamp("approved_at", row.try_get("approved_at")?)?,
        approval_comments: row.try_get("approval_comments")?,
        rejection_comments: row.try_get("rejection_comments")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}

fn entry_from_row(row: SqliteRow) -> Result<TimesheetEntry, RepositoryError> {
    let hours_raw = row.try_get::<String, _>("hours")?;
    let hours = Decimal::from_str(&hours_raw).map_err(|error| {
        RepositoryError::Decode(format!("invalid hours value `{hours_raw}` ({error})"))
    })?;

    Ok(TimesheetEntry {
        id: row.try_get("id")?,
        timesheet_id: TimesheetId(row.try_get("timesheet_id")?),
        project_id: ProjectId(row.try_get("project_id")?),
        work_date: parse_date("work_date", row.try_get("work_date")?)?,
        hours,
        billable: row.try_get::<i64, _>("billable")? != 0,
    })
}
