use crate::connection::DbPool;
use crate::repositories::RepositoryError;
use sqlx::Executor;

/// Canonical demo dataset and verification contract for the approval
/// workflow: one draft, two submitted, one approved, one rejected timesheet,
/// with two managers whose coverage splits the three projects.
const SEED_TIMESHEETS: &[SeedTimesheetContract] = &[
    SeedTimesheetContract {
        timesheet_id: "ts-draft-001",
        status: "draft",
        week_start: "2025-01-06",
        expected_entry_count: 2,
        decided_by: None,
        approval_comments: None,
        rejection_comments: None,
        description: "Draft week, not yet submitted",
    },
    SeedTimesheetContract {
        timesheet_id: "ts-submitted-001",
        status: "submitted",
        week_start: "2025-01-13",
        expected_entry_count: 3,
        decided_by: None,
        approval_comments: None,
        rejection_comments: None,
        description: "Submitted week spanning Alpha and Beta",
    },
    SeedTimesheetContract {
        timesheet_id: "ts-submitted-002",
        status: "submitted",
        week_start: "2025-01-20",
        expected_entry_count: 1,
        decided_by: None,
        approval_comments: None,
        rejection_comments: None,
        description: "Submitted week on Gamma only",
    },
    SeedTimesheetContract {
        timesheet_id: "ts-approved-001",
        status: "approved",
        week_start: "2024-12-16",
        expected_entry_count: 2,
        decided_by: Some("acct-admin-001"),
        approval_comments: Some("Looks good"),
        rejection_comments: None,
        description: "Approved by the org admin",
    },
    SeedTimesheetContract {
        timesheet_id: "ts-rejected-001",
        status: "rejected",
        week_start: "2024-12-23",
        expected_entry_count: 1,
        decided_by: Some("acct-mgr-001"),
        approval_comments: None,
        rejection_comments: Some("Missing Friday hours"),
        description: "Rejected with a reason by the Alpha/Beta manager",
    },
];

const SEED_ACCOUNT_IDS: &[&str] =
    &["acct-admin-001", "acct-mgr-001", "acct-mgr-002", "acct-emp-001"];

const SEED_PROJECT_IDS: &[&str] = &["proj-alpha", "proj-beta", "proj-gamma"];

const SEED_TIMESHEET_IDS: &[&str] =
    &["ts-draft-001", "ts-submitted-001", "ts-submitted-002", "ts-approved-001", "ts-rejected-001"];

const MANAGER_COVERAGE: &[(&str, &str, &str)] = &[
    ("acct-mgr-001", "proj-alpha", "mgr-001-manages-alpha"),
    ("acct-mgr-001", "proj-beta", "mgr-001-manages-beta"),
    ("acct-mgr-002", "proj-gamma", "mgr-002-manages-gamma"),
];

pub struct DemoDataset;

impl DemoDataset {
    /// SQL fixture content for the demo dataset.
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_seed_data.sql");

    /// Load the demo dataset into the database.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let timesheets_seeded = SEED_TIMESHEETS
            .iter()
            .map(|contract| TimesheetSeedInfo {
                timesheet_id: contract.timesheet_id,
                status: contract.status,
                description: contract.description,
            })
            .collect::<Vec<_>>();

        Ok(SeedResult { timesheets_seeded })
    }

    /// Verify that seed data exists and matches the contract.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let quoted_accounts = sql_array_from_ids(SEED_ACCOUNT_IDS);
        let account_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM account WHERE id IN {quoted_accounts}"
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("accounts", account_count == SEED_ACCOUNT_IDS.len() as i64));

        let admin_flag: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM account WHERE id = 'acct-admin-001' AND admin = 1)",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("admin-flag", admin_flag == 1));

        let quoted_projects = sql_array_from_ids(SEED_PROJECT_IDS);
        let project_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM project WHERE id IN {quoted_projects}"
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("projects", project_count == SEED_PROJECT_IDS.len() as i64));

        for (account_id, project_id, label) in MANAGER_COVERAGE {
            let managed: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM project_member
                 WHERE account_id = ?1 AND project_id = ?2 AND role = 'manager')",
            )
            .bind(account_id)
            .bind(project_id)
            .fetch_one(pool)
            .await?;
            checks.push((*label, managed == 1));
        }

        for contract in SEED_TIMESHEETS {
            let timesheet_exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM timesheet
                 WHERE id = ?1 AND status = ?2 AND week_start = ?3)",
            )
            .bind(contract.timesheet_id)
            .bind(contract.status)
            .bind(contract.week_start)
            .fetch_one(pool)
            .await?;
            checks.push((contract.timesheet_id, timesheet_exists == 1));

            let entry_count: i64 =
                sqlx::query_scalar("SELECT COUNT(1) FROM timesheet_entry WHERE timesheet_id = ?1")
                    .bind(contract.timesheet_id)
                    .fetch_one(pool)
                    .await?;
            checks.push((contract.entry_count_label(), entry_count == contract.expected_entry_count));

            checks.push((
                contract.decision_label(),
                Self::verify_decision_fields(pool, contract).await?,
            ));
        }

        let all_present = checks.iter().all(|(_, exists)| *exists);
        Ok(VerificationResult { all_present, checks })
    }

    async fn verify_decision_fields(
        pool: &DbPool,
        contract: &SeedTimesheetContract,
    ) -> Result<bool, RepositoryError> {
        let row = sqlx::query_as::<_, (Option<String>, Option<String>, Option<String>)>(
            "SELECT approved_by, approval_comments, rejection_comments
             FROM timesheet WHERE id = ?",
        )
        .bind(contract.timesheet_id)
        .fetch_one(pool)
        .await?;
        let (approved_by, approval_comments, rejection_comments) = row;

        if approved_by.as_deref() != contract.decided_by {
            return Ok(false);
        }
        if approval_comments.as_deref() != contract.approval_comments {
            return Ok(false);
        }
        if rejection_comments.as_deref() != contract.rejection_comments {
            return Ok(false);
        }
        // A decided sheet never carries both kinds of comments.
        if approval_comments.is_some() && rejection_comments.is_some() {
            return Ok(false);
        }

        Ok(true)
    }

    /// Clean up seeded fixtures from a test database.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        let quoted_timesheets = sql_array_from_ids(SEED_TIMESHEET_IDS);
        let quoted_projects = sql_array_from_ids(SEED_PROJECT_IDS);
        let quoted_accounts = sql_array_from_ids(SEED_ACCOUNT_IDS);

        sqlx::query(&format!(
            "DELETE FROM timesheet_entry WHERE timesheet_id IN {quoted_timesheets}"
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!("DELETE FROM timesheet WHERE id IN {quoted_timesheets}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM project_member WHERE project_id IN {quoted_projects}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM project WHERE id IN {quoted_projects}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM account WHERE id IN {quoted_accounts}"))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedTimesheetContract {
    timesheet_id: &'static str,
    status: &'static str,
    week_start: &'static str,
    expected_entry_count: i64,
    decided_by: Option<&'static str>,
    approval_comments: Option<&'static str>,
    rejection_comments: Option<&'static str>,
    description: &'static str,
}

impl SeedTimesheetContract {
    fn entry_count_label(&self) -> &'static str {
        match self.timesheet_id {
            "ts-draft-001" => "ts-draft-001-entry-count",
            "ts-submitted-001" => "ts-submitted-001-entry-count",
            "ts-submitted-002" => "ts-submitted-002-entry-count",
            "ts-approved-001" => "ts-approved-001-entry-count",
            _ => "ts-rejected-001-entry-count",
        }
    }

    fn decision_label(&self) -> &'static str {
        match self.timesheet_id {
            "ts-draft-001" => "ts-draft-001-decision-fields",
            "ts-submitted-001" => "ts-submitted-001-decision-fields",
            "ts-submitted-002" => "ts-submitted-002-decision-fields",
            "ts-approved-001" => "ts-approved-001-decision-fields",
            _ => "ts-rejected-001-decision-fields",
        }
    }
}

fn sql_array_from_ids(ids: &[&str]) -> String {
    let quoted = ids.iter().map(|id| format!("'{}'", id)).collect::<Vec<_>>().join(",");
    format!("({quoted})")
}

#[derive(Debug)]
pub struct SeedResult {
    pub timesheets_seeded: Vec<TimesheetSeedInfo>,
}

#[derive(Debug)]
pub struct TimesheetSeedInfo {
    pub timesheet_id: &'static str,
    pub status: &'static str,
    pub description: &'static str,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
