use serde::Serialize;
use timeclerk_core::config::{AppConfig, LoadOptions};
use timeclerk_db::{connect_with_settings, migrations};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

impl CheckStatus {
    fn marker(self) -> &'static str {
        match self {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skipped(name: &'static str) -> Self {
        Self {
            name,
            status: CheckStatus::Skipped,
            details: "not run; configuration failed to load".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

impl DoctorReport {
    fn from_checks(checks: Vec<DoctorCheck>) -> Self {
        let failed = checks.iter().filter(|check| check.status == CheckStatus::Fail).count();
        let (overall_status, summary) = if failed == 0 {
            (CheckStatus::Pass, "doctor: all readiness checks passed".to_string())
        } else {
            (CheckStatus::Fail, format!("doctor: {failed} of {} checks failed", checks.len()))
        };
        Self { overall_status, summary, checks }
    }

    fn render_human(&self) -> String {
        let mut lines = vec![self.summary.clone()];
        for check in &self.checks {
            lines.push(format!("- [{}] {}: {}", check.status.marker(), check.name, check.details));
        }
        lines.join("\n")
    }

    fn render_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|error| {
            serde_json::json!({
                "overall_status": "fail",
                "summary": "doctor serialization failed",
                "error": error.to_string(),
            })
            .to_string()
        })
    }
}

pub fn run(json_output: bool) -> String {
    let report = build_report();
    if json_output {
        report.render_json()
    } else {
        report.render_human()
    }
}

fn build_report() -> DoctorReport {
    let checks = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => vec![
            DoctorCheck::pass("config_validation", "configuration resolved and validated"),
            check_database_connectivity(&config),
            check_migration_status(&config),
            check_notifier_configured(&config),
        ],
        Err(error) => vec![
            DoctorCheck::fail("config_validation", error.to_string()),
            DoctorCheck::skipped("database_connectivity"),
            DoctorCheck::skipped("migration_status"),
            DoctorCheck::skipped("notifier_configured"),
        ],
    };

    DoctorReport::from_checks(checks)
}

fn check_database_connectivity(config: &AppConfig) -> DoctorCheck {
    match run_on_pool(config, |_| async { Ok(()) }) {
        Ok(()) => DoctorCheck::pass(
            "database_connectivity",
            format!("reachable at `{}`", config.database.url),
        ),
        Err(error) => DoctorCheck::fail("database_connectivity", error),
    }
}

fn check_migration_status(config: &AppConfig) -> DoctorCheck {
    let total = migrations::total_count();
    let applied = run_on_pool(config, |pool| async move {
        migrations::applied_count(&pool)
            .await
            .map_err(|error| format!("failed to read migration ledger: {error}"))
    });

    match applied {
        Ok(applied) if applied >= total => {
            DoctorCheck::pass("migration_status", format!("all {total} migration(s) applied"))
        }
        Ok(applied) => DoctorCheck::fail(
            "migration_status",
            format!("{applied} of {total} migration(s) applied; run `timeclerk migrate`"),
        ),
        Err(error) => DoctorCheck::fail("migration_status", error),
    }
}

fn check_notifier_configured(config: &AppConfig) -> DoctorCheck {
    if !config.notifier.enabled() {
        return DoctorCheck::pass(
            "notifier_configured",
            "delivery disabled; endpoint not configured",
        );
    }

    let auth = match (&config.notifier.token, &config.notifier.signing_secret) {
        (Some(_), Some(_)) => "bearer token and signing secret",
        (Some(_), None) => "bearer token",
        (None, Some(_)) => "signing secret",
        (None, None) => "no credentials",
    };
    DoctorCheck::pass(
        "notifier_configured",
        format!("delivery enabled to `{}` with {auth}", config.notifier.endpoint),
    )
}

/// Run one async check against a short-lived pool on a private runtime.
fn run_on_pool<T, F, Fut>(config: &AppConfig, check: F) -> Result<T, String>
where
    F: FnOnce(timeclerk_db::DbPool) -> Fut,
    Fut: std::future::Future<Output = Result<T, String>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| format!("failed to initialize async runtime: {error}"))?;

    runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

        let outcome = check(pool.clone()).await;
        pool.close().await;
        outcome
    })
}
