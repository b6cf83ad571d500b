use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use timeclerk_cli::commands::{config, doctor, migrate, seed};

#[test]
fn migrate_applies_schema_on_fresh_database() {
    with_env(&[("TIMECLERK_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("schema is current"), "unexpected message: {message}");
    });
}

#[test]
fn migrate_rejects_non_sqlite_database_url() {
    with_env(&[("TIMECLERK_DATABASE_URL", "postgres://timeclerk@localhost/timeclerk")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("database.url"), "error should name the field: {message}");
    });
}

#[test]
fn seed_loads_demo_dataset() {
    with_env(&[("TIMECLERK_DATABASE_URL", "sqlite::memory:")], || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected successful seed run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");

        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("demo dataset loaded with 5 timesheets"));
        assert!(message.contains("  - ts-draft-001 [draft]: Draft week, not yet submitted"));
        assert!(message.contains("  - ts-submitted-001 [submitted]:"));
        assert!(message.contains("  - ts-rejected-001 [rejected]:"));
    });
}

#[test]
fn seed_reports_identical_summary_across_runs() {
    with_env(&[("TIMECLERK_DATABASE_URL", "sqlite::memory:")], || {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        let first_payload = parse_payload(&first.output);

        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");
        let second_payload = parse_payload(&second.output);

        assert_eq!(first_payload["message"], second_payload["message"]);
    });
}

#[test]
fn doctor_flags_pending_migrations_on_fresh_database() {
    with_env(&[("TIMECLERK_DATABASE_URL", "sqlite::memory:")], || {
        let report = parse_payload(&doctor::run(true));

        assert_eq!(report["overall_status"], "fail");
        assert_eq!(check(&report, "config_validation")["status"], "pass");
        assert_eq!(check(&report, "database_connectivity")["status"], "pass");

        let migration_check = check(&report, "migration_status");
        assert_eq!(migration_check["status"], "fail");
        let details = migration_check["details"].as_str().unwrap_or("");
        assert!(details.contains("timeclerk migrate"), "unexpected details: {details}");

        let notifier_check = check(&report, "notifier_configured");
        assert_eq!(notifier_check["status"], "pass");
        let details = notifier_check["details"].as_str().unwrap_or("");
        assert!(details.contains("delivery disabled"), "unexpected details: {details}");
    });
}

#[test]
fn doctor_passes_against_migrated_database() {
    let db_path = temp_db_path("doctor-pass");
    cleanup_db_files(&db_path);
    let url = format!("sqlite://{}?mode=rwc", db_path.display());

    with_env(&[("TIMECLERK_DATABASE_URL", &url)], || {
        let migrated = migrate::run();
        assert_eq!(migrated.exit_code, 0, "expected migrate to succeed on file database");

        let report = parse_payload(&doctor::run(true));
        assert_eq!(report["overall_status"], "pass");
        assert_eq!(check(&report, "migration_status")["status"], "pass");
    });

    cleanup_db_files(&db_path);
}

#[test]
fn doctor_skips_dependent_checks_when_config_is_invalid() {
    with_env(&[("TIMECLERK_DATABASE_URL", "postgres://timeclerk@localhost/timeclerk")], || {
        let report = parse_payload(&doctor::run(true));

        assert_eq!(report["overall_status"], "fail");
        assert_eq!(check(&report, "config_validation")["status"], "fail");
        assert_eq!(check(&report, "database_connectivity")["status"], "skipped");
        assert_eq!(check(&report, "migration_status")["status"], "skipped");
        assert_eq!(check(&report, "notifier_configured")["status"], "skipped");
    });
}

#[test]
fn config_redacts_notifier_secrets() {
    with_env(
        &[
            ("TIMECLERK_DATABASE_URL", "sqlite::memory:"),
            ("TIMECLERK_NOTIFIER_ENDPOINT", "https://hooks.example.test/timeclerk"),
            ("TIMECLERK_NOTIFIER_TOKEN", "tok-secret-value"),
        ],
        || {
            let output = config::run();

            assert!(output.contains(
                "- database.url = sqlite::memory: (source: env (TIMECLERK_DATABASE_URL))"
            ));
            assert!(output.contains(
                "- notifier.token = <redacted> (source: env (TIMECLERK_NOTIFIER_TOKEN))"
            ));
            assert!(output.contains("- notifier.signing_secret = <unset> (source: default)"));
            assert!(output.contains("- server.port = 8460 (source: default)"));
            assert!(!output.contains("tok-secret-value"), "secret value leaked into output");
        },
    );
}

#[test]
fn config_reports_validation_failure() {
    with_env(&[("TIMECLERK_DATABASE_URL", "postgres://timeclerk@localhost/timeclerk")], || {
        let output = config::run();
        assert!(output.starts_with("config validation failed:"), "unexpected output: {output}");
        assert!(output.contains("database.url"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn check<'a>(report: &'a Value, name: &str) -> &'a Value {
    report["checks"]
        .as_array()
        .expect("doctor report should list checks")
        .iter()
        .find(|entry| entry["name"] == name)
        .unwrap_or_else(|| panic!("doctor report should include check `{name}`"))
}

fn temp_db_path(tag: &str) -> PathBuf {
    env::temp_dir().join(format!("timeclerk-cli-{tag}-{}.db", std::process::id()))
}

fn cleanup_db_files(path: &Path) {
    for suffix in ["", "-wal", "-shm"] {
        let _ = fs::remove_file(format!("{}{suffix}", path.display()));
    }
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "TIMECLERK_DATABASE_URL",
        "TIMECLERK_DATABASE_MAX_CONNECTIONS",
        "TIMECLERK_DATABASE_TIMEOUT_SECS",
        "TIMECLERK_SERVER_BIND_ADDRESS",
        "TIMECLERK_SERVER_PORT",
        "TIMECLERK_SERVER_HEALTH_CHECK_PORT",
        "TIMECLERK_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "TIMECLERK_NOTIFIER_ENDPOINT",
        "TIMECLERK_NOTIFIER_TOKEN",
        "TIMECLERK_NOTIFIER_SIGNING_SECRET",
        "TIMECLERK_NOTIFIER_TIMEOUT_SECS",
        "TIMECLERK_LOGGING_LEVEL",
        "TIMECLERK_LOG_LEVEL",
        "TIMECLERK_LOGGING_FORMAT",
        "TIMECLERK_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
