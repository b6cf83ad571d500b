pub mod config;
pub mod doctor;
pub mod migrate;
pub mod seed;

use serde::Serialize;
use timeclerk_core::config::{AppConfig, LoadOptions};
use timeclerk_db::{connect_with_settings, migrations, DbPool};

/// Outcome of one subcommand run: a single line of output plus the process
/// exit code the binary should return.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

/// A classified failure: which rung of the error ladder it is, what to
/// print, and the exit code operators script against.
#[derive(Debug, Clone)]
pub struct CommandFailure {
    pub error_class: &'static str,
    pub message: String,
    pub exit_code: u8,
}

impl CommandFailure {
    pub fn new(error_class: &'static str, message: impl Into<String>, exit_code: u8) -> Self {
        Self { error_class, message: message.into(), exit_code }
    }
}

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum Status {
    Ok,
    Error,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: &'static str,
    status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_class: Option<&'static str>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &'static str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command,
            status: Status::Ok,
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(&payload) }
    }

    pub fn failure(command: &'static str, failure: CommandFailure) -> Self {
        let payload = CommandOutcome {
            command,
            status: Status::Error,
            error_class: Some(failure.error_class),
            message: failure.message,
        };
        Self { exit_code: failure.exit_code, output: serialize_payload(&payload) }
    }
}

/// Shared preamble for commands that work against the database: load and
/// validate config, stand up a current-thread runtime, connect, and apply
/// pending migrations. The task runs against the migrated pool, which is
/// closed afterwards whether the task succeeds or fails.
pub(crate) fn with_migrated_database<T, F, Fut>(task: F) -> Result<T, CommandFailure>
where
    F: FnOnce(DbPool) -> Fut,
    Fut: std::future::Future<Output = Result<T, CommandFailure>>,
{
    let config = AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandFailure::new("config_validation", format!("configuration issue: {error}"), 2)
    })?;

    let runtime =
        tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
            CommandFailure::new(
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            )
        })?;

    runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| CommandFailure::new("db_connectivity", error.to_string(), 4))?;

        let migrated = migrations::run_pending(&pool)
            .await
            .map_err(|error| CommandFailure::new("migration", error.to_string(), 5));

        let outcome = match migrated {
            Ok(()) => task(pool.clone()).await,
            Err(failure) => Err(failure),
        };
        pool.close().await;
        outcome
    })
}

fn serialize_payload(payload: &CommandOutcome) -> String {
    serde_json::to_string(payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
