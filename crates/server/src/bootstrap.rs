use std::sync::Arc;

use axum::Router;
use thiserror::Error;
use tracing::info;

use timeclerk_core::config::{AppConfig, ConfigError, LoadOptions};
use timeclerk_db::repositories::{
    SqlAccountRepository, SqlAuditLog, SqlProjectRepository, SqlTimesheetRepository,
};
use timeclerk_db::{connect_with_settings, migrations, DbPool};
use timeclerk_notify::{
    Dispatcher, NoopTransport, NotificationTransport, NotifyError, WebhookTransport,
};

use crate::api;
use crate::workflow::ApprovalService;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub service: Arc<ApprovalService>,
    pub api_router: Router,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to connect to the database: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("failed to apply database migrations: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("notification transport init failed: {0}")]
    Notifier(#[source] NotifyError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Brings up the full application from an already-loaded config: database
/// pool, migrations, notification transport, approval service, API router.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let transport: Arc<dyn NotificationTransport> = if config.notifier.enabled() {
        Arc::new(
            WebhookTransport::new(
                config.notifier.endpoint.clone(),
                config.notifier.token.clone(),
                config.notifier.signing_secret.clone(),
                config.notifier.timeout_secs,
            )
            .map_err(BootstrapError::Notifier)?,
        )
    } else {
        Arc::new(NoopTransport)
    };
    info!(
        event_name = "system.bootstrap.notifier_ready",
        mode = if config.notifier.enabled() { "webhook" } else { "noop" },
        "notification transport initialized"
    );

    let service = Arc::new(ApprovalService::new(
        Arc::new(SqlTimesheetRepository::new(db_pool.clone())),
        Arc::new(SqlAccountRepository::new(db_pool.clone())),
        Arc::new(SqlProjectRepository::new(db_pool.clone())),
        Arc::new(SqlAuditLog::new(db_pool.clone())),
        Dispatcher::new(transport),
    ));

    let api_router = api::router(service.clone());

    Ok(Application { config, db_pool, service, api_router })
}
