use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use timeclerk_db::DbPool;
use tracing::{error, info};

#[derive(Clone)]
struct HealthState {
    db_pool: DbPool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Readiness {
    Ready,
    Degraded,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ComponentReport {
    pub status: Readiness,
    pub detail: String,
}

impl ComponentReport {
    fn ready(detail: impl Into<String>) -> Self {
        Self { status: Readiness::Ready, detail: detail.into() }
    }

    fn degraded(detail: impl Into<String>) -> Self {
        Self { status: Readiness::Degraded, detail: detail.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: Readiness,
    pub version: &'static str,
    pub service: ComponentReport,
    pub database: ComponentReport,
    pub checked_at: String,
}

fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool })
}

/// Bind the health listener on its own port and serve it in the background.
pub async fn spawn(bind_address: &str, port: u16, db_pool: DbPool) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;
    let app = router(db_pool);

    info!(
        event_name = "system.health.start",
        bind_address = %address,
        "health listener accepting probes"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, app).await {
            error!(
                event_name = "system.health.error",
                error = %error,
                "health listener exited"
            );
        }
    });

    Ok(())
}

async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = probe_database(&state.db_pool).await;
    let status = database.status;

    let payload = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        service: ComponentReport::ready("timeclerk-server runtime initialized"),
        database,
        checked_at: Utc::now().to_rfc3339(),
    };

    let code = match status {
        Readiness::Ready => StatusCode::OK,
        Readiness::Degraded => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(payload))
}

async fn probe_database(pool: &DbPool) -> ComponentReport {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => ComponentReport::ready("database query succeeded"),
        Err(error) => ComponentReport::degraded(format!("database query failed: {error}")),
    }
}
