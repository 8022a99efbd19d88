use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use basket_db::{DbPool, TransactionRepository};
use chrono::Utc;
use serde::Serialize;
use tracing::warn;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    repository: Arc<dyn TransactionRepository>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub database: HealthCheck,
    /// Informational only: an empty invoice table does not degrade readiness.
    pub dataset: HealthCheck,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool, repository: Arc<dyn TransactionRepository>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool, repository })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let ready = database.status == "ready";
    let dataset = if ready {
        dataset_check(state.repository.as_ref()).await
    } else {
        HealthCheck { status: "unknown", detail: "database unavailable".to_string() }
    };

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "basket-server runtime initialized".to_string(),
        },
        database,
        dataset,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match basket_db::ping(pool).await {
        Ok(()) => HealthCheck { status: "ready", detail: "database query succeeded".to_string() },
        Err(error) => {
            warn!(
                event_name = "system.health.database_degraded",
                correlation_id = "health",
                error = %error,
                "database readiness check failed"
            );
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}

async fn dataset_check(repository: &dyn TransactionRepository) -> HealthCheck {
    match repository.count_lines().await {
        Ok(0) => HealthCheck {
            status: "empty",
            detail: "no itemized invoice lines; mining will report empty input".to_string(),
        },
        Ok(lines) => {
            HealthCheck { status: "ready", detail: format!("{lines} itemized invoice lines") }
        }
        Err(error) => {
            HealthCheck { status: "unknown", detail: format!("invoice lines not countable: {error}") }
        }
    }
}
