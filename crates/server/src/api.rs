//! Market basket JSON API.
//!
//! - `GET /api/association_rules`          — full rule listing
//! - `GET /api/recommendations/{item_id}`  — items ranked by lift for one antecedent item
//! - `GET /api/invoice_itemized`           — raw itemized invoice rows
//!
//! "Nothing found" outcomes are answered with `200` and `success: false`;
//! parameter errors with `400`; exhausted mining budgets and storage failures
//! with `503`.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use basket_core::config::MiningConfig;
use basket_core::errors::{ApplicationError, DomainError, InterfaceError};
use basket_core::mining::{
    MarketBasketEngine, MiningParams, MiningResult, RecommendationResponse, RuleCache,
    RulesResponse,
};
use basket_core::{RuleMetric, TransactionRecord};
use basket_db::{InvoiceLine, TransactionRepository};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct ApiState {
    repository: Arc<dyn TransactionRepository>,
    mining: MiningConfig,
    cache: Option<Arc<RuleCache>>,
}

impl ApiState {
    pub fn new(repository: Arc<dyn TransactionRepository>, mining: MiningConfig) -> Self {
        let cache = mining.cache_enabled.then(|| Arc::new(RuleCache::default()));
        Self { repository, mining, cache }
    }

    fn engine(&self, params: MiningParams) -> MarketBasketEngine {
        let engine = MarketBasketEngine::new(params);
        match &self.cache {
            Some(cache) => engine.with_cache(Arc::clone(cache)),
            None => engine,
        }
    }
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct RulesQuery {
    pub min_support: Option<f64>,
    pub min_threshold: Option<f64>,
    pub metric: Option<String>,
}

impl RulesQuery {
    fn params(&self, defaults: &MiningConfig) -> MiningResult<MiningParams> {
        let mut params = defaults.to_params();
        if let Some(min_support) = self.min_support {
            params = params.with_min_support(min_support);
        }
        if let Some(min_threshold) = self.min_threshold {
            params = params.with_min_threshold(min_threshold);
        }
        if let Some(metric) = &self.metric {
            let metric = metric.parse::<RuleMetric>().map_err(DomainError::InvalidParameter)?;
            params = params.with_metric(metric);
        }
        Ok(params)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RecommendationsQuery {
    pub top_k: Option<usize>,
    pub min_support: Option<f64>,
    pub min_threshold: Option<f64>,
}

impl RecommendationsQuery {
    fn params(&self, defaults: &MiningConfig) -> MiningParams {
        let mut params = defaults.to_params();
        if let Some(top_k) = self.top_k {
            params = params.with_top_k(top_k);
        }
        if let Some(min_support) = self.min_support {
            params = params.with_min_support(min_support);
        }
        if let Some(min_threshold) = self.min_threshold {
            params = params.with_min_threshold(min_threshold);
        }
        params
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error_class: String,
    pub message: String,
    pub user_message: String,
    pub correlation_id: String,
}

#[derive(Debug)]
pub struct ApiError(InterfaceError);

impl ApiError {
    fn from_application(error: ApplicationError, correlation_id: &str) -> Self {
        let interface = error.into_interface(correlation_id);
        warn!(
            event_name = "api.request.failed",
            correlation_id,
            error_class = interface.error_class(),
            error = %interface,
            "request failed"
        );
        Self(interface)
    }

    fn rejected(rejection: &QueryRejection, correlation_id: &str) -> Self {
        Self(InterfaceError::BadRequest {
            message: rejection.body_text(),
            correlation_id: correlation_id.to_owned(),
        })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // internal details stay in the logs
        let message = match &self.0 {
            InterfaceError::Internal { .. } => self.0.user_message().to_owned(),
            other => other.message().to_owned(),
        };
        let body = ApiErrorBody {
            error_class: self.0.error_class().to_owned(),
            message,
            user_message: self.0.user_message().to_owned(),
            correlation_id: self.0.correlation_id().to_owned(),
        };
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/association_rules", get(association_rules))
        .route("/api/recommendations/{item_id}", get(recommendations))
        .route("/api/invoice_itemized", get(invoice_itemized))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn association_rules(
    State(state): State<ApiState>,
    query: Result<Query<RulesQuery>, QueryRejection>,
) -> Result<Json<RulesResponse>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let Query(query) = query.map_err(|rejection| ApiError::rejected(&rejection, &correlation_id))?;
    let params = query
        .params(&state.mining)
        .map_err(|error| ApiError::from_application(error.into(), &correlation_id))?;

    let records = load_records(&state, &correlation_id).await?;
    let engine = state.engine(params);
    let response =
        run_mining(state.mining.deadline_ms, &correlation_id, move || engine.rules_response(&records))
            .await?;

    info!(
        event_name = "api.rules.served",
        correlation_id = %correlation_id,
        success = response.success,
        rules = response.rules_count.unwrap_or(0),
        "association rules served"
    );
    Ok(Json(response))
}

async fn recommendations(
    State(state): State<ApiState>,
    Path(item_id): Path<String>,
    query: Result<Query<RecommendationsQuery>, QueryRejection>,
) -> Result<Json<RecommendationResponse>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let Query(query) = query.map_err(|rejection| ApiError::rejected(&rejection, &correlation_id))?;
    let params = query.params(&state.mining);

    let records = load_records(&state, &correlation_id).await?;
    let engine = state.engine(params);
    let job_item = item_id.clone();
    let response = run_mining(state.mining.deadline_ms, &correlation_id, move || {
        engine.recommendations_response(&records, &job_item)
    })
    .await?;

    info!(
        event_name = "api.recommendations.served",
        correlation_id = %correlation_id,
        item_id = %item_id,
        success = response.success,
        returned = response.recommendations.len(),
        "recommendations served"
    );
    Ok(Json(response))
}

async fn invoice_itemized(
    State(state): State<ApiState>,
) -> Result<Json<Vec<InvoiceLine>>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let lines = state.repository.list_lines().await.map_err(|error| {
        storage_failure(&correlation_id, ApplicationError::Persistence(error.to_string()))
    })?;

    info!(
        event_name = "api.invoice_itemized.served",
        correlation_id = %correlation_id,
        lines = lines.len(),
        "itemized invoice rows served"
    );
    Ok(Json(lines))
}

async fn load_records(
    state: &ApiState,
    correlation_id: &str,
) -> Result<Vec<TransactionRecord>, ApiError> {
    state.repository.list_records().await.map_err(|error| {
        storage_failure(correlation_id, ApplicationError::Persistence(error.to_string()))
    })
}

fn storage_failure(correlation_id: &str, error: ApplicationError) -> ApiError {
    error!(
        event_name = "api.storage.failed",
        correlation_id,
        error = %error,
        "invoice data could not be loaded"
    );
    ApiError::from_application(error, correlation_id)
}

/// Runs a mining job off the async workers, bounded by `deadline_ms` (0 = no bound).
async fn run_mining<T, F>(deadline_ms: u64, correlation_id: &str, job: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> MiningResult<T> + Send + 'static,
{
    let task = tokio::task::spawn_blocking(job);
    let joined = if deadline_ms == 0 {
        task.await
    } else {
        tokio::time::timeout(Duration::from_millis(deadline_ms), task).await.map_err(|_| {
            // The blocking job cannot be cancelled; it keeps running until the
            // engine's own between-levels deadline stops it.
            warn!(
                event_name = "api.mining.abandoned",
                correlation_id,
                deadline_ms,
                "mining job left running after the request deadline"
            );
            ApiError::from_application(ApplicationError::Timeout(deadline_ms), correlation_id)
        })?
    };

    let outcome = joined.map_err(|join_error| {
        error!(
            event_name = "api.mining.task_failed",
            correlation_id,
            error = %join_error,
            "mining task did not complete"
        );
        ApiError(InterfaceError::Internal {
            message: format!("mining task failed: {join_error}"),
            correlation_id: correlation_id.to_owned(),
        })
    })?;

    outcome.map_err(|error| ApiError::from_application(error.into(), correlation_id))
}
