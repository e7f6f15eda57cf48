//! Gateway REST API

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tabula_core::{QueryRecord, ScalarValue, TableDescriptor, TabulaError};
use uuid::Uuid;

use crate::insights::{self, QuickInsights, Suggestions};
use crate::metrics::MetricsSnapshot;
use crate::pipeline::{QueryOutcome, QueryPipeline, QueryRequest, SessionContext, SqlSource};

const DEFAULT_HISTORY_LIMIT: usize = 10;

#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<SessionContext>,
    pub pipeline: Arc<QueryPipeline>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/health", get(health))
        .route("/ready", get(ready))
        // Queries
        .route("/api/v1/query", post(run_query))
        // Schema
        .route("/api/v1/schema", get(get_schema))
        .route("/api/v1/schema/refresh", post(refresh_schema))
        // History
        .route("/api/v1/history", get(get_history).delete(clear_history))
        // Insights
        .route("/api/v1/stats", get(get_stats))
        .route("/api/v1/insights", get(get_insights))
        .route("/api/v1/suggestions", get(get_suggestions))
        .route("/api/v1/metrics", get(get_metrics))
        .with_state(state)
}

/// Error response carrying the taxonomy code and HTTP status
#[derive(Debug)]
pub struct ApiError(pub TabulaError);

impl From<TabulaError> for ApiError {
    fn from(err: TabulaError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(serde_json::json!({ "error": self.0.to_body() }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

async fn health() -> &'static str {
    "OK"
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub connected: bool,
    pub generator: Option<String>,
}

async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    Json(ReadyResponse {
        connected: state.ctx.is_connected(),
        generator: state.ctx.generator().map(|g| g.name().to_string()),
    })
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub request_id: Uuid,
    pub question: String,
    pub sql: String,
    pub source: SqlSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Vec<ScalarValue>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<tabula_core::error::ErrorBody>,
}

impl QueryResponse {
    /// Body plus the status of the outcome: 200, or the error's own status
    pub fn from_outcome(outcome: QueryOutcome) -> (StatusCode, Self) {
        let mut response = Self {
            request_id: outcome.request_id,
            question: outcome.question,
            sql: outcome.sql,
            source: outcome.source,
            columns: None,
            rows: None,
            row_count: None,
            error: None,
        };

        let status = match outcome.result {
            Ok(result) => {
                response.row_count = Some(result.row_count());
                response.columns = Some(result.columns);
                response.rows = Some(result.rows);
                StatusCode::OK
            }
            Err(e) => {
                let status =
                    StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                response.error = Some(e.to_body());
                status
            }
        };
        (status, response)
    }
}

pub(crate) async fn run_query(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<(StatusCode, Json<QueryResponse>), ApiError> {
    req.validate()?;
    state.pipeline.ensure_connected(&state.ctx).await?;

    let outcome = state.pipeline.run(&state.ctx, req).await;
    let (status, body) = QueryResponse::from_outcome(outcome);
    Ok((status, Json(body)))
}

#[derive(Serialize)]
pub struct SchemaResponse {
    pub schema_text: String,
    pub tables: Vec<TableDescriptor>,
}

pub(crate) async fn get_schema(State(state): State<AppState>) -> ApiResult<SchemaResponse> {
    let snapshot = state.pipeline.ensure_connected(&state.ctx).await?;
    Ok(Json(SchemaResponse {
        schema_text: snapshot.schema_text.clone(),
        tables: snapshot.catalog.tables().to_vec(),
    }))
}

pub(crate) async fn refresh_schema(State(state): State<AppState>) -> ApiResult<SchemaResponse> {
    let snapshot = state.pipeline.connect(&state.ctx).await?;
    Ok(Json(SchemaResponse {
        schema_text: snapshot.schema_text.clone(),
        tables: snapshot.catalog.tables().to_vec(),
    }))
}

#[derive(Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

pub(crate) async fn get_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> ApiResult<Vec<QueryRecord>> {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let records = state
        .ctx
        .history()
        .recent(limit)
        .await
        .map_err(TabulaError::from)?;
    Ok(Json(records))
}

pub(crate) async fn clear_history(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state
        .ctx
        .history()
        .clear()
        .await
        .map_err(TabulaError::from)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn get_stats(State(state): State<AppState>) -> ApiResult<BTreeMap<String, i64>> {
    let snapshot = state.pipeline.ensure_connected(&state.ctx).await?;
    Ok(Json(
        insights::table_stats(state.ctx.executor(), &snapshot.catalog).await,
    ))
}

pub(crate) async fn get_insights(State(state): State<AppState>) -> Json<QuickInsights> {
    Json(insights::quick_insights(state.ctx.executor()).await)
}

pub(crate) async fn get_suggestions(State(state): State<AppState>) -> Json<Suggestions> {
    Json(insights::suggestions(&state.ctx.snapshot().catalog))
}

pub(crate) async fn get_metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.pipeline.metrics().snapshot())
}
