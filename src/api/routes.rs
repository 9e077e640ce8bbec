//! Router construction and handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Extension, Json, Router,
};
use pipeline_agentic::{ConfigError, ReviewLoop};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

use super::auth::bearer_auth;
use super::error::{ApiError, ApiResult};
use super::state::AppState;
use super::types::{QueryInput, TaskResponse};
use crate::database::{MongoGateway, MONGODB};

/// Build the full axum router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    // Routes that require the bearer token
    let protected = Router::new()
        .route("/analyze_db", post(analyze_db))
        .layer(axum_mw::from_fn(bearer_auth));

    // Public routes (no auth)
    let public = Router::new().route("/health", get(health));

    public
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(Extension(state))
}

pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// POST /analyze_db
pub async fn analyze_db(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<QueryInput>, JsonRejection>,
) -> ApiResult<Json<TaskResponse>> {
    let Json(input) = payload?;
    let span = tracing::info_span!(
        "analyze_db",
        request_id = %Uuid::new_v4(),
        model = %input.llm_name,
        database = %input.database_name,
    );
    answer_query(state, input).instrument(span).await
}

async fn answer_query(state: Arc<AppState>, input: QueryInput) -> ApiResult<Json<TaskResponse>> {
    tracing::info!("Query: {}", input.query);

    let llm = state.llm_factory.create(&input.llm_name)?;
    if input.database_type != MONGODB {
        return Err(ConfigError::UnsupportedDatabase(input.database_type).into());
    }

    let client = state
        .mongo
        .client(&input.connection_url)
        .await
        .map_err(|e| ApiError::InvalidConnection(e.to_string()))?;
    let gateway = MongoGateway::new(
        &client,
        &input.database_name,
        input.collection_list.clone(),
        state.mongo_settings.clone(),
    );

    let request = input.to_query_request(state.max_iterations);
    let answer = ReviewLoop::new(llm, Arc::new(gateway))
        .answer(&request)
        .await?;

    tracing::info!(
        "Answered with {:?} after {} iteration(s)",
        answer.kind,
        answer.iterations
    );
    Ok(Json(TaskResponse::output(answer.output)))
}
