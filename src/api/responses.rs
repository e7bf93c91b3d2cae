//! Multi-provider query handler

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Deserialize;
use tracing::Instrument;

use crate::aggregator::AggregateResponse;
use crate::error::AppError;
use crate::query::Query;
use crate::AppState;

// ============ Types ============

#[derive(Debug, Deserialize)]
pub struct ResponsesRequest {
    /// Kept untyped so a non-string query is a validation error, not a parse error
    #[serde(default)]
    pub query: Option<serde_json::Value>,
}

// ============ Handler ============

/// Fan the query out to every provider and return all outcomes
pub async fn get_responses(
    State(state): State<AppState>,
    payload: Result<Json<ResponsesRequest>, JsonRejection>,
) -> Result<Json<AggregateResponse>, AppError> {
    let Json(req) = payload?;
    let query = Query::from_json(req.query.as_ref(), state.config.max_query_length)?;

    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("get_responses", %request_id);

    let response = state
        .aggregator
        .fan_out(&query)
        .instrument(span)
        .await
        .map_err(|e| AppError::internal(e, state.config.mode))?;

    Ok(Json(response))
}
