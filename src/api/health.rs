//! Health check handler

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub services: IndexMap<String, &'static str>,
}

/// Process liveness plus a reachability check of one upstream provider
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut services = IndexMap::new();

    if let Some(provider) = state.aggregator.provider(&state.config.health_check_provider) {
        let reachable = provider.health_check().await;
        services.insert(
            provider.name().to_string(),
            if reachable { "OK" } else { "ERROR" },
        );
    }

    Json(HealthResponse {
        status: "OK",
        timestamp: Utc::now(),
        services,
    })
}
