//! LLM Fan-out Gateway
//!
//! Forwards one natural-language query to several LLM providers at once and
//! returns every provider's answer (or classified error) in a single response.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub mod aggregator;
pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod query;
pub mod rate_limit;

use aggregator::Aggregator;
use config::Config;
use rate_limit::ClientRateLimiter;

const MIN_BODY_BYTES: usize = 64 * 1024;
/// Worst case JSON encoding of one character (a `\uXXXX\uXXXX` surrogate pair)
const MAX_ENCODED_CHAR_BYTES: usize = 12;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub aggregator: Arc<Aggregator>,
    pub limiter: Arc<ClientRateLimiter>,
}

impl AppState {
    /// Build the shared HTTP client and one adapter per configured provider
    pub fn from_config(config: Config) -> Result<Self, reqwest::Error> {
        let client = llm::build_client(config.request_timeout)?;
        let providers = llm::build_providers(&config.providers, &client);
        let aggregator = Aggregator::new(
            providers,
            config.request_timeout,
            config.mode.exposes_details(),
        );
        let limiter = rate_limit::build_limiter(&config.rate_limit);

        Ok(AppState {
            config: Arc::new(config),
            aggregator: Arc::new(aggregator),
            limiter,
        })
    }
}

/// Build the application router: JSON API, rate limiting, CORS and static assets
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let static_files = ServeDir::new(&state.config.static_dir);
    let body_limit = body_limit(state.config.max_query_length);

    Router::new()
        .route("/get-responses", post(api::responses::get_responses))
        .route("/health", get(api::health::health))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::enforce,
        ))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .fallback_service(static_files)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Large enough for any query within `max_query_length`, however it is encoded
fn body_limit(max_query_length: usize) -> usize {
    max_query_length
        .saturating_mul(MAX_ENCODED_CHAR_BYTES)
        .saturating_add(1024)
        .max(MIN_BODY_BYTES)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origin = match &config.allowed_origins {
        Some(origins) => AllowOrigin::list(origins.iter().filter_map(|o| {
            match HeaderValue::from_str(o) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin: {}", o);
                    None
                }
            }
        })),
        None => AllowOrigin::any(),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}
