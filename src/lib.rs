//! API gateway for HyperDAG services.
//!
//! Every authenticated request passes a tiered per-key rate limiter before it
//! reaches its handler; sensitive operations take a second, stricter pass.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};

pub mod auth;
pub mod config;
pub mod error;
pub mod grants;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod state;
pub mod sweeper;
pub mod tiers;

pub use config::Args;
pub use error::{ApiError, GatewayError};
pub use state::AppState;

// builds the full router; middleware order is auth -> general limiter -> strict limiter
pub fn router(state: Arc<AppState>) -> Router {
    // sensitive operations take the strict limiter on top of the general one
    let sensitive = Router::new()
        .route("/keys/rotate", post(handlers::rotate_key_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::strict_rate_limit_middleware,
        ));

    let limited = Router::new()
        .route("/grants", get(handlers::list_grants_handler))
        .route("/grants/match", post(handlers::match_grants_handler))
        .merge(sensitive)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_middleware,
        ));

    // usage reads quota without consuming it, so it sits outside the limiter layers
    let protected = Router::new()
        .route("/usage", get(handlers::usage_handler))
        .merge(limited)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .nest("/api/v1", protected)
        .with_state(state)
}
