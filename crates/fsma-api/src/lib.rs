//! # fsma-api — State-Machine Transitions over HTTP
//!
//! Exposes every transition declared on an entity's state field as a
//! `POST` action, plus a discovery route listing the transitions the
//! caller may run right now.
//!
//! ## API Surface
//!
//! | Prefix            | Module                 | Domain          |
//! |-------------------|------------------------|-----------------|
//! | `/v1/documents/*` | [`routes::documents`]  | Review workflow |
//! | `/v1/licenses/*`  | [`routes::licenses`]   | License lifecycle |
//! | `/health/*`       | this module            | Probes          |
//! | `/metrics`        | [`middleware::metrics`] | Counters       |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```
//!
//! ## Building Blocks
//!
//! - [`viewset::TransitionViewSet`] — how a resource loads, saves and
//!   renders its entities.
//! - [`action::build_transition_handler`] — one action per transition.
//! - [`mixin::build_transition_mixin`] — all actions of one state field,
//!   mounted as routes.

pub mod action;
pub mod auth;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod mixin;
pub mod routes;
pub mod state;
pub mod viewset;

use axum::middleware::from_fn;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use fsma_core::TableError;

use crate::auth::AuthConfig;
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health checks and `/metrics` are mounted outside the auth middleware.
/// Fails only if an entity's transition table is malformed.
pub fn app(state: AppState) -> Result<Router, TableError> {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = ApiMetrics::new();

    let api = Router::new()
        .merge(routes::documents::router(&state)?)
        .merge(routes::licenses::router(&state)?)
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .layer(axum::Extension(metrics.clone()))
        .with_state(state);

    let unauthenticated = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(middleware::metrics::render_metrics))
        .layer(axum::Extension(metrics));

    Ok(Router::new().merge(unauthenticated).merge(api))
}

/// Liveness check: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness check: returns 200 when the application is ready to serve.
async fn readiness() -> &'static str {
    "ready"
}
