//! HTTP API server for sale fulfillment.
//!
//! Exposes `POST /sales` to fulfill a sale and `GET /sales/{id}` to read one
//! back, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod seed;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use fulfillment::{ArtifactStore, FulfillmentOrchestrator, Notifier, OrchestratorConfig};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::sales::{AppState, SalesStore};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: SalesStore>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route("/sales", post(routes::sales::create::<S>))
        .route("/sales/{id}", get(routes::sales::get::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state around a store and its outbound services.
pub fn create_state<S: SalesStore>(
    store: S,
    artifacts: Arc<dyn ArtifactStore>,
    notifier: Arc<dyn Notifier>,
    config: &Config,
) -> Arc<AppState<S>> {
    let orchestrator = FulfillmentOrchestrator::new(store, artifacts, notifier)
        .with_config(OrchestratorConfig::with_step_timeout(config.step_timeout));

    Arc::new(AppState {
        orchestrator,
        environment: config.environment.clone(),
    })
}
