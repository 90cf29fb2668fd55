//! HTTP front door of the shipment process engine.
//!
//! Starts shipment processes, reports their committed state and journal,
//! and exposes health and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use event_store::EventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{
    InMemoryCarrierService, InMemoryCollectionService, InMemoryDocumentService, ProcessEngine,
    Services,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::processes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: EventStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/{id}",
            post(routes::processes::start::<S>).get(routes::processes::status::<S>),
        )
        .route("/{id}/events", get(routes::processes::events::<S>))
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

/// Creates application state backed by the in-memory collaborators.
pub fn create_state<S: EventStore + Clone + 'static>(
    event_store: S,
    config: &Config,
) -> Arc<AppState<S>> {
    let services = Services::new(
        Arc::new(InMemoryCarrierService::new()),
        Arc::new(InMemoryDocumentService::new()),
        Arc::new(InMemoryCollectionService::with_booking_delay(
            config.booking_delay(),
        )),
    );
    let engine = ProcessEngine::new(event_store, services).with_settings(config.engine_settings());

    Arc::new(AppState { engine })
}

/// Creates application state with the default configuration.
pub fn create_default_state<S: EventStore + Clone + 'static>(event_store: S) -> Arc<AppState<S>> {
    create_state(event_store, &Config::default())
}
