//! HTTP API server with observability for the theory-test booking
//! service.
//!
//! Exposes the booking journey over REST (start, pay, complete, cancel,
//! reschedule) with structured logging (tracing) and Prometheus metrics.
//! Remote systems are injected as trait objects so the same router runs
//! against HTTP gateways in production and in-memory services in tests.

pub mod config;
pub mod error;
pub mod routes;
pub mod session;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{BookingCoordinator, CancellationCoordinator};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::bookings::{AppState, DynNotifications, DynPayments, DynRecords, DynScheduling};
use session::SessionStore;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/bookings", post(routes::bookings::create))
        .route("/bookings/{id}", get(routes::bookings::get))
        .route("/bookings/{id}/payment", post(routes::bookings::begin_payment))
        .route(
            "/bookings/{id}/payment/complete",
            post(routes::bookings::complete_payment),
        )
        .route("/bookings/{id}/cancel", post(routes::bookings::cancel))
        .route(
            "/bookings/{id}/reschedule",
            post(routes::bookings::reschedule),
        )
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

/// Creates the application state over the given remote services.
pub fn create_state(
    scheduling: DynScheduling,
    records: DynRecords,
    payment: DynPayments,
    notifications: DynNotifications,
) -> Arc<AppState> {
    let coordinator = BookingCoordinator::new(
        scheduling.clone(),
        records.clone(),
        payment.clone(),
        notifications.clone(),
    );
    let cancellation = CancellationCoordinator::new(scheduling, records, payment, notifications);

    Arc::new(AppState {
        coordinator,
        cancellation,
        sessions: SessionStore::new(),
    })
}
