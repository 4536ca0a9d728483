//! # HTTP Server
//!
//! An `axum`-based web server that accepts alerts and manages blackout
//! periods. Every received alert is handed to the `AlertPipeline`; the
//! outcome decides the response status:
//!
//! * `201 Created` when the alert is accepted,
//! * `202 Accepted` when it was dropped because of a blackout,
//! * `403 Forbidden` when a policy plugin rejected it,
//! * `500 Internal Server Error` when a plugin failed.
//!
//! The server shuts down gracefully when the shutdown channel fires.

use crate::blackout::{BlackoutError, BlackoutStore, NewBlackout};
use crate::config::Config;
use crate::core::{Alert, ProcessOverrides};
use crate::pipeline::{AlertPipeline, ProcessError};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, trace};

/// Shared state for all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AlertPipeline>,
    pub blackouts: Arc<dyn BlackoutStore>,
    pub config: Arc<Config>,
    pub prom_handle: Option<PrometheusHandle>,
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/alert", post(receive_alert))
        .route("/plugins", get(list_plugins))
        .route("/blackouts", get(list_blackouts))
        .route("/blackout", post(create_blackout))
        .route("/blackout/{id}", delete(delete_blackout))
        .route("/management/healthcheck", get(healthcheck));

    if state.prom_handle.is_some() {
        app = app.route("/metrics", get(render_metrics));
    }
    app.with_state(state)
}

async fn receive_alert(
    State(state): State<AppState>,
    Query(overrides): Query<ProcessOverrides>,
    Json(alert): Json<Alert>,
) -> Response {
    match state.pipeline.process_alert(alert, overrides).await {
        Ok(alert) => (
            StatusCode::CREATED,
            Json(json!({ "status": "ok", "id": alert.id, "alert": alert })),
        )
            .into_response(),
        Err(ProcessError::Blackout(message)) => (
            StatusCode::ACCEPTED,
            Json(json!({ "status": "ok", "message": message })),
        )
            .into_response(),
        Err(ProcessError::Rejected(message)) => (
            StatusCode::FORBIDDEN,
            Json(json!({ "status": "error", "message": message })),
        )
            .into_response(),
        Err(e @ ProcessError::PluginFailed { .. }) => {
            error!("{}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "message": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn list_plugins(State(state): State<AppState>) -> Json<serde_json::Value> {
    let plugins = state.pipeline.plugins().names();
    Json(json!({ "status": "ok", "plugins": plugins }))
}

async fn list_blackouts(State(state): State<AppState>) -> Json<serde_json::Value> {
    let now = Utc::now();
    let blackouts: Vec<_> = state
        .blackouts
        .list()
        .into_iter()
        .map(|b| {
            let status = if b.is_active(now) {
                "active"
            } else if now < b.start_time {
                "pending"
            } else {
                "expired"
            };
            let priority = b.priority();
            json!({ "blackout": b, "status": status, "priority": priority })
        })
        .collect();
    Json(json!({ "status": "ok", "total": blackouts.len(), "blackouts": blackouts }))
}

async fn create_blackout(
    State(state): State<AppState>,
    Json(request): Json<NewBlackout>,
) -> Response {
    let blackout = state
        .config
        .blackout_duration()
        .and_then(|default| request.into_blackout(Utc::now(), default));
    match blackout {
        Ok(blackout) => {
            let blackout = state.blackouts.create(blackout);
            (
                StatusCode::CREATED,
                Json(json!({ "status": "ok", "id": blackout.id, "blackout": blackout })),
            )
                .into_response()
        }
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": "error", "message": e.to_string() })),
        )
            .into_response(),
    }
}

async fn delete_blackout(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.blackouts.delete(&id) {
        Ok(()) => Json(json!({ "status": "ok" })).into_response(),
        Err(e @ BlackoutError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "status": "error", "message": e.to_string() })),
        )
            .into_response(),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": "error", "message": e.to_string() })),
        )
            .into_response(),
    }
}

async fn healthcheck() -> &'static str {
    "OK"
}

async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.prom_handle {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// The alert receiving server.
pub struct AlertServer {
    listener: TcpListener,
    state: AppState,
    shutdown_rx: watch::Receiver<bool>,
}

impl AlertServer {
    /// Creates a new `AlertServer` but does not spawn it.
    ///
    /// # Arguments
    ///
    /// * `listener` - A `TcpListener` that has already been bound to an address.
    /// * `state` - The handler state.
    /// * `shutdown_rx` - A watch channel receiver for graceful shutdown.
    pub fn new(listener: TcpListener, state: AppState, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            listener,
            state,
            shutdown_rx,
        }
    }

    /// Returns a future that runs the server until a shutdown signal is received.
    pub fn run(self) -> impl Future<Output = ()> {
        let app = router(self.state);
        let mut shutdown_rx = self.shutdown_rx;
        let listener = self.listener;

        async move {
            if let Ok(addr) = listener.local_addr() {
                info!(%addr, "Alert server listening");
            }
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.changed().await;
                    trace!("Alert server received shutdown signal.");
                })
                .await;
            if let Err(e) = result {
                error!("Alert server error: {}", e);
            }
            trace!("Alert server task finished.");
        }
    }
}
