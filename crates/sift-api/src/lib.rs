//! Search service and HTTP API for Sift.
//!
//! - [`service`]: [`SearchService`], shared by the HTTP layer and the CLI
//! - [`handlers`]: axum handlers over the service
//! - [`error`]: status-code mapping for the shared error type
//! - [`models`]: request and response bodies
//!
//! # Routes
//!
//! | Method | Path | |
//! |--------|------|---|
//! | `POST` | `/search` | JSON [`SearchRequest`] |
//! | `GET` | `/search` | same fields as a query string |
//! | `POST` | `/feedback` | JSON [`FeedbackRequest`]; 409 for an unknown log id |
//! | `GET` | `/analytics?days=` | [`sift_storage::AnalyticsReport`] |
//! | `GET` | `/health` | [`HealthReport`]; 503 when degraded |

pub mod error;
pub mod handlers;
pub mod models;
pub mod service;

pub use error::ApiError;
pub use handlers::AppState;
pub use models::{
    AnalyticsParams, BackendHealth, FeedbackRequest, FeedbackResponse, HealthReport, SearchHit,
    SearchRequest, SearchResponse, VectorHealth,
};
pub use service::{AnalyticsSettings, SearchService};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use sift_core::{Error, Result};

/// Build the router with every route.
pub fn create_router(service: Arc<SearchService>) -> Router {
    Router::new()
        .route(
            "/search",
            get(handlers::search_query).post(handlers::search_json),
        )
        .route("/feedback", post(handlers::feedback))
        .route("/analytics", get(handlers::analytics))
        .route("/health", get(handlers::health))
        .with_state(service)
}

/// Serve the API on `addr` until Ctrl-C, then flush pending event writes.
pub async fn serve(service: Arc<SearchService>, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::operation(format!("failed to bind {addr}: {e}")))?;
    tracing::info!("listening on http://{addr}");

    axum::serve(listener, create_router(Arc::clone(&service)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::operation(format!("server error: {e}")))?;

    service.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
