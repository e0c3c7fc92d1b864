//! HTTP request handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use sift_storage::AnalyticsReport;

use crate::error::ApiError;
use crate::models::{
    AnalyticsParams, FeedbackRequest, FeedbackResponse, HealthReport, SearchRequest,
    SearchResponse,
};
use crate::service::SearchService;

/// Shared state handed to every handler.
pub type AppState = Arc<SearchService>;

/// `POST /search`
#[tracing::instrument(name = "search", skip_all)]
pub async fn search_json(
    State(service): State<AppState>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(request) = body?;
    Ok(Json(service.search(request).await?))
}

/// `GET /search?q=…&mode=…&limit=…`
#[tracing::instrument(name = "search", skip_all)]
pub async fn search_query(
    State(service): State<AppState>,
    params: Result<Query<SearchRequest>, QueryRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Query(request) = params?;
    Ok(Json(service.search(request).await?))
}

/// `POST /feedback`
#[tracing::instrument(name = "feedback", skip_all)]
pub async fn feedback(
    State(service): State<AppState>,
    body: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<FeedbackResponse>), ApiError> {
    let Json(request) = body?;
    let response = service.submit_feedback(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// `GET /analytics?days=…`
#[tracing::instrument(name = "analytics", skip_all)]
pub async fn analytics(
    State(service): State<AppState>,
    params: Result<Query<AnalyticsParams>, QueryRejection>,
) -> Result<Json<AnalyticsReport>, ApiError> {
    let Query(params) = params?;
    let report = service
        .analytics(params.days, params.top_n, params.recent_k)
        .await?;
    Ok(Json(report))
}

/// `GET /health`
pub async fn health(State(service): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let report = service.health().await;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}
