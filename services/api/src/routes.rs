use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use mortgage_match::error::AppError;
use mortgage_match::marketplace::engine::amortization::{closing_costs, compute_payment};
use mortgage_match::marketplace::{
    marketplace_router, EventPublisher, MarketplaceError, MarketplaceRepository,
    MarketplaceService, PaymentQuote,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct QuoteRequest {
    pub(crate) principal: u64,
    pub(crate) rate_bps: u32,
    pub(crate) term_months: u32,
    #[serde(default)]
    pub(crate) points_bps: u32,
    #[serde(default)]
    pub(crate) origination_fee_bps: u32,
    #[serde(default)]
    pub(crate) closing_cost_estimate: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuoteResponse {
    #[serde(flatten)]
    pub(crate) quote: PaymentQuote,
    pub(crate) closing_costs: u64,
}

pub(crate) fn with_marketplace_routes<R, E>(
    service: Arc<MarketplaceService<R, E>>,
) -> axum::Router
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    marketplace_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/v1/quote", axum::routing::post(quote_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Stateless amortization quote; no offer or application is involved.
pub(crate) async fn quote_endpoint(
    Json(request): Json<QuoteRequest>,
) -> Result<Json<QuoteResponse>, AppError> {
    quote(&request).map(Json)
}

pub(crate) fn quote(request: &QuoteRequest) -> Result<QuoteResponse, AppError> {
    let quote = compute_payment(request.principal, request.rate_bps, request.term_months)
        .map_err(MarketplaceError::from)?;
    let closing_costs = closing_costs(
        request.principal,
        request.points_bps,
        request.origination_fee_bps,
        request.closing_cost_estimate,
    )
    .map_err(MarketplaceError::from)?;

    Ok(QuoteResponse {
        quote,
        closing_costs,
    })
}
