use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{
    ActorId, ApplicationId, ApplicationTerms, BorrowerRegistration, LenderRegistration,
    LenderResponse, OfferId, OfferTerms, PlatformParameters,
};
use super::engine::EligibilityResult;
use super::repository::{EventPublisher, MarketplaceRepository};
use super::service::{MarketplaceError, MarketplaceService};

/// Header carrying the authenticated caller identity.
pub const ACTOR_HEADER: &str = "x-actor-id";

type SharedService<R, E> = Arc<MarketplaceService<R, E>>;

/// Router builder exposing the marketplace operations over HTTP.
pub fn marketplace_router<R, E>(service: SharedService<R, E>) -> Router
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    Router::new()
        .route("/api/v1/lenders", post(register_lender_handler::<R, E>))
        .route("/api/v1/lenders/:lender_id", get(lender_handler::<R, E>))
        .route(
            "/api/v1/lenders/:lender_id/approve",
            post(approve_lender_handler::<R, E>),
        )
        .route(
            "/api/v1/lenders/:lender_id/loans",
            post(completed_loan_handler::<R, E>),
        )
        .route(
            "/api/v1/lenders/:lender_id/reputation",
            post(reputation_handler::<R, E>),
        )
        .route("/api/v1/borrowers", post(register_borrower_handler::<R, E>))
        .route(
            "/api/v1/borrowers/:borrower_id",
            get(borrower_handler::<R, E>),
        )
        .route(
            "/api/v1/borrowers/:borrower_id/verify",
            post(verify_borrower_handler::<R, E>),
        )
        .route("/api/v1/offers", post(create_offer_handler::<R, E>))
        .route("/api/v1/offers/:offer_id", get(offer_handler::<R, E>))
        .route(
            "/api/v1/offers/:offer_id/status",
            put(offer_status_handler::<R, E>),
        )
        .route("/api/v1/applications", post(submit_handler::<R, E>))
        .route(
            "/api/v1/applications/:application_id",
            get(status_handler::<R, E>),
        )
        .route(
            "/api/v1/applications/:application_id/withdraw",
            post(withdraw_handler::<R, E>),
        )
        .route(
            "/api/v1/applications/:application_id/eligibility/:offer_id",
            get(eligibility_handler::<R, E>),
        )
        .route(
            "/api/v1/applications/:application_id/matches",
            post(match_handler::<R, E>).get(matches_handler::<R, E>),
        )
        .route(
            "/api/v1/applications/:application_id/matches/:offer_id/response",
            post(respond_handler::<R, E>),
        )
        .route("/api/v1/comparisons", post(compare_handler::<R, E>))
        .route("/api/v1/platform/stats", get(stats_handler::<R, E>))
        .route(
            "/api/v1/platform/parameters",
            put(parameters_handler::<R, E>),
        )
        .route("/api/v1/platform/pause", put(pause_handler::<R, E>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct OfferStatusRequest {
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletedLoanRequest {
    pub rate_bps: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReputationRequest {
    pub delta: i16,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MatchResponseRequest {
    pub response: LenderResponse,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PauseRequest {
    pub paused: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ComparisonRequest {
    pub offer1: OfferId,
    pub offer2: OfferId,
    pub application_id: ApplicationId,
}

#[derive(Debug, Serialize)]
struct EligibilityView {
    #[serde(flatten)]
    evaluation: EligibilityResult,
    match_score: Option<u8>,
}

pub(crate) async fn register_lender_handler<R, E>(
    State(service): State<SharedService<R, E>>,
    headers: HeaderMap,
    axum::Json(registration): axum::Json<LenderRegistration>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    let caller = match actor(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    respond(
        StatusCode::CREATED,
        service.register_lender(&caller, registration, Utc::now()),
    )
}

pub(crate) async fn lender_handler<R, E>(
    State(service): State<SharedService<R, E>>,
    Path(lender_id): Path<String>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    respond(StatusCode::OK, service.lender(&ActorId(lender_id)))
}

pub(crate) async fn approve_lender_handler<R, E>(
    State(service): State<SharedService<R, E>>,
    headers: HeaderMap,
    Path(lender_id): Path<String>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    let caller = match actor(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        service.approve_lender(&caller, &ActorId(lender_id)),
    )
}

pub(crate) async fn completed_loan_handler<R, E>(
    State(service): State<SharedService<R, E>>,
    headers: HeaderMap,
    Path(lender_id): Path<String>,
    axum::Json(request): axum::Json<CompletedLoanRequest>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    let caller = match actor(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        service.record_completed_loan(&caller, &ActorId(lender_id), request.rate_bps),
    )
}

pub(crate) async fn reputation_handler<R, E>(
    State(service): State<SharedService<R, E>>,
    headers: HeaderMap,
    Path(lender_id): Path<String>,
    axum::Json(request): axum::Json<ReputationRequest>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    let caller = match actor(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        service.adjust_reputation(&caller, &ActorId(lender_id), request.delta),
    )
}

pub(crate) async fn register_borrower_handler<R, E>(
    State(service): State<SharedService<R, E>>,
    headers: HeaderMap,
    axum::Json(registration): axum::Json<BorrowerRegistration>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    let caller = match actor(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        service.register_borrower(&caller, registration),
    )
}

pub(crate) async fn borrower_handler<R, E>(
    State(service): State<SharedService<R, E>>,
    Path(borrower_id): Path<String>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    respond(StatusCode::OK, service.borrower(&ActorId(borrower_id)))
}

pub(crate) async fn verify_borrower_handler<R, E>(
    State(service): State<SharedService<R, E>>,
    headers: HeaderMap,
    Path(borrower_id): Path<String>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    let caller = match actor(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        service.verify_borrower(&caller, &ActorId(borrower_id)),
    )
}

pub(crate) async fn create_offer_handler<R, E>(
    State(service): State<SharedService<R, E>>,
    headers: HeaderMap,
    axum::Json(terms): axum::Json<OfferTerms>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    let caller = match actor(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    let created = service
        .create_offer(&caller, terms, Utc::now())
        .and_then(|offer_id| service.offer(offer_id));
    respond(StatusCode::CREATED, created)
}

pub(crate) async fn offer_handler<R, E>(
    State(service): State<SharedService<R, E>>,
    Path(offer_id): Path<u64>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    respond(StatusCode::OK, service.offer(OfferId(offer_id)))
}

pub(crate) async fn offer_status_handler<R, E>(
    State(service): State<SharedService<R, E>>,
    headers: HeaderMap,
    Path(offer_id): Path<u64>,
    axum::Json(request): axum::Json<OfferStatusRequest>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    let caller = match actor(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        service.update_offer_status(&caller, OfferId(offer_id), request.active),
    )
}

pub(crate) async fn submit_handler<R, E>(
    State(service): State<SharedService<R, E>>,
    headers: HeaderMap,
    axum::Json(terms): axum::Json<ApplicationTerms>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    let caller = match actor(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    let submitted = service
        .submit_application(&caller, terms, Utc::now())
        .and_then(|application_id| service.application_status(application_id));
    respond(StatusCode::ACCEPTED, submitted)
}

pub(crate) async fn status_handler<R, E>(
    State(service): State<SharedService<R, E>>,
    Path(application_id): Path<u64>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    respond(
        StatusCode::OK,
        service.application_status(ApplicationId(application_id)),
    )
}

pub(crate) async fn withdraw_handler<R, E>(
    State(service): State<SharedService<R, E>>,
    headers: HeaderMap,
    Path(application_id): Path<u64>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    let caller = match actor(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        service.withdraw_application(&caller, ApplicationId(application_id), Utc::now()),
    )
}

pub(crate) async fn eligibility_handler<R, E>(
    State(service): State<SharedService<R, E>>,
    Path((application_id, offer_id)): Path<(u64, u64)>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    let view = service
        .evaluate_eligibility(ApplicationId(application_id), OfferId(offer_id), Utc::now())
        .map(|evaluation| EligibilityView {
            match_score: service.compute_match_score(&evaluation),
            evaluation,
        });
    respond(StatusCode::OK, view)
}

pub(crate) async fn match_handler<R, E>(
    State(service): State<SharedService<R, E>>,
    headers: HeaderMap,
    Path(application_id): Path<u64>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    let caller = match actor(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        service.match_application(&caller, ApplicationId(application_id), Utc::now()),
    )
}

pub(crate) async fn matches_handler<R, E>(
    State(service): State<SharedService<R, E>>,
    Path(application_id): Path<u64>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    respond(
        StatusCode::OK,
        service.matches_for(ApplicationId(application_id)),
    )
}

pub(crate) async fn respond_handler<R, E>(
    State(service): State<SharedService<R, E>>,
    headers: HeaderMap,
    Path((application_id, offer_id)): Path<(u64, u64)>,
    axum::Json(request): axum::Json<MatchResponseRequest>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    let caller = match actor(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        service.respond_to_match(
            &caller,
            ApplicationId(application_id),
            OfferId(offer_id),
            request.response,
        ),
    )
}

pub(crate) async fn compare_handler<R, E>(
    State(service): State<SharedService<R, E>>,
    axum::Json(request): axum::Json<ComparisonRequest>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    respond(
        StatusCode::OK,
        service.compare_offers(request.offer1, request.offer2, request.application_id),
    )
}

pub(crate) async fn stats_handler<R, E>(State(service): State<SharedService<R, E>>) -> Response
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    respond(StatusCode::OK, service.platform_stats())
}

pub(crate) async fn parameters_handler<R, E>(
    State(service): State<SharedService<R, E>>,
    headers: HeaderMap,
    axum::Json(parameters): axum::Json<PlatformParameters>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    let caller = match actor(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        service.set_platform_parameters(&caller, parameters),
    )
}

pub(crate) async fn pause_handler<R, E>(
    State(service): State<SharedService<R, E>>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<PauseRequest>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    let caller = match actor(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    let stats = service
        .set_paused(&caller, request.paused)
        .and_then(|()| service.platform_stats());
    respond(StatusCode::OK, stats)
}

fn actor(headers: &HeaderMap) -> Result<ActorId, Response> {
    headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| ActorId(value.to_string()))
        .ok_or_else(|| {
            let payload = json!({
                "error": format!("missing {ACTOR_HEADER} header"),
            });
            (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
        })
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, MarketplaceError>) -> Response {
    match result {
        Ok(body) => (status, axum::Json(body)).into_response(),
        Err(error) => error.into_response(),
    }
}

impl MarketplaceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            MarketplaceError::OwnerOnly | MarketplaceError::Unauthorized => StatusCode::FORBIDDEN,
            MarketplaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            MarketplaceError::AlreadyExists { .. } | MarketplaceError::ApplicationClosed { .. } => {
                StatusCode::CONFLICT
            }
            MarketplaceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            MarketplaceError::PlatformPaused => StatusCode::SERVICE_UNAVAILABLE,
            MarketplaceError::Repository(_) | MarketplaceError::Publish(_) => match self.code() {
                101 => StatusCode::NOT_FOUND,
                106 => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for MarketplaceError {
    fn into_response(self) -> Response {
        let payload = json!({
            "error": self.to_string(),
            "code": self.code(),
            "symbol": self.symbol(),
        });
        (self.status_code(), axum::Json(payload)).into_response()
    }
}
