use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use super::domain::{CandidateJobLink, LinkId, Viewer};
use super::protocol::TransitionError;
use super::repository::{LinkRepository, NotificationPublisher, RepositoryError};
use super::service::{DisclosureService, DisclosureServiceError};
use super::visibility::{project, LinkView};
use super::wire::{
    AdvanceRequest, ApiResponse, AssessmentRequest, CompanyNoteRequest, ErrorCode,
    ExpressInterestRequest,
    InterestResponseRequest, InterviewResponseRequest, ScheduleInterviewRequest,
    SurfaceCandidateRequest, ViewerQuery, WithdrawRequest,
};

type SharedService<R, N> = Arc<DisclosureService<R, N>>;
type ViewerParam = Result<Query<ViewerQuery>, QueryRejection>;

/// Router builder exposing the disclosure workflow over HTTP.
pub fn disclosure_router<R, N>(service: SharedService<R, N>) -> Router
where
    R: LinkRepository + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route("/api/v1/links", post(surface_handler::<R, N>))
        .route("/api/v1/links/:link_id", get(fetch_handler::<R, N>))
        .route("/api/v1/interests", post(express_interest_handler::<R, N>))
        .route(
            "/api/v1/links/:link_id/interest-response",
            post(interest_response_handler::<R, N>),
        )
        .route(
            "/api/v1/links/:link_id/interview-response",
            post(interview_response_handler::<R, N>),
        )
        .route(
            "/api/v1/links/:link_id/interview-schedule",
            post(schedule_handler::<R, N>),
        )
        .route(
            "/api/v1/links/:link_id/advance",
            post(advance_handler::<R, N>),
        )
        .route(
            "/api/v1/links/:link_id/assessment",
            post(assessment_handler::<R, N>),
        )
        .route(
            "/api/v1/links/:link_id/withdraw",
            post(withdraw_handler::<R, N>),
        )
        .route(
            "/api/v1/links/:link_id/notes",
            post(note_handler::<R, N>),
        )
        .with_state(service)
}

pub(crate) async fn surface_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    viewer: ViewerParam,
    body: Result<Json<SurfaceCandidateRequest>, JsonRejection>,
) -> Response
where
    R: LinkRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let (viewer, request) = match extract(viewer, body) {
        Ok(parts) => parts,
        Err(response) => return response,
    };

    match service.surface_candidate(&viewer, request) {
        Ok(link) => created(&link, &viewer),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn fetch_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(link_id): Path<String>,
    viewer: ViewerParam,
) -> Response
where
    R: LinkRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let viewer = match viewer_from(viewer) {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };

    respond(service.fetch_link(&viewer, &LinkId(link_id)))
}

pub(crate) async fn express_interest_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    viewer: ViewerParam,
    body: Result<Json<ExpressInterestRequest>, JsonRejection>,
) -> Response
where
    R: LinkRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let (viewer, request) = match extract(viewer, body) {
        Ok(parts) => parts,
        Err(response) => return response,
    };

    respond(service.express_interest(&viewer, &request.candidate_id, &request.job_id))
}

pub(crate) async fn interest_response_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(link_id): Path<String>,
    viewer: ViewerParam,
    body: Result<Json<InterestResponseRequest>, JsonRejection>,
) -> Response
where
    R: LinkRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let (viewer, request) = match extract(viewer, body) {
        Ok(parts) => parts,
        Err(response) => return response,
    };

    respond(service.respond_to_interest(
        &viewer,
        &LinkId(link_id),
        request.accepted,
        request.reason,
    ))
}

pub(crate) async fn interview_response_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(link_id): Path<String>,
    viewer: ViewerParam,
    body: Result<Json<InterviewResponseRequest>, JsonRejection>,
) -> Response
where
    R: LinkRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let (viewer, request) = match extract(viewer, body) {
        Ok(parts) => parts,
        Err(response) => return response,
    };

    respond(service.respond_to_interview_invite(&viewer, &LinkId(link_id), request.accepted))
}

pub(crate) async fn schedule_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(link_id): Path<String>,
    viewer: ViewerParam,
    body: Result<Json<ScheduleInterviewRequest>, JsonRejection>,
) -> Response
where
    R: LinkRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let (viewer, request) = match extract(viewer, body) {
        Ok(parts) => parts,
        Err(response) => return response,
    };

    respond(service.schedule_interview(&viewer, &LinkId(link_id), request.interview_date))
}

pub(crate) async fn advance_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(link_id): Path<String>,
    viewer: ViewerParam,
    body: Result<Json<AdvanceRequest>, JsonRejection>,
) -> Response
where
    R: LinkRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let (viewer, request) = match extract(viewer, body) {
        Ok(parts) => parts,
        Err(response) => return response,
    };

    respond(service.advance(&viewer, &LinkId(link_id), request.to))
}

pub(crate) async fn assessment_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(link_id): Path<String>,
    viewer: ViewerParam,
    body: Result<Json<AssessmentRequest>, JsonRejection>,
) -> Response
where
    R: LinkRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let (viewer, request) = match extract(viewer, body) {
        Ok(parts) => parts,
        Err(response) => return response,
    };

    respond(service.record_assessment(&viewer, &LinkId(link_id), request.completed))
}

pub(crate) async fn withdraw_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(link_id): Path<String>,
    viewer: ViewerParam,
    body: Result<Json<WithdrawRequest>, JsonRejection>,
) -> Response
where
    R: LinkRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let (viewer, request) = match extract(viewer, body) {
        Ok(parts) => parts,
        Err(response) => return response,
    };

    respond(service.withdraw(&viewer, &LinkId(link_id), request.reason))
}

pub(crate) async fn note_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(link_id): Path<String>,
    viewer: ViewerParam,
    body: Result<Json<CompanyNoteRequest>, JsonRejection>,
) -> Response
where
    R: LinkRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let (viewer, request) = match extract(viewer, body) {
        Ok(parts) => parts,
        Err(response) => return response,
    };

    respond(service.add_company_note(&viewer, &LinkId(link_id), &request.note))
}

fn viewer_from(param: ViewerParam) -> Result<Viewer, Response> {
    param
        .map(|Query(query)| Viewer::from(query))
        .map_err(|rejection| bad_request(rejection.body_text()))
}

fn extract<T>(
    viewer: ViewerParam,
    body: Result<Json<T>, JsonRejection>,
) -> Result<(Viewer, T), Response> {
    let viewer = viewer_from(viewer)?;
    let Json(request) = body.map_err(|rejection| bad_request(rejection.body_text()))?;
    Ok((viewer, request))
}

fn respond(result: Result<LinkView, DisclosureServiceError>) -> Response {
    match result {
        Ok(link) => (StatusCode::OK, Json(ApiResponse::Link { link })).into_response(),
        Err(error) => error_response(error),
    }
}

fn created(link: &CandidateJobLink, viewer: &Viewer) -> Response {
    let link = project(link, viewer.role);
    (StatusCode::CREATED, Json(ApiResponse::Link { link })).into_response()
}

fn bad_request(message: String) -> Response {
    let payload = ApiResponse::Error {
        code: ErrorCode::BadRequest,
        message,
    };
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}

pub(crate) fn error_response(error: DisclosureServiceError) -> Response {
    let (status, code) = match &error {
        DisclosureServiceError::Transition(TransitionError::IllegalTransition { .. })
        | DisclosureServiceError::Repository(RepositoryError::Conflict) => {
            (StatusCode::CONFLICT, ErrorCode::IllegalTransition)
        }
        DisclosureServiceError::Transition(TransitionError::RoleNotPermitted { .. })
        | DisclosureServiceError::Unauthorized { .. } => {
            (StatusCode::FORBIDDEN, ErrorCode::Unauthorized)
        }
        DisclosureServiceError::Repository(RepositoryError::NotFound) => {
            (StatusCode::NOT_FOUND, ErrorCode::NotFound)
        }
        DisclosureServiceError::Repository(RepositoryError::Unavailable(_)) => {
            (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::Unavailable)
        }
        DisclosureServiceError::EmptyNote => (StatusCode::BAD_REQUEST, ErrorCode::BadRequest),
    };

    let payload = ApiResponse::Error {
        code,
        message: error.to_string(),
    };
    (status, Json(payload)).into_response()
}
