use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::session::{
        CreateSessionRequest, GameSummaryResponse, HostActionRequest, ResumeResponse,
        SessionSummary, StartGameResponse, SubmitAnswerRequest, SubmitAnswerResponse,
    },
    error::AppError,
    services::session_service,
    state::SharedState,
};

/// Routes driving a session through its lifecycle.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{id}/start", post(start_game))
        .route("/sessions/{id}/answers", post(submit_answer))
        .route("/sessions/{id}/pause", post(pause_session))
        .route("/sessions/{id}/resume", post(resume_session))
        .route("/sessions/{id}/complete", post(complete_game))
        .route("/sessions/{id}/cancel", post(cancel_session))
        .route("/sessions/{id}/summary", get(session_summary))
}

/// Bind a fresh session to a game.
#[utoipa::path(
    post,
    path = "/sessions",
    tag = "session",
    request_body = CreateSessionRequest,
    responses(
        (status = 200, description = "Session created", body = SessionSummary),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn create_session(
    State(state): State<SharedState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<Json<SessionSummary>, AppError> {
    let session = session_service::create_session(&state, payload).await?;
    Ok(Json(session))
}

/// Start a session over its game's generated assignment set.
#[utoipa::path(
    post,
    path = "/sessions/{id}/start",
    tag = "session",
    params(("id" = Uuid, Path, description = "Session identifier")),
    request_body = HostActionRequest,
    responses(
        (status = 200, description = "Session started", body = StartGameResponse),
        (status = 409, description = "Session already started")
    )
)]
pub async fn start_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<HostActionRequest>,
) -> Result<Json<StartGameResponse>, AppError> {
    let started = session_service::start_game(&state, id, payload.host_id).await?;
    Ok(Json(started))
}

/// Submit one answer for the session's current question.
#[utoipa::path(
    post,
    path = "/sessions/{id}/answers",
    tag = "session",
    params(("id" = Uuid, Path, description = "Session identifier")),
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Answer recorded", body = SubmitAnswerResponse),
        (status = 409, description = "Answer already submitted for this question")
    )
)]
pub async fn submit_answer(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<SubmitAnswerRequest>>,
) -> Result<Json<SubmitAnswerResponse>, AppError> {
    let outcome = session_service::submit_answer(&state, id, payload).await?;
    Ok(Json(outcome))
}

/// Suspend an in-progress session.
#[utoipa::path(
    post,
    path = "/sessions/{id}/pause",
    tag = "session",
    params(("id" = Uuid, Path, description = "Session identifier")),
    request_body = HostActionRequest,
    responses(
        (status = 200, description = "Session paused", body = SessionSummary),
        (status = 409, description = "Session is not in progress")
    )
)]
pub async fn pause_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<HostActionRequest>,
) -> Result<Json<SessionSummary>, AppError> {
    let session = session_service::pause(&state, id, payload.host_id).await?;
    Ok(Json(session))
}

/// Resume a paused session on the question it was paused on.
#[utoipa::path(
    post,
    path = "/sessions/{id}/resume",
    tag = "session",
    params(("id" = Uuid, Path, description = "Session identifier")),
    request_body = HostActionRequest,
    responses(
        (status = 200, description = "Session resumed", body = ResumeResponse),
        (status = 409, description = "Session is not paused")
    )
)]
pub async fn resume_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<HostActionRequest>,
) -> Result<Json<ResumeResponse>, AppError> {
    let resumed = session_service::resume(&state, id, payload.host_id).await?;
    Ok(Json(resumed))
}

/// Finish a session early by host decision.
#[utoipa::path(
    post,
    path = "/sessions/{id}/complete",
    tag = "session",
    params(("id" = Uuid, Path, description = "Session identifier")),
    request_body = HostActionRequest,
    responses(
        (status = 200, description = "Session completed", body = GameSummaryResponse),
        (status = 409, description = "Session is already terminal")
    )
)]
pub async fn complete_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<HostActionRequest>,
) -> Result<Json<GameSummaryResponse>, AppError> {
    let summary = session_service::complete_game(&state, id, payload.host_id).await?;
    Ok(Json(summary))
}

/// Abandon a session without recording statistics.
#[utoipa::path(
    post,
    path = "/sessions/{id}/cancel",
    tag = "session",
    params(("id" = Uuid, Path, description = "Session identifier")),
    request_body = HostActionRequest,
    responses(
        (status = 200, description = "Session cancelled", body = SessionSummary),
        (status = 409, description = "Session is already terminal")
    )
)]
pub async fn cancel_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<HostActionRequest>,
) -> Result<Json<SessionSummary>, AppError> {
    let session = session_service::cancel(&state, id, payload.host_id).await?;
    Ok(Json(session))
}

/// Per-round accuracy breakdown of a session.
#[utoipa::path(
    get,
    path = "/sessions/{id}/summary",
    tag = "session",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Session summary", body = GameSummaryResponse),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn session_summary(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameSummaryResponse>, AppError> {
    let summary = session_service::summary(&state, id).await?;
    Ok(Json(summary))
}
