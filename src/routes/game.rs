use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        game::{
            AssignmentView, CreateGameRequest, GameView, GenerateRequest, GenerationReport,
            ReplaceQuestionRequest, ReplacementOptionsQuery,
        },
        question::QuestionSummary,
    },
    error::AppError,
    services::{assignment_service, game_service, replacement_service},
    state::SharedState,
};

/// Routes handling game registration, assignment generation, and question
/// replacement.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games", post(create_game))
        .route("/games/{id}", get(get_game))
        .route("/games/{id}/generate", post(generate_assignments))
        .route("/games/{id}/replacements", get(replacement_options))
        .route("/assignments/{id}/replace", post(replace_question))
}

/// Register a new game configuration.
#[utoipa::path(
    post,
    path = "/games",
    tag = "game",
    request_body = CreateGameRequest,
    responses(
        (status = 200, description = "Game registered", body = GameView),
        (status = 400, description = "Invalid game configuration")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateGameRequest>>,
) -> Result<Json<GameView>, AppError> {
    let game = game_service::create_game(&state, payload).await?;
    Ok(Json(game))
}

/// Fetch a stored game configuration.
#[utoipa::path(
    get,
    path = "/games/{id}",
    tag = "game",
    params(("id" = Uuid, Path, description = "Game identifier")),
    responses(
        (status = 200, description = "Game found", body = GameView),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn get_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameView>, AppError> {
    let game = game_service::find_game(&state, id).await?;
    Ok(Json(game))
}

/// Generate (or return) the full question assignment set for a game.
#[utoipa::path(
    post,
    path = "/games/{id}/generate",
    tag = "game",
    params(("id" = Uuid, Path, description = "Game identifier")),
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Assignment set generated or returned", body = GenerationReport),
        (status = 409, description = "Generation already in progress"),
        (status = 422, description = "Question pool cannot fill the game")
    )
)]
pub async fn generate_assignments(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<GenerationReport>, AppError> {
    let report = assignment_service::generate(&state, id, payload).await?;
    Ok(Json(report))
}

/// List same-category substitutes for an assigned question.
#[utoipa::path(
    get,
    path = "/games/{id}/replacements",
    tag = "game",
    params(
        ("id" = Uuid, Path, description = "Game identifier"),
        ("question_id" = Uuid, Query, description = "Question being replaced"),
        ("category" = String, Query, description = "Category to draw candidates from")
    ),
    responses(
        (status = 200, description = "Replacement candidates", body = [QuestionSummary]),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn replacement_options(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ReplacementOptionsQuery>,
) -> Result<Json<Vec<QuestionSummary>>, AppError> {
    let candidates = replacement_service::options(&state, id, query).await?;
    Ok(Json(candidates))
}

/// Swap the question bound to an assignment slot.
#[utoipa::path(
    post,
    path = "/assignments/{id}/replace",
    tag = "game",
    params(("id" = Uuid, Path, description = "Assignment identifier")),
    request_body = ReplaceQuestionRequest,
    responses(
        (status = 200, description = "Question replaced", body = AssignmentView),
        (status = 409, description = "Question already assigned in this game")
    )
)]
pub async fn replace_question(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReplaceQuestionRequest>,
) -> Result<Json<AssignmentView>, AppError> {
    let updated = replacement_service::replace(&state, id, payload).await?;
    Ok(Json(updated))
}
