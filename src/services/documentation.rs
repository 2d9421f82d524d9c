use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Quiz Night Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::game::create_game,
        crate::routes::game::get_game,
        crate::routes::game::generate_assignments,
        crate::routes::game::replacement_options,
        crate::routes::game::replace_question,
        crate::routes::session::create_session,
        crate::routes::session::start_game,
        crate::routes::session::submit_answer,
        crate::routes::session::pause_session,
        crate::routes::session::resume_session,
        crate::routes::session::complete_game,
        crate::routes::session::cancel_session,
        crate::routes::session::session_summary,
        crate::routes::stats::host_stats,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::game::CreateGameRequest,
            crate::dto::game::GameView,
            crate::dto::game::GenerateRequest,
            crate::dto::game::GenerationStatus,
            crate::dto::game::GenerationReport,
            crate::dto::game::RoundPlan,
            crate::dto::game::AssignmentView,
            crate::dto::game::ReplaceQuestionRequest,
            crate::dto::question::QuestionSummary,
            crate::dto::question::QuestionCard,
            crate::dto::session::CreateSessionRequest,
            crate::dto::session::HostActionRequest,
            crate::dto::session::SessionSummary,
            crate::dto::session::StartGameResponse,
            crate::dto::session::SubmitAnswerRequest,
            crate::dto::session::SubmitAnswerResponse,
            crate::dto::session::ResumeResponse,
            crate::dto::session::RoundBreakdown,
            crate::dto::session::GameSummaryResponse,
            crate::dto::stats::HostStatsResponse,
            crate::dao::models::Category,
            crate::dao::models::RoundStatus,
            crate::state::session_machine::SessionStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "game", description = "Game registration, assignment generation, and replacement"),
        (name = "session", description = "Session lifecycle and answer submission"),
        (name = "stats", description = "Per-host lifetime statistics"),
    )
)]
pub struct ApiDoc;
