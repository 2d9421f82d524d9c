use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::SessionEntity,
    dto::{format_system_time, question::QuestionCard, validation::validate_answer_text},
    state::session_machine::SessionStatus,
};

/// Payload binding a fresh session to an assigned game.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    /// Game whose assignment set the session plays through.
    pub game_id: Uuid,
    /// Authenticated host; must own the game.
    pub host_id: Uuid,
}

/// Payload for host-driven lifecycle transitions (start, pause, resume,
/// complete, cancel).
#[derive(Debug, Deserialize, ToSchema)]
pub struct HostActionRequest {
    /// Authenticated host; must own the session.
    pub host_id: Uuid,
}

/// Projection of a session exposed to clients.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionSummary {
    /// Session identifier.
    pub id: Uuid,
    /// Game being played.
    pub game_id: Uuid,
    /// Owning host.
    pub host_id: Uuid,
    /// Current lifecycle status.
    pub status: SessionStatus,
    /// Total rounds of the game.
    pub total_rounds: u32,
    /// Questions per round of the game.
    pub questions_per_round: u32,
    /// 1-based current round pointer.
    pub current_round: u32,
    /// 0-based pointer to the next question within the current round.
    pub current_question_index: u32,
    /// Cumulative score.
    pub total_score: u32,
    /// RFC 3339 start timestamp, once started.
    pub started_at: Option<String>,
    /// RFC 3339 end timestamp, once terminal.
    pub ended_at: Option<String>,
    /// Total play duration in milliseconds, once completed.
    pub total_duration_ms: Option<u64>,
}

impl From<SessionEntity> for SessionSummary {
    fn from(session: SessionEntity) -> Self {
        Self {
            id: session.id,
            game_id: session.game_id,
            host_id: session.host_id,
            status: session.status,
            total_rounds: session.total_rounds,
            questions_per_round: session.questions_per_round,
            current_round: session.current_round,
            current_question_index: session.current_question_index,
            total_score: session.total_score,
            started_at: session.started_at.map(format_system_time),
            ended_at: session.ended_at.map(format_system_time),
            total_duration_ms: session.total_duration_ms,
        }
    }
}

/// Response returned when a session leaves setup.
#[derive(Debug, Serialize, ToSchema)]
pub struct StartGameResponse {
    /// The started session.
    pub session: SessionSummary,
    /// Presentation payload for round 1, question 1.
    pub first_question: QuestionCard,
}

/// Payload submitting one answer against an assignment.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubmitAnswerRequest {
    /// Authenticated host; must own the session.
    pub host_id: Uuid,
    /// Assignment the answer closes.
    pub assignment_id: Uuid,
    /// Submitted answer text.
    #[validate(custom(function = validate_answer_text))]
    pub answer: String,
    /// Time the player took to answer, in milliseconds.
    pub time_to_answer_ms: u64,
}

/// Outcome of one answer submission.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitAnswerResponse {
    /// Whether the submitted answer matched.
    pub is_correct: bool,
    /// The stored correct answer, revealed after submission.
    pub correct_answer: String,
    /// Session score after this answer.
    pub updated_score: u32,
    /// Whether this answer finished the current round.
    pub round_complete: bool,
    /// Whether this answer finished the whole game.
    pub game_complete: bool,
    /// Next question to present; absent when a round or the game just
    /// completed.
    pub next_question: Option<QuestionCard>,
}

/// Response returned when a paused session resumes.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResumeResponse {
    /// The resumed session.
    pub session: SessionSummary,
    /// The question the session was paused on.
    pub next_question: Option<QuestionCard>,
}

/// Per-round slice of a session summary, derived from answer records.
#[derive(Debug, Serialize, ToSchema, PartialEq)]
pub struct RoundBreakdown {
    /// 1-based round number.
    pub round_number: u32,
    /// Answers recorded in the round.
    pub answered: u32,
    /// Correct answers recorded in the round.
    pub correct: u32,
    /// `correct / answered`, or 0 when nothing was answered.
    pub accuracy: f64,
}

/// Aggregated view of a session, derived entirely from answer records.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameSummaryResponse {
    /// Session identifier.
    pub session_id: Uuid,
    /// Lifecycle status at the time of the request.
    pub status: SessionStatus,
    /// Cumulative score.
    pub total_score: u32,
    /// Total answers recorded.
    pub questions_answered: u32,
    /// Total correct answers recorded.
    pub correct_answers: u32,
    /// Total play duration in milliseconds, once completed.
    pub total_duration_ms: Option<u64>,
    /// Per-round accuracy breakdown.
    pub rounds: Vec<RoundBreakdown>,
}
