use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::session_machine::SessionStatus;

/// Closed set of trivia categories the question bank is tagged with.
///
/// Keeping this an enum (rather than free-form strings) makes the balanced
/// distribution arithmetic total: every selected category is a known key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// General knowledge.
    General,
    /// Natural sciences.
    Science,
    /// World and national history.
    History,
    /// Geography and places.
    Geography,
    /// Sports and athletes.
    Sports,
    /// Film, television, and pop culture.
    Entertainment,
    /// Music across eras and genres.
    Music,
    /// Books and authors.
    Literature,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::General => "general",
            Category::Science => "science",
            Category::History => "history",
            Category::Geography => "geography",
            Category::Sports => "sports",
            Category::Entertainment => "entertainment",
            Category::Music => "music",
            Category::Literature => "literature",
        };
        f.write_str(name)
    }
}

/// Trivia question as stored in the (externally owned) question bank.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    /// Stable identifier of the question.
    pub id: Uuid,
    /// Category the question is tagged with.
    pub category: Category,
    /// Prompt text shown to players.
    pub prompt: String,
    /// The single correct answer.
    pub correct_answer: String,
    /// Up to three wrong answers presented alongside the correct one.
    pub distractors: Vec<String>,
}

/// Host-supplied game configuration persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Host that owns this game.
    pub host_id: Uuid,
    /// Number of rounds in the game (>= 1).
    pub total_rounds: u32,
    /// Number of questions in each round (>= 1).
    pub questions_per_round: u32,
    /// Categories in host selection order; order drives remainder placement.
    pub categories: Vec<Category>,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
}

/// Lifecycle of a single round within a game.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    /// No answer recorded for this round yet.
    Pending,
    /// At least one answer recorded, round not finished.
    InProgress,
    /// Every question of the round has been answered.
    Completed,
}

/// One round of a game, owning an ordered slice of assignments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundEntity {
    /// Primary key of the round.
    pub id: Uuid,
    /// Game this round belongs to.
    pub game_id: Uuid,
    /// 1-based position of the round within the game.
    pub round_number: u32,
    /// Current lifecycle status of the round.
    pub status: RoundStatus,
}

/// Binding of a question to a slot of a round.
///
/// `(round_id, question_id)` is unique, and `question_id` is additionally
/// unique across the whole game: a question assigned once never reappears in
/// a later round of the same game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssignmentEntity {
    /// Primary key of the assignment.
    pub id: Uuid,
    /// Game the owning round belongs to (denormalised for game-wide lookups).
    pub game_id: Uuid,
    /// Round this assignment belongs to.
    pub round_id: Uuid,
    /// 1-based round number of the owning round.
    pub round_number: u32,
    /// Question bound to this slot.
    pub question_id: Uuid,
    /// 1-based position of the question within the round.
    pub question_order: u32,
}

/// One recorded answer per `(session, assignment)` pair.
///
/// The presence of this record is the idempotency guard against double
/// submission: it is only ever created through a compare-and-set insert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerRecordEntity {
    /// Primary key of the record.
    pub id: Uuid,
    /// Session the answer was submitted in.
    pub session_id: Uuid,
    /// Assignment the answer closes.
    pub assignment_id: Uuid,
    /// Round number of the assignment, for per-round summaries.
    pub round_number: u32,
    /// Answer text as submitted by the player.
    pub submitted_answer: String,
    /// Whether the submitted answer matched the stored correct answer.
    pub is_correct: bool,
    /// Time the player took to answer, in milliseconds.
    pub time_to_answer_ms: u64,
    /// Timestamp marking the question closed.
    pub answered_at: SystemTime,
}

/// A playable session over a game's assignment set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionEntity {
    /// Primary key of the session.
    pub id: Uuid,
    /// Game this session plays through.
    pub game_id: Uuid,
    /// Host that owns the session (must match the game's host).
    pub host_id: Uuid,
    /// Current lifecycle status.
    pub status: SessionStatus,
    /// Number of rounds, copied from the game config at creation.
    pub total_rounds: u32,
    /// Questions per round, copied from the game config at creation.
    pub questions_per_round: u32,
    /// 1-based pointer to the round currently being played.
    pub current_round: u32,
    /// 0-based pointer to the next question within the current round.
    pub current_question_index: u32,
    /// Cumulative score; monotonically non-decreasing while in progress.
    pub total_score: u32,
    /// Set when the session leaves setup.
    pub started_at: Option<SystemTime>,
    /// Set when the session reaches a terminal status.
    pub ended_at: Option<SystemTime>,
    /// Total play duration, computed at completion.
    pub total_duration_ms: Option<u64>,
}

/// Lifetime counters for a host, maintained by the stats rollup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct HostStatsEntity {
    /// Host these counters belong to.
    pub host_id: Uuid,
    /// Number of sessions rolled up as completed.
    pub games_completed: u64,
    /// Total answers recorded across completed sessions.
    pub questions_answered: u64,
    /// Total correct answers across completed sessions.
    pub correct_answers: u64,
    /// Total play time across completed sessions, in milliseconds.
    pub total_play_time_ms: u64,
}

impl HostStatsEntity {
    /// Fresh counters for a host with no completed games.
    pub fn empty(host_id: Uuid) -> Self {
        Self {
            host_id,
            games_completed: 0,
            questions_answered: 0,
            correct_answers: 0,
            total_play_time_ms: 0,
        }
    }
}

/// Counters contributed by one completed session to a host's lifetime stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsDelta {
    /// Answers recorded during the session.
    pub questions_answered: u64,
    /// Correct answers recorded during the session.
    pub correct_answers: u64,
    /// Play time of the session, in milliseconds.
    pub play_time_ms: u64,
}
