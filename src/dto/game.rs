use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{Category, GameEntity, RoundStatus},
    dto::{format_system_time, validation::validate_selected_categories},
};

/// Payload used to register a new game configuration.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateGameRequest {
    /// Authenticated host registering the game.
    pub host_id: Uuid,
    /// Number of rounds to play.
    #[validate(range(min = 1, max = 50))]
    pub total_rounds: u32,
    /// Number of questions in each round.
    #[validate(range(min = 1, max = 100))]
    pub questions_per_round: u32,
    /// Categories to draw from, in the host's preferred order.
    #[validate(custom(function = validate_selected_categories))]
    pub categories: Vec<Category>,
}

/// Projection of a stored game configuration.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameView {
    /// Game identifier.
    pub id: Uuid,
    /// Owning host.
    pub host_id: Uuid,
    /// Number of rounds.
    pub total_rounds: u32,
    /// Questions per round.
    pub questions_per_round: u32,
    /// Selected categories in host order.
    pub categories: Vec<Category>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

impl From<GameEntity> for GameView {
    fn from(game: GameEntity) -> Self {
        Self {
            id: game.id,
            host_id: game.host_id,
            total_rounds: game.total_rounds,
            questions_per_round: game.questions_per_round,
            categories: game.categories,
            created_at: format_system_time(game.created_at),
        }
    }
}

/// Payload driving an assignment generation run.
#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateRequest {
    /// Authenticated host; must own the game.
    pub host_id: Uuid,
    /// When set, an existing assignment set is atomically replaced instead
    /// of being returned as-is.
    #[serde(default)]
    pub force_regenerate: bool,
}

/// Outcome classification of a generation call.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    /// A fresh assignment set was written.
    Generated,
    /// A complete set already existed; it is returned unchanged.
    AlreadyGenerated,
}

/// Full report of a (possibly pre-existing) assignment set.
#[derive(Debug, Serialize, ToSchema)]
pub struct GenerationReport {
    /// Whether this call wrote anything.
    pub status: GenerationStatus,
    /// Planned question count per category, in host selection order.
    #[schema(value_type = Object)]
    pub per_category_counts: IndexMap<Category, u32>,
    /// Number of picks that fell back to ledger-marked questions.
    pub duplicates_found: u32,
    /// Round numbers holding at least one ledger-marked question.
    pub duplicate_rounds: Vec<u32>,
    /// The assigned rounds, in round order.
    pub rounds: Vec<RoundPlan>,
}

/// One round of an assignment set.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoundPlan {
    /// 1-based round number.
    pub round_number: u32,
    /// Current round lifecycle status.
    pub status: RoundStatus,
    /// Assigned question slots, in question order.
    pub questions: Vec<AssignmentView>,
}

/// One assigned question slot.
#[derive(Debug, Serialize, ToSchema)]
pub struct AssignmentView {
    /// Assignment identifier (stable across replacements).
    pub assignment_id: Uuid,
    /// Question currently bound to the slot.
    pub question_id: Uuid,
    /// 1-based position within the round.
    pub question_order: u32,
    /// Category of the bound question.
    pub category: Category,
    /// Prompt of the bound question.
    pub prompt: String,
}

/// Query parameters for listing replacement candidates.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReplacementOptionsQuery {
    /// Question being replaced; excluded from the candidates.
    pub question_id: Uuid,
    /// Category to draw candidates from.
    pub category: Category,
}

/// Payload swapping the question bound to an assignment.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReplaceQuestionRequest {
    /// Authenticated host; must own the game.
    pub host_id: Uuid,
    /// Question to bind in place of the current one.
    pub new_question_id: Uuid,
}
