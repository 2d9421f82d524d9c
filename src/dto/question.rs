use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dao::models::{Category, QuestionEntity};

/// Host-facing projection of a bank question, answers included.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct QuestionSummary {
    /// Stable identifier of the question.
    pub id: Uuid,
    /// Category the question is tagged with.
    pub category: Category,
    /// Prompt text.
    pub prompt: String,
    /// The correct answer (visible to the host only).
    pub correct_answer: String,
    /// Wrong answers presented alongside the correct one.
    pub distractors: Vec<String>,
}

impl From<QuestionEntity> for QuestionSummary {
    fn from(question: QuestionEntity) -> Self {
        Self {
            id: question.id,
            category: question.category,
            prompt: question.prompt,
            correct_answer: question.correct_answer,
            distractors: question.distractors,
        }
    }
}

/// Player-facing presentation payload for one question slot.
///
/// Answers arrive shuffled so the correct one is not positionally stable;
/// correctness is only revealed by submitting.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionCard {
    /// Assignment the answer must be submitted against.
    pub assignment_id: Uuid,
    /// 1-based round number the question belongs to.
    pub round_number: u32,
    /// 1-based position of the question within its round.
    pub question_order: u32,
    /// Category of the question.
    pub category: Category,
    /// Prompt text shown to players.
    pub prompt: String,
    /// Correct answer and distractors, in presentation order.
    pub answers: Vec<String>,
}
