//! Replacement resolver for assigned questions.
//!
//! Offers same-category substitutes for a single assignment, excluding
//! everything already assigned anywhere in the game, and swaps a question
//! in place while preserving its slot order.

use std::collections::HashSet;

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::models::AssignmentEntity,
    dto::{
        game::{AssignmentView, ReplaceQuestionRequest, ReplacementOptionsQuery},
        question::QuestionSummary,
    },
    error::ServiceError,
    state::SharedState,
};

/// List candidate substitutes for a question of a game.
///
/// Candidates share the requested category and exclude every question id
/// already assigned anywhere in the game as well as the question being
/// replaced. An exhausted category yields an empty list, not an error.
pub async fn options(
    state: &SharedState,
    game_id: Uuid,
    query: ReplacementOptionsQuery,
) -> Result<Vec<QuestionSummary>, ServiceError> {
    let store = state.require_store().await?;
    let bank = state.require_bank().await?;

    if store.find_game(game_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("game `{game_id}` not found")));
    }

    let assigned: HashSet<Uuid> = store
        .assignments_for_game(game_id)
        .await?
        .into_iter()
        .map(|assignment| assignment.question_id)
        .collect();

    let candidates = bank
        .questions_by_category(query.category)
        .await?
        .into_iter()
        .filter(|question| question.id != query.question_id && !assigned.contains(&question.id))
        .take(state.config().max_replacement_options)
        .map(QuestionSummary::from)
        .collect();

    Ok(candidates)
}

/// Swap the question bound to an assignment.
///
/// Validates host ownership, that the assignment exists, and that the new
/// question is not already assigned anywhere in the same game. The slot's
/// `question_order` is preserved and the new question is marked in the
/// used-question ledger.
///
/// The uniqueness check and the write run under the game's generation
/// claim, so two replacements (or a replacement racing a regenerate)
/// cannot both observe the question as free and bind it twice.
pub async fn replace(
    state: &SharedState,
    assignment_id: Uuid,
    request: ReplaceQuestionRequest,
) -> Result<AssignmentView, ServiceError> {
    let store = state.require_store().await?;

    let Some(assignment) = store.find_assignment(assignment_id).await? else {
        return Err(ServiceError::NotFound(format!(
            "assignment `{assignment_id}` not found"
        )));
    };

    let game_id = assignment.game_id;
    if !store.try_claim_generation(game_id).await? {
        return Err(ServiceError::Conflict(
            "another generation or replacement is in progress for this game".into(),
        ));
    }
    let outcome = replace_locked(state, assignment, request).await;
    if let Err(err) = store.release_generation(game_id).await {
        warn!(game_id = %game_id, error = %err, "failed to release generation claim after replacement");
    }
    outcome
}

async fn replace_locked(
    state: &SharedState,
    assignment: AssignmentEntity,
    request: ReplaceQuestionRequest,
) -> Result<AssignmentView, ServiceError> {
    let store = state.require_store().await?;
    let bank = state.require_bank().await?;
    let assignment_id = assignment.id;

    let Some(game) = store.find_game(assignment.game_id).await? else {
        return Err(ServiceError::NotFound(format!(
            "game `{}` not found",
            assignment.game_id
        )));
    };
    if game.host_id != request.host_id {
        return Err(ServiceError::Unauthorized(
            "game belongs to a different host".into(),
        ));
    }

    let Some(question) = bank.question(request.new_question_id).await? else {
        return Err(ServiceError::NotFound(format!(
            "question `{}` not found in bank",
            request.new_question_id
        )));
    };
    if !game.categories.contains(&question.category) {
        return Err(ServiceError::InvalidInput(format!(
            "category `{}` is not part of this game's selection",
            question.category
        )));
    }

    let already_assigned = store
        .assignments_for_game(assignment.game_id)
        .await?
        .iter()
        .any(|existing| existing.question_id == request.new_question_id);
    if already_assigned {
        return Err(ServiceError::Conflict(
            "duplicate question: already assigned in this game".into(),
        ));
    }

    store
        .update_assignment_question(assignment_id, request.new_question_id)
        .await?;
    store
        .mark_questions_used(game.host_id, vec![request.new_question_id])
        .await?;

    info!(
        assignment_id = %assignment_id,
        question_id = %request.new_question_id,
        "assignment question replaced"
    );

    Ok(view(
        AssignmentEntity {
            question_id: request.new_question_id,
            ..assignment
        },
        question.category,
        question.prompt,
    ))
}

fn view(assignment: AssignmentEntity, category: crate::dao::models::Category, prompt: String) -> AssignmentView {
    AssignmentView {
        assignment_id: assignment.id,
        question_id: assignment.question_id,
        question_order: assignment.question_order,
        category,
        prompt,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::SystemTime;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            bank::MemoryQuestionBank,
            models::{Category, GameEntity, QuestionEntity, RoundEntity, RoundStatus},
            store::{GameStore, memory::MemoryGameStore},
        },
        state::AppState,
    };

    struct Fixture {
        state: crate::state::SharedState,
        store: MemoryGameStore,
        game: GameEntity,
        assigned: Vec<QuestionEntity>,
        unassigned: Vec<QuestionEntity>,
        assignments: Vec<AssignmentEntity>,
    }

    fn question(category: Category, tag: usize) -> QuestionEntity {
        QuestionEntity {
            id: Uuid::new_v4(),
            category,
            prompt: format!("{category} question {tag}"),
            correct_answer: format!("answer {tag}"),
            distractors: vec!["no".into()],
        }
    }

    async fn fixture() -> Fixture {
        let assigned: Vec<QuestionEntity> =
            (0..3).map(|tag| question(Category::Science, tag)).collect();
        let unassigned: Vec<QuestionEntity> = (3..6)
            .map(|tag| question(Category::Science, tag))
            .collect();

        let mut all = assigned.clone();
        all.extend(unassigned.clone());
        let bank = MemoryQuestionBank::from_questions(all).unwrap();

        let store = MemoryGameStore::new();
        let game = GameEntity {
            id: Uuid::new_v4(),
            host_id: Uuid::new_v4(),
            total_rounds: 1,
            questions_per_round: 3,
            categories: vec![Category::Science],
            created_at: SystemTime::now(),
        };
        store.save_game(game.clone()).await.unwrap();

        let round = RoundEntity {
            id: Uuid::new_v4(),
            game_id: game.id,
            round_number: 1,
            status: RoundStatus::Pending,
        };
        let assignments: Vec<AssignmentEntity> = assigned
            .iter()
            .enumerate()
            .map(|(index, q)| AssignmentEntity {
                id: Uuid::new_v4(),
                game_id: game.id,
                round_id: round.id,
                round_number: 1,
                question_id: q.id,
                question_order: index as u32 + 1,
            })
            .collect();
        store
            .replace_assignments(game.id, vec![round], assignments.clone())
            .await
            .unwrap();

        let config = AppConfig {
            shuffle: false,
            ..AppConfig::default()
        };
        let state = AppState::new(config);
        state.install_store(Arc::new(store.clone())).await;
        state.install_bank(Arc::new(bank)).await;

        Fixture {
            state,
            store,
            game,
            assigned,
            unassigned,
            assignments,
        }
    }

    #[tokio::test]
    async fn options_exclude_assigned_questions_and_the_replaced_one() {
        let fx = fixture().await;

        let candidates = options(
            &fx.state,
            fx.game.id,
            ReplacementOptionsQuery {
                question_id: fx.assigned[0].id,
                category: Category::Science,
            },
        )
        .await
        .unwrap();

        let ids: Vec<Uuid> = candidates.iter().map(|c| c.id).collect();
        for q in &fx.assigned {
            assert!(!ids.contains(&q.id));
        }
        for q in &fx.unassigned {
            assert!(ids.contains(&q.id));
        }
    }

    #[tokio::test]
    async fn options_for_exhausted_category_are_empty_not_an_error() {
        let fx = fixture().await;

        let candidates = options(
            &fx.state,
            fx.game.id,
            ReplacementOptionsQuery {
                question_id: Uuid::new_v4(),
                category: Category::Literature,
            },
        )
        .await
        .unwrap();

        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn replace_swaps_in_place_and_marks_ledger() {
        let fx = fixture().await;
        let target = &fx.assignments[1];
        let substitute = &fx.unassigned[0];

        let updated = replace(
            &fx.state,
            target.id,
            ReplaceQuestionRequest {
                host_id: fx.game.host_id,
                new_question_id: substitute.id,
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.question_id, substitute.id);
        assert_eq!(updated.question_order, target.question_order);

        let stored = fx.store.find_assignment(target.id).await.unwrap().unwrap();
        assert_eq!(stored.question_id, substitute.id);
        assert!(
            fx.store
                .used_questions(fx.game.host_id)
                .await
                .unwrap()
                .contains(&substitute.id)
        );
    }

    #[tokio::test]
    async fn replace_rejects_questions_already_assigned_in_the_game() {
        let fx = fixture().await;
        let target = &fx.assignments[0];

        let err = replace(
            &fx.state,
            target.id,
            ReplaceQuestionRequest {
                host_id: fx.game.host_id,
                new_question_id: fx.assigned[2].id,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn replace_is_rejected_while_the_game_claim_is_held() {
        let fx = fixture().await;
        let target = &fx.assignments[0];

        assert!(fx.store.try_claim_generation(fx.game.id).await.unwrap());
        let err = replace(
            &fx.state,
            target.id,
            ReplaceQuestionRequest {
                host_id: fx.game.host_id,
                new_question_id: fx.unassigned[0].id,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        // The slot is untouched and the swap goes through once released.
        let stored = fx.store.find_assignment(target.id).await.unwrap().unwrap();
        assert_eq!(stored.question_id, fx.assigned[0].id);

        fx.store.release_generation(fx.game.id).await.unwrap();
        replace(
            &fx.state,
            target.id,
            ReplaceQuestionRequest {
                host_id: fx.game.host_id,
                new_question_id: fx.unassigned[0].id,
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn concurrent_replaces_cannot_double_assign_a_question() {
        let fx = fixture().await;
        let substitute = &fx.unassigned[0];

        // Two slots race for the same substitute. Whichever interleaving
        // the runtime picks, the claim serializes them and the second one
        // sees the question as taken.
        let (first, second) = tokio::join!(
            replace(
                &fx.state,
                fx.assignments[0].id,
                ReplaceQuestionRequest {
                    host_id: fx.game.host_id,
                    new_question_id: substitute.id,
                },
            ),
            replace(
                &fx.state,
                fx.assignments[1].id,
                ReplaceQuestionRequest {
                    host_id: fx.game.host_id,
                    new_question_id: substitute.id,
                },
            ),
        );
        assert_eq!(
            [&first, &second].iter().filter(|r| r.is_ok()).count(),
            1,
            "exactly one replacement may win the substitute"
        );

        let bound: Vec<Uuid> = fx
            .store
            .assignments_for_game(fx.game.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|a| a.question_id == substitute.id)
            .map(|a| a.id)
            .collect();
        assert_eq!(bound.len(), 1);

        // Both paths released the claim.
        assert!(fx.store.try_claim_generation(fx.game.id).await.unwrap());
    }

    #[tokio::test]
    async fn replace_requires_the_owning_host() {
        let fx = fixture().await;

        let err = replace(
            &fx.state,
            fx.assignments[0].id,
            ReplaceQuestionRequest {
                host_id: Uuid::new_v4(),
                new_question_id: fx.unassigned[0].id,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }
}
