//! Question assignment engine.
//!
//! Computes the deterministic category distribution plan for a game, draws
//! concrete questions (preferring ones the host has never used), fills
//! rounds round-robin, and commits the whole set atomically. At most one
//! generation runs per game at a time, enforced through a storage-level
//! claim.

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use rand::{rng, seq::SliceRandom};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::models::{AssignmentEntity, Category, GameEntity, QuestionEntity, RoundEntity, RoundStatus},
    dto::game::{AssignmentView, GenerateRequest, GenerationReport, GenerationStatus, RoundPlan},
    error::ServiceError,
    state::SharedState,
};

/// Compute the per-category question counts for a game.
///
/// Base count is `floor(total / k)`; the first `total mod k` categories in
/// host selection order receive one extra, so counts sum exactly to `total`
/// and differ by at most one. The plan is independent of pool availability.
pub fn plan_distribution(
    total_rounds: u32,
    questions_per_round: u32,
    categories: &[Category],
) -> IndexMap<Category, u32> {
    let total = total_rounds * questions_per_round;
    let k = categories.len() as u32;
    let base = total / k;
    let remainder = (total % k) as usize;

    categories
        .iter()
        .enumerate()
        .map(|(index, category)| {
            let extra = u32::from(index < remainder);
            (*category, base + extra)
        })
        .collect()
}

/// Generate (or return) the assignment set for a game.
///
/// A complete existing set is returned unchanged unless
/// `force_regenerate` is set, in which case it is atomically replaced.
/// Concurrent calls for the same game lose the generation claim and are
/// rejected with a conflict.
pub async fn generate(
    state: &SharedState,
    game_id: Uuid,
    request: GenerateRequest,
) -> Result<GenerationReport, ServiceError> {
    let store = state.require_store().await?;

    let Some(game) = store.find_game(game_id).await? else {
        return Err(ServiceError::NotFound(format!("game `{game_id}` not found")));
    };
    if game.host_id != request.host_id {
        return Err(ServiceError::Unauthorized(
            "game belongs to a different host".into(),
        ));
    }
    validate_config(&game)?;

    let total = game.total_rounds * game.questions_per_round;
    let existing = store.assignments_for_game(game_id).await?;
    if existing.len() as u32 == total && !request.force_regenerate {
        return report_existing(state, &game).await;
    }

    if !store.try_claim_generation(game_id).await? {
        return Err(ServiceError::Conflict(
            "generation already in progress for this game".into(),
        ));
    }

    let outcome = generate_locked(state, &game, &request).await;

    if let Err(err) = store.release_generation(game_id).await {
        warn!(game_id = %game_id, error = %err, "failed to release generation claim");
    }

    outcome
}

/// The generation body, run while holding the per-game claim.
async fn generate_locked(
    state: &SharedState,
    game: &GameEntity,
    request: &GenerateRequest,
) -> Result<GenerationReport, ServiceError> {
    let store = state.require_store().await?;
    let bank = state.require_bank().await?;

    let total = game.total_rounds * game.questions_per_round;

    // Re-check under the claim: a racing call may have just committed.
    let existing = store.assignments_for_game(game.id).await?;
    if existing.len() as u32 == total && !request.force_regenerate {
        return report_existing(state, game).await;
    }

    let plan = plan_distribution(game.total_rounds, game.questions_per_round, &game.categories);
    let used = store.used_questions(game.host_id).await?;

    let mut pools: HashMap<Category, Vec<QuestionEntity>> = HashMap::new();
    let mut available: u32 = 0;
    for category in &game.categories {
        let pool = bank.questions_by_category(*category).await?;
        available += pool.len() as u32;
        pools.insert(*category, pool);
    }

    // Insufficiency is checked against the combined pool (unused plus
    // ledger-marked) before anything is written; rejection is atomic.
    if available < total {
        let shortfall = total - available;
        return Err(ServiceError::InsufficientPool {
            shortfall,
            suggestions: build_suggestions(game, available),
        });
    }

    let shuffle = state.config().shuffle;
    let mut drawn: Vec<(QuestionEntity, bool)> = Vec::with_capacity(total as usize);
    let mut spare_fresh: Vec<QuestionEntity> = Vec::new();
    let mut spare_used: Vec<QuestionEntity> = Vec::new();
    let mut deficit: u32 = 0;

    for (category, count) in &plan {
        let pool = pools.remove(category).unwrap_or_default();
        let (mut fresh, mut repeats): (Vec<_>, Vec<_>) =
            pool.into_iter().partition(|q| !used.contains(&q.id));

        if shuffle {
            let mut generator = rng();
            fresh.shuffle(&mut generator);
            repeats.shuffle(&mut generator);
        }

        let mut remaining = *count as usize;
        let take_fresh = remaining.min(fresh.len());
        for question in fresh.drain(..take_fresh) {
            drawn.push((question, false));
        }
        remaining -= take_fresh;

        let take_repeats = remaining.min(repeats.len());
        for question in repeats.drain(..take_repeats) {
            drawn.push((question, true));
        }
        remaining -= take_repeats;

        deficit += remaining as u32;
        spare_fresh.extend(fresh);
        spare_used.extend(repeats);
    }

    // A category pool smaller than its planned share spills into other
    // selected categories; the global availability check above guarantees
    // the spill can always be absorbed.
    if deficit > 0 {
        info!(
            game_id = %game.id,
            deficit,
            "category plan exceeds per-category pools; borrowing across categories"
        );
        if shuffle {
            let mut generator = rng();
            spare_fresh.shuffle(&mut generator);
            spare_used.shuffle(&mut generator);
        }
        for question in spare_fresh.into_iter().take(deficit as usize) {
            drawn.push((question, false));
            deficit -= 1;
        }
        for question in spare_used.into_iter().take(deficit as usize) {
            drawn.push((question, true));
        }
    }

    debug_assert_eq!(drawn.len() as u32, total);

    let (rounds, assignments, views, duplicate_rounds, duplicates_found) =
        deal_into_rounds(game, &drawn);

    store
        .replace_assignments(game.id, rounds.clone(), assignments)
        .await?;
    store
        .mark_questions_used(
            game.host_id,
            drawn.iter().map(|(question, _)| question.id).collect(),
        )
        .await?;

    info!(
        game_id = %game.id,
        total,
        duplicates_found,
        forced = request.force_regenerate,
        "assignment set committed"
    );

    Ok(GenerationReport {
        status: GenerationStatus::Generated,
        per_category_counts: plan,
        duplicates_found,
        duplicate_rounds,
        rounds: views,
    })
}

/// Deal the drawn questions into rounds, round-robin in draw order.
///
/// The i-th drawn question lands in round `i % total_rounds`; the j-th card
/// a round receives takes question order `j + 1`.
fn deal_into_rounds(
    game: &GameEntity,
    drawn: &[(QuestionEntity, bool)],
) -> (
    Vec<RoundEntity>,
    Vec<AssignmentEntity>,
    Vec<RoundPlan>,
    Vec<u32>,
    u32,
) {
    let round_count = game.total_rounds as usize;
    let rounds: Vec<RoundEntity> = (1..=game.total_rounds)
        .map(|round_number| RoundEntity {
            id: Uuid::new_v4(),
            game_id: game.id,
            round_number,
            status: RoundStatus::Pending,
        })
        .collect();

    let mut assignments = Vec::with_capacity(drawn.len());
    let mut views: Vec<RoundPlan> = rounds
        .iter()
        .map(|round| RoundPlan {
            round_number: round.round_number,
            status: round.status,
            questions: Vec::with_capacity(game.questions_per_round as usize),
        })
        .collect();
    let mut duplicate_rounds = BTreeSet::new();
    let mut duplicates_found = 0;

    for (index, (question, from_ledger)) in drawn.iter().enumerate() {
        let slot = index % round_count;
        let round = &rounds[slot];
        let question_order = (index / round_count) as u32 + 1;

        if *from_ledger {
            duplicates_found += 1;
            duplicate_rounds.insert(round.round_number);
        }

        let assignment = AssignmentEntity {
            id: Uuid::new_v4(),
            game_id: game.id,
            round_id: round.id,
            round_number: round.round_number,
            question_id: question.id,
            question_order,
        };
        views[slot].questions.push(AssignmentView {
            assignment_id: assignment.id,
            question_id: question.id,
            question_order,
            category: question.category,
            prompt: question.prompt.clone(),
        });
        assignments.push(assignment);
    }

    (
        rounds,
        assignments,
        views,
        duplicate_rounds.into_iter().collect(),
        duplicates_found,
    )
}

/// Build the report for a game whose assignment set already exists.
///
/// Per-category counts are recomputed from the stored rows; fallback
/// statistics of the original run are not persisted, so they read as zero.
async fn report_existing(
    state: &SharedState,
    game: &GameEntity,
) -> Result<GenerationReport, ServiceError> {
    let store = state.require_store().await?;
    let bank = state.require_bank().await?;

    let rounds = store.rounds_for_game(game.id).await?;
    let assignments = store.assignments_for_game(game.id).await?;

    let mut per_category_counts: IndexMap<Category, u32> = game
        .categories
        .iter()
        .map(|category| (*category, 0))
        .collect();
    let mut views: Vec<RoundPlan> = rounds
        .iter()
        .map(|round| RoundPlan {
            round_number: round.round_number,
            status: round.status,
            questions: Vec::new(),
        })
        .collect();

    for assignment in assignments {
        let Some(question) = bank.question(assignment.question_id).await? else {
            return Err(ServiceError::NotFound(format!(
                "assigned question `{}` missing from bank",
                assignment.question_id
            )));
        };
        *per_category_counts.entry(question.category).or_insert(0) += 1;

        let Some(view) = views
            .iter_mut()
            .find(|round| round.round_number == assignment.round_number)
        else {
            continue;
        };
        view.questions.push(AssignmentView {
            assignment_id: assignment.id,
            question_id: question.id,
            question_order: assignment.question_order,
            category: question.category,
            prompt: question.prompt,
        });
    }

    Ok(GenerationReport {
        status: GenerationStatus::AlreadyGenerated,
        per_category_counts,
        duplicates_found: 0,
        duplicate_rounds: Vec::new(),
        rounds: views,
    })
}

fn validate_config(game: &GameEntity) -> Result<(), ServiceError> {
    if game.total_rounds == 0 {
        return Err(ServiceError::InvalidInput(
            "game must have at least one round".into(),
        ));
    }
    if game.questions_per_round == 0 {
        return Err(ServiceError::InvalidInput(
            "rounds must hold at least one question".into(),
        ));
    }
    if game.categories.is_empty() {
        return Err(ServiceError::InvalidInput(
            "at least one category must be selected".into(),
        ));
    }
    Ok(())
}

/// Actionable configuration changes that would make generation fit the pool.
fn build_suggestions(game: &GameEntity, available: u32) -> Vec<String> {
    let mut suggestions = Vec::new();

    let per_round = available / game.total_rounds;
    if per_round >= 1 {
        suggestions.push(format!(
            "reduce questions per round to at most {per_round}"
        ));
    }

    suggestions.push("add more categories to widen the question pool".into());

    let rounds = available / game.questions_per_round;
    if rounds >= 1 {
        suggestions.push(format!("reduce the number of rounds to at most {rounds}"));
    }

    suggestions
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::SystemTime;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            bank::MemoryQuestionBank,
            store::{GameStore, memory::MemoryGameStore},
        },
        state::AppState,
    };

    fn question(category: Category, tag: usize) -> QuestionEntity {
        QuestionEntity {
            id: Uuid::new_v4(),
            category,
            prompt: format!("{category} question {tag}"),
            correct_answer: format!("answer {tag}"),
            distractors: vec!["wrong a".into(), "wrong b".into()],
        }
    }

    fn bank_with(counts: &[(Category, usize)]) -> (MemoryQuestionBank, Vec<QuestionEntity>) {
        let mut questions = Vec::new();
        for (category, count) in counts {
            for tag in 0..*count {
                questions.push(question(*category, tag));
            }
        }
        (
            MemoryQuestionBank::from_questions(questions.clone()).unwrap(),
            questions,
        )
    }

    async fn state_with(
        store: MemoryGameStore,
        bank: MemoryQuestionBank,
    ) -> crate::state::SharedState {
        let config = AppConfig {
            shuffle: false,
            ..AppConfig::default()
        };
        let state = AppState::new(config);
        state.install_store(Arc::new(store)).await;
        state.install_bank(Arc::new(bank)).await;
        state
    }

    fn game(total_rounds: u32, questions_per_round: u32, categories: Vec<Category>) -> GameEntity {
        GameEntity {
            id: Uuid::new_v4(),
            host_id: Uuid::new_v4(),
            total_rounds,
            questions_per_round,
            categories,
            created_at: SystemTime::now(),
        }
    }

    #[test]
    fn plan_splits_evenly_without_remainder() {
        let plan = plan_distribution(
            3,
            10,
            &[Category::Science, Category::History, Category::Sports],
        );
        assert_eq!(plan[&Category::Science], 10);
        assert_eq!(plan[&Category::History], 10);
        assert_eq!(plan[&Category::Sports], 10);
        assert_eq!(plan.values().sum::<u32>(), 30);
    }

    #[test]
    fn plan_gives_remainder_to_first_categories_in_selection_order() {
        let plan = plan_distribution(
            2,
            5,
            &[Category::Music, Category::General, Category::Geography],
        );
        assert_eq!(plan[&Category::Music], 4);
        assert_eq!(plan[&Category::General], 3);
        assert_eq!(plan[&Category::Geography], 3);
        assert_eq!(plan.values().sum::<u32>(), 10);
    }

    #[test]
    fn plan_counts_differ_by_at_most_one() {
        let plan = plan_distribution(
            7,
            3,
            &[
                Category::Science,
                Category::History,
                Category::Sports,
                Category::Music,
                Category::General,
            ],
        );
        let max = plan.values().max().unwrap();
        let min = plan.values().min().unwrap();
        assert!(max - min <= 1);
        assert_eq!(plan.values().sum::<u32>(), 21);
    }

    #[tokio::test]
    async fn generate_fills_every_round_without_in_game_duplicates() {
        let store = MemoryGameStore::new();
        let (bank, _) = bank_with(&[(Category::Science, 8), (Category::History, 8)]);
        let game = game(3, 4, vec![Category::Science, Category::History]);
        store.save_game(game.clone()).await.unwrap();
        let state = state_with(store.clone(), bank).await;

        let report = generate(
            &state,
            game.id,
            GenerateRequest {
                host_id: game.host_id,
                force_regenerate: false,
            },
        )
        .await
        .unwrap();

        assert_eq!(report.status, GenerationStatus::Generated);
        assert_eq!(report.per_category_counts.values().sum::<u32>(), 12);
        assert_eq!(report.duplicates_found, 0);
        assert_eq!(report.rounds.len(), 3);
        for round in &report.rounds {
            assert_eq!(round.questions.len(), 4);
            for (index, view) in round.questions.iter().enumerate() {
                assert_eq!(view.question_order as usize, index + 1);
            }
        }

        let assignments = store.assignments_for_game(game.id).await.unwrap();
        let unique: HashSet<Uuid> = assignments.iter().map(|a| a.question_id).collect();
        assert_eq!(unique.len(), assignments.len());
    }

    #[tokio::test]
    async fn generate_rejects_short_pool_atomically() {
        let store = MemoryGameStore::new();
        let (bank, _) = bank_with(&[(Category::Science, 5)]);
        let game = game(4, 5, vec![Category::Science]);
        store.save_game(game.clone()).await.unwrap();
        let state = state_with(store.clone(), bank).await;

        let err = generate(
            &state,
            game.id,
            GenerateRequest {
                host_id: game.host_id,
                force_regenerate: false,
            },
        )
        .await
        .unwrap_err();

        match err {
            ServiceError::InsufficientPool {
                shortfall,
                suggestions,
            } => {
                assert_eq!(shortfall, 15);
                assert!(!suggestions.is_empty());
            }
            other => panic!("expected insufficient pool, got {other:?}"),
        }

        assert!(store.assignments_for_game(game.id).await.unwrap().is_empty());
        // The claim must have been released despite the failure.
        assert!(store.try_claim_generation(game.id).await.unwrap());
    }

    #[tokio::test]
    async fn generate_twice_is_idempotent_without_force() {
        let store = MemoryGameStore::new();
        let (bank, _) = bank_with(&[(Category::Music, 10)]);
        let game = game(2, 3, vec![Category::Music]);
        store.save_game(game.clone()).await.unwrap();
        let state = state_with(store.clone(), bank).await;

        let request = |force| GenerateRequest {
            host_id: game.host_id,
            force_regenerate: force,
        };

        generate(&state, game.id, request(false)).await.unwrap();
        let before = store.assignments_for_game(game.id).await.unwrap();

        let second = generate(&state, game.id, request(false)).await.unwrap();
        assert_eq!(second.status, GenerationStatus::AlreadyGenerated);
        assert_eq!(second.per_category_counts[&Category::Music], 6);

        let after = store.assignments_for_game(game.id).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn force_regenerate_replaces_the_whole_set() {
        let store = MemoryGameStore::new();
        let (bank, _) = bank_with(&[(Category::History, 12)]);
        let game = game(2, 3, vec![Category::History]);
        store.save_game(game.clone()).await.unwrap();
        let state = state_with(store.clone(), bank).await;

        generate(
            &state,
            game.id,
            GenerateRequest {
                host_id: game.host_id,
                force_regenerate: false,
            },
        )
        .await
        .unwrap();
        let before: HashSet<Uuid> = store
            .assignments_for_game(game.id)
            .await
            .unwrap()
            .iter()
            .map(|a| a.id)
            .collect();

        let report = generate(
            &state,
            game.id,
            GenerateRequest {
                host_id: game.host_id,
                force_regenerate: true,
            },
        )
        .await
        .unwrap();
        assert_eq!(report.status, GenerationStatus::Generated);

        let after: HashSet<Uuid> = store
            .assignments_for_game(game.id)
            .await
            .unwrap()
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(after.len(), 6);
        assert!(before.is_disjoint(&after));
    }

    #[tokio::test]
    async fn ledger_marked_questions_are_a_fallback_and_reported() {
        let store = MemoryGameStore::new();
        let (bank, questions) = bank_with(&[(Category::Sports, 6)]);
        let game = game(2, 3, vec![Category::Sports]);
        store.save_game(game.clone()).await.unwrap();

        // Mark four of the six as already used; the plan needs six, so two
        // fallback picks are unavoidable... but never a hard failure.
        store
            .mark_questions_used(
                game.host_id,
                questions.iter().take(4).map(|q| q.id).collect(),
            )
            .await
            .unwrap();
        let state = state_with(store.clone(), bank).await;

        let report = generate(
            &state,
            game.id,
            GenerateRequest {
                host_id: game.host_id,
                force_regenerate: false,
            },
        )
        .await
        .unwrap();

        assert_eq!(report.status, GenerationStatus::Generated);
        assert_eq!(report.duplicates_found, 4);
        assert!(!report.duplicate_rounds.is_empty());
    }

    #[tokio::test]
    async fn concurrent_generation_is_rejected_with_conflict() {
        let store = MemoryGameStore::new();
        let (bank, _) = bank_with(&[(Category::General, 10)]);
        let game = game(2, 2, vec![Category::General]);
        store.save_game(game.clone()).await.unwrap();

        assert!(store.try_claim_generation(game.id).await.unwrap());
        let state = state_with(store.clone(), bank).await;

        let err = generate(
            &state,
            game.id,
            GenerateRequest {
                host_id: game.host_id,
                force_regenerate: false,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn generation_by_non_owner_is_unauthorized() {
        let store = MemoryGameStore::new();
        let (bank, _) = bank_with(&[(Category::General, 4)]);
        let game = game(1, 2, vec![Category::General]);
        store.save_game(game.clone()).await.unwrap();
        let state = state_with(store, bank).await;

        let err = generate(
            &state,
            game.id,
            GenerateRequest {
                host_id: Uuid::new_v4(),
                force_regenerate: false,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn small_category_pool_borrows_from_other_categories() {
        let store = MemoryGameStore::new();
        // Science can only cover 2 of its planned 5; history has surplus.
        let (bank, _) = bank_with(&[(Category::Science, 2), (Category::History, 10)]);
        let game = game(2, 5, vec![Category::Science, Category::History]);
        store.save_game(game.clone()).await.unwrap();
        let state = state_with(store.clone(), bank).await;

        let report = generate(
            &state,
            game.id,
            GenerateRequest {
                host_id: game.host_id,
                force_regenerate: false,
            },
        )
        .await
        .unwrap();

        assert_eq!(report.status, GenerationStatus::Generated);
        let assignments = store.assignments_for_game(game.id).await.unwrap();
        assert_eq!(assignments.len(), 10);
        let unique: HashSet<Uuid> = assignments.iter().map(|a| a.question_id).collect();
        assert_eq!(unique.len(), 10);
    }
}
