//! In-memory [`GameStore`] backend.
//!
//! Backs the service in tests and single-node deployments. The dashmap entry
//! API gives the compare-and-set semantics the trait demands without any
//! external coordinator.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::models::{
    AnswerRecordEntity, AssignmentEntity, GameEntity, HostStatsEntity, RoundEntity, RoundStatus,
    SessionEntity, StatsDelta,
};
use crate::dao::storage::StorageResult;
use crate::dao::store::GameStore;

#[derive(Debug, Default)]
struct Inner {
    games: DashMap<Uuid, GameEntity>,
    generation_claims: DashMap<Uuid, ()>,
    // Rounds and assignments are keyed by game id; the index maps an
    // assignment id back to its game for point lookups.
    rounds: DashMap<Uuid, Vec<RoundEntity>>,
    assignments: DashMap<Uuid, Vec<AssignmentEntity>>,
    assignment_index: DashMap<Uuid, Uuid>,
    used_questions: DashMap<Uuid, HashSet<Uuid>>,
    sessions: DashMap<Uuid, SessionEntity>,
    answers: DashMap<(Uuid, Uuid), AnswerRecordEntity>,
    stats: DashMap<Uuid, HostStatsEntity>,
}

/// Process-local store keeping every entity in dashmaps.
#[derive(Debug, Clone, Default)]
pub struct MemoryGameStore {
    inner: Arc<Inner>,
}

impl MemoryGameStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn ready<T: Send + 'static>(value: T) -> BoxFuture<'static, StorageResult<T>> {
    Box::pin(async move { Ok(value) })
}

impl GameStore for MemoryGameStore {
    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.games.insert(game.id, game);
        ready(())
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        ready(self.inner.games.get(&id).map(|entry| entry.clone()))
    }

    fn try_claim_generation(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let claimed = match self.inner.generation_claims.entry(game_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(());
                true
            }
        };
        ready(claimed)
    }

    fn release_generation(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.generation_claims.remove(&game_id);
        ready(())
    }

    fn replace_assignments(
        &self,
        game_id: Uuid,
        rounds: Vec<RoundEntity>,
        assignments: Vec<AssignmentEntity>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        // Drop the old index entries before swapping so a point lookup never
        // resolves to a row that is about to disappear.
        if let Some(previous) = self.inner.assignments.get(&game_id) {
            for assignment in previous.iter() {
                self.inner.assignment_index.remove(&assignment.id);
            }
        }
        for assignment in &assignments {
            self.inner.assignment_index.insert(assignment.id, game_id);
        }
        self.inner.rounds.insert(game_id, rounds);
        self.inner.assignments.insert(game_id, assignments);
        ready(())
    }

    fn rounds_for_game(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>> {
        let mut rounds = self
            .inner
            .rounds
            .get(&game_id)
            .map(|entry| entry.clone())
            .unwrap_or_default();
        rounds.sort_by_key(|round| round.round_number);
        ready(rounds)
    }

    fn assignments_for_game(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<AssignmentEntity>>> {
        let mut assignments = self
            .inner
            .assignments
            .get(&game_id)
            .map(|entry| entry.clone())
            .unwrap_or_default();
        assignments.sort_by_key(|a| (a.round_number, a.question_order));
        ready(assignments)
    }

    fn find_assignment(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<AssignmentEntity>>> {
        let found = self.inner.assignment_index.get(&id).and_then(|game_id| {
            self.inner
                .assignments
                .get(&game_id)
                .and_then(|list| list.iter().find(|a| a.id == id).cloned())
        });
        ready(found)
    }

    fn update_assignment_question(
        &self,
        assignment_id: Uuid,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<()>> {
        if let Some(game_id) = self.inner.assignment_index.get(&assignment_id) {
            if let Some(mut list) = self.inner.assignments.get_mut(&game_id) {
                if let Some(assignment) = list.iter_mut().find(|a| a.id == assignment_id) {
                    assignment.question_id = question_id;
                }
            }
        }
        ready(())
    }

    fn update_round_status(
        &self,
        game_id: Uuid,
        round_number: u32,
        status: RoundStatus,
    ) -> BoxFuture<'static, StorageResult<()>> {
        if let Some(mut rounds) = self.inner.rounds.get_mut(&game_id) {
            if let Some(round) = rounds.iter_mut().find(|r| r.round_number == round_number) {
                round.status = status;
            }
        }
        ready(())
    }

    fn mark_questions_used(
        &self,
        host_id: Uuid,
        question_ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let mut ledger = self.inner.used_questions.entry(host_id).or_default();
        ledger.extend(question_ids);
        ready(())
    }

    fn used_questions(
        &self,
        host_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<HashSet<Uuid>>> {
        ready(
            self.inner
                .used_questions
                .get(&host_id)
                .map(|entry| entry.clone())
                .unwrap_or_default(),
        )
    }

    fn save_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.sessions.insert(session.id, session);
        ready(())
    }

    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        ready(self.inner.sessions.get(&id).map(|entry| entry.clone()))
    }

    fn update_session_if(
        &self,
        session: SessionEntity,
        expected: SessionEntity,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let updated = match self.inner.sessions.entry(session.id) {
            Entry::Occupied(mut slot) if *slot.get() == expected => {
                slot.insert(session);
                true
            }
            _ => false,
        };
        ready(updated)
    }

    fn insert_answer(
        &self,
        record: AnswerRecordEntity,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let inserted = match self
            .inner
            .answers
            .entry((record.session_id, record.assignment_id))
        {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
        };
        ready(inserted)
    }

    fn find_answer(
        &self,
        session_id: Uuid,
        assignment_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<AnswerRecordEntity>>> {
        ready(
            self.inner
                .answers
                .get(&(session_id, assignment_id))
                .map(|entry| entry.clone()),
        )
    }

    fn remove_answer(
        &self,
        session_id: Uuid,
        assignment_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.answers.remove(&(session_id, assignment_id));
        ready(())
    }

    fn answers_for_session(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<AnswerRecordEntity>>> {
        let mut records: Vec<AnswerRecordEntity> = self
            .inner
            .answers
            .iter()
            .filter(|entry| entry.key().0 == session_id)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|record| record.answered_at);
        ready(records)
    }

    fn find_host_stats(
        &self,
        host_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<HostStatsEntity>>> {
        ready(self.inner.stats.get(&host_id).map(|entry| entry.clone()))
    }

    fn apply_stats(
        &self,
        host_id: Uuid,
        delta: StatsDelta,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let mut stats = self
            .inner
            .stats
            .entry(host_id)
            .or_insert_with(|| HostStatsEntity::empty(host_id));
        stats.games_completed += 1;
        stats.questions_answered += delta.questions_answered;
        stats.correct_answers += delta.correct_answers;
        stats.total_play_time_ms += delta.play_time_ms;
        ready(())
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        ready(())
    }
}
