pub mod memory;

use std::collections::HashSet;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::models::{
    AnswerRecordEntity, AssignmentEntity, GameEntity, HostStatsEntity, RoundEntity, RoundStatus,
    SessionEntity, StatsDelta,
};
use crate::dao::storage::StorageResult;

/// Abstraction over the persistence layer for games, rounds, assignments,
/// sessions, answer records, the used-question ledger, and host stats.
///
/// The few operations that must be race-free (generation claims, answer
/// inserts, session status updates) are expressed as compare-and-set calls
/// so that backends with transactional semantics can map them directly.
pub trait GameStore: Send + Sync {
    /// Persist a game configuration (upsert by id).
    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch a game configuration by id.
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;

    /// Atomically claim the per-game generation flag.
    ///
    /// Returns `false` when another generation already holds the claim.
    fn try_claim_generation(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    /// Release the per-game generation flag.
    fn release_generation(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<()>>;

    /// Atomically replace the whole round/assignment set of a game.
    ///
    /// Old rows are dropped and the new ones written as one unit; a partial
    /// old/new mix must never be observable.
    fn replace_assignments(
        &self,
        game_id: Uuid,
        rounds: Vec<RoundEntity>,
        assignments: Vec<AssignmentEntity>,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Rounds of a game, ordered by round number.
    fn rounds_for_game(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>>;
    /// All assignments of a game across every round.
    fn assignments_for_game(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<AssignmentEntity>>>;
    /// Fetch a single assignment by id.
    fn find_assignment(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<AssignmentEntity>>>;
    /// Overwrite the question bound to an assignment, preserving its order.
    fn update_assignment_question(
        &self,
        assignment_id: Uuid,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Update the lifecycle status of one round of a game.
    fn update_round_status(
        &self,
        game_id: Uuid,
        round_number: u32,
        status: RoundStatus,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Append question ids to the per-host used-question ledger.
    ///
    /// Re-marking an already-present pair is a no-op.
    fn mark_questions_used(
        &self,
        host_id: Uuid,
        question_ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// The set of question ids ever used by a host.
    fn used_questions(&self, host_id: Uuid)
    -> BoxFuture<'static, StorageResult<HashSet<Uuid>>>;

    /// Persist a session (upsert by id).
    fn save_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch a session by id.
    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>>;
    /// Overwrite a session only if the stored row still equals `expected`.
    ///
    /// Comparing the full snapshot (not just the status) means a lifecycle
    /// transition whose read predates a concurrently committed answer loses
    /// the swap instead of rewinding the score and question pointers.
    /// Returns `false` for the loser, who must re-read before retrying.
    fn update_session_if(
        &self,
        session: SessionEntity,
        expected: SessionEntity,
    ) -> BoxFuture<'static, StorageResult<bool>>;

    /// Insert an answer record unless one already exists for the same
    /// `(session, assignment)` pair. Returns `false` for the loser.
    fn insert_answer(
        &self,
        record: AnswerRecordEntity,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Fetch the answer record for a `(session, assignment)` pair, if any.
    fn find_answer(
        &self,
        session_id: Uuid,
        assignment_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<AnswerRecordEntity>>>;
    /// Remove an answer record (compensation when a session update loses).
    fn remove_answer(
        &self,
        session_id: Uuid,
        assignment_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// All answer records of a session, in submission order.
    fn answers_for_session(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<AnswerRecordEntity>>>;

    /// Fetch lifetime counters for a host.
    fn find_host_stats(
        &self,
        host_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<HostStatsEntity>>>;
    /// Add a completed game's counters to a host's lifetime stats.
    fn apply_stats(
        &self,
        host_id: Uuid,
        delta: StatsDelta,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Cheap connectivity probe used by the health endpoint.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
