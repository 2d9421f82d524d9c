//! Host statistics aggregation.
//!
//! Completed sessions are folded into per-host lifetime counters as an
//! atomic delta, so concurrent completions by the same host never lose
//! an increment. Cancelled sessions contribute nothing.

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::{HostStatsEntity, SessionEntity, StatsDelta},
    dto::stats::HostStatsResponse,
    error::ServiceError,
    state::SharedState,
};

/// Fold a completed session into the host's lifetime counters.
///
/// Must be called at most once per session, after its completion has been
/// committed to storage.
pub async fn rollup_completed(
    state: &SharedState,
    session: &SessionEntity,
) -> Result<(), ServiceError> {
    let store = state.require_store().await?;
    let records = store.answers_for_session(session.id).await?;

    let delta = StatsDelta {
        questions_answered: records.len() as u64,
        correct_answers: records.iter().filter(|record| record.is_correct).count() as u64,
        play_time_ms: session.total_duration_ms.unwrap_or_default(),
    };
    store.apply_stats(session.host_id, delta).await?;

    info!(
        host_id = %session.host_id,
        session_id = %session.id,
        questions = delta.questions_answered,
        "session rolled into host stats"
    );
    Ok(())
}

/// Lifetime counters for a host; zeroes for a host with no completed games.
pub async fn host_stats(
    state: &SharedState,
    host_id: Uuid,
) -> Result<HostStatsResponse, ServiceError> {
    let stats = state
        .require_store()
        .await?
        .find_host_stats(host_id)
        .await?
        .unwrap_or_else(|| HostStatsEntity::empty(host_id));
    Ok(stats.into())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::SystemTime;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::AnswerRecordEntity,
            store::{GameStore, memory::MemoryGameStore},
        },
        state::{AppState, SharedState, session_machine::SessionStatus},
    };

    fn completed_session(host_id: Uuid) -> SessionEntity {
        SessionEntity {
            id: Uuid::new_v4(),
            game_id: Uuid::new_v4(),
            host_id,
            status: SessionStatus::Completed,
            total_rounds: 1,
            questions_per_round: 2,
            current_round: 2,
            current_question_index: 0,
            total_score: 1,
            started_at: Some(SystemTime::now()),
            ended_at: Some(SystemTime::now()),
            total_duration_ms: Some(90_000),
        }
    }

    async fn record_answer(
        store: &MemoryGameStore,
        session_id: Uuid,
        is_correct: bool,
    ) {
        let inserted = store
            .insert_answer(AnswerRecordEntity {
                id: Uuid::new_v4(),
                session_id,
                assignment_id: Uuid::new_v4(),
                round_number: 1,
                submitted_answer: "a".into(),
                is_correct,
                time_to_answer_ms: 100,
                answered_at: SystemTime::now(),
            })
            .await
            .unwrap();
        assert!(inserted);
    }

    async fn state_with(store: MemoryGameStore) -> SharedState {
        let state = AppState::new(AppConfig::default());
        state.install_store(Arc::new(store)).await;
        state
    }

    #[tokio::test]
    async fn rollups_accumulate_across_sessions() {
        let store = MemoryGameStore::new();
        let host_id = Uuid::new_v4();

        let first = completed_session(host_id);
        record_answer(&store, first.id, true).await;
        record_answer(&store, first.id, false).await;
        let second = completed_session(host_id);
        record_answer(&store, second.id, true).await;

        let state = state_with(store).await;
        rollup_completed(&state, &first).await.unwrap();
        rollup_completed(&state, &second).await.unwrap();

        let stats = host_stats(&state, host_id).await.unwrap();
        assert_eq!(stats.games_completed, 2);
        assert_eq!(stats.questions_answered, 3);
        assert_eq!(stats.correct_answers, 2);
        assert_eq!(stats.total_play_time_ms, 180_000);
    }

    #[tokio::test]
    async fn unknown_hosts_report_zeroed_counters() {
        let state = state_with(MemoryGameStore::new()).await;
        let host_id = Uuid::new_v4();

        let stats = host_stats(&state, host_id).await.unwrap();
        assert_eq!(stats.host_id, host_id);
        assert_eq!(stats.games_completed, 0);
        assert_eq!(stats.questions_answered, 0);
    }
}
