use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dao::models::HostStatsEntity;

/// Lifetime counters exposed for a host.
#[derive(Debug, Serialize, ToSchema)]
pub struct HostStatsResponse {
    /// Host the counters belong to.
    pub host_id: Uuid,
    /// Completed sessions rolled up so far.
    pub games_completed: u64,
    /// Total answers across completed sessions.
    pub questions_answered: u64,
    /// Total correct answers across completed sessions.
    pub correct_answers: u64,
    /// Total play time across completed sessions, in milliseconds.
    pub total_play_time_ms: u64,
}

impl From<HostStatsEntity> for HostStatsResponse {
    fn from(stats: HostStatsEntity) -> Self {
        Self {
            host_id: stats.host_id,
            games_completed: stats.games_completed,
            questions_answered: stats.questions_answered,
            correct_answers: stats.correct_answers,
            total_play_time_ms: stats.total_play_time_ms,
        }
    }
}
