use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::stats::HostStatsResponse, error::AppError, services::stats_service, state::SharedState,
};

/// Routes exposing per-host lifetime statistics.
pub fn router() -> Router<SharedState> {
    Router::new().route("/hosts/{id}/stats", get(host_stats))
}

/// Lifetime counters for a host; zeroed for hosts with no completed games.
#[utoipa::path(
    get,
    path = "/hosts/{id}/stats",
    tag = "stats",
    params(("id" = Uuid, Path, description = "Host identifier")),
    responses(
        (status = 200, description = "Lifetime host statistics", body = HostStatsResponse)
    )
)]
pub async fn host_stats(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<HostStatsResponse>, AppError> {
    let stats = stats_service::host_stats(&state, id).await?;
    Ok(Json(stats))
}
