use serde::Serialize;
use utoipa::ToSchema;

/// Payload of `GET /healthcheck`.
///
/// The service reports `degraded` while the store or the question bank is
/// not installed yet (startup, or a failed bank load being retried).
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Either `ok` or `degraded`.
    pub status: String,
}

impl HealthResponse {
    /// Everything the engines depend on is available.
    pub fn ok() -> Self {
        Self {
            status: "ok".into(),
        }
    }

    /// At least one backing dependency is missing or unreachable.
    pub fn degraded() -> Self {
        Self {
            status: "degraded".into(),
        }
    }
}
