use serde::Serialize;
use utoipa::ToSchema;

use crate::state::jobs::JobKind;

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Scheduled jobs currently running in this instance.
    pub running_jobs: Vec<JobKind>,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok(running_jobs: Vec<JobKind>) -> Self {
        Self {
            status: "ok".to_string(),
            running_jobs,
        }
    }

    /// Whether the response reports degraded mode.
    pub fn is_degraded(&self) -> bool {
        self.status == "degraded"
    }

    /// Create a health response indicating the system is in degraded mode.
    pub fn degraded(running_jobs: Vec<JobKind>) -> Self {
        Self {
            status: "degraded".to_string(),
            running_jobs,
        }
    }
}
