use axum::{Json, Router, extract::State, http::StatusCode, routing::get};

use crate::{dto::health::HealthResponse, services::health_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/healthcheck",
    tag = "health",
    responses(
        (status = 200, description = "Storage reachable", body = HealthResponse),
        (status = 503, description = "Degraded mode: storage unavailable", body = HealthResponse),
    )
)]
/// Report storage availability and the scheduled jobs running in this instance.
pub async fn healthcheck(State(state): State<SharedState>) -> (StatusCode, Json<HealthResponse>) {
    let health = health_service::health_status(&state).await;
    let code = if health.is_degraded() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (code, Json(health))
}

/// Configure the health routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/healthcheck", get(healthcheck))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{config::AppConfig, dao::league_store::memory::MemoryLeagueStore, state::AppState};

    #[tokio::test]
    async fn unavailable_while_degraded() {
        let state = AppState::new(AppConfig::default());
        let (code, Json(body)) = healthcheck(State(state)).await;
        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, "degraded");
    }

    #[tokio::test]
    async fn ok_with_store() {
        let state =
            AppState::with_store(AppConfig::default(), Arc::new(MemoryLeagueStore::new())).await;
        let (code, _) = healthcheck(State(state)).await;
        assert_eq!(code, StatusCode::OK);
    }
}
