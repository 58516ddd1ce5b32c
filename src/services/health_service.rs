use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report whether storage is reachable, logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_league_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        Err(_) => warn!("storage unavailable (degraded mode)"),
    }

    let running = state.jobs().running();
    if state.is_degraded().await {
        HealthResponse::degraded(running)
    } else {
        HealthResponse::ok(running)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig, dao::league_store::memory::MemoryLeagueStore, state::AppState,
        state::jobs::JobKind,
    };

    #[tokio::test]
    async fn degraded_without_store() {
        let state = AppState::new(AppConfig::default());
        assert_eq!(health_status(&state).await.status, "degraded");
    }

    #[tokio::test]
    async fn reports_running_jobs() {
        let state =
            AppState::with_store(AppConfig::default(), Arc::new(MemoryLeagueStore::new())).await;
        let _guard = state.jobs().begin(&[JobKind::TakeSnapshots]).unwrap();
        let health = health_status(&state).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.running_jobs, vec![JobKind::TakeSnapshots]);
    }
}
