use std::collections::HashSet;

use tracing::{info, warn};

use crate::{
    dao::models::LeagueEntity, error::ServiceError, league::Tier, state::SharedState,
};

/// Create the tier leagues missing from storage. Returns how many were created.
pub async fn ensure_tier_leagues(state: &SharedState) -> Result<usize, ServiceError> {
    let store = state.require_league_store().await?;
    let mut present = HashSet::new();
    for league in store.list_leagues().await? {
        match league.tier() {
            Ok(Some(tier)) => {
                present.insert(tier);
            }
            Ok(None) => {}
            Err(err) => warn!(league_id = %league.id, error = %err, "league has a malformed tier"),
        }
    }

    let capacity = state.config().tier_league_capacity();
    let mut created = 0;
    for tier in Tier::ALL {
        if present.contains(&tier) {
            continue;
        }
        let league = LeagueEntity::tiered(tier, capacity);
        info!(league_id = %league.id, %tier, capacity, "creating tier league");
        store.save_league(league).await?;
        created += 1;
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::league_store::{LeagueStore, memory::MemoryLeagueStore},
        state::AppState,
    };

    #[tokio::test]
    async fn creates_each_tier_once() {
        let store = MemoryLeagueStore::new();
        let state = AppState::with_store(AppConfig::default(), Arc::new(store.clone())).await;

        assert_eq!(ensure_tier_leagues(&state).await.unwrap(), Tier::ALL.len());
        assert_eq!(ensure_tier_leagues(&state).await.unwrap(), 0);

        let leagues = store.list_leagues().await.unwrap();
        assert_eq!(leagues.len(), Tier::ALL.len());
        assert!(leagues.iter().all(|league| league.capacity == 30));
    }

    #[tokio::test]
    async fn degraded_state_is_reported() {
        let state = AppState::new(AppConfig::default());
        assert!(matches!(
            ensure_tier_leagues(&state).await,
            Err(ServiceError::Degraded)
        ));
    }
}
