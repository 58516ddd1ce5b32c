use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{league_store::LeagueStore, storage::StorageError},
    state::SharedState,
};

const CONNECT_BACKOFF_START: Duration = Duration::from_secs(1);
const CONNECT_BACKOFF_CAP: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const RECONNECT_ATTEMPTS: u32 = 3;

fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(CONNECT_BACKOFF_CAP)
}

/// Keep a league store installed in the shared state.
///
/// Until `connect` succeeds every scheduled job and read endpoint answers in degraded mode.
/// Once connected the store is polled; a failed poll flips the degraded flag while the
/// store's own reconnect is retried, and after [`RECONNECT_ATTEMPTS`] failures the store is
/// dropped and a fresh connection is requested.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn LeagueStore>, StorageError>> + Send,
{
    let mut backoff = CONNECT_BACKOFF_START;

    loop {
        let store = match connect().await {
            Ok(store) => store,
            Err(err) => {
                warn!(error = %err, retry_in = ?backoff, "league store connection failed");
                sleep(backoff).await;
                backoff = next_backoff(backoff);
                continue;
            }
        };

        state.set_league_store(store.clone()).await;
        info!("league store connected; leaving degraded mode");
        backoff = CONNECT_BACKOFF_START;

        watch_store(&state, store.as_ref()).await;

        state.clear_league_store().await;
        warn!("league store lost; requesting a new connection");
        sleep(backoff).await;
        backoff = next_backoff(backoff);
    }
}

/// Poll the store until it stays unreachable through every reconnect attempt.
async fn watch_store(state: &SharedState, store: &dyn LeagueStore) {
    loop {
        if store.health_check().await.is_ok() {
            if state.is_degraded().await {
                info!("league store healthy again");
                state.update_degraded(false).await;
            }
            sleep(HEALTH_POLL_INTERVAL).await;
            continue;
        }

        if !reconnect(state, store).await {
            return;
        }
        state.update_degraded(false).await;
        sleep(HEALTH_POLL_INTERVAL).await;
    }
}

async fn reconnect(state: &SharedState, store: &dyn LeagueStore) -> bool {
    let mut backoff = CONNECT_BACKOFF_START;
    for attempt in 1..=RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "league store reconnected");
                return true;
            }
            Err(err) => {
                if attempt == 1 {
                    state.update_degraded(true).await;
                }
                warn!(attempt, error = %err, "league store reconnect failed");
                sleep(backoff).await;
                backoff = next_backoff(backoff);
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    use super::*;
    use crate::{
        config::AppConfig, dao::league_store::memory::MemoryLeagueStore, state::AppState,
    };

    #[tokio::test(start_paused = true)]
    async fn retries_until_storage_connects() {
        let state = AppState::new(AppConfig::default());
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let supervisor = tokio::spawn(run(state.clone(), move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(StorageError::unavailable(
                        "first attempt refused".into(),
                        std::io::Error::other("connection refused"),
                    ))
                } else {
                    Ok(Arc::new(MemoryLeagueStore::new()) as Arc<dyn LeagueStore>)
                }
            }
        }));

        let mut watcher = state.degraded_watcher();
        while *watcher.borrow_and_update() {
            watcher.changed().await.unwrap();
        }

        assert!(!state.is_degraded().await);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        supervisor.abort();
    }
}
