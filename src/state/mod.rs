pub mod jobs;
pub mod season_status;

use std::{future::Future, sync::Arc};

use tokio::sync::{RwLock, watch};
use tokio::time::timeout;
use tracing::warn;

use crate::{config::AppConfig, dao::league_store::LeagueStore, error::ServiceError};

use self::jobs::{JobKind, JobRegistry};

pub type SharedState = Arc<AppState>;

/// Central application state: storage handle, degraded flag, configuration and running jobs.
pub struct AppState {
    league_store: RwLock<Option<Arc<dyn LeagueStore>>>,
    degraded: watch::Sender<bool>,
    config: AppConfig,
    jobs: JobRegistry,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            league_store: RwLock::new(None),
            degraded: degraded_tx,
            config,
            jobs: JobRegistry::new(),
        })
    }

    /// Construct a state with `store` already installed.
    pub async fn with_store(config: AppConfig, store: Arc<dyn LeagueStore>) -> SharedState {
        let state = Self::new(config);
        state.set_league_store(store).await;
        state
    }

    /// Obtain a handle to the current league store, if one is installed.
    pub async fn league_store(&self) -> Option<Arc<dyn LeagueStore>> {
        let guard = self.league_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the league store or fail with [`ServiceError::Degraded`].
    pub async fn require_league_store(&self) -> Result<Arc<dyn LeagueStore>, ServiceError> {
        if *self.degraded.borrow() {
            return Err(ServiceError::Degraded);
        }
        self.league_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new league store implementation and leave degraded mode.
    pub async fn set_league_store(&self, store: Arc<dyn LeagueStore>) {
        {
            let mut guard = self.league_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current league store and enter degraded mode.
    pub async fn clear_league_store(&self) {
        {
            let mut guard = self.league_store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Whether requests are currently refused for lack of storage.
    pub async fn is_degraded(&self) -> bool {
        if *self.degraded.borrow() {
            return true;
        }
        self.league_store.read().await.is_none()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Registry of jobs currently running in this process.
    pub fn jobs(&self) -> &JobRegistry {
        &self.jobs
    }

    /// Run `work` as the scheduled job(s) `kinds`, refusing to overlap with a run already
    /// in flight and bounding it by the configured job timeout.
    pub async fn run_job<F, Fut, T>(&self, kinds: &[JobKind], work: F) -> Result<T, ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let _guard = self.jobs.begin(kinds).map_err(ServiceError::JobRunning)?;

        match timeout(self.config.job_timeout(), work()).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    jobs = ?kinds,
                    limit = ?self.config.job_timeout(),
                    "scheduled job timed out"
                );
                Err(ServiceError::JobTimedOut {
                    limit: self.config.job_timeout(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::dao::league_store::memory::MemoryLeagueStore;

    #[tokio::test]
    async fn starts_degraded_until_store_installed() {
        let state = AppState::new(AppConfig::default());
        assert!(state.is_degraded().await);
        assert!(matches!(
            state.require_league_store().await,
            Err(ServiceError::Degraded)
        ));

        state
            .set_league_store(Arc::new(MemoryLeagueStore::new()))
            .await;
        assert!(!state.is_degraded().await);
        assert!(state.require_league_store().await.is_ok());

        state.clear_league_store().await;
        assert!(state.is_degraded().await);
    }

    #[tokio::test]
    async fn degraded_watcher_sees_changes() {
        let state = AppState::new(AppConfig::default());
        let mut watcher = state.degraded_watcher();
        state
            .set_league_store(Arc::new(MemoryLeagueStore::new()))
            .await;
        watcher.changed().await.unwrap();
        assert!(!*watcher.borrow());
    }

    #[tokio::test]
    async fn overlapping_job_is_rejected() {
        let state = AppState::new(AppConfig::default());
        let _running = state.jobs().begin(&[JobKind::CloseSeasons]).unwrap();

        let result = state
            .run_job(&[JobKind::CloseSeasons], || async { Ok(()) })
            .await;
        assert!(matches!(
            result,
            Err(ServiceError::JobRunning(JobKind::CloseSeasons))
        ));
    }

    #[tokio::test]
    async fn job_is_released_after_completion() {
        let state = AppState::new(AppConfig::default());
        let value = state
            .run_job(&[JobKind::OpenSeasons], || async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert!(state.jobs().running().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_job_times_out() {
        let state = AppState::new(AppConfig::default());
        let result: Result<(), _> = state
            .run_job(&[JobKind::TakeSnapshots], || async {
                tokio::time::sleep(Duration::from_secs(3_600)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(ServiceError::JobTimedOut { .. })));
        assert!(state.jobs().running().is_empty());
    }
}
