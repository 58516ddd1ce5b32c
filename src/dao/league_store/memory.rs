//! Process-local [`LeagueStore`] used by tests and single-node local runs.
//!
//! Every operation takes the same lock, so a closure commit is atomic with respect
//! to every other write, the way a database transaction would be.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::SystemTime,
};

use futures::future::BoxFuture;
use time::Date;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::LeagueStore;
use crate::{
    dao::{
        models::{
            ActivityLogEntity, LeagueEntity, MembershipEntity, PositionSnapshotEntity,
            SeasonClosure, SeasonEntity, SeasonResultEntity,
        },
        storage::{StorageError, StorageResult},
    },
    state::season_status::{SeasonEvent, SeasonStatus},
};

#[derive(Default)]
struct Tables {
    leagues: HashMap<Uuid, LeagueEntity>,
    memberships: HashMap<Uuid, MembershipEntity>,
    seasons: HashMap<Uuid, SeasonEntity>,
    results: HashMap<(Uuid, Uuid), SeasonResultEntity>,
    snapshots: HashMap<(Uuid, Uuid, Date), PositionSnapshotEntity>,
    activity: Vec<ActivityLogEntity>,
    #[cfg(test)]
    failing_commits: HashSet<Uuid>,
}

/// In-memory league store.
#[derive(Clone, Default)]
pub struct MemoryLeagueStore {
    inner: Arc<Mutex<Tables>>,
}

impl MemoryLeagueStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next commits of `season_id` fail as if the backend went away.
    #[cfg(test)]
    pub(crate) async fn fail_commits_for(&self, season_id: Uuid) {
        self.inner.lock().await.failing_commits.insert(season_id);
    }

    /// Put a completed season back to `active`, as if its status write had been lost.
    #[cfg(test)]
    pub(crate) async fn reopen_season(&self, season_id: Uuid) {
        if let Some(season) = self.inner.lock().await.seasons.get_mut(&season_id) {
            season.status = SeasonStatus::Active;
            season.completed_at = None;
        }
    }

    fn validate_closure(tables: &Tables, closure: &SeasonClosure) -> StorageResult<()> {
        let season = tables.seasons.get(&closure.season_id).ok_or_else(|| {
            StorageError::conflict(format!("season `{}` vanished", closure.season_id))
        })?;
        season
            .status
            .apply(SeasonEvent::Complete)
            .map_err(|err| StorageError::conflict(err.to_string()))?;

        let mut seen = HashSet::new();
        for result in &closure.results {
            let key = (result.season_id, result.user_id);
            if tables.results.contains_key(&key) || !seen.insert(key) {
                return Err(StorageError::duplicate(
                    "season result",
                    format!("{}/{}", result.season_id, result.user_id),
                ));
            }
        }

        for reset in &closure.resets {
            let still_member = tables
                .memberships
                .get(&reset.user_id)
                .is_some_and(|membership| membership.league_id == closure.league_id);
            if !still_member {
                return Err(StorageError::conflict(format!(
                    "user `{}` left league `{}` during closure",
                    reset.user_id, closure.league_id
                )));
            }
        }

        Ok(())
    }
}

impl LeagueStore for MemoryLeagueStore {
    fn save_league(&self, league: LeagueEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.lock().await.leagues.insert(league.id, league);
            Ok(())
        })
    }

    fn find_league(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<LeagueEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.lock().await.leagues.get(&id).cloned()) })
    }

    fn list_leagues(&self) -> BoxFuture<'static, StorageResult<Vec<LeagueEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut leagues: Vec<_> = inner.lock().await.leagues.values().cloned().collect();
            leagues.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
            Ok(leagues)
        })
    }

    fn save_membership(
        &self,
        membership: MembershipEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner
                .lock()
                .await
                .memberships
                .insert(membership.user_id, membership);
            Ok(())
        })
    }

    fn list_members(
        &self,
        league_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<MembershipEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let tables = inner.lock().await;
            let mut members: Vec<_> = tables
                .memberships
                .values()
                .filter(|membership| membership.league_id == league_id)
                .cloned()
                .collect();
            members.sort_by(|a, b| a.joined_at.cmp(&b.joined_at));
            Ok(members)
        })
    }

    fn count_members(&self, league_id: Uuid) -> BoxFuture<'static, StorageResult<u64>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let tables = inner.lock().await;
            let count = tables
                .memberships
                .values()
                .filter(|membership| membership.league_id == league_id)
                .count();
            Ok(count as u64)
        })
    }

    fn award_points(
        &self,
        user_id: Uuid,
        points: i64,
        now: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Option<MembershipEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut tables = inner.lock().await;
            Ok(tables.memberships.get_mut(&user_id).map(|membership| {
                membership.points += points;
                membership.updated_at = now;
                membership.clone()
            }))
        })
    }

    fn set_cached_ranks(
        &self,
        league_id: Uuid,
        ranks: Vec<(Uuid, u32)>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut tables = inner.lock().await;
            for (user_id, rank) in ranks {
                match tables.memberships.get_mut(&user_id) {
                    Some(membership) if membership.league_id == league_id => {
                        membership.cached_rank = Some(rank);
                    }
                    _ => {}
                }
            }
            Ok(())
        })
    }

    fn insert_season(&self, season: SeasonEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut tables = inner.lock().await;
            let clash = tables.seasons.values().any(|existing| {
                existing.league_id == season.league_id
                    && (existing.season_number == season.season_number
                        || (existing.status == SeasonStatus::Active
                            && season.status == SeasonStatus::Active))
            });
            if clash {
                return Err(StorageError::duplicate(
                    "season",
                    format!("{}#{}", season.league_id, season.season_number),
                ));
            }
            tables.seasons.insert(season.id, season);
            Ok(())
        })
    }

    fn find_season(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SeasonEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.lock().await.seasons.get(&id).cloned()) })
    }

    fn find_seasons(
        &self,
        ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<SeasonEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let tables = inner.lock().await;
            Ok(ids
                .iter()
                .filter_map(|id| tables.seasons.get(id).cloned())
                .collect())
        })
    }

    fn list_seasons(
        &self,
        statuses: Vec<SeasonStatus>,
    ) -> BoxFuture<'static, StorageResult<Vec<SeasonEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let tables = inner.lock().await;
            let mut seasons: Vec<_> = tables
                .seasons
                .values()
                .filter(|season| statuses.contains(&season.status))
                .cloned()
                .collect();
            seasons.sort_by(|a, b| {
                a.league_id
                    .cmp(&b.league_id)
                    .then(a.season_number.cmp(&b.season_number))
            });
            Ok(seasons)
        })
    }

    fn latest_season(
        &self,
        league_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SeasonEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let tables = inner.lock().await;
            Ok(tables
                .seasons
                .values()
                .filter(|season| season.league_id == league_id)
                .max_by_key(|season| season.season_number)
                .cloned())
        })
    }

    fn claim_season(
        &self,
        id: Uuid,
        now: SystemTime,
        stale_before: SystemTime,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut tables = inner.lock().await;
            let Some(season) = tables.seasons.get_mut(&id) else {
                return Ok(false);
            };
            let claimable = match season.status {
                SeasonStatus::Active => true,
                SeasonStatus::Closing => season
                    .claimed_at
                    .is_none_or(|claimed_at| claimed_at < stale_before),
                SeasonStatus::Completed => false,
            };
            if !claimable {
                return Ok(false);
            }
            match season.status.apply(SeasonEvent::Claim) {
                Ok(next) => {
                    season.status = next;
                    season.claimed_at = Some(now);
                    Ok(true)
                }
                Err(_) => Ok(false),
            }
        })
    }

    fn release_season(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut tables = inner.lock().await;
            let Some(season) = tables.seasons.get_mut(&id) else {
                return Ok(false);
            };
            match season.status.apply(SeasonEvent::Release) {
                Ok(next) => {
                    season.status = next;
                    season.claimed_at = None;
                    Ok(true)
                }
                Err(_) => Ok(false),
            }
        })
    }

    fn commit_closure(&self, closure: SeasonClosure) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut tables = inner.lock().await;

            #[cfg(test)]
            if tables.failing_commits.contains(&closure.season_id) {
                return Err(StorageError::unavailable(
                    "injected commit failure".into(),
                    std::io::Error::other("memory store offline"),
                ));
            }

            Self::validate_closure(&tables, &closure)?;

            for result in closure.results {
                tables
                    .results
                    .insert((result.season_id, result.user_id), result);
            }
            for reset in closure.resets {
                if let Some(membership) = tables.memberships.get_mut(&reset.user_id) {
                    membership.league_id = reset.league_id;
                    membership.points = 0;
                    membership.cached_rank = None;
                    membership.updated_at = closure.closed_at;
                }
            }
            tables.activity.extend(closure.activity);
            if let Some(season) = tables.seasons.get_mut(&closure.season_id) {
                season.status = SeasonStatus::Completed;
                season.completed_at = Some(closure.closed_at);
                season.claimed_at = None;
            }
            Ok(())
        })
    }

    fn results_for_season(
        &self,
        season_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SeasonResultEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let tables = inner.lock().await;
            let mut results: Vec<_> = tables
                .results
                .values()
                .filter(|result| result.season_id == season_id)
                .cloned()
                .collect();
            results.sort_by_key(|result| result.final_rank);
            Ok(results)
        })
    }

    fn results_for_user(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SeasonResultEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let tables = inner.lock().await;
            let mut results: Vec<_> = tables
                .results
                .values()
                .filter(|result| result.user_id == user_id)
                .cloned()
                .collect();
            results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(results)
        })
    }

    fn insert_snapshot(
        &self,
        snapshot: PositionSnapshotEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut tables = inner.lock().await;
            let key = (snapshot.season_id, snapshot.user_id, snapshot.taken_on);
            if tables.snapshots.contains_key(&key) {
                return Err(StorageError::duplicate(
                    "position snapshot",
                    format!("{}/{}/{}", key.0, key.1, key.2),
                ));
            }
            tables.snapshots.insert(key, snapshot);
            Ok(())
        })
    }

    fn snapshots_for_user(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PositionSnapshotEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let tables = inner.lock().await;
            let mut snapshots: Vec<_> = tables
                .snapshots
                .values()
                .filter(|snapshot| snapshot.user_id == user_id)
                .cloned()
                .collect();
            snapshots.sort_by_key(|snapshot| snapshot.taken_on);
            Ok(snapshots)
        })
    }

    fn activity_for_user(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ActivityLogEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let tables = inner.lock().await;
            Ok(tables
                .activity
                .iter()
                .rev()
                .filter(|entry| entry.user_id == user_id)
                .cloned()
                .collect())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
