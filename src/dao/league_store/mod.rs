pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use std::time::SystemTime;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::models::{
    ActivityLogEntity, LeagueEntity, MembershipEntity, PositionSnapshotEntity, SeasonClosure,
    SeasonEntity, SeasonResultEntity,
};
use crate::dao::storage::StorageResult;
use crate::state::season_status::SeasonStatus;

/// Abstraction over the persistence layer for leagues, seasons and their history.
pub trait LeagueStore: Send + Sync {
    fn save_league(&self, league: LeagueEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_league(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<LeagueEntity>>>;
    fn list_leagues(&self) -> BoxFuture<'static, StorageResult<Vec<LeagueEntity>>>;

    /// Insert or replace the membership of `membership.user_id`.
    fn save_membership(&self, membership: MembershipEntity)
    -> BoxFuture<'static, StorageResult<()>>;
    fn list_members(&self, league_id: Uuid)
    -> BoxFuture<'static, StorageResult<Vec<MembershipEntity>>>;
    fn count_members(&self, league_id: Uuid) -> BoxFuture<'static, StorageResult<u64>>;
    /// Atomically add `points` to the member's current season total.
    /// Returns the updated membership, or `None` when the user has no league.
    fn award_points(
        &self,
        user_id: Uuid,
        points: i64,
        now: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Option<MembershipEntity>>>;
    /// Store the ranks computed on demand for members still in `league_id`.
    fn set_cached_ranks(
        &self,
        league_id: Uuid,
        ranks: Vec<(Uuid, u32)>,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Insert a new season. Fails with a duplicate error when the (league, number)
    /// pair exists or the league already has an active season.
    fn insert_season(&self, season: SeasonEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_season(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SeasonEntity>>>;
    fn find_seasons(&self, ids: Vec<Uuid>)
    -> BoxFuture<'static, StorageResult<Vec<SeasonEntity>>>;
    fn list_seasons(
        &self,
        statuses: Vec<SeasonStatus>,
    ) -> BoxFuture<'static, StorageResult<Vec<SeasonEntity>>>;
    /// Season with the highest number for the league.
    fn latest_season(&self, league_id: Uuid)
    -> BoxFuture<'static, StorageResult<Option<SeasonEntity>>>;
    /// Move an `active` season (or a `closing` one claimed before `stale_before`)
    /// to `closing`. Returns whether this caller now owns the season.
    fn claim_season(
        &self,
        id: Uuid,
        now: SystemTime,
        stale_before: SystemTime,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Hand a `closing` season back to `active`.
    fn release_season(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    /// Atomically write results, reset memberships, append activity and complete the season.
    fn commit_closure(&self, closure: SeasonClosure) -> BoxFuture<'static, StorageResult<()>>;

    fn results_for_season(
        &self,
        season_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SeasonResultEntity>>>;
    fn results_for_user(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SeasonResultEntity>>>;

    /// Insert one snapshot. Fails with a duplicate error when the day is already recorded.
    fn insert_snapshot(
        &self,
        snapshot: PositionSnapshotEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn snapshots_for_user(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PositionSnapshotEntity>>>;

    fn activity_for_user(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ActivityLogEntity>>>;

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
