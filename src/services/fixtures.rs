//! Shared seeding helpers for service tests.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use time::{Date, macros::date};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::{
        league_store::{LeagueStore, memory::MemoryLeagueStore},
        models::{LeagueEntity, MembershipEntity, SeasonEntity},
    },
    league::{SeasonWindow, Tier},
    state::{AppState, SharedState, season_status::SeasonStatus},
};

/// Monday following the seeded season.
pub const TODAY: Date = date!(2026 - 10 - 19);
/// First day of the seeded season.
pub const SEASON_START: Date = date!(2026 - 10 - 12);

pub struct Fixture {
    pub state: SharedState,
    pub store: MemoryLeagueStore,
    pub leagues: HashMap<Tier, LeagueEntity>,
}

impl Fixture {
    /// State backed by a fresh memory store with one league per tier.
    pub async fn new() -> Self {
        let store = MemoryLeagueStore::new();
        let state = AppState::with_store(AppConfig::default(), Arc::new(store.clone())).await;
        let mut leagues = HashMap::new();
        for (offset, tier) in Tier::ALL.into_iter().enumerate() {
            let mut league = LeagueEntity::tiered(tier, 30);
            league.created_at = UNIX_EPOCH + Duration::from_secs(offset as u64);
            store.save_league(league.clone()).await.unwrap();
            leagues.insert(tier, league);
        }
        Self {
            state,
            store,
            leagues,
        }
    }

    pub fn league(&self, tier: Tier) -> Uuid {
        self.leagues[&tier].id
    }

    /// Add a member; `seniority` orders join times (lower joined earlier).
    pub async fn add_member(&self, tier: Tier, points: i64, seniority: u64) -> Uuid {
        let user_id = Uuid::new_v4();
        let joined_at = UNIX_EPOCH + Duration::from_secs(1_000 + seniority);
        self.store
            .save_membership(MembershipEntity {
                user_id,
                league_id: self.league(tier),
                points,
                cached_rank: None,
                joined_at,
                updated_at: joined_at,
            })
            .await
            .unwrap();
        user_id
    }

    /// Add one member per entry of `points`, the first one joining first.
    pub async fn add_members(&self, tier: Tier, points: &[i64]) -> Vec<Uuid> {
        let mut users = Vec::with_capacity(points.len());
        for (seniority, points) in points.iter().enumerate() {
            users.push(self.add_member(tier, *points, seniority as u64).await);
        }
        users
    }

    /// Insert an active season starting on `starts_on`.
    pub async fn open_season(&self, tier: Tier, number: u32, starts_on: Date) -> SeasonEntity {
        let window = SeasonWindow::next(starts_on, starts_on.weekday());
        let season = SeasonEntity {
            id: Uuid::new_v4(),
            league_id: self.league(tier),
            season_number: number,
            starts_on: window.starts_on,
            ends_on: window.ends_on,
            status: SeasonStatus::Active,
            claimed_at: None,
            completed_at: None,
            created_at: SystemTime::now(),
        };
        self.store.insert_season(season.clone()).await.unwrap();
        season
    }

    pub async fn season(&self, id: Uuid) -> SeasonEntity {
        self.store.find_season(id).await.unwrap().unwrap()
    }

    pub async fn membership(&self, tier: Tier, user_id: Uuid) -> Option<MembershipEntity> {
        self.store
            .list_members(self.league(tier))
            .await
            .unwrap()
            .into_iter()
            .find(|membership| membership.user_id == user_id)
    }
}
