//! End-to-end season lifecycle against the in-memory store.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use league_season_engine::{
    config::AppConfig,
    dao::{
        league_store::{LeagueStore, memory::MemoryLeagueStore},
        models::{LeagueEntity, MembershipEntity},
    },
    league::{Outcome, Tier},
    services::{
        bootstrap_service, history_service, promotion_service, scheduler_service,
        snapshot_service,
    },
    state::{AppState, SharedState, season_status::SeasonStatus},
};
use time::{Date, macros::date};
use uuid::Uuid;

/// Friday before the first season starts.
const OPENED_ON: Date = date!(2026 - 10 - 16);
/// Monday after the first season ends.
const CLOSED_ON: Date = date!(2026 - 10 - 26);

struct Engine {
    state: SharedState,
    store: MemoryLeagueStore,
    leagues: HashMap<Tier, Uuid>,
}

impl Engine {
    async fn start() -> Self {
        let store = MemoryLeagueStore::new();
        let state = AppState::with_store(AppConfig::default(), Arc::new(store.clone())).await;
        bootstrap_service::ensure_tier_leagues(&state).await.unwrap();

        let leagues = store
            .list_leagues()
            .await
            .unwrap()
            .into_iter()
            .filter_map(|league: LeagueEntity| {
                league
                    .tier()
                    .ok()
                    .flatten()
                    .map(|tier| (tier, league.id))
            })
            .collect();
        Self {
            state,
            store,
            leagues,
        }
    }

    /// Seed `points.len()` members; earlier entries joined earlier.
    async fn seed(&self, tier: Tier, points: &[i64]) -> Vec<Uuid> {
        let mut users = Vec::new();
        for (index, points) in points.iter().enumerate() {
            let user_id = Uuid::new_v4();
            let joined_at = UNIX_EPOCH + Duration::from_secs(10_000 + index as u64);
            self.store
                .save_membership(MembershipEntity {
                    user_id,
                    league_id: self.leagues[&tier],
                    points: *points,
                    cached_rank: None,
                    joined_at,
                    updated_at: joined_at,
                })
                .await
                .unwrap();
            users.push(user_id);
        }
        users
    }

    async fn league_of(&self, user_id: Uuid) -> Option<(Tier, i64)> {
        for (tier, league_id) in &self.leagues {
            let members = self.store.list_members(*league_id).await.unwrap();
            if let Some(member) = members.iter().find(|member| member.user_id == user_id) {
                return Some((*tier, member.points));
            }
        }
        None
    }

    async fn outcome_of(&self, user_id: Uuid) -> Outcome {
        self.store.results_for_user(user_id).await.unwrap()[0].outcome
    }
}

fn descending(count: i64) -> Vec<i64> {
    (0..count).map(|index| (count - index) * 10).collect()
}

#[tokio::test]
async fn bronze_league_never_demotes() {
    let engine = Engine::start().await;
    let users = engine.seed(Tier::Bronze, &descending(10)).await;
    scheduler_service::open_next_seasons_on(&engine.state, OPENED_ON)
        .await
        .unwrap();

    let summary = promotion_service::close_seasons_on(&engine.state, CLOSED_ON, false)
        .await
        .unwrap();
    assert_eq!(summary.members(), 10);
    assert_eq!(summary.demoted, 0);

    for user in &users[..2] {
        assert_eq!(engine.outcome_of(*user).await, Outcome::Promoted);
        assert_eq!(engine.league_of(*user).await, Some((Tier::Silver, 0)));
    }
    for user in &users[8..] {
        assert_eq!(engine.outcome_of(*user).await, Outcome::Stayed);
        assert_eq!(engine.league_of(*user).await, Some((Tier::Bronze, 0)));
    }
}

#[tokio::test]
async fn legend_league_never_promotes() {
    let engine = Engine::start().await;
    let users = engine.seed(Tier::Legend, &descending(10)).await;
    scheduler_service::open_next_seasons_on(&engine.state, OPENED_ON)
        .await
        .unwrap();

    let summary = promotion_service::close_seasons_on(&engine.state, CLOSED_ON, false)
        .await
        .unwrap();
    assert_eq!(summary.promoted, 0);
    assert_eq!(summary.demoted, 2);

    for user in &users[..2] {
        assert_eq!(engine.outcome_of(*user).await, Outcome::Stayed);
        assert_eq!(engine.league_of(*user).await, Some((Tier::Legend, 0)));
    }
    for user in &users[8..] {
        assert_eq!(engine.outcome_of(*user).await, Outcome::Demoted);
        assert_eq!(engine.league_of(*user).await, Some((Tier::Diamond, 0)));
    }
}

#[tokio::test]
async fn five_member_gold_league() {
    let engine = Engine::start().await;
    let users = engine.seed(Tier::Gold, &descending(5)).await;
    scheduler_service::open_next_seasons_on(&engine.state, OPENED_ON)
        .await
        .unwrap();

    promotion_service::close_seasons_on(&engine.state, CLOSED_ON, false)
        .await
        .unwrap();

    assert_eq!(engine.outcome_of(users[0]).await, Outcome::Promoted);
    for user in &users[1..4] {
        assert_eq!(engine.outcome_of(*user).await, Outcome::Stayed);
    }
    assert_eq!(engine.outcome_of(users[4]).await, Outcome::Demoted);
}

#[tokio::test]
async fn demotion_scare_counts_once() {
    let engine = Engine::start().await;
    let users = engine.seed(Tier::Gold, &descending(5)).await;
    let scared = users[4];
    scheduler_service::open_next_seasons_on(&engine.state, OPENED_ON)
        .await
        .unwrap();

    for day in [
        date!(2026 - 10 - 19),
        date!(2026 - 10 - 21),
        date!(2026 - 10 - 23),
    ] {
        snapshot_service::take_snapshots_on(&engine.state, day)
            .await
            .unwrap();
    }
    // 10 points -> 35: overtakes the 30 and 20 point members, finishing third.
    engine
        .store
        .award_points(scared, 25, SystemTime::now())
        .await
        .unwrap();

    promotion_service::close_seasons_on(&engine.state, CLOSED_ON, false)
        .await
        .unwrap();

    assert_eq!(engine.outcome_of(scared).await, Outcome::Stayed);
    assert_eq!(
        snapshot_service::count_demotion_escapes(&engine.state, scared)
            .await
            .unwrap(),
        1
    );
    let summary = history_service::achievement_summary(&engine.state, scared, None)
        .await
        .unwrap();
    assert_eq!(summary.demotion_escapes, 1);
    assert_eq!(summary.perfect_seasons, None);
}

#[tokio::test]
async fn equal_points_favour_the_earlier_joiner() {
    let engine = Engine::start().await;
    let users = engine.seed(Tier::Silver, &[40, 40, 10, 10, 10]).await;
    scheduler_service::open_next_seasons_on(&engine.state, OPENED_ON)
        .await
        .unwrap();

    promotion_service::close_seasons_on(&engine.state, CLOSED_ON, false)
        .await
        .unwrap();

    assert_eq!(engine.outcome_of(users[0]).await, Outcome::Promoted);
    assert_eq!(engine.outcome_of(users[1]).await, Outcome::Stayed);
    assert_eq!(engine.outcome_of(users[4]).await, Outcome::Demoted);
}

#[tokio::test]
async fn repeated_triggers_are_idempotent() {
    let engine = Engine::start().await;
    let users = engine.seed(Tier::Platinum, &descending(7)).await;
    scheduler_service::open_next_seasons_on(&engine.state, OPENED_ON)
        .await
        .unwrap();

    let day = date!(2026 - 10 - 20);
    snapshot_service::take_snapshots_on(&engine.state, day)
        .await
        .unwrap();
    let repeat = snapshot_service::take_snapshots_on(&engine.state, day)
        .await
        .unwrap();
    assert_eq!(repeat.inserted, 0);
    assert_eq!(repeat.already_present, 7);
    assert_eq!(engine.store.snapshots_for_user(users[0]).await.unwrap().len(), 1);

    let first = scheduler_service::weekly_rollover_on(&engine.state, CLOSED_ON)
        .await
        .unwrap();
    assert_eq!(first.closed.members(), 7);
    let second = scheduler_service::weekly_rollover_on(&engine.state, CLOSED_ON)
        .await
        .unwrap();
    assert_eq!(second.closed.members(), 0);
    assert_eq!(second.opened.opened, 0);

    for user in &users {
        assert_eq!(engine.store.results_for_user(*user).await.unwrap().len(), 1);
    }

    let active = scheduler_service::get_all_active_seasons(&engine.state)
        .await
        .unwrap();
    assert_eq!(active.len(), Tier::ALL.len());
    assert!(active.iter().all(|season| season.season_number == 2));
    assert!(active.iter().all(|season| season.status == SeasonStatus::Active));
    assert!(active.iter().all(|season| season.starts_on == "2026-10-26"));
}

#[tokio::test]
async fn full_ladder_closes_every_member_once() {
    let engine = Engine::start().await;
    let mut everyone = Vec::new();
    for tier in Tier::ALL {
        everyone.extend(engine.seed(tier, &descending(5)).await);
    }
    scheduler_service::open_next_seasons_on(&engine.state, OPENED_ON)
        .await
        .unwrap();

    let summary = promotion_service::close_seasons_on(&engine.state, CLOSED_ON, false)
        .await
        .unwrap();
    assert_eq!(summary.seasons_processed, Tier::ALL.len() as u32);
    assert_eq!(summary.members(), everyone.len() as u32);
    assert_eq!(
        (summary.promoted, summary.demoted, summary.stayed),
        (5, 5, 20)
    );

    for user in &everyone {
        assert_eq!(engine.store.results_for_user(*user).await.unwrap().len(), 1);
    }
    for tier in Tier::ALL {
        let members = engine.store.list_members(engine.leagues[&tier]).await.unwrap();
        // Every departure is matched by an arrival from the neighbouring tier.
        assert_eq!(members.len(), 5);
    }
}
