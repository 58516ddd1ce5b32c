//! Season opening and the combined weekly rollover.

use std::{sync::Arc, time::SystemTime};

use time::{Date, OffsetDateTime, Weekday};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        league_store::LeagueStore,
        models::{LeagueEntity, SeasonEntity},
        storage::StorageResult,
    },
    dto::{
        cron::{OpenSeasonsSummary, WeeklyRolloverSummary},
        league::SeasonSummary,
    },
    error::ServiceError,
    league::SeasonWindow,
    services::promotion_service,
    state::{SharedState, jobs::JobKind, season_status::SeasonStatus},
};

enum OpenOutcome {
    Opened(SeasonEntity),
    AlreadyOpen,
}

/// Open the next season of every tiered league that has none open.
pub async fn open_next_seasons(state: &SharedState) -> Result<OpenSeasonsSummary, ServiceError> {
    let today = OffsetDateTime::now_utc().date();
    state
        .run_job(&[JobKind::OpenSeasons], || open_next_seasons_on(state, today))
        .await
}

/// Close finished seasons, then open the following ones, as a single job.
pub async fn weekly_rollover(state: &SharedState) -> Result<WeeklyRolloverSummary, ServiceError> {
    let today = OffsetDateTime::now_utc().date();
    state
        .run_job(&[JobKind::CloseSeasons, JobKind::OpenSeasons], || {
            weekly_rollover_on(state, today)
        })
        .await
}

/// Unguarded rollover for `today`.
pub async fn weekly_rollover_on(
    state: &SharedState,
    today: Date,
) -> Result<WeeklyRolloverSummary, ServiceError> {
    let closed = promotion_service::close_seasons_on(state, today, false).await?;
    let opened = open_next_seasons_on(state, today).await?;
    Ok(WeeklyRolloverSummary { closed, opened })
}

/// Open seasons as of `today`.
pub async fn open_next_seasons_on(
    state: &SharedState,
    today: Date,
) -> Result<OpenSeasonsSummary, ServiceError> {
    let store = state.require_league_store().await?;
    let boundary = state.config().season_boundary();
    let leagues = store.list_leagues().await?;

    let mut summary = OpenSeasonsSummary::default();
    for league in leagues {
        match league.tier() {
            Ok(Some(_)) => {}
            Ok(None) => continue,
            Err(err) => {
                warn!(league_id = %league.id, error = %err, "cannot open season for league");
                summary.failed += 1;
                continue;
            }
        }

        match open_for_league(&store, &league, today, boundary).await {
            Ok(OpenOutcome::Opened(season)) => {
                info!(
                    league_id = %league.id,
                    season_id = %season.id,
                    season_number = season.season_number,
                    starts_on = %season.starts_on,
                    "season opened"
                );
                summary.opened += 1;
            }
            Ok(OpenOutcome::AlreadyOpen) => summary.already_open += 1,
            Err(err) => {
                warn!(league_id = %league.id, error = %err, "failed to open season");
                summary.failed += 1;
            }
        }
    }

    info!(
        opened = summary.opened,
        already_open = summary.already_open,
        failed = summary.failed,
        "season opening run finished"
    );
    Ok(summary)
}

async fn open_for_league(
    store: &Arc<dyn LeagueStore>,
    league: &LeagueEntity,
    today: Date,
    boundary: Weekday,
) -> StorageResult<OpenOutcome> {
    let latest = store.latest_season(league.id).await?;
    if latest.as_ref().is_some_and(|season| season.status.is_open()) {
        return Ok(OpenOutcome::AlreadyOpen);
    }

    let window = SeasonWindow::next(today, boundary);
    let season = SeasonEntity {
        id: Uuid::new_v4(),
        league_id: league.id,
        season_number: latest.map_or(1, |season| season.season_number + 1),
        starts_on: window.starts_on,
        ends_on: window.ends_on,
        status: SeasonStatus::Active,
        claimed_at: None,
        completed_at: None,
        created_at: SystemTime::now(),
    };

    match store.insert_season(season.clone()).await {
        Ok(()) => Ok(OpenOutcome::Opened(season)),
        Err(err) if err.is_duplicate() => {
            debug!(league_id = %league.id, "season opened concurrently; skipping");
            Ok(OpenOutcome::AlreadyOpen)
        }
        Err(err) => Err(err),
    }
}

/// The league's current active season.
pub async fn get_active_season(
    state: &SharedState,
    league_id: Uuid,
) -> Result<SeasonSummary, ServiceError> {
    let store = state.require_league_store().await?;
    if store.find_league(league_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!(
            "league `{league_id}` not found"
        )));
    }

    match store.latest_season(league_id).await? {
        Some(season) if season.status == SeasonStatus::Active => Ok(season.into()),
        _ => Err(ServiceError::NotFound(format!(
            "league `{league_id}` has no active season"
        ))),
    }
}

/// Every active season across all leagues.
pub async fn get_all_active_seasons(
    state: &SharedState,
) -> Result<Vec<SeasonSummary>, ServiceError> {
    let store = state.require_league_store().await?;
    let seasons = store.list_seasons(vec![SeasonStatus::Active]).await?;
    Ok(seasons.into_iter().map(Into::into).collect())
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;
    use crate::{
        league::Tier,
        services::fixtures::{Fixture, SEASON_START, TODAY},
    };

    #[tokio::test]
    async fn first_run_opens_one_season_per_tier() {
        let fixture = Fixture::new().await;
        let summary = open_next_seasons_on(&fixture.state, date!(2026 - 10 - 16))
            .await
            .unwrap();
        assert_eq!(summary.opened, 6);

        let season = get_active_season(&fixture.state, fixture.league(Tier::Gold))
            .await
            .unwrap();
        assert_eq!(season.season_number, 1);
        assert_eq!(season.starts_on, "2026-10-19");
        assert_eq!(season.ends_on, "2026-10-25");
    }

    #[tokio::test]
    async fn open_is_idempotent() {
        let fixture = Fixture::new().await;
        open_next_seasons_on(&fixture.state, TODAY).await.unwrap();
        let summary = open_next_seasons_on(&fixture.state, TODAY).await.unwrap();
        assert_eq!(summary.opened, 0);
        assert_eq!(summary.already_open, 6);
        assert_eq!(
            get_all_active_seasons(&fixture.state).await.unwrap().len(),
            6
        );
    }

    #[tokio::test]
    async fn custom_leagues_are_ignored() {
        let fixture = Fixture::new().await;
        let mut custom = LeagueEntity::tiered(Tier::Gold, 10);
        custom.tier = None;
        fixture.store.save_league(custom.clone()).await.unwrap();

        let summary = open_next_seasons_on(&fixture.state, TODAY).await.unwrap();
        assert_eq!(summary.opened, 6);
        assert!(matches!(
            get_active_season(&fixture.state, custom.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn rollover_closes_then_opens_next_number() {
        let fixture = Fixture::new().await;
        fixture.add_members(Tier::Gold, &[10, 5, 1]).await;
        let first = fixture.open_season(Tier::Gold, 1, SEASON_START).await;

        let summary = weekly_rollover_on(&fixture.state, TODAY).await.unwrap();
        assert_eq!(summary.closed.seasons_processed, 1);
        // Gold reopens; the five other tiers get their first season.
        assert_eq!(summary.opened.opened, 6);

        let next = get_active_season(&fixture.state, fixture.league(Tier::Gold))
            .await
            .unwrap();
        assert_eq!(next.season_number, 2);
        assert_ne!(next.id, first.id);
        assert_eq!(next.starts_on, "2026-10-19");
    }

    #[tokio::test]
    async fn closing_season_blocks_reopening() {
        let fixture = Fixture::new().await;
        let season = fixture.open_season(Tier::Gold, 1, SEASON_START).await;
        fixture
            .store
            .claim_season(season.id, SystemTime::now(), std::time::UNIX_EPOCH)
            .await
            .unwrap();

        let summary = open_next_seasons_on(&fixture.state, TODAY).await.unwrap();
        assert_eq!(summary.already_open, 1);
        assert_eq!(summary.opened, 5);
    }

    #[tokio::test]
    async fn unknown_league_is_not_found() {
        let fixture = Fixture::new().await;
        assert!(matches!(
            get_active_season(&fixture.state, Uuid::new_v4()).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
