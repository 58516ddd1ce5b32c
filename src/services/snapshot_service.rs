//! Daily zone snapshots of every active season and the demotion-escape query built on them.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::SystemTime,
};

use time::{Date, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        league_store::LeagueStore,
        models::{PositionSnapshotEntity, SeasonEntity, SeasonResultEntity},
    },
    dto::cron::SnapshotSummary,
    error::ServiceError,
    league::{Outcome, Zone, ranking},
    services::standings_service::contenders_of,
    state::{SharedState, jobs::JobKind, season_status::SeasonStatus},
};

#[derive(Default)]
struct SeasonTally {
    inserted: u32,
    already_present: u32,
}

/// Snapshot every active season for today.
pub async fn take_snapshots(state: &SharedState) -> Result<SnapshotSummary, ServiceError> {
    let today = OffsetDateTime::now_utc().date();
    state
        .run_job(&[JobKind::TakeSnapshots], || take_snapshots_on(state, today))
        .await
}

/// Snapshot every active season that has started by `today`.
pub async fn take_snapshots_on(
    state: &SharedState,
    today: Date,
) -> Result<SnapshotSummary, ServiceError> {
    let store = state.require_league_store().await?;
    let seasons = store.list_seasons(vec![SeasonStatus::Active]).await?;

    let mut summary = SnapshotSummary::default();
    for season in seasons.into_iter().filter(|season| season.starts_on <= today) {
        match snapshot_season(&store, &season, today).await {
            Ok(tally) => {
                summary.seasons += 1;
                summary.inserted += tally.inserted;
                summary.already_present += tally.already_present;
            }
            Err(err) => {
                warn!(
                    season_id = %season.id,
                    league_id = %season.league_id,
                    error = %err,
                    "failed to snapshot season"
                );
                summary.failed += 1;
            }
        }
    }

    info!(
        seasons = summary.seasons,
        inserted = summary.inserted,
        already_present = summary.already_present,
        failed = summary.failed,
        taken_on = %today,
        "snapshot run finished"
    );
    Ok(summary)
}

async fn snapshot_season(
    store: &Arc<dyn LeagueStore>,
    season: &SeasonEntity,
    today: Date,
) -> Result<SeasonTally, ServiceError> {
    let league = store
        .find_league(season.league_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("league `{}`", season.league_id)))?;
    let tier = league
        .tier()
        .map_err(|err| ServiceError::InvalidState(err.to_string()))?
        .ok_or_else(|| ServiceError::InvalidState(format!("league `{}` has no tier", league.id)))?;

    let members = store.list_members(league.id).await?;
    let standings = ranking::rank(contenders_of(members), tier);

    let mut tally = SeasonTally::default();
    for standing in standings {
        let snapshot = PositionSnapshotEntity {
            season_id: season.id,
            league_id: league.id,
            user_id: standing.user_id,
            taken_on: today,
            points: standing.points,
            rank: standing.rank,
            zone: standing.zone,
            created_at: SystemTime::now(),
        };
        match store.insert_snapshot(snapshot).await {
            Ok(()) => tally.inserted += 1,
            Err(err) if err.is_duplicate() => tally.already_present += 1,
            Err(err) => return Err(err.into()),
        }
    }
    Ok(tally)
}

/// Number of seasons in which `user_id` was seen in the demotion zone but was not demoted.
pub async fn count_demotion_escapes(
    state: &SharedState,
    user_id: Uuid,
) -> Result<u32, ServiceError> {
    let store = state.require_league_store().await?;
    let snapshots = store.snapshots_for_user(user_id).await?;
    let results = store.results_for_user(user_id).await?;
    Ok(demotion_escapes(&snapshots, &results))
}

/// Count distinct seasons with a demotion-zone snapshot and a final outcome other than demoted.
pub fn demotion_escapes(
    snapshots: &[PositionSnapshotEntity],
    results: &[SeasonResultEntity],
) -> u32 {
    let endangered: HashSet<Uuid> = snapshots
        .iter()
        .filter(|snapshot| snapshot.zone == Zone::Demotion)
        .map(|snapshot| snapshot.season_id)
        .collect();
    let outcomes: HashMap<Uuid, Outcome> = results
        .iter()
        .map(|result| (result.season_id, result.outcome))
        .collect();

    endangered
        .iter()
        .filter(|season_id| {
            outcomes
                .get(season_id)
                .is_some_and(|outcome| *outcome != Outcome::Demoted)
        })
        .count() as u32
}
