//! Season closure: rank every finished season, write its results, move members
//! between tier leagues and complete the season, one atomic commit per season.
//!
//! Seasons are claimed with a compare-and-set on their status (`active -> closing`)
//! so overlapping runs, even from different processes, never close the same season
//! twice. Any failure hands the season back to `active` and the next trigger retries it.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use thiserror::Error;
use time::{Date, OffsetDateTime};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        league_store::LeagueStore,
        models::{
            ActivityKind, ActivityLogEntity, LeagueEntity, MembershipEntity, MembershipReset,
            SeasonClosure, SeasonEntity, SeasonResultEntity,
        },
        storage::StorageError,
    },
    dto::cron::CloseSeasonsSummary,
    error::ServiceError,
    league::{Outcome, Tier, UnknownTier, ranking},
    services::standings_service::contenders_of,
    state::{SharedState, jobs::JobKind, season_status::SeasonStatus},
};

/// Reasons a single season could not be closed.
#[derive(Debug, Error)]
pub enum ClosureError {
    /// Results already exist for the season.
    #[error("season already closed")]
    AlreadyClosed,
    /// The storage backend failed or the data moved underneath the closure.
    #[error(transparent)]
    Storage(StorageError),
    /// The season points at a league that does not exist.
    #[error("league `{0}` not found")]
    MissingLeague(Uuid),
    /// The league's tier value is malformed.
    #[error(transparent)]
    UnknownTier(#[from] UnknownTier),
    /// Custom leagues do not take part in promotion.
    #[error("league `{0}` has no tier")]
    Untiered(Uuid),
    /// No league exists for the tier members should move to.
    #[error("no league available for tier `{0}`")]
    MissingDestination(Tier),
}

impl From<StorageError> for ClosureError {
    fn from(err: StorageError) -> Self {
        if err.is_duplicate() {
            ClosureError::AlreadyClosed
        } else {
            ClosureError::Storage(err)
        }
    }
}

enum SeasonReport {
    Closed(Vec<Outcome>),
    Empty,
}

/// Close every finished season. Guarded against overlapping runs in this process.
pub async fn close_seasons(
    state: &SharedState,
    force: bool,
) -> Result<CloseSeasonsSummary, ServiceError> {
    let today = OffsetDateTime::now_utc().date();
    state
        .run_job(&[JobKind::CloseSeasons], || {
            close_seasons_on(state, today, force)
        })
        .await
}

/// Close every open season whose last day is before `today` (or every open season
/// when `force` is set).
pub async fn close_seasons_on(
    state: &SharedState,
    today: Date,
    force: bool,
) -> Result<CloseSeasonsSummary, ServiceError> {
    let store = state.require_league_store().await?;
    let seasons = store
        .list_seasons(vec![SeasonStatus::Active, SeasonStatus::Closing])
        .await?;
    let directory = TierDirectory::new(store.list_leagues().await?);

    let mut summary = CloseSeasonsSummary::default();
    let mut claimed = Vec::new();
    for season in seasons {
        if !force && season.ends_on >= today {
            debug!(
                season_id = %season.id,
                ends_on = %season.ends_on,
                "season still running; not closing"
            );
            continue;
        }

        let now = SystemTime::now();
        let stale_before = now
            .checked_sub(state.config().claim_timeout())
            .unwrap_or(UNIX_EPOCH);
        match store.claim_season(season.id, now, stale_before).await {
            Ok(true) => claimed.push(season),
            Ok(false) => {
                debug!(season_id = %season.id, "season owned by another closure run; skipping");
                summary.seasons_skipped += 1;
            }
            Err(err) => {
                warn!(season_id = %season.id, error = %err, "failed to claim season");
                summary.seasons_failed += 1;
            }
        }
    }

    // Rosters are read before any commit: a member moved into a neighbouring tier by
    // this run must not be ranked again in the season they just arrived in.
    let mut rosters = Vec::with_capacity(claimed.len());
    for season in claimed {
        match store.list_members(season.league_id).await {
            Ok(members) => rosters.push((season, members)),
            Err(err) => {
                error!(
                    season_id = %season.id,
                    league_id = %season.league_id,
                    error = %err,
                    "failed to load season roster; releasing season for retry"
                );
                summary.seasons_failed += 1;
                release(&store, season.id).await;
            }
        }
    }

    for (season, members) in rosters {
        match close_claimed_season(&store, &directory, &season, members).await {
            Ok(SeasonReport::Closed(outcomes)) => {
                summary.seasons_processed += 1;
                for outcome in outcomes {
                    summary.record(outcome);
                }
            }
            Ok(SeasonReport::Empty) => summary.empty_seasons += 1,
            Err(ClosureError::AlreadyClosed) => {
                summary.seasons_skipped += 1;
                complete_already_closed(&store, &season).await;
            }
            Err(err) => {
                error!(
                    season_id = %season.id,
                    league_id = %season.league_id,
                    error = %err,
                    "season closure failed; releasing season for retry"
                );
                summary.seasons_failed += 1;
                release(&store, season.id).await;
            }
        }
    }

    info!(
        processed = summary.seasons_processed,
        skipped = summary.seasons_skipped,
        failed = summary.seasons_failed,
        empty = summary.empty_seasons,
        promoted = summary.promoted,
        demoted = summary.demoted,
        stayed = summary.stayed,
        "season closure run finished"
    );
    Ok(summary)
}

async fn release(store: &Arc<dyn LeagueStore>, season_id: Uuid) {
    match store.release_season(season_id).await {
        Ok(true) => {}
        Ok(false) => warn!(%season_id, "season was not closing anymore when released"),
        Err(err) => warn!(
            %season_id,
            error = %err,
            "failed to release season; it will be re-claimed once its claim is stale"
        ),
    }
}

/// Results for the season are already stored, so only its status is missing.
/// Completing it lets the league open its next season.
async fn complete_already_closed(store: &Arc<dyn LeagueStore>, season: &SeasonEntity) {
    warn!(
        season_id = %season.id,
        league_id = %season.league_id,
        "season results already recorded; completing season without new results"
    );
    if let Err(err) = store
        .commit_closure(SeasonClosure::without_results(
            season.id,
            season.league_id,
            SystemTime::now(),
        ))
        .await
    {
        error!(
            season_id = %season.id,
            error = %err,
            "failed to complete already closed season; releasing it"
        );
        release(store, season.id).await;
    }
}

async fn close_claimed_season(
    store: &Arc<dyn LeagueStore>,
    directory: &TierDirectory,
    season: &SeasonEntity,
    members: Vec<MembershipEntity>,
) -> Result<SeasonReport, ClosureError> {
    let league = directory
        .league(season.league_id)
        .ok_or(ClosureError::MissingLeague(season.league_id))?;
    let tier = league.tier()?.ok_or(ClosureError::Untiered(league.id))?;

    if members.is_empty() {
        warn!(
            season_id = %season.id,
            league_id = %league.id,
            "season has no members; completing it without results"
        );
        store
            .commit_closure(SeasonClosure::without_results(
                season.id,
                league.id,
                SystemTime::now(),
            ))
            .await?;
        return Ok(SeasonReport::Empty);
    }

    let verdicts = ranking::decide(contenders_of(members), tier);

    let mut placements: HashMap<Tier, Vec<Placement>> = HashMap::new();
    for verdict in &verdicts {
        if verdict.destination != tier && !placements.contains_key(&verdict.destination) {
            let candidates = directory.placements(store, verdict.destination).await?;
            placements.insert(verdict.destination, candidates);
        }
    }

    let closed_at = SystemTime::now();
    let mut closure = SeasonClosure {
        season_id: season.id,
        league_id: league.id,
        results: Vec::with_capacity(verdicts.len()),
        resets: Vec::with_capacity(verdicts.len()),
        activity: Vec::new(),
        closed_at,
    };
    let mut outcomes = Vec::with_capacity(verdicts.len());

    for verdict in verdicts {
        let user_id = verdict.standing.user_id;
        let destination_league = if verdict.destination == tier {
            league.id
        } else {
            placements
                .get_mut(&verdict.destination)
                .and_then(|candidates| pick_destination(candidates))
                .ok_or(ClosureError::MissingDestination(verdict.destination))?
        };

        let kind = match verdict.outcome {
            Outcome::Promoted => Some(ActivityKind::Promote),
            Outcome::Demoted => Some(ActivityKind::Demote),
            Outcome::Stayed => None,
        };
        if let Some(kind) = kind {
            closure.activity.push(ActivityLogEntity {
                id: Uuid::new_v4(),
                user_id,
                kind,
                from_league_id: Some(league.id),
                to_league_id: Some(destination_league),
                from_tier: Some(tier),
                to_tier: Some(verdict.destination),
                season_id: Some(season.id),
                created_at: closed_at,
            });
        }

        closure.results.push(SeasonResultEntity {
            season_id: season.id,
            league_id: league.id,
            user_id,
            final_points: verdict.standing.points,
            final_rank: verdict.standing.rank,
            outcome: verdict.outcome,
            from_tier: tier,
            destination_tier: verdict.destination,
            created_at: closed_at,
        });
        closure.resets.push(MembershipReset {
            user_id,
            league_id: destination_league,
        });
        outcomes.push(verdict.outcome);
    }

    store.commit_closure(closure).await?;
    info!(
        season_id = %season.id,
        league_id = %league.id,
        tier = %tier,
        members = outcomes.len(),
        "season closed"
    );
    Ok(SeasonReport::Closed(outcomes))
}

/// Tiered leagues known at the start of a closure run.
struct TierDirectory {
    leagues: HashMap<Uuid, LeagueEntity>,
    by_tier: HashMap<Tier, Vec<Uuid>>,
}

impl TierDirectory {
    fn new(leagues: Vec<LeagueEntity>) -> Self {
        let mut by_tier: HashMap<Tier, Vec<Uuid>> = HashMap::new();
        for league in &leagues {
            match league.tier() {
                Ok(Some(tier)) => by_tier.entry(tier).or_default().push(league.id),
                Ok(None) => {}
                Err(err) => warn!(
                    league_id = %league.id,
                    error = %err,
                    "ignoring league with malformed tier as a destination"
                ),
            }
        }
        Self {
            leagues: leagues
                .into_iter()
                .map(|league| (league.id, league))
                .collect(),
            by_tier,
        }
    }

    fn league(&self, id: Uuid) -> Option<&LeagueEntity> {
        self.leagues.get(&id)
    }

    async fn placements(
        &self,
        store: &Arc<dyn LeagueStore>,
        tier: Tier,
    ) -> Result<Vec<Placement>, StorageError> {
        let Some(ids) = self.by_tier.get(&tier) else {
            return Ok(Vec::new());
        };
        let mut placements = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(league) = self.leagues.get(id) else {
                continue;
            };
            placements.push(Placement {
                league_id: league.id,
                capacity: league.capacity,
                members: store.count_members(league.id).await?,
            });
        }
        Ok(placements)
    }
}

/// Occupancy of a candidate destination league.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Placement {
    league_id: Uuid,
    capacity: u32,
    members: u64,
}

impl Placement {
    fn free(&self) -> i64 {
        i64::from(self.capacity) - i64::try_from(self.members).unwrap_or(i64::MAX)
    }
}

/// Pick the candidate with the most free capacity (first one on ties) and count
/// the incoming member against it.
fn pick_destination(candidates: &mut [Placement]) -> Option<Uuid> {
    let best = candidates
        .iter_mut()
        .reduce(|best, next| if next.free() > best.free() { next } else { best })?;
    best.members += 1;
    Some(best.league_id)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::services::fixtures::{Fixture, SEASON_START, TODAY};

    #[test]
    fn destination_prefers_most_free_capacity() {
        let crowded = Uuid::new_v4();
        let roomy = Uuid::new_v4();
        let mut candidates = vec![
            Placement {
                league_id: crowded,
                capacity: 30,
                members: 29,
            },
            Placement {
                league_id: roomy,
                capacity: 30,
                members: 27,
            },
        ];
        assert_eq!(pick_destination(&mut candidates), Some(roomy));
        assert_eq!(pick_destination(&mut candidates), Some(roomy));
        // Both now have one free slot; the first candidate wins the tie.
        assert_eq!(pick_destination(&mut candidates), Some(crowded));
        assert_eq!(pick_destination(&mut []), None);
    }

    #[tokio::test]
    async fn ten_member_gold_league_moves_two_each_way() {
        let fixture = Fixture::new().await;
        let users = fixture
            .add_members(Tier::Gold, &[100, 90, 80, 70, 60, 50, 40, 30, 20, 10])
            .await;
        let season = fixture.open_season(Tier::Gold, 1, SEASON_START).await;

        let summary = close_seasons_on(&fixture.state, TODAY, false).await.unwrap();
        assert_eq!(summary.seasons_processed, 1);
        assert_eq!(
            (summary.promoted, summary.demoted, summary.stayed),
            (2, 2, 6)
        );
        assert_eq!(summary.members(), 10);

        let results = fixture.store.results_for_season(season.id).await.unwrap();
        assert_eq!(results.len(), 10);
        assert_eq!(results[0].user_id, users[0]);
        assert_eq!(results[0].outcome, Outcome::Promoted);
        assert_eq!(results[0].destination_tier, Tier::Platinum);
        assert_eq!(results[9].outcome, Outcome::Demoted);
        assert_eq!(results[9].destination_tier, Tier::Silver);

        let promoted = fixture.membership(Tier::Platinum, users[0]).await.unwrap();
        assert_eq!(promoted.points, 0);
        assert_eq!(promoted.cached_rank, None);
        assert!(fixture.membership(Tier::Silver, users[9]).await.is_some());
        let stayed = fixture.membership(Tier::Gold, users[4]).await.unwrap();
        assert_eq!(stayed.points, 0);

        assert_eq!(
            fixture.season(season.id).await.status,
            SeasonStatus::Completed
        );
        let activity = fixture.store.activity_for_user(users[0]).await.unwrap();
        assert_eq!(activity.len(), 1);
        assert_eq!(activity[0].kind, ActivityKind::Promote);
        assert!(
            fixture
                .store
                .activity_for_user(users[4])
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn boundary_tiers_keep_their_extremes() {
        let fixture = Fixture::new().await;
        let legends = fixture.add_members(Tier::Legend, &[50, 40, 30, 20, 10]).await;
        let bronzes = fixture.add_members(Tier::Bronze, &[50, 40, 30, 20, 10]).await;
        fixture.open_season(Tier::Legend, 1, SEASON_START).await;
        fixture.open_season(Tier::Bronze, 1, SEASON_START).await;

        let summary = close_seasons_on(&fixture.state, TODAY, false).await.unwrap();
        assert_eq!(summary.seasons_processed, 2);
        // Legend demotes one and keeps its top; bronze promotes one and keeps its bottom.
        assert_eq!(
            (summary.promoted, summary.demoted, summary.stayed),
            (1, 1, 8)
        );
        assert!(fixture.membership(Tier::Legend, legends[0]).await.is_some());
        assert!(fixture.membership(Tier::Diamond, legends[4]).await.is_some());
        assert!(fixture.membership(Tier::Silver, bronzes[0]).await.is_some());
        assert!(fixture.membership(Tier::Bronze, bronzes[4]).await.is_some());
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let fixture = Fixture::new().await;
        fixture.add_members(Tier::Silver, &[5, 4, 3, 2, 1]).await;
        let season = fixture.open_season(Tier::Silver, 1, SEASON_START).await;

        close_seasons_on(&fixture.state, TODAY, false).await.unwrap();
        let before = fixture.store.results_for_season(season.id).await.unwrap();

        let summary = close_seasons_on(&fixture.state, TODAY, false).await.unwrap();
        assert_eq!(summary, CloseSeasonsSummary::default());
        let after = fixture.store.results_for_season(season.id).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn running_season_waits_unless_forced() {
        let fixture = Fixture::new().await;
        fixture.add_members(Tier::Gold, &[3, 2, 1]).await;
        let season = fixture.open_season(Tier::Gold, 1, TODAY).await;

        let summary = close_seasons_on(&fixture.state, TODAY, false).await.unwrap();
        assert_eq!(summary.seasons_processed, 0);
        assert_eq!(fixture.season(season.id).await.status, SeasonStatus::Active);

        let summary = close_seasons_on(&fixture.state, TODAY, true).await.unwrap();
        assert_eq!(summary.seasons_processed, 1);
    }

    #[tokio::test]
    async fn failed_commit_leaves_no_trace() {
        let fixture = Fixture::new().await;
        let users = fixture.add_members(Tier::Gold, &[30, 20, 10, 5, 1]).await;
        let season = fixture.open_season(Tier::Gold, 1, SEASON_START).await;
        fixture.store.fail_commits_for(season.id).await;

        let summary = close_seasons_on(&fixture.state, TODAY, false).await.unwrap();
        assert_eq!(summary.seasons_failed, 1);
        assert_eq!(summary.members(), 0);
        assert_eq!(fixture.season(season.id).await.status, SeasonStatus::Active);
        assert!(
            fixture
                .store
                .results_for_season(season.id)
                .await
                .unwrap()
                .is_empty()
        );
        let untouched = fixture.membership(Tier::Gold, users[0]).await.unwrap();
        assert_eq!(untouched.points, 30);
    }

    #[tokio::test]
    async fn one_broken_league_does_not_block_others() {
        let fixture = Fixture::new().await;
        let mut broken = LeagueEntity::tiered(Tier::Gold, 30);
        broken.tier = Some("mythic".into());
        fixture.store.save_league(broken.clone()).await.unwrap();
        let gold_season = fixture.open_season(Tier::Gold, 1, SEASON_START).await;
        let broken_season = SeasonEntity {
            id: Uuid::new_v4(),
            league_id: broken.id,
            ..gold_season
        };
        fixture
            .store
            .insert_season(broken_season.clone())
            .await
            .unwrap();
        fixture.add_members(Tier::Gold, &[2, 1]).await;

        let summary = close_seasons_on(&fixture.state, TODAY, false).await.unwrap();
        assert_eq!(summary.seasons_failed, 1);
        assert_eq!(summary.seasons_processed, 1);
        assert_eq!(
            fixture.season(broken_season.id).await.status,
            SeasonStatus::Active
        );
    }

    #[tokio::test]
    async fn empty_season_is_completed_without_results() {
        let fixture = Fixture::new().await;
        let season = fixture.open_season(Tier::Diamond, 1, SEASON_START).await;

        let summary = close_seasons_on(&fixture.state, TODAY, false).await.unwrap();
        assert_eq!(summary.empty_seasons, 1);
        assert_eq!(summary.seasons_processed, 0);
        assert_eq!(
            fixture.season(season.id).await.status,
            SeasonStatus::Completed
        );
    }

    #[tokio::test]
    async fn fresh_claim_is_respected_and_stale_claim_is_taken_over() {
        let fixture = Fixture::new().await;
        fixture.add_members(Tier::Gold, &[2, 1]).await;
        let season = fixture.open_season(Tier::Gold, 1, SEASON_START).await;

        let now = SystemTime::now();
        assert!(
            fixture
                .store
                .claim_season(season.id, now, UNIX_EPOCH)
                .await
                .unwrap()
        );
        let summary = close_seasons_on(&fixture.state, TODAY, false).await.unwrap();
        assert_eq!(summary.seasons_skipped, 1);
        assert_eq!(
            fixture.season(season.id).await.status,
            SeasonStatus::Closing
        );

        let other = fixture.open_season(Tier::Silver, 1, SEASON_START).await;
        fixture.add_members(Tier::Silver, &[1]).await;
        let long_ago = now - Duration::from_secs(3_600);
        fixture
            .store
            .claim_season(other.id, long_ago, UNIX_EPOCH)
            .await
            .unwrap();
        let summary = close_seasons_on(&fixture.state, TODAY, false).await.unwrap();
        assert_eq!(summary.seasons_processed, 1);
        assert_eq!(
            fixture.season(other.id).await.status,
            SeasonStatus::Completed
        );
    }

    #[tokio::test]
    async fn adjacent_tiers_close_in_one_run() {
        // Rerun on fresh stores: season order in a run follows random league ids.
        for _ in 0..16 {
            let fixture = Fixture::new().await;
            let silver = fixture.add_members(Tier::Silver, &[50, 40, 30, 20, 10]).await;
            let gold = fixture.add_members(Tier::Gold, &[50, 40, 30, 20, 10]).await;
            fixture.open_season(Tier::Silver, 1, SEASON_START).await;
            fixture.open_season(Tier::Gold, 1, SEASON_START).await;

            let summary = close_seasons_on(&fixture.state, TODAY, false).await.unwrap();
            assert_eq!(summary.seasons_processed, 2);
            assert_eq!(summary.members(), 10);
            assert_eq!(
                (summary.promoted, summary.demoted, summary.stayed),
                (2, 2, 6)
            );

            for user in silver.iter().chain(&gold) {
                let results = fixture.store.results_for_user(*user).await.unwrap();
                assert_eq!(results.len(), 1);
            }
            let climber = fixture.store.results_for_user(silver[0]).await.unwrap();
            assert_eq!(climber[0].outcome, Outcome::Promoted);
            assert!(fixture.membership(Tier::Gold, silver[0]).await.is_some());
            let faller = fixture.store.results_for_user(gold[4]).await.unwrap();
            assert_eq!(faller[0].outcome, Outcome::Demoted);
            assert!(fixture.membership(Tier::Silver, gold[4]).await.is_some());
        }
    }

    #[tokio::test]
    async fn season_with_recorded_results_is_completed() {
        let fixture = Fixture::new().await;
        fixture.add_members(Tier::Gold, &[50, 40, 30, 20, 10]).await;
        let season = fixture.open_season(Tier::Gold, 1, SEASON_START).await;
        close_seasons_on(&fixture.state, TODAY, false).await.unwrap();
        let recorded = fixture.store.results_for_season(season.id).await.unwrap();
        fixture.store.reopen_season(season.id).await;

        let summary = close_seasons_on(&fixture.state, TODAY, false).await.unwrap();
        assert_eq!(summary.seasons_skipped, 1);
        assert_eq!(summary.members(), 0);
        assert_eq!(
            fixture.season(season.id).await.status,
            SeasonStatus::Completed
        );
        assert_eq!(
            fixture.store.results_for_season(season.id).await.unwrap(),
            recorded
        );
    }
}
