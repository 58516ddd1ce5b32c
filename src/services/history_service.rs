//! Read-side queries over closed seasons for history views and achievement consumers.

use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    dao::models::SeasonResultEntity,
    dto::history::{
        AchievementSummary, ActivityEntry, DEFAULT_HISTORY_LIMIT, SeasonHistoryEntry,
        SeasonResultsResponse,
    },
    error::ServiceError,
    league::Outcome,
    services::snapshot_service::demotion_escapes,
    state::SharedState,
};

/// The user's past seasons, newest first.
pub async fn season_history(
    state: &SharedState,
    user_id: Uuid,
    limit: Option<u32>,
) -> Result<Vec<SeasonHistoryEntry>, ServiceError> {
    let store = state.require_league_store().await?;
    let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT) as usize;
    let results: Vec<_> = store
        .results_for_user(user_id)
        .await?
        .into_iter()
        .take(limit)
        .collect();

    let numbers: HashMap<Uuid, u32> = store
        .find_seasons(results.iter().map(|result| result.season_id).collect())
        .await?
        .into_iter()
        .map(|season| (season.id, season.season_number))
        .collect();

    Ok(results
        .into_iter()
        .map(|result| {
            let number = numbers.get(&result.season_id).copied();
            SeasonHistoryEntry::new(result, number)
        })
        .collect())
}

/// Final standings of one season.
pub async fn season_results(
    state: &SharedState,
    season_id: Uuid,
) -> Result<SeasonResultsResponse, ServiceError> {
    let store = state.require_league_store().await?;
    let season = store
        .find_season(season_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("season `{season_id}` not found")))?;
    let results = store.results_for_season(season_id).await?;

    Ok(SeasonResultsResponse {
        season: season.into(),
        results: results.into_iter().map(Into::into).collect(),
    })
}

/// Consecutive promotions ending with the user's most recent season.
pub async fn promotion_streak(state: &SharedState, user_id: Uuid) -> Result<u32, ServiceError> {
    let store = state.require_league_store().await?;
    Ok(streak_of(&store.results_for_user(user_id).await?))
}

/// Seasons the user finished with at least `max_points`.
pub async fn perfect_seasons(
    state: &SharedState,
    user_id: Uuid,
    max_points: i64,
) -> Result<u32, ServiceError> {
    let store = state.require_league_store().await?;
    Ok(perfect_count(
        &store.results_for_user(user_id).await?,
        max_points,
    ))
}

/// The user's league transitions, newest first.
pub async fn activity_for(
    state: &SharedState,
    user_id: Uuid,
) -> Result<Vec<ActivityEntry>, ServiceError> {
    let store = state.require_league_store().await?;
    let entries = store.activity_for_user(user_id).await?;
    Ok(entries.into_iter().map(Into::into).collect())
}

/// Everything the achievement system needs about a user, from a single read of their history.
pub async fn achievement_summary(
    state: &SharedState,
    user_id: Uuid,
    max_points: Option<i64>,
) -> Result<AchievementSummary, ServiceError> {
    let store = state.require_league_store().await?;
    let results = store.results_for_user(user_id).await?;
    let snapshots = store.snapshots_for_user(user_id).await?;

    Ok(AchievementSummary {
        user_id,
        promotion_streak: streak_of(&results),
        perfect_seasons: max_points.map(|max| perfect_count(&results, max)),
        demotion_escapes: demotion_escapes(&snapshots, &results),
    })
}

// `results` is newest first.
fn streak_of(results: &[SeasonResultEntity]) -> u32 {
    results
        .iter()
        .take_while(|result| result.outcome == Outcome::Promoted)
        .count() as u32
}

fn perfect_count(results: &[SeasonResultEntity], max_points: i64) -> u32 {
    results
        .iter()
        .filter(|result| result.final_points >= max_points)
        .count() as u32
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;
    use crate::{
        dao::league_store::LeagueStore,
        league::Tier,
        services::{
            fixtures::{Fixture, SEASON_START, TODAY},
            promotion_service, scheduler_service,
        },
    };

    #[tokio::test]
    async fn streak_counts_back_from_latest_season() {
        let fixture = Fixture::new().await;
        let users = fixture.add_members(Tier::Bronze, &[100, 1, 1, 1, 1]).await;
        let star = users[0];
        fixture.open_season(Tier::Bronze, 1, SEASON_START).await;

        // Week one: bronze -> silver.
        promotion_service::close_seasons_on(&fixture.state, TODAY, false)
            .await
            .unwrap();
        // Week two: the star keeps winning in silver, alone, and goes to gold.
        scheduler_service::open_next_seasons_on(&fixture.state, TODAY)
            .await
            .unwrap();
        fixture
            .store
            .award_points(star, 100, std::time::SystemTime::now())
            .await
            .unwrap();
        promotion_service::close_seasons_on(&fixture.state, date!(2026 - 10 - 26), false)
            .await
            .unwrap();

        assert_eq!(promotion_streak(&fixture.state, star).await.unwrap(), 2);
        assert_eq!(perfect_seasons(&fixture.state, star, 100).await.unwrap(), 2);
        assert_eq!(perfect_seasons(&fixture.state, star, 101).await.unwrap(), 0);

        let history = season_history(&fixture.state, star, None).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].from_tier, Tier::Silver);
        assert_eq!(history[0].season_number, Some(1));
        assert_eq!(history[1].from_tier, Tier::Bronze);

        let limited = season_history(&fixture.state, star, Some(1)).await.unwrap();
        assert_eq!(limited.len(), 1);

        let activity = activity_for(&fixture.state, star).await.unwrap();
        assert_eq!(activity.len(), 2);
        assert_eq!(activity[0].to_tier, Some(Tier::Gold));

        let summary = achievement_summary(&fixture.state, star, Some(100))
            .await
            .unwrap();
        assert_eq!(summary.promotion_streak, 2);
        assert_eq!(summary.perfect_seasons, Some(2));
        assert_eq!(summary.demotion_escapes, 0);
    }

    #[tokio::test]
    async fn stayed_breaks_the_streak() {
        let fixture = Fixture::new().await;
        let users = fixture.add_members(Tier::Gold, &[5, 4, 3, 2, 1]).await;
        let season = fixture.open_season(Tier::Gold, 1, SEASON_START).await;
        promotion_service::close_seasons_on(&fixture.state, TODAY, false)
            .await
            .unwrap();

        assert_eq!(promotion_streak(&fixture.state, users[2]).await.unwrap(), 0);
        let response = season_results(&fixture.state, season.id).await.unwrap();
        assert_eq!(response.results.len(), 5);
        assert_eq!(response.results[0].user_id, users[0]);
        assert_eq!(response.results[0].outcome, Outcome::Promoted);
    }

    #[tokio::test]
    async fn unknown_season_is_not_found() {
        let fixture = Fixture::new().await;
        assert!(matches!(
            season_results(&fixture.state, Uuid::new_v4()).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
