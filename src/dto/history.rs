use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{ActivityKind, ActivityLogEntity, SeasonResultEntity},
    dto::{format_system_time, league::SeasonSummary},
    league::{Outcome, Tier},
};

/// Default number of seasons returned by the history endpoint.
pub const DEFAULT_HISTORY_LIMIT: u32 = 20;

/// Query parameters of `GET /users/{id}/seasons`.
#[derive(Debug, Default, Deserialize, IntoParams, Validate)]
pub struct HistoryQuery {
    /// Maximum number of seasons to return, newest first.
    #[validate(range(min = 1, max = 200))]
    pub limit: Option<u32>,
}

/// Query parameters of `GET /users/{id}/achievements`.
#[derive(Debug, Default, Deserialize, IntoParams, Validate)]
pub struct AchievementQuery {
    /// Highest number of points reachable in one season; enables perfect-season counting.
    #[validate(range(min = 1))]
    pub max_points: Option<i64>,
}

/// One of a user's past seasons.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SeasonHistoryEntry {
    pub season_id: Uuid,
    pub league_id: Uuid,
    /// `None` when the season row is no longer available.
    pub season_number: Option<u32>,
    pub final_points: i64,
    pub final_rank: u32,
    pub outcome: Outcome,
    pub from_tier: Tier,
    pub destination_tier: Tier,
    /// RFC 3339 closure timestamp.
    pub closed_at: String,
}

impl SeasonHistoryEntry {
    pub fn new(result: SeasonResultEntity, season_number: Option<u32>) -> Self {
        Self {
            season_id: result.season_id,
            league_id: result.league_id,
            season_number,
            final_points: result.final_points,
            final_rank: result.final_rank,
            outcome: result.outcome,
            from_tier: result.from_tier,
            destination_tier: result.destination_tier,
            closed_at: format_system_time(result.created_at),
        }
    }
}

/// A member's line in the final standings of a closed season.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SeasonResultEntry {
    pub user_id: Uuid,
    pub final_points: i64,
    pub final_rank: u32,
    pub outcome: Outcome,
    pub destination_tier: Tier,
}

impl From<SeasonResultEntity> for SeasonResultEntry {
    fn from(result: SeasonResultEntity) -> Self {
        Self {
            user_id: result.user_id,
            final_points: result.final_points,
            final_rank: result.final_rank,
            outcome: result.outcome,
            destination_tier: result.destination_tier,
        }
    }
}

/// Final standings of one season.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SeasonResultsResponse {
    pub season: SeasonSummary,
    pub results: Vec<SeasonResultEntry>,
}

/// Inputs consumed by the achievement system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AchievementSummary {
    pub user_id: Uuid,
    /// Consecutive promotions ending with the most recent season.
    pub promotion_streak: u32,
    /// Seasons finished with the maximum number of points; absent without `max_points`.
    pub perfect_seasons: Option<u32>,
    /// Seasons where the user was seen in the demotion zone but was not demoted.
    pub demotion_escapes: u32,
}

/// One league transition of a user.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub kind: ActivityKind,
    pub from_league_id: Option<Uuid>,
    pub to_league_id: Option<Uuid>,
    pub from_tier: Option<Tier>,
    pub to_tier: Option<Tier>,
    pub season_id: Option<Uuid>,
    /// RFC 3339 timestamp.
    pub created_at: String,
}

impl From<ActivityLogEntity> for ActivityEntry {
    fn from(entry: ActivityLogEntity) -> Self {
        Self {
            id: entry.id,
            kind: entry.kind,
            from_league_id: entry.from_league_id,
            to_league_id: entry.to_league_id,
            from_tier: entry.from_tier,
            to_tier: entry.to_tier,
            season_id: entry.season_id,
            created_at: format_system_time(entry.created_at),
        }
    }
}
