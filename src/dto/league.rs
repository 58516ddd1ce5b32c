use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::{LeagueEntity, SeasonEntity},
    dto::{format_date, format_system_time},
    league::{Cutoffs, Standing, Tier, Zone},
    state::season_status::SeasonStatus,
};

/// Public view of a season.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SeasonSummary {
    pub id: Uuid,
    pub league_id: Uuid,
    pub season_number: u32,
    /// First day, `YYYY-MM-DD`.
    pub starts_on: String,
    /// Last day (inclusive), `YYYY-MM-DD`.
    pub ends_on: String,
    pub status: SeasonStatus,
    /// RFC 3339 completion timestamp, once completed.
    pub completed_at: Option<String>,
}

impl From<SeasonEntity> for SeasonSummary {
    fn from(season: SeasonEntity) -> Self {
        Self {
            id: season.id,
            league_id: season.league_id,
            season_number: season.season_number,
            starts_on: format_date(season.starts_on),
            ends_on: format_date(season.ends_on),
            status: season.status,
            completed_at: season.completed_at.map(format_system_time),
        }
    }
}

/// One row of a live leaderboard.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StandingEntry {
    pub user_id: Uuid,
    pub points: i64,
    pub rank: u32,
    pub zone: Zone,
}

impl From<Standing> for StandingEntry {
    fn from(standing: Standing) -> Self {
        Self {
            user_id: standing.user_id,
            points: standing.points,
            rank: standing.rank,
            zone: standing.zone,
        }
    }
}

/// Live ranking of a tiered league.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StandingsResponse {
    pub league_id: Uuid,
    pub league_name: String,
    pub tier: Tier,
    /// Season currently open in the league, if any.
    pub season: Option<SeasonSummary>,
    /// Last rank in the promotion zone.
    pub promotion_cutoff: u32,
    /// Ranks strictly above this value are in the demotion zone.
    pub demotion_cutoff: u32,
    pub standings: Vec<StandingEntry>,
}

impl StandingsResponse {
    /// Assemble the response for `league` from freshly ranked members.
    pub fn new(
        league: LeagueEntity,
        tier: Tier,
        season: Option<SeasonEntity>,
        standings: Vec<Standing>,
    ) -> Self {
        let cutoffs = Cutoffs::for_total(standings.len());
        Self {
            league_id: league.id,
            league_name: league.name,
            tier,
            season: season.map(Into::into),
            promotion_cutoff: cutoffs.promotion as u32,
            demotion_cutoff: cutoffs.demotion as u32,
            standings: standings.into_iter().map(Into::into).collect(),
        }
    }
}
