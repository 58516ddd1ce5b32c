use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use time::Date;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    league::{Outcome, Tier, UnknownTier, Zone},
    state::season_status::SeasonStatus,
};

/// A ranked group of members. Tiered leagues take part in promotion and demotion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeagueEntity {
    /// Primary key of the league.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Raw tier identifier; `None` for custom leagues.
    pub tier: Option<String>,
    /// Soft cap on members, used when picking a destination league.
    pub capacity: u32,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

impl LeagueEntity {
    /// Build a tiered league.
    pub fn tiered(tier: Tier, capacity: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: tier.league_name(),
            tier: Some(tier.as_str().to_owned()),
            capacity,
            created_at: SystemTime::now(),
        }
    }

    /// Parse the stored tier.
    pub fn tier(&self) -> Result<Option<Tier>, UnknownTier> {
        self.tier.as_deref().map(str::parse).transpose()
    }
}

/// A user's place in a league. Keyed by user: a user belongs to at most one league.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MembershipEntity {
    /// Owning user (primary key).
    pub user_id: Uuid,
    /// League the user currently plays in.
    pub league_id: Uuid,
    /// Points accumulated during the current season.
    pub points: i64,
    /// Last computed rank; cleared at season boundaries.
    pub cached_rank: Option<u32>,
    /// Join timestamp, used as the ranking tie-break.
    pub joined_at: SystemTime,
    /// Last modification timestamp.
    pub updated_at: SystemTime,
}

/// One weekly competitive window of a league.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeasonEntity {
    /// Primary key of the season.
    pub id: Uuid,
    /// League owning the season.
    pub league_id: Uuid,
    /// Strictly increasing per league, starting at 1.
    pub season_number: u32,
    /// First day of the season.
    pub starts_on: Date,
    /// Last day of the season (inclusive).
    pub ends_on: Date,
    /// Lifecycle status.
    pub status: SeasonStatus,
    /// When the current closure run claimed the season.
    pub claimed_at: Option<SystemTime>,
    /// When the season was completed.
    pub completed_at: Option<SystemTime>,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

/// Final outcome of one member in one season. Written once, never updated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeasonResultEntity {
    /// Closed season.
    pub season_id: Uuid,
    /// League the season belonged to.
    pub league_id: Uuid,
    /// Member.
    pub user_id: Uuid,
    /// Points at closure.
    pub final_points: i64,
    /// Rank at closure.
    pub final_rank: u32,
    /// Promotion/demotion decision.
    pub outcome: Outcome,
    /// Tier the season was played in.
    pub from_tier: Tier,
    /// Tier the member plays in next season.
    pub destination_tier: Tier,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

/// Daily zone record of a member. Unique per (season, user, day).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PositionSnapshotEntity {
    /// Active season at the time of the snapshot.
    pub season_id: Uuid,
    /// League of the season.
    pub league_id: Uuid,
    /// Member.
    pub user_id: Uuid,
    /// Calendar day the snapshot belongs to.
    pub taken_on: Date,
    /// Points at snapshot time.
    pub points: i64,
    /// Rank at snapshot time.
    pub rank: u32,
    /// Zone at snapshot time.
    pub zone: Zone,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

/// Kind of league transition recorded in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    /// User joined a league.
    Join,
    /// User was promoted at season closure.
    Promote,
    /// User was demoted at season closure.
    Demote,
    /// User left a league.
    Leave,
}

/// Append-only audit record of a league transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityLogEntity {
    /// Primary key.
    pub id: Uuid,
    /// User concerned.
    pub user_id: Uuid,
    /// Transition kind.
    pub kind: ActivityKind,
    /// League before the transition.
    pub from_league_id: Option<Uuid>,
    /// League after the transition.
    pub to_league_id: Option<Uuid>,
    /// Tier before the transition.
    pub from_tier: Option<Tier>,
    /// Tier after the transition.
    pub to_tier: Option<Tier>,
    /// Season whose closure caused the transition.
    pub season_id: Option<Uuid>,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

/// Membership rewrite applied at closure: move to `league_id` and reset the season state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipReset {
    /// Member.
    pub user_id: Uuid,
    /// League for next season (unchanged for members who stayed).
    pub league_id: Uuid,
}

/// Everything written atomically when one season closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonClosure {
    /// Season being closed; must be `closing`.
    pub season_id: Uuid,
    /// League the season belongs to; members must still belong to it.
    pub league_id: Uuid,
    /// One row per member.
    pub results: Vec<SeasonResultEntity>,
    /// One reset per member.
    pub resets: Vec<MembershipReset>,
    /// One entry per member who changed tier.
    pub activity: Vec<ActivityLogEntity>,
    /// Completion timestamp.
    pub closed_at: SystemTime,
}

impl SeasonClosure {
    /// Completes the season without writing results or moving anyone.
    pub fn without_results(season_id: Uuid, league_id: Uuid, closed_at: SystemTime) -> Self {
        Self {
            season_id,
            league_id,
            results: Vec::new(),
            resets: Vec::new(),
            activity: Vec::new(),
            closed_at,
        }
    }
}
