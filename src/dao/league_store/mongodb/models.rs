use mongodb::bson::{self, DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use time::{Date, macros::format_description};
use uuid::Uuid;

use super::error::{MongoDaoError, MongoResult};
use crate::{
    dao::models::{
        ActivityKind, ActivityLogEntity, LeagueEntity, MembershipEntity, PositionSnapshotEntity,
        SeasonEntity, SeasonResultEntity,
    },
    league::{Outcome, Tier, Zone},
    state::season_status::SeasonStatus,
};

pub const LEAGUE_COLLECTION: &str = "leagues";
pub const MEMBERSHIP_COLLECTION: &str = "memberships";
pub const SEASON_COLLECTION: &str = "seasons";
pub const RESULT_COLLECTION: &str = "season_results";
pub const SNAPSHOT_COLLECTION: &str = "position_snapshots";
pub const ACTIVITY_COLLECTION: &str = "activity_log";

pub fn bson_uuid(id: Uuid) -> bson::Uuid {
    bson::Uuid::from_bytes(id.into_bytes())
}

fn from_bson_uuid(id: bson::Uuid) -> Uuid {
    Uuid::from_bytes(id.bytes())
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": bson_uuid(id)}
}

/// Dates are stored as `YYYY-MM-DD` strings so they sort lexicographically.
pub fn format_date(date: Date) -> String {
    date.to_string()
}

fn parse_date(collection: &'static str, field: &'static str, value: &str) -> MongoResult<Date> {
    let format = format_description!("[year]-[month]-[day]");
    Date::parse(value, &format).map_err(|_| MongoDaoError::InvalidField {
        collection,
        field,
        value: value.to_owned(),
    })
}

fn to_u32(collection: &'static str, field: &'static str, value: i64) -> MongoResult<u32> {
    u32::try_from(value).map_err(|_| MongoDaoError::InvalidField {
        collection,
        field,
        value: value.to_string(),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoLeagueDocument {
    #[serde(rename = "_id")]
    id: bson::Uuid,
    name: String,
    tier: Option<String>,
    capacity: i64,
    created_at: DateTime,
}

impl From<LeagueEntity> for MongoLeagueDocument {
    fn from(value: LeagueEntity) -> Self {
        Self {
            id: bson_uuid(value.id),
            name: value.name,
            tier: value.tier,
            capacity: i64::from(value.capacity),
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl TryFrom<MongoLeagueDocument> for LeagueEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoLeagueDocument) -> MongoResult<Self> {
        Ok(Self {
            id: from_bson_uuid(value.id),
            name: value.name,
            tier: value.tier,
            capacity: to_u32(LEAGUE_COLLECTION, "capacity", value.capacity)?,
            created_at: value.created_at.to_system_time(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMembershipDocument {
    /// Keyed by user so a user can only ever hold one membership.
    #[serde(rename = "_id")]
    user_id: bson::Uuid,
    league_id: bson::Uuid,
    points: i64,
    cached_rank: Option<i64>,
    joined_at: DateTime,
    updated_at: DateTime,
}

impl From<MembershipEntity> for MongoMembershipDocument {
    fn from(value: MembershipEntity) -> Self {
        Self {
            user_id: bson_uuid(value.user_id),
            league_id: bson_uuid(value.league_id),
            points: value.points,
            cached_rank: value.cached_rank.map(i64::from),
            joined_at: DateTime::from_system_time(value.joined_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl TryFrom<MongoMembershipDocument> for MembershipEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoMembershipDocument) -> MongoResult<Self> {
        Ok(Self {
            user_id: from_bson_uuid(value.user_id),
            league_id: from_bson_uuid(value.league_id),
            points: value.points,
            cached_rank: value
                .cached_rank
                .map(|rank| to_u32(MEMBERSHIP_COLLECTION, "cached_rank", rank))
                .transpose()?,
            joined_at: value.joined_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSeasonDocument {
    #[serde(rename = "_id")]
    id: bson::Uuid,
    league_id: bson::Uuid,
    season_number: i64,
    starts_on: String,
    ends_on: String,
    status: SeasonStatus,
    claimed_at: Option<DateTime>,
    completed_at: Option<DateTime>,
    created_at: DateTime,
}

impl From<SeasonEntity> for MongoSeasonDocument {
    fn from(value: SeasonEntity) -> Self {
        Self {
            id: bson_uuid(value.id),
            league_id: bson_uuid(value.league_id),
            season_number: i64::from(value.season_number),
            starts_on: format_date(value.starts_on),
            ends_on: format_date(value.ends_on),
            status: value.status,
            claimed_at: value.claimed_at.map(DateTime::from_system_time),
            completed_at: value.completed_at.map(DateTime::from_system_time),
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl TryFrom<MongoSeasonDocument> for SeasonEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoSeasonDocument) -> MongoResult<Self> {
        Ok(Self {
            id: from_bson_uuid(value.id),
            league_id: from_bson_uuid(value.league_id),
            season_number: to_u32(SEASON_COLLECTION, "season_number", value.season_number)?,
            starts_on: parse_date(SEASON_COLLECTION, "starts_on", &value.starts_on)?,
            ends_on: parse_date(SEASON_COLLECTION, "ends_on", &value.ends_on)?,
            status: value.status,
            claimed_at: value.claimed_at.map(DateTime::to_system_time),
            completed_at: value.completed_at.map(DateTime::to_system_time),
            created_at: value.created_at.to_system_time(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSeasonResultDocument {
    season_id: bson::Uuid,
    league_id: bson::Uuid,
    user_id: bson::Uuid,
    final_points: i64,
    final_rank: i64,
    outcome: Outcome,
    from_tier: Tier,
    destination_tier: Tier,
    created_at: DateTime,
}

impl From<SeasonResultEntity> for MongoSeasonResultDocument {
    fn from(value: SeasonResultEntity) -> Self {
        Self {
            season_id: bson_uuid(value.season_id),
            league_id: bson_uuid(value.league_id),
            user_id: bson_uuid(value.user_id),
            final_points: value.final_points,
            final_rank: i64::from(value.final_rank),
            outcome: value.outcome,
            from_tier: value.from_tier,
            destination_tier: value.destination_tier,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl TryFrom<MongoSeasonResultDocument> for SeasonResultEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoSeasonResultDocument) -> MongoResult<Self> {
        Ok(Self {
            season_id: from_bson_uuid(value.season_id),
            league_id: from_bson_uuid(value.league_id),
            user_id: from_bson_uuid(value.user_id),
            final_points: value.final_points,
            final_rank: to_u32(RESULT_COLLECTION, "final_rank", value.final_rank)?,
            outcome: value.outcome,
            from_tier: value.from_tier,
            destination_tier: value.destination_tier,
            created_at: value.created_at.to_system_time(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSnapshotDocument {
    season_id: bson::Uuid,
    league_id: bson::Uuid,
    user_id: bson::Uuid,
    taken_on: String,
    points: i64,
    rank: i64,
    zone: Zone,
    created_at: DateTime,
}

impl From<PositionSnapshotEntity> for MongoSnapshotDocument {
    fn from(value: PositionSnapshotEntity) -> Self {
        Self {
            season_id: bson_uuid(value.season_id),
            league_id: bson_uuid(value.league_id),
            user_id: bson_uuid(value.user_id),
            taken_on: format_date(value.taken_on),
            points: value.points,
            rank: i64::from(value.rank),
            zone: value.zone,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl TryFrom<MongoSnapshotDocument> for PositionSnapshotEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoSnapshotDocument) -> MongoResult<Self> {
        Ok(Self {
            season_id: from_bson_uuid(value.season_id),
            league_id: from_bson_uuid(value.league_id),
            user_id: from_bson_uuid(value.user_id),
            taken_on: parse_date(SNAPSHOT_COLLECTION, "taken_on", &value.taken_on)?,
            points: value.points,
            rank: to_u32(SNAPSHOT_COLLECTION, "rank", value.rank)?,
            zone: value.zone,
            created_at: value.created_at.to_system_time(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoActivityDocument {
    #[serde(rename = "_id")]
    id: bson::Uuid,
    user_id: bson::Uuid,
    kind: ActivityKind,
    from_league_id: Option<bson::Uuid>,
    to_league_id: Option<bson::Uuid>,
    from_tier: Option<Tier>,
    to_tier: Option<Tier>,
    season_id: Option<bson::Uuid>,
    created_at: DateTime,
}

impl From<ActivityLogEntity> for MongoActivityDocument {
    fn from(value: ActivityLogEntity) -> Self {
        Self {
            id: bson_uuid(value.id),
            user_id: bson_uuid(value.user_id),
            kind: value.kind,
            from_league_id: value.from_league_id.map(bson_uuid),
            to_league_id: value.to_league_id.map(bson_uuid),
            from_tier: value.from_tier,
            to_tier: value.to_tier,
            season_id: value.season_id.map(bson_uuid),
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<MongoActivityDocument> for ActivityLogEntity {
    fn from(value: MongoActivityDocument) -> Self {
        Self {
            id: from_bson_uuid(value.id),
            user_id: from_bson_uuid(value.user_id),
            kind: value.kind,
            from_league_id: value.from_league_id.map(from_bson_uuid),
            to_league_id: value.to_league_id.map(from_bson_uuid),
            from_tier: value.from_tier,
            to_tier: value.to_tier,
            season_id: value.season_id.map(from_bson_uuid),
            created_at: value.created_at.to_system_time(),
        }
    }
}
