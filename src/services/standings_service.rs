//! Live standings of a tier league: members ranked with their current zone,
//! refreshing each member's cached rank on the way.

use uuid::Uuid;

use crate::{
    dao::models::MembershipEntity,
    dto::league::StandingsResponse,
    error::ServiceError,
    league::{Contender, ranking},
    state::SharedState,
};

/// Project memberships onto the ranking engine's input.
pub fn contenders_of(members: Vec<MembershipEntity>) -> Vec<Contender> {
    members
        .into_iter()
        .map(|membership| Contender {
            user_id: membership.user_id,
            points: membership.points,
            joined_at: membership.joined_at,
        })
        .collect()
}

/// Rank a tiered league live and refresh its members' cached ranks.
pub async fn standings(
    state: &SharedState,
    league_id: Uuid,
) -> Result<StandingsResponse, ServiceError> {
    let store = state.require_league_store().await?;
    let league = store
        .find_league(league_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("league `{league_id}` not found")))?;
    let tier = league
        .tier()
        .map_err(|err| ServiceError::InvalidState(err.to_string()))?
        .ok_or_else(|| {
            ServiceError::InvalidInput(format!("league `{league_id}` is not a tier league"))
        })?;

    let members = store.list_members(league_id).await?;
    let standings = ranking::rank(contenders_of(members), tier);
    store
        .set_cached_ranks(
            league_id,
            standings
                .iter()
                .map(|standing| (standing.user_id, standing.rank))
                .collect(),
        )
        .await?;

    let season = store
        .latest_season(league_id)
        .await?
        .filter(|season| season.status.is_open());

    Ok(StandingsResponse::new(league, tier, season, standings))
}
