use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::{
        history::SeasonResultsResponse,
        league::{SeasonSummary, StandingsResponse},
    },
    error::AppError,
    services::{history_service, scheduler_service, standings_service},
    state::SharedState,
};

/// League and season read endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/leagues/{id}/standings", get(league_standings))
        .route("/leagues/{id}/active-season", get(active_season))
        .route("/seasons/active", get(active_seasons))
        .route("/seasons/{id}/results", get(season_results))
}

/// Live ranking of a tier league with each member's zone.
#[utoipa::path(
    get,
    path = "/leagues/{id}/standings",
    tag = "leagues",
    params(("id" = Uuid, Path, description = "League identifier")),
    responses(
        (status = 200, description = "Current standings", body = StandingsResponse),
        (status = 400, description = "League is not a tier league"),
        (status = 404, description = "League not found"),
    )
)]
pub async fn league_standings(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StandingsResponse>, AppError> {
    Ok(Json(standings_service::standings(&state, id).await?))
}

/// The league's active season.
#[utoipa::path(
    get,
    path = "/leagues/{id}/active-season",
    tag = "leagues",
    params(("id" = Uuid, Path, description = "League identifier")),
    responses(
        (status = 200, description = "Active season", body = SeasonSummary),
        (status = 404, description = "League not found or no active season"),
    )
)]
pub async fn active_season(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SeasonSummary>, AppError> {
    Ok(Json(scheduler_service::get_active_season(&state, id).await?))
}

/// Every active season.
#[utoipa::path(
    get,
    path = "/seasons/active",
    tag = "seasons",
    responses((status = 200, description = "Active seasons", body = [SeasonSummary]))
)]
pub async fn active_seasons(
    State(state): State<SharedState>,
) -> Result<Json<Vec<SeasonSummary>>, AppError> {
    Ok(Json(scheduler_service::get_all_active_seasons(&state).await?))
}

/// Final standings of a season.
#[utoipa::path(
    get,
    path = "/seasons/{id}/results",
    tag = "seasons",
    params(("id" = Uuid, Path, description = "Season identifier")),
    responses(
        (status = 200, description = "Season results by rank", body = SeasonResultsResponse),
        (status = 404, description = "Season not found"),
    )
)]
pub async fn season_results(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SeasonResultsResponse>, AppError> {
    Ok(Json(history_service::season_results(&state, id).await?))
}
