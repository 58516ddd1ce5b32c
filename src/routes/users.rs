use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::history::{
        AchievementQuery, AchievementSummary, ActivityEntry, HistoryQuery, SeasonHistoryEntry,
    },
    error::AppError,
    services::history_service,
    state::SharedState,
};

/// Per-user history endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/users/{id}/seasons", get(user_seasons))
        .route("/users/{id}/achievements", get(user_achievements))
        .route("/users/{id}/activity", get(user_activity))
}

/// The user's past seasons, newest first.
#[utoipa::path(
    get,
    path = "/users/{id}/seasons",
    tag = "users",
    params(("id" = Uuid, Path, description = "User identifier"), HistoryQuery),
    responses(
        (status = 200, description = "Season history", body = [SeasonHistoryEntry]),
        (status = 400, description = "Invalid limit"),
    )
)]
pub async fn user_seasons(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Query(query)): Valid<Query<HistoryQuery>>,
) -> Result<Json<Vec<SeasonHistoryEntry>>, AppError> {
    Ok(Json(
        history_service::season_history(&state, id, query.limit).await?,
    ))
}

/// Achievement inputs: promotion streak, perfect seasons and demotion escapes.
#[utoipa::path(
    get,
    path = "/users/{id}/achievements",
    tag = "users",
    params(("id" = Uuid, Path, description = "User identifier"), AchievementQuery),
    responses(
        (status = 200, description = "Achievement inputs", body = AchievementSummary),
        (status = 400, description = "Invalid max_points"),
    )
)]
pub async fn user_achievements(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Query(query)): Valid<Query<AchievementQuery>>,
) -> Result<Json<AchievementSummary>, AppError> {
    Ok(Json(
        history_service::achievement_summary(&state, id, query.max_points).await?,
    ))
}

/// The user's league transitions, newest first.
#[utoipa::path(
    get,
    path = "/users/{id}/activity",
    tag = "users",
    params(("id" = Uuid, Path, description = "User identifier")),
    responses((status = 200, description = "Activity log", body = [ActivityEntry]))
)]
pub async fn user_activity(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ActivityEntry>>, AppError> {
    Ok(Json(history_service::activity_for(&state, id).await?))
}
