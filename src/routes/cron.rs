use axum::{
    Json, Router,
    body::Body,
    extract::{Query, State},
    http::{HeaderMap, Request, header::AUTHORIZATION},
    middleware::{self, Next},
    response::Response,
    routing::post,
};

use crate::{
    dto::cron::{
        CloseSeasonsQuery, CloseSeasonsSummary, OpenSeasonsSummary, SnapshotSummary,
        WeeklyRolloverSummary,
    },
    error::AppError,
    services::{promotion_service, scheduler_service, snapshot_service},
    state::SharedState,
};

/// Scheduled-trigger endpoints, protected by the shared trigger secret.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/cron/close-seasons", post(close_seasons))
        .route("/cron/open-seasons", post(open_seasons))
        .route("/cron/snapshots", post(take_snapshots))
        .route("/cron/weekly-rollover", post(weekly_rollover))
        .route_layer(middleware::from_fn_with_state(state, require_trigger_secret))
}

/// Close every finished season, promoting and demoting members.
#[utoipa::path(
    post,
    path = "/cron/close-seasons",
    tag = "cron",
    params(CloseSeasonsQuery),
    security(("trigger_secret" = [])),
    responses(
        (status = 200, description = "Closure counters", body = CloseSeasonsSummary),
        (status = 401, description = "Missing or wrong trigger secret"),
        (status = 409, description = "A closure run is already in progress"),
        (status = 503, description = "Storage unavailable"),
        (status = 504, description = "Job exceeded its timeout"),
    )
)]
pub async fn close_seasons(
    State(state): State<SharedState>,
    Query(query): Query<CloseSeasonsQuery>,
) -> Result<Json<CloseSeasonsSummary>, AppError> {
    Ok(Json(
        promotion_service::close_seasons(&state, query.force).await?,
    ))
}

/// Open the next season of every tier league without one.
#[utoipa::path(
    post,
    path = "/cron/open-seasons",
    tag = "cron",
    security(("trigger_secret" = [])),
    responses(
        (status = 200, description = "Opening counters", body = OpenSeasonsSummary),
        (status = 401, description = "Missing or wrong trigger secret"),
        (status = 409, description = "An opening run is already in progress"),
        (status = 503, description = "Storage unavailable"),
        (status = 504, description = "Job exceeded its timeout"),
    )
)]
pub async fn open_seasons(
    State(state): State<SharedState>,
) -> Result<Json<OpenSeasonsSummary>, AppError> {
    Ok(Json(scheduler_service::open_next_seasons(&state).await?))
}

/// Record today's zone of every member of every active season.
#[utoipa::path(
    post,
    path = "/cron/snapshots",
    tag = "cron",
    security(("trigger_secret" = [])),
    responses(
        (status = 200, description = "Snapshot counters", body = SnapshotSummary),
        (status = 401, description = "Missing or wrong trigger secret"),
        (status = 409, description = "A snapshot run is already in progress"),
        (status = 503, description = "Storage unavailable"),
        (status = 504, description = "Job exceeded its timeout"),
    )
)]
pub async fn take_snapshots(
    State(state): State<SharedState>,
) -> Result<Json<SnapshotSummary>, AppError> {
    Ok(Json(snapshot_service::take_snapshots(&state).await?))
}

/// Close finished seasons, then open the next ones.
#[utoipa::path(
    post,
    path = "/cron/weekly-rollover",
    tag = "cron",
    security(("trigger_secret" = [])),
    responses(
        (status = 200, description = "Closure and opening counters", body = WeeklyRolloverSummary),
        (status = 401, description = "Missing or wrong trigger secret"),
        (status = 409, description = "A closure or opening run is already in progress"),
        (status = 503, description = "Storage unavailable"),
        (status = 504, description = "Job exceeded its timeout"),
    )
)]
pub async fn weekly_rollover(
    State(state): State<SharedState>,
) -> Result<Json<WeeklyRolloverSummary>, AppError> {
    Ok(Json(scheduler_service::weekly_rollover(&state).await?))
}

async fn require_trigger_secret(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    check_bearer(req.headers(), state.config().trigger_secret())?;
    Ok(next.run(req).await)
}

/// Compare the request's bearer token with the configured secret.
fn check_bearer(headers: &HeaderMap, expected: Option<&str>) -> Result<(), AppError> {
    let Some(expected) = expected else {
        return Err(AppError::Unauthorized(
            "trigger secret not configured".into(),
        ));
    };

    let provided = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".into()))?;

    if constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        Err(AppError::Unauthorized("invalid trigger secret".into()))
    }
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter()
        .zip(right)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn matching_bearer_is_accepted() {
        assert!(check_bearer(&headers("Bearer s3cret"), Some("s3cret")).is_ok());
    }

    #[test]
    fn wrong_or_missing_token_is_rejected() {
        assert!(matches!(
            check_bearer(&headers("Bearer nope"), Some("s3cret")),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            check_bearer(&headers("s3cret"), Some("s3cret")),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            check_bearer(&HeaderMap::new(), Some("s3cret")),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn unconfigured_secret_rejects_everything() {
        assert!(check_bearer(&headers("Bearer anything"), None).is_err());
    }
}
