use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the league season engine.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::cron::close_seasons,
        crate::routes::cron::open_seasons,
        crate::routes::cron::take_snapshots,
        crate::routes::cron::weekly_rollover,
        crate::routes::leagues::league_standings,
        crate::routes::leagues::active_season,
        crate::routes::leagues::active_seasons,
        crate::routes::leagues::season_results,
        crate::routes::users::user_seasons,
        crate::routes::users::user_achievements,
        crate::routes::users::user_activity,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::cron::CloseSeasonsSummary,
            crate::dto::cron::OpenSeasonsSummary,
            crate::dto::cron::SnapshotSummary,
            crate::dto::cron::WeeklyRolloverSummary,
            crate::dto::league::SeasonSummary,
            crate::dto::league::StandingEntry,
            crate::dto::league::StandingsResponse,
            crate::dto::history::SeasonHistoryEntry,
            crate::dto::history::SeasonResultEntry,
            crate::dto::history::SeasonResultsResponse,
            crate::dto::history::AchievementSummary,
            crate::dto::history::ActivityEntry,
            crate::dao::models::ActivityKind,
            crate::league::Tier,
            crate::league::Zone,
            crate::league::Outcome,
            crate::state::season_status::SeasonStatus,
            crate::state::jobs::JobKind,
        )
    ),
    modifiers(&TriggerSecurity),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "cron", description = "Scheduled season lifecycle triggers"),
        (name = "leagues", description = "League standings and active seasons"),
        (name = "seasons", description = "Season listings and final results"),
        (name = "users", description = "Per-user season history and achievement inputs"),
    )
)]
pub struct ApiDoc;

/// Registers the bearer scheme used by the cron endpoints.
struct TriggerSecurity;

impl Modify for TriggerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "trigger_secret",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/healthcheck",
            "/cron/close-seasons",
            "/cron/weekly-rollover",
            "/leagues/{id}/standings",
            "/seasons/{id}/results",
            "/users/{id}/achievements",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("trigger_secret"));
    }
}
