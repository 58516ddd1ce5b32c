use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::league::Outcome;

/// Query parameters accepted by `POST /cron/close-seasons`.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct CloseSeasonsQuery {
    /// Close active seasons even if their last day has not passed yet.
    #[serde(default)]
    pub force: bool,
}

/// Counters reported by a season closure run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct CloseSeasonsSummary {
    /// Seasons completed with results by this run.
    pub seasons_processed: u32,
    /// Seasons another run owns or that were already closed.
    pub seasons_skipped: u32,
    /// Seasons released back to `active` after an error.
    pub seasons_failed: u32,
    /// Seasons completed without members.
    pub empty_seasons: u32,
    /// Members moved one tier up.
    pub promoted: u32,
    /// Members moved one tier down.
    pub demoted: u32,
    /// Members kept in their tier.
    pub stayed: u32,
}

impl CloseSeasonsSummary {
    /// Count one member's outcome.
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Promoted => self.promoted += 1,
            Outcome::Demoted => self.demoted += 1,
            Outcome::Stayed => self.stayed += 1,
        }
    }

    /// Members whose outcome was decided by this run.
    pub fn members(&self) -> u32 {
        self.promoted + self.demoted + self.stayed
    }
}

/// Counters reported by a season opening run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct OpenSeasonsSummary {
    /// Seasons created by this run.
    pub opened: u32,
    /// Tiered leagues that already had an open season.
    pub already_open: u32,
    /// Leagues that could not be handled.
    pub failed: u32,
}

/// Counters reported by a daily snapshot run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct SnapshotSummary {
    /// Active seasons snapshotted.
    pub seasons: u32,
    /// Snapshot rows written.
    pub inserted: u32,
    /// Members already snapshotted for the day.
    pub already_present: u32,
    /// Seasons that could not be snapshotted.
    pub failed: u32,
}

/// Result of the combined close-then-open trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct WeeklyRolloverSummary {
    /// Closure counters.
    pub closed: CloseSeasonsSummary,
    /// Opening counters.
    pub opened: OpenSeasonsSummary,
}
