use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Lifecycle status of a season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SeasonStatus {
    /// Members are collecting points; at most one per league.
    Active,
    /// A closure run has claimed the season and is computing results.
    Closing,
    /// Results are written; terminal.
    Completed,
}

/// Events that can be applied to a season's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonEvent {
    /// A closure run takes ownership of the season.
    Claim,
    /// A closure run failed and hands the season back for a later retry.
    Release,
    /// A closure run committed the season's results.
    Complete,
}

/// Error returned when an event cannot be applied from the current status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid season transition: {event:?} cannot be applied while {from:?}")]
pub struct InvalidTransition {
    /// Status the season was in.
    pub from: SeasonStatus,
    /// Rejected event.
    pub event: SeasonEvent,
}

/// Raised when a stored status string is not a known status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown season status `{0}`")]
pub struct UnknownStatus(pub String);

impl SeasonStatus {
    /// Stable lowercase identifier used in storage.
    pub fn as_str(self) -> &'static str {
        match self {
            SeasonStatus::Active => "active",
            SeasonStatus::Closing => "closing",
            SeasonStatus::Completed => "completed",
        }
    }

    /// Whether the season still awaits closure.
    pub fn is_open(self) -> bool {
        !matches!(self, SeasonStatus::Completed)
    }

    /// Compute the status reached by applying `event`.
    pub fn apply(self, event: SeasonEvent) -> Result<SeasonStatus, InvalidTransition> {
        let next = match (self, event) {
            (SeasonStatus::Active, SeasonEvent::Claim) => SeasonStatus::Closing,
            // Re-claiming a closing season is only legal once its claim went stale;
            // the store checks the claim age before applying it.
            (SeasonStatus::Closing, SeasonEvent::Claim) => SeasonStatus::Closing,
            (SeasonStatus::Closing, SeasonEvent::Release) => SeasonStatus::Active,
            (SeasonStatus::Closing, SeasonEvent::Complete) => SeasonStatus::Completed,
            (from, event) => return Err(InvalidTransition { from, event }),
        };
        Ok(next)
    }
}

impl fmt::Display for SeasonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeasonStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(SeasonStatus::Active),
            "closing" => Ok(SeasonStatus::Closing),
            "completed" => Ok(SeasonStatus::Completed),
            other => Err(UnknownStatus(other.to_owned())),
        }
    }
}
