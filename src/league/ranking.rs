//! Pure ranking logic shared by season closure, daily snapshots and live standings.
//!
//! Members are ordered by points (descending), then by join time (ascending) so the
//! earlier joiner wins a tie. Cutoffs are derived from [`PROMOTION_SHARE_PERCENT`]
//! of the membership and zones are assigned once per member, checking promotion
//! before demotion, which keeps the three zones disjoint even for tiny leagues.

use std::{cmp::Ordering, fmt, time::SystemTime};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::league::tier::Tier;

/// Share of a league (in percent, rounded up) promoted and demoted each season.
pub const PROMOTION_SHARE_PERCENT: usize = 20;

/// Live standing classification of a member within the active season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    /// Currently on course for promotion.
    Promotion,
    /// Neither promoted nor demoted.
    Safe,
    /// Currently on course for demotion.
    Demotion,
}

impl Zone {
    /// Stable lowercase identifier used in storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Zone::Promotion => "promotion",
            Zone::Safe => "safe",
            Zone::Demotion => "demotion",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final, one-time classification assigned when a season closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Moved one tier up.
    Promoted,
    /// Moved one tier down.
    Demoted,
    /// Kept the same tier.
    Stayed,
}

impl Outcome {
    /// Stable lowercase identifier used in storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Promoted => "promoted",
            Outcome::Demoted => "demoted",
            Outcome::Stayed => "stayed",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One member as seen by the ranking engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contender {
    /// Member identity.
    pub user_id: Uuid,
    /// Points accumulated during the current season.
    pub points: i64,
    /// Join timestamp; earlier joiners win ties.
    pub joined_at: SystemTime,
}

/// Rank boundaries for a league of a given size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cutoffs {
    /// Ranks `1..=promotion` are in the promotion zone.
    pub promotion: usize,
    /// Ranks strictly greater than `demotion` are in the demotion zone.
    pub demotion: usize,
}

impl Cutoffs {
    /// Compute the cutoffs for a league of `total` members.
    pub fn for_total(total: usize) -> Self {
        let share = (total * PROMOTION_SHARE_PERCENT).div_ceil(100);
        Self {
            promotion: share,
            demotion: total - share,
        }
    }

    /// Raw zone for a 1-indexed rank, before any tier-boundary exception.
    pub fn zone_for(&self, rank: usize) -> Zone {
        if rank <= self.promotion {
            Zone::Promotion
        } else if rank > self.demotion {
            Zone::Demotion
        } else {
            Zone::Safe
        }
    }
}

/// A ranked member with its current zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    /// Member identity.
    pub user_id: Uuid,
    /// Points accumulated during the current season.
    pub points: i64,
    /// 1-indexed rank.
    pub rank: u32,
    /// Zone after the tier-boundary exception.
    pub zone: Zone,
}

/// Closure-time decision for one member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Final standing of the member.
    pub standing: Standing,
    /// Promotion/demotion decision.
    pub outcome: Outcome,
    /// Tier the member plays in next season.
    pub destination: Tier,
}

fn by_points_then_seniority(left: &Contender, right: &Contender) -> Ordering {
    right
        .points
        .cmp(&left.points)
        .then_with(|| left.joined_at.cmp(&right.joined_at))
        .then_with(|| left.user_id.cmp(&right.user_id))
}

/// Rank a league's members and classify their zones (read-only mode).
pub fn rank(mut contenders: Vec<Contender>, tier: Tier) -> Vec<Standing> {
    contenders.sort_by(by_points_then_seniority);
    let cutoffs = Cutoffs::for_total(contenders.len());

    contenders
        .into_iter()
        .enumerate()
        .map(|(index, contender)| {
            let rank = index + 1;
            let zone = match cutoffs.zone_for(rank) {
                Zone::Promotion if tier.above().is_none() => Zone::Safe,
                Zone::Demotion if tier.below().is_none() => Zone::Safe,
                zone => zone,
            };
            Standing {
                user_id: contender.user_id,
                points: contender.points,
                rank: rank as u32,
                zone,
            }
        })
        .collect()
}

/// Rank a league's members and decide each member's outcome (closure mode).
pub fn decide(contenders: Vec<Contender>, tier: Tier) -> Vec<Verdict> {
    rank(contenders, tier)
        .into_iter()
        .map(|standing| {
            let (outcome, destination) = match standing.zone {
                Zone::Promotion => tier
                    .above()
                    .map_or((Outcome::Stayed, tier), |up| (Outcome::Promoted, up)),
                Zone::Demotion => tier
                    .below()
                    .map_or((Outcome::Stayed, tier), |down| (Outcome::Demoted, down)),
                Zone::Safe => (Outcome::Stayed, tier),
            };
            Verdict {
                standing,
                outcome,
                destination,
            }
        })
        .collect()
}
