use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Ordered ladder of league tiers, from the entry tier up to the top tier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Entry tier; nobody can be demoted out of it.
    Bronze,
    /// Second tier.
    Silver,
    /// Third tier.
    Gold,
    /// Fourth tier.
    Platinum,
    /// Fifth tier.
    Diamond,
    /// Top tier; nobody can be promoted out of it.
    Legend,
}

/// Raised when a stored tier value does not name a known tier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown tier `{0}`")]
pub struct UnknownTier(pub String);

impl Tier {
    /// Every tier, bottom to top.
    pub const ALL: [Tier; 6] = [
        Tier::Bronze,
        Tier::Silver,
        Tier::Gold,
        Tier::Platinum,
        Tier::Diamond,
        Tier::Legend,
    ];

    /// Lowest tier of the ladder.
    pub const BOTTOM: Tier = Tier::Bronze;
    /// Highest tier of the ladder.
    pub const TOP: Tier = Tier::Legend;

    /// Stable lowercase identifier used in storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Bronze => "bronze",
            Tier::Silver => "silver",
            Tier::Gold => "gold",
            Tier::Platinum => "platinum",
            Tier::Diamond => "diamond",
            Tier::Legend => "legend",
        }
    }

    /// Tier directly above this one, if any.
    pub fn above(self) -> Option<Tier> {
        let index = self.index();
        Self::ALL.get(index + 1).copied()
    }

    /// Tier directly below this one, if any.
    pub fn below(self) -> Option<Tier> {
        let index = self.index();
        index.checked_sub(1).map(|below| Self::ALL[below])
    }

    /// Display name used when bootstrapping the tier league.
    pub fn league_name(self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => format!("{}{} League", first.to_ascii_uppercase(), chars.as_str()),
            None => String::new(),
        }
    }

    fn index(self) -> usize {
        Self::ALL
            .iter()
            .position(|tier| *tier == self)
            .unwrap_or_default()
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = UnknownTier;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|tier| tier.as_str() == value)
            .ok_or_else(|| UnknownTier(value.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_are_strictly_ordered() {
        for pair in Tier::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn boundary_tiers_have_no_outer_neighbour() {
        assert_eq!(Tier::BOTTOM.below(), None);
        assert_eq!(Tier::TOP.above(), None);
        assert_eq!(Tier::Bronze.above(), Some(Tier::Silver));
        assert_eq!(Tier::Legend.below(), Some(Tier::Diamond));
    }

    #[test]
    fn parse_is_strict() {
        assert_eq!("gold".parse::<Tier>(), Ok(Tier::Gold));
        assert_eq!(
            "Gold".parse::<Tier>(),
            Err(UnknownTier("Gold".to_owned()))
        );
        assert!("mythic".parse::<Tier>().is_err());
    }

    #[test]
    fn league_name_is_capitalised() {
        assert_eq!(Tier::Platinum.league_name(), "Platinum League");
    }
}
