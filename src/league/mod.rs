/// Weekly season window arithmetic.
pub mod calendar;
/// Ranking, cutoff and zone computation.
pub mod ranking;
/// Ordered tier ladder.
pub mod tier;

pub use calendar::SeasonWindow;
pub use ranking::{Contender, Cutoffs, Outcome, Standing, Verdict, Zone};
pub use tier::{Tier, UnknownTier};
