use time::{Date, Duration, Weekday};

/// Number of calendar days a season spans, both ends inclusive.
pub const SEASON_LENGTH_DAYS: i64 = 7;

/// Inclusive date range covered by one season.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonWindow {
    /// First day of the season.
    pub starts_on: Date,
    /// Last day of the season (inclusive).
    pub ends_on: Date,
}

impl SeasonWindow {
    /// Window of the season opened on `today`: it starts on the next `boundary`
    /// weekday (today included) and lasts [`SEASON_LENGTH_DAYS`].
    pub fn next(today: Date, boundary: Weekday) -> Self {
        let offset = (i64::from(boundary.number_days_from_monday())
            - i64::from(today.weekday().number_days_from_monday()))
        .rem_euclid(7);
        let starts_on = today + Duration::days(offset);
        Self {
            starts_on,
            ends_on: starts_on + Duration::days(SEASON_LENGTH_DAYS - 1),
        }
    }

    /// Whether `day` falls inside the window.
    pub fn contains(&self, day: Date) -> bool {
        self.starts_on <= day && day <= self.ends_on
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    #[test]
    fn boundary_day_opens_the_same_day() {
        // 2026-10-12 is a Monday.
        let window = SeasonWindow::next(date!(2026 - 10 - 12), Weekday::Monday);
        assert_eq!(window.starts_on, date!(2026 - 10 - 12));
        assert_eq!(window.ends_on, date!(2026 - 10 - 18));
    }

    #[test]
    fn mid_week_waits_for_next_boundary() {
        let window = SeasonWindow::next(date!(2026 - 10 - 16), Weekday::Monday);
        assert_eq!(window.starts_on, date!(2026 - 10 - 19));
        assert_eq!(window.ends_on, date!(2026 - 10 - 25));
        assert!(window.contains(date!(2026 - 10 - 25)));
        assert!(!window.contains(date!(2026 - 10 - 26)));
    }

    #[test]
    fn sunday_boundary_from_monday() {
        let window = SeasonWindow::next(date!(2026 - 10 - 12), Weekday::Sunday);
        assert_eq!(window.starts_on, date!(2026 - 10 - 18));
    }
}
