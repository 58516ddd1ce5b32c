use std::time::SystemTime;
use time::{Date, OffsetDateTime, format_description::well_known::Rfc3339};

pub mod cron;
pub mod health;
pub mod history;
pub mod league;

fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}

fn format_date(date: Date) -> String {
    date.to_string()
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use time::macros::date;

    use super::*;

    #[test]
    fn timestamps_are_rfc3339() {
        let formatted = format_system_time(UNIX_EPOCH + Duration::from_secs(86_400));
        assert_eq!(formatted, "1970-01-02T00:00:00Z");
    }

    #[test]
    fn dates_are_iso() {
        assert_eq!(format_date(date!(2026 - 03 - 09)), "2026-03-09");
    }
}
