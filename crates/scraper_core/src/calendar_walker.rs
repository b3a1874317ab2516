use chrono::{Datelike, Duration, NaiveDateTime};
use tracing::warn;
use vrs_gtfs_model::Calendar;

use crate::error::ScrapeError;

const DAYS_PER_WEEK: i64 = 7;

/// First date-time at or after `calendar.start_date + offset` whose weekday
/// is active in the calendar.
pub fn next_service_datetime(
    calendar: &Calendar,
    offset: Duration,
) -> Result<NaiveDateTime, ScrapeError> {
    let start = calendar
        .start_date
        .to_naive_date()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| ScrapeError::InvalidCalendar {
            service_id: calendar.service_id.clone(),
            detail: format!("invalid start_date {}", calendar.start_date),
        })?;
    let mut current = start + offset;

    for _ in 0..DAYS_PER_WEEK {
        if calendar.is_active_on(current.weekday()) {
            if let Some(end) = calendar.end_date.to_naive_date() {
                if current.date() > end {
                    warn!(
                        "Service {} first runs on {}, after its end date {}",
                        calendar.service_id,
                        current.date(),
                        calendar.end_date
                    );
                }
            }
            return Ok(current);
        }
        current += Duration::days(1);
    }

    Err(ScrapeError::NoActiveWeekday {
        service_id: calendar.service_id.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Weekday};
    use vrs_gtfs_model::{GtfsDate, ServiceAvailability};

    fn calendar(start: &str, active: &[Weekday]) -> Calendar {
        let flag = |day: Weekday| ServiceAvailability::from(active.contains(&day));
        Calendar {
            service_id: "0".to_string(),
            monday: flag(Weekday::Mon),
            tuesday: flag(Weekday::Tue),
            wednesday: flag(Weekday::Wed),
            thursday: flag(Weekday::Thu),
            friday: flag(Weekday::Fri),
            saturday: flag(Weekday::Sat),
            sunday: flag(Weekday::Sun),
            start_date: GtfsDate::parse(start).unwrap(),
            end_date: GtfsDate::parse("20131231").unwrap(),
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn wednesday_only_from_monday_start() {
        // 2013-02-25 is a Monday.
        let calendar = calendar("20130225", &[Weekday::Wed]);
        let next = next_service_datetime(&calendar, Duration::hours(6)).unwrap();
        assert_eq!(next, at(2013, 2, 27, 6));
        assert_eq!(next.weekday(), Weekday::Wed);
    }

    #[test]
    fn start_date_itself_when_active() {
        // 2013-02-24 is a Sunday.
        let calendar = calendar("20130224", &[Weekday::Sun]);
        let next = next_service_datetime(&calendar, Duration::hours(6)).unwrap();
        assert_eq!(next, at(2013, 2, 24, 6));
    }

    #[test]
    fn monday_only_from_sunday_start() {
        let calendar = calendar("20130224", &[Weekday::Mon]);
        let next = next_service_datetime(&calendar, Duration::hours(6)).unwrap();
        assert_eq!(next, at(2013, 2, 25, 6));
    }

    #[test]
    fn offset_past_midnight_moves_the_weekday() {
        // Sunday start + 30h lands on Monday 06:00.
        let calendar = calendar("20130224", &[Weekday::Mon]);
        let next = next_service_datetime(&calendar, Duration::hours(30)).unwrap();
        assert_eq!(next, at(2013, 2, 25, 6));
    }

    #[test]
    fn no_active_weekday_is_an_error() {
        let calendar = calendar("20130224", &[]);
        let err = next_service_datetime(&calendar, Duration::hours(6)).unwrap_err();
        assert!(matches!(err, ScrapeError::NoActiveWeekday { service_id } if service_id == "0"));
    }
}
