#![no_main]
use libfuzzer_sys::fuzz_target;
use vrs_gtfs_core::calendar_walker::next_service_datetime;
use vrs_gtfs_model::{Calendar, GtfsDate, ServiceAvailability};
use arbitrary::Arbitrary;
use chrono::{Datelike, Duration, NaiveDate};

#[derive(Debug, Arbitrary)]
struct CalendarData {
    weekdays: [bool; 7],
    start_offset_days: u16,
    length_days: u16,
    query_seconds: u32,
}

fuzz_target!(|data: CalendarData| {
    let base = NaiveDate::from_ymd_opt(2013, 1, 1).unwrap();
    let start = base + Duration::days(i64::from(data.start_offset_days));
    let end = start + Duration::days(i64::from(data.length_days));
    let flag = |index: usize| ServiceAvailability::from(data.weekdays[index]);
    let calendar = Calendar {
        service_id: "fuzz".to_string(),
        monday: flag(0),
        tuesday: flag(1),
        wednesday: flag(2),
        thursday: flag(3),
        friday: flag(4),
        saturday: flag(5),
        sunday: flag(6),
        start_date: GtfsDate::from_naive_date(start),
        end_date: GtfsDate::from_naive_date(end),
    };
    let offset = Duration::seconds(i64::from(data.query_seconds % (3 * 86_400)));

    match next_service_datetime(&calendar, offset) {
        Ok(when) => {
            assert!(calendar.is_active_on(when.weekday()));
            assert!(when >= start.and_hms_opt(0, 0, 0).unwrap() + offset);
            assert!(when < start.and_hms_opt(0, 0, 0).unwrap() + offset + Duration::days(7));
        }
        Err(_) => assert!(!data.weekdays.iter().any(|active| *active)),
    }
});
