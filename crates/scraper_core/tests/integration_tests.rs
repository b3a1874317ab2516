use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use vrs_gtfs_core::feed::{CALENDAR_FILE, STOPS_FILE, STOP_TIMES_FILE};
use vrs_gtfs_core::{
    load_routes, FeedAssembler, GtfsFeed, RetryPolicy, RunStatus, ScrapeError, ScrapeSettings,
    Transport, TransportError, GTFS_FILE_NAMES,
};
use vrs_gtfs_model::{Calendar, GtfsDate, ServiceAvailability};

const STATIONS: &[(&str, &str, &str, f64, f64)] = &[
    ("Sülzgürtel", "310", "Köln, Sülzgürtel", 50.9178, 6.9231),
    ("Rathaus", "15", "Köln, Rathaus", 50.9380, 6.9590),
    ("Am Butzweilerhof", "701", "Köln, Am Butzweilerhof", 50.9790, 6.8920),
];

/// Stands in for the three remote services and counts what it was asked.
struct FakePlanner {
    journey_page: String,
    journey_forms: RefCell<Vec<Vec<(String, String)>>>,
    searches: Cell<usize>,
    geocodes: Cell<usize>,
    fail_searches: bool,
}

impl FakePlanner {
    fn new(journey_page: String) -> Self {
        Self {
            journey_page,
            journey_forms: RefCell::new(Vec::new()),
            searches: Cell::new(0),
            geocodes: Cell::new(0),
            fail_searches: false,
        }
    }
}

impl Transport for FakePlanner {
    fn post_form(&self, _url: &str, form: &[(&str, String)]) -> Result<String, TransportError> {
        self.journey_forms.borrow_mut().push(
            form.iter()
                .map(|(key, value)| (key.to_string(), value.clone()))
                .collect(),
        );
        Ok(self.journey_page.clone())
    }

    fn post_xml(&self, _url: &str, body: &str) -> Result<String, TransportError> {
        self.searches.set(self.searches.get() + 1);
        if self.fail_searches {
            return Err(TransportError::Connect("connection refused".into()));
        }
        let (_, id, value, _, _) = STATIONS
            .iter()
            .find(|(name, ..)| body.contains(&format!("<String>{}, Köln</String>", name)))
            .expect("known station");
        Ok(format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Object><ID>{}</ID><Value>{}</Value></Object></Response>",
            id, value
        ))
    }

    fn get(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        self.geocodes.set(self.geocodes.get() + 1);
        let decoded = url::form_urlencoded::parse(url.split_once('?').expect("query").1.as_bytes())
            .find(|(key, _)| key == "q")
            .map(|(_, value)| value.into_owned())
            .expect("q parameter");
        let (.., lat, lon) = STATIONS
            .iter()
            .find(|(_, _, value, ..)| *value == decoded)
            .expect("known display name");
        Ok(format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><plist version=\"1.0\"><array><dict>\
             <key>lat</key><real>{}</real><key>lon</key><real>{}</real></dict></array></plist>",
            lat, lon
        )
        .into_bytes())
    }
}

fn temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("{}_{}_{}", prefix, std::process::id(), nanos));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn journey_panel(number: usize, line: &str, stops: &[(&str, &str)]) -> String {
    let rows: String = stops
        .iter()
        .map(|(station, time)| {
            format!(
                "<tr><td><table><tr><td></td><td>{}</td></tr></table></td>\
                 <td><table><tr><td>ab</td><td>{}</td></tr></table></td></tr>",
                station, time
            )
        })
        .collect();
    format!(
        "<div id=\"fahrt-{}\"><table><tr><td></td><td><table><tr>\
         <td><div><table>{}</table></div></td><td><b>{}</b></td>\
         </tr></table></td></tr></table></div>",
        number, rows, line
    )
}

fn journey_page() -> String {
    format!(
        "<html><body>{}{}{}</body></html>",
        journey_panel(
            1,
            "5",
            &[("Sülzgürtel", "06:02"), ("Rathaus", "06:14"), ("Am Butzweilerhof", "06:31")]
        ),
        journey_panel(2, "13", &[("Sülzgürtel", "06:05"), ("Am Butzweilerhof", "06:40")]),
        journey_panel(
            3,
            "5",
            &[("Sülzgürtel", "06:12"), ("Rathaus", "06:24"), ("Am Butzweilerhof", "06:41")]
        ),
    )
}

fn write_route(dir: &PathBuf) {
    fs::write(
        dir.join("5_tram(Sülzgürtel - Am Butzweilerhof).data"),
        "Sülzgürtel\nRathaus\nAm Butzweilerhof\n",
    )
    .expect("write route");
}

fn every_day_calendar() -> Calendar {
    let on = ServiceAvailability::Available;
    Calendar {
        service_id: "daily".into(),
        monday: on,
        tuesday: on,
        wednesday: on,
        thursday: on,
        friday: on,
        saturday: on,
        sunday: on,
        start_date: GtfsDate::parse("20130224").unwrap(),
        end_date: GtfsDate::parse("20130601").unwrap(),
    }
}

fn settings() -> ScrapeSettings {
    ScrapeSettings {
        connection_retry: RetryPolicy::immediate(2),
        unavailable_retry: RetryPolicy::immediate(2),
        ..ScrapeSettings::default()
    }
}

#[test]
fn scrapes_one_route_into_a_feed() {
    let root = temp_dir("vrs_gtfs_e2e");
    let routes_dir = root.join("vrs");
    fs::create_dir_all(&routes_dir).unwrap();
    write_route(&routes_dir);
    let output = root.join("gtfs");
    let cache = root.join("cache.json");

    let planner = FakePlanner::new(journey_page());
    let routes = load_routes(&routes_dir).unwrap();
    let mut assembler = FeedAssembler::open(&planner, settings(), routes, &cache)
        .unwrap()
        .with_calendar(vec![every_day_calendar()]);

    assert_eq!(assembler.run().unwrap(), RunStatus::Completed);
    assembler.save(&output).unwrap();

    // 2013-02-24 is a Sunday and the calendar runs every day.
    let forms = planner.journey_forms.borrow();
    assert_eq!(forms.len(), 1);
    assert!(forms[0].contains(&("datum".to_string(), "24.02.2013".to_string())));
    assert!(forms[0].contains(&("zeit".to_string(), "06:00".to_string())));

    // Each station is searched and geocoded exactly once.
    assert_eq!(planner.searches.get(), 3);
    assert_eq!(planner.geocodes.get(), 3);

    for name in GTFS_FILE_NAMES {
        assert!(output.join(name).is_file(), "{} missing", name);
    }
    let feed = GtfsFeed::from_dir(&output).unwrap();
    let trip_ids: Vec<&str> = feed.trips.iter().map(|trip| trip.trip_id.as_str()).collect();
    assert_eq!(trip_ids, vec!["5_0_daily_21720", "5_0_daily_22320"]);
    assert!(feed
        .trips
        .iter()
        .all(|trip| trip.route_id == "5_0" && trip.service_id == "daily"));
    assert_eq!(feed.stop_times.len(), 6);

    let stop_ids: HashSet<&str> = feed.stops.iter().map(|stop| stop.stop_id.as_str()).collect();
    assert_eq!(stop_ids.len(), feed.stops.len());
    assert!(feed
        .stop_times
        .iter()
        .all(|stop_time| stop_ids.contains(stop_time.stop_id.as_str())));

    let stops = fs::read_to_string(output.join(STOPS_FILE)).unwrap();
    assert!(stops.contains("\"Köln, Rathaus\""));
    let stop_times = fs::read_to_string(output.join(STOP_TIMES_FILE)).unwrap();
    assert!(stop_times.contains("5_0_daily_21720,06:31:00,06:31:00,701,2"));
    let calendar = fs::read_to_string(output.join(CALENDAR_FILE)).unwrap();
    assert!(calendar.contains("daily,1,1,1,1,1,1,1,20130224,20130601"));

    fs::remove_dir_all(&root).ok();
}

#[test]
fn cached_stops_are_not_queried_again() {
    let root = temp_dir("vrs_gtfs_cache");
    let routes_dir = root.join("vrs");
    fs::create_dir_all(&routes_dir).unwrap();
    write_route(&routes_dir);
    let cache = root.join("cache.json");

    let first = FakePlanner::new(journey_page());
    let mut assembler =
        FeedAssembler::open(&first, settings(), load_routes(&routes_dir).unwrap(), &cache)
            .unwrap()
            .with_calendar(vec![every_day_calendar()]);
    assembler.run().unwrap();
    assembler.save(&root.join("gtfs")).unwrap();
    assert_eq!(first.searches.get(), 3);

    let second = FakePlanner::new(journey_page());
    let mut assembler =
        FeedAssembler::open(&second, settings(), load_routes(&routes_dir).unwrap(), &cache)
            .unwrap()
            .with_calendar(vec![every_day_calendar()]);
    assembler.run().unwrap();

    assert_eq!(second.searches.get(), 0);
    assert_eq!(second.geocodes.get(), 0);
    assert_eq!(second.journey_forms.borrow().len(), 1);
    assert_eq!(assembler.trips().len(), 2);

    fs::remove_dir_all(&root).ok();
}

#[test]
fn unreachable_stop_search_still_allows_a_save() {
    let root = temp_dir("vrs_gtfs_unreachable");
    let routes_dir = root.join("vrs");
    fs::create_dir_all(&routes_dir).unwrap();
    write_route(&routes_dir);
    let output = root.join("gtfs");

    let mut planner = FakePlanner::new(journey_page());
    planner.fail_searches = true;
    let mut assembler = FeedAssembler::open(
        &planner,
        settings(),
        load_routes(&routes_dir).unwrap(),
        root.join("cache.json"),
    )
    .unwrap();

    let err = assembler.run().unwrap_err();
    assert!(matches!(err, ScrapeError::Unreachable { attempts: 2, .. }));
    assert_eq!(planner.searches.get(), 2);

    assembler.save(&output).unwrap();
    assert_eq!(fs::read_to_string(output.join(STOP_TIMES_FILE)).unwrap(), "");

    fs::remove_dir_all(&root).ok();
}

#[test]
fn interrupt_stops_before_querying() {
    let root = temp_dir("vrs_gtfs_interrupt");
    let routes_dir = root.join("vrs");
    fs::create_dir_all(&routes_dir).unwrap();
    write_route(&routes_dir);

    let planner = FakePlanner::new(journey_page());
    let mut assembler = FeedAssembler::open(
        &planner,
        settings(),
        load_routes(&routes_dir).unwrap(),
        root.join("cache.json"),
    )
    .unwrap()
    .with_interrupt(Arc::new(AtomicBool::new(true)));

    assert_eq!(assembler.run().unwrap(), RunStatus::Interrupted);
    assert!(planner.journey_forms.borrow().is_empty());

    fs::remove_dir_all(&root).ok();
}
