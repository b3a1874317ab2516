use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;
use vrs_gtfs_model::{Agency, Calendar, Route, Stop, StopTime, Trip};

use crate::error::ScrapeError;

pub const AGENCY_FILE: &str = "agency.txt";
pub const ROUTES_FILE: &str = "routes.txt";
pub const STOP_TIMES_FILE: &str = "stop_times.txt";
pub const STOPS_FILE: &str = "stops.txt";
pub const TRIPS_FILE: &str = "trips.txt";
pub const CALENDAR_FILE: &str = "calendar.txt";

/// Every table the scraper emits, in the order they are written.
pub const GTFS_FILE_NAMES: &[&str] = &[
    AGENCY_FILE,
    ROUTES_FILE,
    STOP_TIMES_FILE,
    STOPS_FILE,
    TRIPS_FILE,
    CALENDAR_FILE,
];

/// An owned feed, as read back from an output directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GtfsFeed {
    pub agency: Vec<Agency>,
    pub routes: Vec<Route>,
    pub stop_times: Vec<StopTime>,
    pub stops: Vec<Stop>,
    pub trips: Vec<Trip>,
    pub calendar: Vec<Calendar>,
}

impl GtfsFeed {
    /// Missing files read as empty tables.
    pub fn from_dir(dir: &Path) -> Result<Self, ScrapeError> {
        Ok(Self {
            agency: read_optional_table(&dir.join(AGENCY_FILE))?,
            routes: read_optional_table(&dir.join(ROUTES_FILE))?,
            stop_times: read_optional_table(&dir.join(STOP_TIMES_FILE))?,
            stops: read_optional_table(&dir.join(STOPS_FILE))?,
            trips: read_optional_table(&dir.join(TRIPS_FILE))?,
            calendar: read_optional_table(&dir.join(CALENDAR_FILE))?,
        })
    }

    pub fn tables(&self) -> FeedTables<'_> {
        FeedTables {
            agency: &self.agency,
            routes: &self.routes,
            stop_times: &self.stop_times,
            stops: &self.stops,
            trips: &self.trips,
            calendar: &self.calendar,
        }
    }
}

/// Borrowed view of the tables to write. The assembler keeps stops in its
/// repository and everything else alongside, so nothing is copied for a save.
#[derive(Debug, Clone, Copy)]
pub struct FeedTables<'a> {
    pub agency: &'a [Agency],
    pub routes: &'a [Route],
    pub stop_times: &'a [StopTime],
    pub stops: &'a [Stop],
    pub trips: &'a [Trip],
    pub calendar: &'a [Calendar],
}

impl FeedTables<'_> {
    pub fn write_to_dir(&self, dir: &Path) -> Result<(), ScrapeError> {
        fs::create_dir_all(dir).map_err(|err| ScrapeError::io(dir, err))?;
        write_table(&dir.join(AGENCY_FILE), self.agency)?;
        write_table(&dir.join(ROUTES_FILE), self.routes)?;
        write_table(&dir.join(STOP_TIMES_FILE), self.stop_times)?;
        write_table(&dir.join(STOPS_FILE), self.stops)?;
        write_table(&dir.join(TRIPS_FILE), self.trips)?;
        write_table(&dir.join(CALENDAR_FILE), self.calendar)?;
        Ok(())
    }
}

/// Writes `records` with a header row taken from the field names. An empty
/// table leaves an empty file.
pub fn write_table<T: Serialize>(path: &Path, records: &[T]) -> Result<(), ScrapeError> {
    if records.is_empty() {
        return fs::write(path, "").map_err(|err| ScrapeError::io(path, err));
    }

    info!("writing {} ({} rows)", path.display(), records.len());
    let csv_error = |source| ScrapeError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    for record in records {
        writer.serialize(record).map_err(csv_error)?;
    }
    writer.flush().map_err(|err| ScrapeError::io(path, err))
}

pub fn read_table<R: DeserializeOwned>(path: &Path) -> Result<Vec<R>, ScrapeError> {
    let csv_error = |source| ScrapeError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_error)?;
    reader
        .deserialize()
        .collect::<Result<Vec<R>, _>>()
        .map_err(csv_error)
}

fn read_optional_table<R: DeserializeOwned>(path: &Path) -> Result<Vec<R>, ScrapeError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    read_table(path)
}
