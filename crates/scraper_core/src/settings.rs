use std::path::PathBuf;

use chrono::Duration;
use vrs_gtfs_model::{Agency, Calendar, GtfsDate, ServiceAvailability};

use crate::retry::RetryPolicy;

pub const DEFAULT_CITY: &str = "Köln";
pub const DEFAULT_MODE_FILTER: &str =
    "LongDistanceTrains,RegionalTrains,SuburbanTrains,Underground,LightRail,Bus,CommunityBus,OnDemandServices";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub journey: String,
    pub stop_search: String,
    pub geocoder: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            journey: "http://auskunft.vrsinfo.de/vrs/cgi/process/eingabeRoute".to_string(),
            stop_search: "http://auskunft.vrsinfo.de/vrs/cgi/service/objects".to_string(),
            geocoder:
                "http://www.vrsinfo.de/index.php?eID=tx_mobi_fahrplan_geocoder&epsg=4326"
                    .to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    pub endpoints: Endpoints,
    /// Appended to every station name in stop searches.
    pub city: String,
    pub mode_filter: String,
    /// Time of day queried on each matching service date.
    pub daily_offset: Duration,
    pub connection_retry: RetryPolicy,
    pub unavailable_retry: RetryPolicy,
    /// Last journey-planner response is written here when set.
    pub dump_html: Option<PathBuf>,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            city: DEFAULT_CITY.to_string(),
            mode_filter: DEFAULT_MODE_FILTER.to_string(),
            daily_offset: Duration::hours(6),
            connection_retry: RetryPolicy::connection(),
            unavailable_retry: RetryPolicy::unavailable(),
            dump_html: None,
        }
    }
}

pub fn default_agency() -> Agency {
    Agency {
        agency_name: "VRS".to_string(),
        agency_url: "http://www.vrsinfo.de".to_string(),
        agency_timezone: "Europe/Berlin".to_string(),
    }
}

/// Monday service between 2013-02-24 and 2013-06-01.
pub fn default_calendar() -> Calendar {
    Calendar {
        service_id: "0".to_string(),
        monday: ServiceAvailability::Available,
        start_date: GtfsDate::from_naive_date(
            chrono::NaiveDate::from_ymd_opt(2013, 2, 24).unwrap_or_default(),
        ),
        end_date: GtfsDate::from_naive_date(
            chrono::NaiveDate::from_ymd_opt(2013, 6, 1).unwrap_or_default(),
        ),
        ..Calendar::default()
    }
}
