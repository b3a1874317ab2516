use std::fs;

use chrono::NaiveDateTime;
use tracing::{debug, info};
use vrs_gtfs_model::StopTime;

use crate::error::ScrapeError;
use crate::journey_page::{JourneyPage, TripPanel, PANEL_COUNT};
use crate::repository::StopRepository;
use crate::settings::ScrapeSettings;
use crate::stop_resolver::StopResolver;
use crate::time::normalize_time;
use crate::transport::Transport;

/// One journey-planner lookup for a route under a service pattern.
#[derive(Debug, Clone, Copy)]
pub struct TripQuery<'q> {
    pub route_id: &'q str,
    pub service_id: &'q str,
    pub from: &'q str,
    pub to: &'q str,
    pub when: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedTrip {
    pub trip_id: String,
    pub stop_times: Vec<StopTime>,
}

pub struct TripExtractor<'a, T: Transport + ?Sized> {
    transport: &'a T,
    settings: &'a ScrapeSettings,
    resolver: StopResolver<'a, T>,
}

impl<'a, T: Transport + ?Sized> TripExtractor<'a, T> {
    pub fn new(transport: &'a T, settings: &'a ScrapeSettings) -> Self {
        Self {
            transport,
            settings,
            resolver: StopResolver::new(transport, settings),
        }
    }

    pub fn extract(
        &self,
        repository: &mut StopRepository,
        query: &TripQuery<'_>,
    ) -> Result<Vec<ExtractedTrip>, ScrapeError> {
        let start_id = self.resolver.resolve(repository, query.from)?;
        let destination_id = self.resolver.resolve(repository, query.to)?;

        let endpoint = self.settings.endpoints.journey.as_str();
        let form = journey_form(query, &start_id, &destination_id, &self.settings.mode_filter);
        let html = self
            .settings
            .connection_retry
            .run(endpoint, || self.transport.post_form(endpoint, &form))?;

        if let Some(path) = &self.settings.dump_html {
            fs::write(path, &html).map_err(|err| ScrapeError::io(path, err))?;
        }

        self.extract_from_page(repository, &html, query.route_id, query.service_id)
    }

    /// Collects every panel on a result page that runs the route's line.
    pub fn extract_from_page(
        &self,
        repository: &mut StopRepository,
        html: &str,
        route_id: &str,
        service_id: &str,
    ) -> Result<Vec<ExtractedTrip>, ScrapeError> {
        let page = JourneyPage::parse(html);
        let expected = expected_line(route_id);
        let mut trips = Vec::new();

        for number in 1..=PANEL_COUNT {
            let Some(panel) = page.panel(number) else {
                debug!(panel = number, "no such panel");
                continue;
            };
            let Some(label) = panel.line_label() else {
                debug!(panel = number, "panel has no line label");
                continue;
            };
            if label != expected {
                info!("Skipping trip with bad line: {} (expected {})", label, expected);
                continue;
            }
            if let Some(trip) = self.extract_panel(repository, &panel, route_id, service_id)? {
                trips.push(trip);
            }
        }

        Ok(trips)
    }

    fn extract_panel(
        &self,
        repository: &mut StopRepository,
        panel: &TripPanel<'_>,
        route_id: &str,
        service_id: &str,
    ) -> Result<Option<ExtractedTrip>, ScrapeError> {
        let rows = panel.stop_rows()?;
        let Some(first_row) = rows.first() else {
            debug!(panel = panel.number(), "panel lists no stops");
            return Ok(None);
        };

        let (hours, minutes) = first_row.departure_clock()?;
        let first_time = hours * 3600 + minutes * 60;
        let trip_id = trip_identifier(route_id, service_id, first_time);
        if !repository.insert_trip(&trip_id) {
            info!("Skipping {}", trip_id);
            return Ok(None);
        }

        let mut stop_times = Vec::with_capacity(rows.len());
        for (sequence, row) in rows.iter().enumerate() {
            let station = row.station_name()?;
            let (hours, minutes) = row.departure_clock()?;
            let time = normalize_time(hours, minutes, 0, Some(first_time));
            let stop_id = self.resolver.resolve(repository, &station)?;
            debug!("Just got to {} ({}) at {}", station, stop_id, time);
            stop_times.push(StopTime {
                trip_id: trip_id.clone(),
                arrival_time: time,
                departure_time: time,
                stop_id,
                stop_sequence: sequence as u32,
            });
        }

        Ok(Some(ExtractedTrip {
            trip_id,
            stop_times,
        }))
    }
}

/// The line number as the planner prints it: no direction, no leading zeros.
pub fn expected_line(route_id: &str) -> &str {
    route_id
        .split('_')
        .next()
        .unwrap_or(route_id)
        .trim_start_matches('0')
}

pub fn trip_identifier(route_id: &str, service_id: &str, first_departure: u32) -> String {
    format!("{}_{}_{}", route_id, service_id, first_departure)
}

pub fn journey_form(
    query: &TripQuery<'_>,
    start_id: &str,
    destination_id: &str,
    mode_filter: &str,
) -> Vec<(&'static str, String)> {
    vec![
        ("start", query.from.to_string()),
        ("startID", start_id.to_string()),
        ("startTyp", "Stop".to_string()),
        ("via", String::new()),
        ("viaID", String::new()),
        ("viaTyp", String::new()),
        ("viaZeitAufenthalt", "0".to_string()),
        ("ziel", query.to.to_string()),
        ("zielID", destination_id.to_string()),
        ("zielTyp", "Stop".to_string()),
        ("datum", query.when.format("%d.%m.%Y").to_string()),
        ("zeit", query.when.format("%H:%M").to_string()),
        ("suchrichtung", "ab".to_string()),
        ("barriere", String::new()),
        ("zuschlagfrei", "1".to_string()),
        ("verkehrsmittel", mode_filter.to_string()),
    ]
}
