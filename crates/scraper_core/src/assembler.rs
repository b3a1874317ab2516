use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;
use vrs_gtfs_model::{Agency, Calendar, Route, StopTime, Trip};

use crate::calendar_walker::next_service_datetime;
use crate::error::ScrapeError;
use crate::feed::FeedTables;
use crate::progress::{NoOpProgressHandler, ProgressHandler};
use crate::repository::StopRepository;
use crate::settings::{default_agency, default_calendar, ScrapeSettings};
use crate::transport::Transport;
use crate::trip_extractor::{TripExtractor, TripQuery};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Interrupted,
}

/// Queries every route under every calendar and collects the resulting feed.
pub struct FeedAssembler<T: Transport> {
    transport: T,
    settings: ScrapeSettings,
    cache_path: PathBuf,
    repository: StopRepository,
    agency: Vec<Agency>,
    routes: Vec<Route>,
    calendar: Vec<Calendar>,
    trips: Vec<Trip>,
    stop_times: Vec<StopTime>,
    progress: Arc<dyn ProgressHandler>,
    interrupt: Arc<AtomicBool>,
}

impl<T: Transport> FeedAssembler<T> {
    /// Starts from the stop cache at `cache_path` when one exists.
    pub fn open(
        transport: T,
        settings: ScrapeSettings,
        routes: Vec<Route>,
        cache_path: impl Into<PathBuf>,
    ) -> Result<Self, ScrapeError> {
        let cache_path = cache_path.into();
        let repository = StopRepository::load_snapshot(&cache_path)?.unwrap_or_default();
        Ok(Self {
            transport,
            settings,
            cache_path,
            repository,
            agency: vec![default_agency()],
            routes,
            calendar: vec![default_calendar()],
            trips: Vec::new(),
            stop_times: Vec::new(),
            progress: Arc::new(NoOpProgressHandler),
            interrupt: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn with_agency(mut self, agency: Vec<Agency>) -> Self {
        self.agency = agency;
        self
    }

    pub fn with_calendar(mut self, calendar: Vec<Calendar>) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressHandler>) -> Self {
        self.progress = progress;
        self
    }

    /// The run stops before its next query once `flag` is set.
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = flag;
        self
    }

    pub fn run(&mut self) -> Result<RunStatus, ScrapeError> {
        self.progress
            .set_total_queries(self.routes.len() * self.calendar.len());
        let extractor = TripExtractor::new(&self.transport, &self.settings);

        for route in &self.routes {
            info!(
                "Going for route {} ({}: {} - {})",
                route.route_id, route.route_long_name, route.route_first, route.route_last
            );
            for calendar in &self.calendar {
                if self.interrupt.load(Ordering::SeqCst) {
                    info!("Interrupted, stopping before route {}", route.route_id);
                    return Ok(RunStatus::Interrupted);
                }

                let when = next_service_datetime(calendar, self.settings.daily_offset)?;
                info!(
                    "Get stop times for service {} and route {} at {}",
                    calendar.service_id, route.route_id, when
                );
                self.progress
                    .on_start_query(&route.route_id, &calendar.service_id);

                let query = TripQuery {
                    route_id: &route.route_id,
                    service_id: &calendar.service_id,
                    from: &route.route_first,
                    to: &route.route_last,
                    when,
                };
                let extracted = extractor.extract(&mut self.repository, &query)?;
                let mut collected = 0;
                for trip in extracted {
                    if trip.stop_times.is_empty() {
                        continue;
                    }
                    self.stop_times.extend(trip.stop_times);
                    self.trips.push(Trip {
                        route_id: route.route_id.clone(),
                        service_id: calendar.service_id.clone(),
                        trip_id: trip.trip_id,
                    });
                    collected += 1;
                }

                self.progress
                    .on_finish_query(&route.route_id, &calendar.service_id, collected);
            }
        }

        Ok(RunStatus::Completed)
    }

    /// Writes the stop cache and every feed table under `output_dir`.
    pub fn save(&self, output_dir: &Path) -> Result<(), ScrapeError> {
        self.repository.save_snapshot(&self.cache_path)?;
        self.tables().write_to_dir(output_dir)?;
        info!(
            trips = self.trips.len(),
            stop_times = self.stop_times.len(),
            stops = self.repository.stops().len(),
            "Saved feed to {}",
            output_dir.display()
        );
        Ok(())
    }

    pub fn tables(&self) -> FeedTables<'_> {
        FeedTables {
            agency: &self.agency,
            routes: &self.routes,
            stop_times: &self.stop_times,
            stops: self.repository.stops(),
            trips: &self.trips,
            calendar: &self.calendar,
        }
    }

    pub fn trips(&self) -> &[Trip] {
        &self.trips
    }

    pub fn stop_times(&self) -> &[StopTime] {
        &self.stop_times
    }
}
