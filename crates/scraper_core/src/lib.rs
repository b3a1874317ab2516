pub mod assembler;
pub mod calendar_walker;
pub mod error;
pub mod feed;
pub mod journey_page;
pub mod progress;
pub mod repository;
pub mod retry;
pub mod route_source;
pub mod settings;
pub mod stop_resolver;
pub mod time;
pub mod transport;
pub mod trip_extractor;

pub use assembler::{FeedAssembler, RunStatus};
pub use calendar_walker::next_service_datetime;
pub use error::ScrapeError;
pub use feed::{read_table, write_table, FeedTables, GtfsFeed, GTFS_FILE_NAMES};
pub use journey_page::{JourneyPage, LayoutError, LAYOUT_VERSION};
pub use repository::StopRepository;
pub use retry::RetryPolicy;
pub use route_source::load_routes;
pub use settings::{default_agency, default_calendar, Endpoints, ScrapeSettings};
pub use stop_resolver::StopResolver;
pub use time::normalize_time;
pub use transport::{HttpTransport, HttpTransportConfig, Transport, TransportError};
pub use trip_extractor::{ExtractedTrip, TripExtractor, TripQuery};
