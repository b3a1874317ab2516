use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;
use vrs_gtfs_model::Stop;

use crate::error::ScrapeError;

pub const SNAPSHOT_VERSION: u32 = 1;

/// Caches shared by the stop resolver and the trip extractor for one run.
///
/// Stops and the name lookup survive between runs through a JSON snapshot;
/// trip ids only live as long as the process since trips themselves are not
/// persisted.
#[derive(Debug, Default)]
pub struct StopRepository {
    stops: Vec<Stop>,
    stop_names: HashMap<String, String>,
    stops_by_id: HashMap<String, usize>,
    trip_ids: HashSet<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    stops: Vec<Stop>,
    stop_names: BTreeMap<String, String>,
}

impl StopRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_id_for_name(&self, name: &str) -> Option<&str> {
        self.stop_names.get(name).map(String::as_str)
    }

    pub fn remember_name(&mut self, name: &str, stop_id: &str) {
        self.stop_names
            .entry(name.to_string())
            .or_insert_with(|| stop_id.to_string());
    }

    pub fn stop(&self, stop_id: &str) -> Option<&Stop> {
        self.stops_by_id.get(stop_id).map(|&index| &self.stops[index])
    }

    pub fn contains_stop(&self, stop_id: &str) -> bool {
        self.stops_by_id.contains_key(stop_id)
    }

    /// Records a stop unless its id is already known. Returns whether it was
    /// new.
    pub fn insert_stop(&mut self, stop: Stop) -> bool {
        if self.stops_by_id.contains_key(&stop.stop_id) {
            return false;
        }
        self.stops_by_id.insert(stop.stop_id.clone(), self.stops.len());
        self.stops.push(stop);
        true
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    /// Returns `false` when the trip id was seen before.
    pub fn insert_trip(&mut self, trip_id: &str) -> bool {
        self.trip_ids.insert(trip_id.to_string())
    }

    pub fn load_snapshot(path: &Path) -> Result<Option<Self>, ScrapeError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(ScrapeError::io(path, err)),
        };
        let snapshot: Snapshot =
            serde_json::from_str(&contents).map_err(|err| ScrapeError::Snapshot {
                path: path.to_path_buf(),
                detail: err.to_string(),
            })?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(ScrapeError::Snapshot {
                path: path.to_path_buf(),
                detail: format!(
                    "unsupported version {} (expected {})",
                    snapshot.version, SNAPSHOT_VERSION
                ),
            });
        }

        let mut repository = Self::new();
        for stop in snapshot.stops {
            repository.insert_stop(stop);
        }
        repository.stop_names = snapshot.stop_names.into_iter().collect();
        info!(
            stops = repository.stops.len(),
            names = repository.stop_names.len(),
            "Loaded stop cache from {}",
            path.display()
        );
        Ok(Some(repository))
    }

    pub fn save_snapshot(&self, path: &Path) -> Result<(), ScrapeError> {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            stops: self.stops.clone(),
            stop_names: self
                .stop_names
                .iter()
                .map(|(name, stop_id)| (name.clone(), stop_id.clone()))
                .collect(),
        };
        let json = serde_json::to_string_pretty(&snapshot).map_err(|err| ScrapeError::Snapshot {
            path: path.to_path_buf(),
            detail: err.to_string(),
        })?;
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| ScrapeError::io(parent, err))?;
        }
        fs::write(path, format!("{}\n", json)).map_err(|err| ScrapeError::io(path, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        std::env::temp_dir().join(format!("{}_{}_{}.json", prefix, std::process::id(), nanos))
    }

    fn stop(id: &str, name: &str) -> Stop {
        Stop {
            stop_id: id.to_string(),
            stop_name: name.to_string(),
            stop_lat: 50.94,
            stop_lon: 6.95,
        }
    }

    #[test]
    fn first_stop_for_an_id_wins() {
        let mut repository = StopRepository::new();
        assert!(repository.insert_stop(stop("81", "Frankenstr.")));
        assert!(!repository.insert_stop(stop("81", "Frankenstraße")));
        assert_eq!(repository.stops().len(), 1);
        assert_eq!(repository.stop("81").unwrap().stop_name, "Frankenstr.");
    }

    #[test]
    fn name_lookup_is_written_once() {
        let mut repository = StopRepository::new();
        repository.remember_name("Frankenstr.", "81");
        repository.remember_name("Frankenstr.", "99");
        assert_eq!(repository.stop_id_for_name("Frankenstr."), Some("81"));
        assert_eq!(repository.stop_id_for_name("Neumarkt"), None);
    }

    #[test]
    fn trip_ids_are_deduplicated() {
        let mut repository = StopRepository::new();
        assert!(repository.insert_trip("5_0_0_21600"));
        assert!(!repository.insert_trip("5_0_0_21600"));
        assert!(repository.insert_trip("5_0_0_22200"));
    }

    #[test]
    fn missing_snapshot_is_not_an_error() {
        let path = temp_path("missing_snapshot");
        assert!(StopRepository::load_snapshot(&path).unwrap().is_none());
    }

    #[test]
    fn snapshot_keeps_stops_and_names_but_not_trips() {
        let path = temp_path("snapshot");
        let mut repository = StopRepository::new();
        repository.insert_stop(stop("81", "Frankenstr."));
        repository.insert_stop(stop("417", "Andreaskloster"));
        repository.remember_name("Frankenstr.", "81");
        repository.remember_name("Andreaskloster", "417");
        repository.insert_trip("5_0_0_21600");
        repository.save_snapshot(&path).unwrap();

        let mut loaded = StopRepository::load_snapshot(&path).unwrap().unwrap();
        assert_eq!(loaded.stops(), repository.stops());
        assert_eq!(loaded.stop_id_for_name("Andreaskloster"), Some("417"));
        assert!(loaded.contains_stop("81"));
        assert!(loaded.insert_trip("5_0_0_21600"));

        fs::remove_file(&path).ok();
    }

    #[test]
    fn snapshot_lists_names_in_order() {
        let path = temp_path("snapshot_order");
        let mut repository = StopRepository::new();
        repository.remember_name("Zülpicher Platz", "64");
        repository.remember_name("Neumarkt", "2");
        repository.remember_name("Aachener Str./Gürtel", "219");
        repository.save_snapshot(&path).unwrap();
        let first = fs::read_to_string(&path).unwrap();

        let aachener = first.find("Aachener").unwrap();
        let neumarkt = first.find("Neumarkt").unwrap();
        let zuelpicher = first.find("Zülpicher").unwrap();
        assert!(aachener < neumarkt && neumarkt < zuelpicher);

        StopRepository::load_snapshot(&path)
            .unwrap()
            .unwrap()
            .save_snapshot(&path)
            .unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), first);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn rejects_unknown_snapshot_version() {
        let path = temp_path("snapshot_version");
        fs::write(&path, r#"{"version": 99, "stops": [], "stop_names": {}}"#).unwrap();
        let err = StopRepository::load_snapshot(&path).unwrap_err();
        assert!(matches!(err, ScrapeError::Snapshot { .. }));
        fs::remove_file(&path).ok();
    }
}
