//! Route definitions: one `*.data` file per line and direction, named
//! `<line>[-<direction>]_<anything>(<long name>)<anything>.data`, listing one
//! station per line from the first to the last stop.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;
use vrs_gtfs_model::{Route, RouteType};

use crate::error::ScrapeError;

pub const ROUTE_FILE_EXTENSION: &str = "data";
const DEFAULT_DIRECTION: &str = "0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteFileName {
    pub line: String,
    pub direction: String,
    pub long_name: String,
}

impl RouteFileName {
    pub fn parse(file_name: &str) -> Option<Self> {
        let (_, after_open) = file_name.split_once('(')?;
        let (long_name, _) = after_open.split_once(')')?;

        let line_direction = file_name.split('_').next().unwrap_or(file_name);
        let mut parts = line_direction.split('-');
        let line = parts.next().unwrap_or_default().trim();
        if line.is_empty() {
            return None;
        }
        let direction = parts
            .next()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_DIRECTION);

        Some(Self {
            line: line.to_string(),
            direction: direction.to_string(),
            long_name: long_name.to_string(),
        })
    }

    pub fn route_id(&self) -> String {
        format!("{}_{}", self.line, self.direction)
    }

    /// Lines numbered with a leading zero are light rail, everything else runs
    /// as a bus.
    pub fn route_type(&self) -> RouteType {
        if self.line.starts_with('0') {
            RouteType::Tram
        } else {
            RouteType::Bus
        }
    }
}

/// Builds a route from a definition file's name and contents. `None` when the
/// file lists no stations.
pub fn parse_route_definition(name: &RouteFileName, contents: &str) -> Option<Route> {
    let stations: Vec<&str> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let first = stations.first()?;
    let last = stations.last()?;

    Some(Route {
        route_id: name.route_id(),
        route_short_name: name.line.clone(),
        route_long_name: name.long_name.clone(),
        route_type: name.route_type(),
        route_first: first.to_string(),
        route_last: last.to_string(),
    })
}

pub fn load_routes(dir: &Path) -> Result<Vec<Route>, ScrapeError> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|err| ScrapeError::io(dir, err))?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext == ROUTE_FILE_EXTENSION)
                    .unwrap_or(false)
        })
        .collect();
    paths.sort();

    let mut routes = Vec::new();
    let mut seen = HashSet::new();
    for path in paths {
        info!("now loading {}", path.display());
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ScrapeError::RouteDefinition {
                path: path.clone(),
                detail: "file name is not valid UTF-8".to_string(),
            })?;
        let name = RouteFileName::parse(file_name).ok_or_else(|| ScrapeError::RouteDefinition {
            path: path.clone(),
            detail: "expected <line>[-<direction>]_...(<long name>).data".to_string(),
        })?;
        let contents = fs::read_to_string(&path).map_err(|err| ScrapeError::io(&path, err))?;

        let Some(route) = parse_route_definition(&name, &contents) else {
            info!("{} lists no stations, skipping", path.display());
            continue;
        };
        if !seen.insert(route.route_id.clone()) {
            return Err(ScrapeError::RouteDefinition {
                path,
                detail: format!("duplicate route id {}", route.route_id),
            });
        }
        routes.push(route);
    }

    Ok(routes)
}
