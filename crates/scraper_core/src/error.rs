use std::path::PathBuf;

use crate::journey_page::LayoutError;
use crate::transport::TransportError;

/// Longest slice of a remote response kept inside an error for diagnosis.
pub const SNIPPET_LIMIT: usize = 512;

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("{endpoint} unreachable after {attempts} attempts: {source}")]
    Unreachable {
        endpoint: String,
        attempts: u32,
        #[source]
        source: TransportError,
    },
    #[error("{endpoint} still unavailable after {attempts} attempts")]
    ServiceUnavailable { endpoint: String, attempts: u32 },
    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: TransportError,
    },
    #[error("unexpected response from {endpoint}: {detail} (response starts with {snippet:?})")]
    MalformedResponse {
        endpoint: String,
        payload: String,
        snippet: String,
        detail: String,
    },
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("calendar {service_id} has no active weekday")]
    NoActiveWeekday { service_id: String },
    #[error("calendar {service_id}: {detail}")]
    InvalidCalendar { service_id: String, detail: String },
    #[error("route definition {}: {detail}", .path.display())]
    RouteDefinition { path: PathBuf, detail: String },
    #[error("snapshot {}: {detail}", .path.display())]
    Snapshot { path: PathBuf, detail: String },
    #[error("io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error in {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl ScrapeError {
    pub fn malformed(
        endpoint: impl Into<String>,
        payload: impl Into<String>,
        response: &str,
        detail: impl Into<String>,
    ) -> Self {
        ScrapeError::MalformedResponse {
            endpoint: endpoint.into(),
            payload: payload.into(),
            snippet: snippet(response),
            detail: detail.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScrapeError::Io {
            path: path.into(),
            source,
        }
    }
}

pub fn snippet(response: &str) -> String {
    match response.char_indices().nth(SNIPPET_LIMIT) {
        Some((index, _)) => response[..index].to_string(),
        None => response.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_truncates_on_char_boundary() {
        let long = "ä".repeat(SNIPPET_LIMIT + 10);
        let cut = snippet(&long);
        assert_eq!(cut.chars().count(), SNIPPET_LIMIT);
        assert_eq!(snippet("short"), "short");
    }

    #[test]
    fn malformed_error_mentions_endpoint() {
        let err = ScrapeError::malformed("stop-search", "<Request/>", "<html>", "missing ID");
        let message = err.to_string();
        assert!(message.contains("stop-search"));
        assert!(message.contains("missing ID"));
    }
}
