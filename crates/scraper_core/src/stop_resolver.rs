use std::io::Cursor;

use tracing::{info, warn};
use url::Url;
use vrs_gtfs_model::Stop;

use crate::error::ScrapeError;
use crate::repository::StopRepository;
use crate::settings::ScrapeSettings;
use crate::transport::Transport;

const UNAVAILABLE_MARKER: &str = "503 Service Unavailable";
const OUTPUT_SRS: &str = "urn:adv:crs:ETRS89_UTM32";

/// Maps station names to stop ids, querying the stop search and the geocoder
/// the first time a name is seen.
pub struct StopResolver<'a, T: Transport + ?Sized> {
    transport: &'a T,
    settings: &'a ScrapeSettings,
}

impl<'a, T: Transport + ?Sized> StopResolver<'a, T> {
    pub fn new(transport: &'a T, settings: &'a ScrapeSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    pub fn resolve(&self, repository: &mut StopRepository, name: &str) -> Result<String, ScrapeError> {
        if let Some(stop_id) = repository.stop_id_for_name(name) {
            return Ok(stop_id.to_string());
        }

        info!("Querying '{}'", name);
        let (stop_id, stop_name) = self.search(name)?;
        info!("Got {} for {}", stop_id, stop_name);

        // Another name may already have led to this stop.
        if !repository.contains_stop(&stop_id) {
            let (stop_lat, stop_lon) = self.geocode(&stop_name)?;
            repository.insert_stop(Stop {
                stop_id: stop_id.clone(),
                stop_name,
                stop_lat,
                stop_lon,
            });
        }
        repository.remember_name(name, &stop_id);

        Ok(stop_id)
    }

    fn search(&self, name: &str) -> Result<(String, String), ScrapeError> {
        let endpoint = self.settings.endpoints.stop_search.as_str();
        let payload = stop_search_payload(&format!("{}, {}", name, self.settings.city));
        let body = self
            .settings
            .connection_retry
            .run(endpoint, || self.transport.post_xml(endpoint, &payload))?;
        parse_stop_search(&body)
            .map_err(|detail| ScrapeError::malformed(endpoint, payload.as_str(), &body, detail))
    }

    fn geocode(&self, stop_name: &str) -> Result<(f64, f64), ScrapeError> {
        let url = geocode_url(&self.settings.endpoints.geocoder, stop_name).map_err(|err| {
            ScrapeError::malformed(
                self.settings.endpoints.geocoder.as_str(),
                stop_name,
                "",
                format!("invalid geocoder url: {}", err),
            )
        })?;
        let policy = &self.settings.unavailable_retry;
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let body = self
                .settings
                .connection_retry
                .run(url.as_str(), || self.transport.get(url.as_str()))?;
            if !is_unavailable(&body) {
                return parse_geocode(&body).map_err(|detail| {
                    ScrapeError::malformed(
                        url.as_str(),
                        stop_name,
                        &String::from_utf8_lossy(&body),
                        detail,
                    )
                });
            }
            if attempt >= max_attempts {
                return Err(ScrapeError::ServiceUnavailable {
                    endpoint: url.to_string(),
                    attempts: attempt,
                });
            }
            let delay = policy.delay_after(attempt);
            warn!("Service is down! Retrying in {:?}", delay);
            std::thread::sleep(delay);
        }
    }
}

pub fn stop_search_payload(query: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="ISO-8859-1"?>"#,
            "<Request><ObjectInfo><ObjectSearch><String>{}</String>",
            "<Classes><Stop/><Address/><POI/></Classes></ObjectSearch>",
            "<Options><Output><SRSName>{}</SRSName></Output></Options>",
            "</ObjectInfo></Request>"
        ),
        escape_xml(query),
        OUTPUT_SRS
    )
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// First `ID` and first `Value` of a stop search response.
pub fn parse_stop_search(body: &str) -> Result<(String, String), String> {
    let document = roxmltree::Document::parse(body).map_err(|err| err.to_string())?;
    let first_text = |tag: &str| {
        document
            .descendants()
            .find(|node| node.has_tag_name(tag))
            .and_then(|node| node.text())
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    };
    let stop_id = first_text("ID").ok_or_else(|| "no ID element".to_string())?;
    let stop_name = first_text("Value").ok_or_else(|| "no Value element".to_string())?;
    Ok((stop_id, stop_name))
}

pub fn geocode_url(base: &str, name: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base)?;
    url.query_pairs_mut().append_pair("q", name);
    Ok(url)
}

fn is_unavailable(body: &[u8]) -> bool {
    String::from_utf8_lossy(body).contains(UNAVAILABLE_MARKER)
}

/// Coordinates of the first entry of the geocoder's property list.
pub fn parse_geocode(body: &[u8]) -> Result<(f64, f64), String> {
    let value = plist::Value::from_reader(Cursor::new(body)).map_err(|err| err.to_string())?;
    let first = value
        .as_array()
        .ok_or_else(|| "expected an array of places".to_string())?
        .first()
        .ok_or_else(|| "no places returned".to_string())?
        .as_dictionary()
        .ok_or_else(|| "place is not a dictionary".to_string())?;
    let coordinate = |key: &str| -> Result<f64, String> {
        match first.get(key) {
            Some(plist::Value::Real(value)) => Ok(*value),
            Some(plist::Value::Integer(value)) => value
                .as_signed()
                .map(|value| value as f64)
                .ok_or_else(|| format!("{} out of range", key)),
            Some(plist::Value::String(value)) => value
                .trim()
                .parse()
                .map_err(|_| format!("{} is not a number: {}", key, value)),
            Some(_) => Err(format!("{} has an unexpected type", key)),
            None => Err(format!("place has no {}", key)),
        }
    };
    Ok((coordinate("lat")?, coordinate("lon")?))
}
