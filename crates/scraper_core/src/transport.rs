use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, ORIGIN, REFERER};

pub const XML_CONTENT_TYPE: &str = "text/xml; charset=UTF-8;";

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("http status {0}")]
    Status(u16),
    #[error("failed to read response body: {0}")]
    Body(String),
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Connection-level failures that are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Connect(_) | TransportError::Timeout(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if let Some(status) = err.status() {
            TransportError::Status(status.as_u16())
        } else if err.is_body() || err.is_decode() {
            TransportError::Body(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

/// Blocking HTTP operations the scraper needs from the remote site.
pub trait Transport {
    fn post_form(&self, url: &str, form: &[(&str, String)]) -> Result<String, TransportError>;

    fn post_xml(&self, url: &str, body: &str) -> Result<String, TransportError>;

    fn get(&self, url: &str) -> Result<Vec<u8>, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn post_form(&self, url: &str, form: &[(&str, String)]) -> Result<String, TransportError> {
        (**self).post_form(url, form)
    }

    fn post_xml(&self, url: &str, body: &str) -> Result<String, TransportError> {
        (**self).post_xml(url, body)
    }

    fn get(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        (**self).get(url)
    }
}

#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    pub user_agent: String,
    pub origin: String,
    pub referer: String,
    pub timeout: Duration,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("vrs-gtfs/{}", env!("CARGO_PKG_VERSION")),
            origin: "http://auskunft.vrsinfo.de".to_string(),
            referer: "http://auskunft.vrsinfo.de/vrs/cgi/page/eingabeRoute".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &HttpTransportConfig) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ORIGIN,
            HeaderValue::from_str(&config.origin)
                .map_err(|err| TransportError::Other(err.to_string()))?,
        );
        headers.insert(
            REFERER,
            HeaderValue::from_str(&config.referer)
                .map_err(|err| TransportError::Other(err.to_string()))?,
        );
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn post_form(&self, url: &str, form: &[(&str, String)]) -> Result<String, TransportError> {
        let response = self
            .client
            .post(url)
            .form(form)
            .send()?
            .error_for_status()?;
        Ok(response.text()?)
    }

    fn post_xml(&self, url: &str, body: &str) -> Result<String, TransportError> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, XML_CONTENT_TYPE)
            .body(body.as_bytes().to_vec())
            .send()?
            .error_for_status()?;
        Ok(response.text()?)
    }

    // The geocoder reports outages inside a 200 body, so the status is left
    // for the caller to interpret together with the body.
    fn get(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let response = self.client.get(url).send()?;
        Ok(response.bytes()?.to_vec())
    }
}
