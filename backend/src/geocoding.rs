//! MapTiler geocoding proxy. Responses are passed through unchanged.

use std::time::Duration;

use reqwest::Url;
use serde_json::Value;
use shared::Coordinate;
use thiserror::Error;

pub const DEFAULT_GEOCODING_URL: &str = "https://api.maptiler.com/geocoding";
const SUGGESTION_LIMIT: u32 = 5;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeocodeError {
    /// Missing API key or unusable base URL.
    #[error("{0}")]
    Configuration(String),
    #[error("{0}")]
    InvalidInput(String),
    /// Timeout, transport failure or an error status from MapTiler.
    #[error("{0}")]
    Service(String),
}

#[derive(Debug, Clone, Copy)]
enum Lookup {
    Forward,
    Reverse,
}

impl Lookup {
    fn label(self) -> &'static str {
        match self {
            Lookup::Forward => "Geocoding",
            Lookup::Reverse => "Reverse geocoding",
        }
    }
}

pub struct MapTilerClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl MapTilerClient {
    /// A blank `api_key` is treated as missing.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, GeocodeError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| {
                GeocodeError::Configuration(format!("failed to build geocoding HTTP client: {err}"))
            })?;
        let api_key = api_key.filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            tracing::warn!("MapTiler API key is not configured; geocoding requests will fail");
        }

        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key,
        })
    }

    /// Place search for `query`, up to five suggestions, optionally biased
    /// toward `proximity`.
    pub async fn geocode(
        &self,
        query: &str,
        autocomplete: bool,
        proximity: Option<Coordinate>,
    ) -> Result<Value, GeocodeError> {
        let api_key = self.api_key(Lookup::Forward)?;
        let url = self.lookup_url(&format!("{query}.json"))?;

        let mut params = vec![
            ("key", api_key.to_string()),
            ("autocomplete", autocomplete.to_string()),
            ("limit", SUGGESTION_LIMIT.to_string()),
        ];
        if let Some(near) = proximity {
            params.push(("proximity", format!("{},{}", near.lon, near.lat)));
        }

        tracing::info!("forward geocoding '{query}' (autocomplete={autocomplete}, proximity={proximity:?})");
        self.fetch(url, &params, Lookup::Forward).await
    }

    pub async fn reverse_geocode(&self, location: Coordinate) -> Result<Value, GeocodeError> {
        let api_key = self.api_key(Lookup::Reverse)?;
        if !location.lon.is_finite() || !location.lat.is_finite() {
            tracing::error!("invalid coordinates for reverse geocoding: {location:?}");
            return Err(GeocodeError::InvalidInput("Invalid coordinates provided".into()));
        }
        let url = self.lookup_url(&format!("{},{}.json", location.lon, location.lat))?;

        tracing::info!(
            "reverse geocoding (longitude={}, latitude={})",
            location.lon,
            location.lat
        );
        self.fetch(url, &[("key", api_key.to_string())], Lookup::Reverse)
            .await
    }

    fn api_key(&self, lookup: Lookup) -> Result<&str, GeocodeError> {
        self.api_key.as_deref().ok_or_else(|| {
            tracing::error!("MapTiler API key is missing for {}", lookup.label());
            GeocodeError::Configuration(format!(
                "{} service configuration error: API key missing",
                lookup.label()
            ))
        })
    }

    /// Base URL with `segment` appended as one percent-encoded path segment.
    fn lookup_url(&self, segment: &str) -> Result<Url, GeocodeError> {
        let invalid = || {
            GeocodeError::Configuration(format!("invalid geocoding base URL '{}'", self.base_url))
        };
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .push(segment);
        Ok(url)
    }

    async fn fetch(
        &self,
        url: Url,
        params: &[(&str, String)],
        lookup: Lookup,
    ) -> Result<Value, GeocodeError> {
        let label = lookup.label();
        let response = self
            .http
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    tracing::error!("MapTiler {label} request timed out");
                    GeocodeError::Service(format!("{label} service timed out"))
                } else {
                    tracing::error!("MapTiler {label} request failed: {err}");
                    GeocodeError::Service(format!("{label} service request failed."))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("MapTiler {label} request failed with status {status}");
            return Err(GeocodeError::Service(format!(
                "{label} service request failed (Status: {}).",
                status.as_u16()
            )));
        }

        response.json().await.map_err(|err| {
            tracing::error!("could not decode MapTiler {label} response: {err}");
            GeocodeError::Service(format!("{label} service returned an unreadable response."))
        })
    }
}
