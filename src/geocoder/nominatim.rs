//! OpenStreetMap Nominatim provider.
//!
//! Usage policy: <https://operations.osmfoundation.org/policies/nominatim/>.
//! A descriptive `User-Agent` is mandatory and callers must stay under one
//! request per second, which [`RateLimitedGeocodeClient`](super::RateLimitedGeocodeClient)
//! takes care of.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use super::Geocoder;
use crate::config::MapPickerConfig;
use crate::error::{Error, Result};
use crate::types::{Coordinate, GeocodeResult};

/// Connection settings for a Nominatim instance.
#[derive(Debug, Clone)]
pub struct NominatimConfig {
    /// Base URL of the instance
    pub endpoint: String,
    /// Value of the `User-Agent` header
    pub user_agent: String,
    /// Value of the `Accept-Language` header
    pub language: String,
    /// ISO 3166-1 alpha-2 codes results are restricted to
    pub country: String,
    /// Transport-level timeout per request
    pub timeout: Duration,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self::from(&MapPickerConfig::default())
    }
}

impl From<&MapPickerConfig> for NominatimConfig {
    fn from(config: &MapPickerConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            user_agent: config.user_agent.clone(),
            language: config.language.clone(),
            country: config.country.clone(),
            timeout: config.request_timeout,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
    display_name: Option<String>,
}

impl Place {
    fn into_result(self) -> Result<GeocodeResult> {
        let latitude = self
            .lat
            .parse::<f64>()
            .map_err(|e| Error::malformed_response(format!("invalid lat {:?}: {e}", self.lat)))?;
        let longitude = self
            .lon
            .parse::<f64>()
            .map_err(|e| Error::malformed_response(format!("invalid lon {:?}: {e}", self.lon)))?;
        Ok(GeocodeResult {
            coordinate: Coordinate::new(latitude, longitude),
            display_name: self.display_name,
        })
    }
}

/// Nominatim `/search` client.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: Client,
    search_url: Url,
    language: String,
    country: String,
}

impl NominatimGeocoder {
    /// Create a client for the given instance.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the endpoint is not a valid URL or
    /// the HTTP client cannot be built.
    pub fn new(config: NominatimConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::configuration(format!("failed to build HTTP client: {e}")))?;

        let mut base = Url::parse(&config.endpoint)
            .map_err(|e| Error::configuration(format!("invalid endpoint {}: {e}", config.endpoint)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let search_url = base
            .join("search")
            .map_err(|e| Error::configuration(format!("invalid endpoint {}: {e}", config.endpoint)))?;

        Ok(Self {
            client,
            search_url,
            language: config.language,
            country: config.country,
        })
    }

    /// URL requests are sent to.
    pub fn search_url(&self) -> &Url {
        &self.search_url
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<GeocodeResult>> {
        let limit = limit.to_string();
        let response = self
            .client
            .get(self.search_url.clone())
            .header(reqwest::header::ACCEPT_LANGUAGE, &self.language)
            .query(&[
                ("format", "json"),
                ("q", query),
                ("limit", limit.as_str()),
                ("countrycodes", self.country.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::http_status(status.as_u16()));
        }

        let places: Vec<Place> = response
            .json()
            .await
            .map_err(|e| Error::malformed_response(e.to_string()))?;
        debug!(query, candidates = places.len(), "nominatim search completed");

        places.into_iter().map(Place::into_result).collect()
    }
}
