//! Configuration for the resolver, its provider and the picker.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::{Coordinate, ZoomPolicy};

/// Public Nominatim instance.
pub const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org";

/// Smallest accepted gap between outbound requests (one per second).
pub const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(1000);

/// Configuration for [`MapPicker`](crate::MapPicker).
#[derive(Debug, Clone, PartialEq)]
pub struct MapPickerConfig {
    /// Base URL of the geocoding provider
    pub endpoint: String,

    /// Descriptive client identifier sent with every request
    pub user_agent: String,

    /// Preferred result language
    pub language: String,

    /// Country results are restricted to
    pub country: String,

    /// Candidates requested per geocode call
    pub result_limit: usize,

    /// Floor between consecutive outbound requests
    pub min_request_interval: Duration,

    /// Budget for a single geocode attempt
    pub request_timeout: Duration,

    /// Zoom chosen for each matched specificity
    pub zoom_policy: ZoomPolicy,

    /// Shown when neither a saved nor a device location is available
    pub fallback_location: Coordinate,
}

impl Default for MapPickerConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_agent: concat!("mappicker-rs/", env!("CARGO_PKG_VERSION")).to_string(),
            language: "ja".to_string(),
            country: "jp".to_string(),
            result_limit: 1,
            min_request_interval: MIN_REQUEST_INTERVAL,
            request_timeout: Duration::from_secs(10),
            zoom_policy: ZoomPolicy::default(),
            fallback_location: Coordinate::TOKYO_STATION,
        }
    }
}

impl MapPickerConfig {
    /// Create a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use mappicker_rs::MapPickerConfig;
    ///
    /// let config = MapPickerConfig::builder()
    ///     .user_agent("my-crm-map/2.1 (ops@example.com)")
    ///     .request_timeout(Duration::from_secs(5))
    ///     .build();
    /// assert_eq!(config.country, "jp");
    /// ```
    pub fn builder() -> MapPickerConfigBuilder {
        MapPickerConfigBuilder::new()
    }

    /// Defaults overlaid with `MAPPICKER_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a numeric variable does not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`, keyed like the
    /// environment variables read by [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(endpoint) = lookup("MAPPICKER_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Some(user_agent) = lookup("MAPPICKER_USER_AGENT") {
            config.user_agent = user_agent;
        }
        if let Some(language) = lookup("MAPPICKER_LANGUAGE") {
            config.language = language;
        }
        if let Some(country) = lookup("MAPPICKER_COUNTRY") {
            config.country = country;
        }
        if let Some(limit) = lookup("MAPPICKER_RESULT_LIMIT") {
            config.result_limit = parse_number("MAPPICKER_RESULT_LIMIT", &limit)?;
        }
        if let Some(ms) = lookup("MAPPICKER_MIN_INTERVAL_MS") {
            config.min_request_interval =
                Duration::from_millis(parse_number("MAPPICKER_MIN_INTERVAL_MS", &ms)?);
        }
        if let Some(secs) = lookup("MAPPICKER_TIMEOUT_SECS") {
            config.request_timeout =
                Duration::from_secs(parse_number("MAPPICKER_TIMEOUT_SECS", &secs)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check invariants the resolver relies on.
    pub fn validate(&self) -> Result<()> {
        if self.user_agent.trim().is_empty() {
            return Err(Error::configuration("user agent must not be empty"));
        }
        if self.min_request_interval < MIN_REQUEST_INTERVAL {
            return Err(Error::configuration(format!(
                "min request interval must be at least {}ms, got {}ms",
                MIN_REQUEST_INTERVAL.as_millis(),
                self.min_request_interval.as_millis()
            )));
        }
        if self.result_limit == 0 {
            return Err(Error::configuration("result limit must be at least 1"));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::configuration("request timeout must be positive"));
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::configuration(format!("{key}={value:?}: {e}")))
}

/// Builder for MapPickerConfig.
#[derive(Debug, Clone)]
pub struct MapPickerConfigBuilder {
    config: MapPickerConfig,
}

impl MapPickerConfigBuilder {
    /// Create a new configuration builder with default values.
    pub fn new() -> Self {
        Self {
            config: MapPickerConfig::default(),
        }
    }

    /// Set the provider base URL.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Set the client identifier.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the preferred result language.
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.config.language = language.into();
        self
    }

    /// Set the country scope.
    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.config.country = country.into();
        self
    }

    /// Set the number of candidates requested per call.
    pub fn result_limit(mut self, limit: usize) -> Self {
        self.config.result_limit = limit;
        self
    }

    /// Set the floor between outbound requests.
    pub fn min_request_interval(mut self, interval: Duration) -> Self {
        self.config.min_request_interval = interval;
        self
    }

    /// Set the per-attempt timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the zoom policy.
    pub fn zoom_policy(mut self, policy: ZoomPolicy) -> Self {
        self.config.zoom_policy = policy;
        self
    }

    /// Set the location shown when nothing else is known.
    pub fn fallback_location(mut self, location: Coordinate) -> Self {
        self.config.fallback_location = location;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> MapPickerConfig {
        self.config
    }
}

impl Default for MapPickerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
