//! # mappicker-rs
//!
//! Location picker core with progressive Japanese address resolution.
//!
//! Free-form Japanese addresses often fail to geocode as written: a building
//! name, a room number or a lot the provider does not know is enough to get
//! an empty answer. This crate normalizes the input, splits it into
//! administrative segments and retries with progressively coarser queries
//! until the provider answers, then reports how specific the match was so
//! the map can zoom accordingly.
//!
//! ## Features
//!
//! - **Normalization**: Full-width folding, dash unification, whitespace and
//!   separator removal
//! - **Segmentation**: Prefecture, city, town, chōme, lot, building number
//!   and building name
//! - **Progressive Resolution**: Fallback queries from finest to coarsest
//!   with a specificity-derived zoom hint
//! - **Rate Limiting**: Start-to-start request floor shared by every caller
//! - **Picker State**: Initial view, picks, searches and change notifications
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mappicker_rs::MapPicker;
//!
//! # async fn run() -> mappicker_rs::Result<()> {
//! let picker = MapPicker::new()?;
//!
//! let outcome = picker.resolve("東京都千代田区丸の内１丁目９−１ 丸の内ビル").await?;
//! if let Some(coordinate) = outcome.coordinate {
//!     println!("{coordinate} at zoom {:?}", outcome.zoom);
//! }
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod geocoder;
pub mod normalizer;
pub mod picker;
pub mod resolver;
pub mod segmenter;
pub mod throttle;
pub mod types;

use std::sync::Arc;

// Re-export main API
pub use config::{MapPickerConfig, MapPickerConfigBuilder};
pub use error::{Error, Result};
pub use geocoder::{Geocoder, RateLimitedGeocodeClient};
pub use normalizer::{AddressNormalizer, NormalizedAddress};
pub use picker::{BroadcastPublisher, LocationPicker, LocationPublisher, MapView, SearchMessage};
pub use resolver::ProgressiveResolver;
pub use segmenter::{AddressSegmenter, AddressSegments};
pub use throttle::{Clock, ManualClock, Throttle, TokioClock};
pub use types::*;

#[cfg(feature = "nominatim")]
pub use geocoder::nominatim::{NominatimConfig, NominatimGeocoder};

/// Main entry point wiring configuration, provider and resolver together.
///
/// # Examples
///
/// ```rust
/// use mappicker_rs::{MapPicker, SpecificityLevel};
///
/// let picker = MapPicker::new()?;
/// let segments = picker.segment_address("東京都千代田区丸の内１丁目９−１");
/// assert_eq!(segments.city.as_deref(), Some("千代田区"));
/// assert_eq!(segments.finest_level(), SpecificityLevel::Go);
/// # Ok::<(), mappicker_rs::Error>(())
/// ```
#[derive(Debug)]
pub struct MapPicker {
    config: MapPickerConfig,
    resolver: Arc<ProgressiveResolver>,
}

impl MapPicker {
    /// Create a picker backed by the public Nominatim instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    #[cfg(feature = "nominatim")]
    pub fn new() -> Result<Self> {
        Self::with_config(MapPickerConfig::default())
    }

    /// Create a Nominatim-backed picker with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` is invalid or the endpoint
    /// is not a URL.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use mappicker_rs::{MapPicker, MapPickerConfig};
    ///
    /// let config = MapPickerConfig::builder()
    ///     .endpoint("http://localhost:8080")
    ///     .min_request_interval(Duration::from_millis(1500))
    ///     .build();
    ///
    /// let picker = MapPicker::with_config(config)?;
    /// assert_eq!(picker.config().endpoint, "http://localhost:8080");
    /// # Ok::<(), mappicker_rs::Error>(())
    /// ```
    #[cfg(feature = "nominatim")]
    pub fn with_config(config: MapPickerConfig) -> Result<Self> {
        config.validate()?;
        let geocoder = NominatimGeocoder::new(NominatimConfig::from(&config))?;
        Self::with_geocoder(config, Arc::new(geocoder), Arc::new(TokioClock))
    }

    /// Create a picker around any provider and clock.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` is invalid.
    pub fn with_geocoder(
        config: MapPickerConfig,
        geocoder: Arc<dyn Geocoder>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let client = RateLimitedGeocodeClient::with_clock(
            geocoder,
            config.min_request_interval,
            config.request_timeout,
            clock,
        );
        let resolver = ProgressiveResolver::new(client)
            .with_zoom_policy(config.zoom_policy.clone())
            .with_result_limit(config.result_limit);

        Ok(Self {
            config,
            resolver: Arc::new(resolver),
        })
    }

    /// Create a new address normalizer.
    pub fn normalizer(&self) -> AddressNormalizer {
        AddressNormalizer::new()
    }

    /// Create a new address segmenter.
    pub fn segmenter(&self) -> AddressSegmenter {
        AddressSegmenter::new()
    }

    /// Normalize an address string.
    pub fn normalize_address(&self, address: &str) -> NormalizedAddress {
        self.normalizer().normalize(address)
    }

    /// Normalize and segment an address string.
    pub fn segment_address(&self, address: &str) -> AddressSegments {
        self.segmenter().segment(&self.normalize_address(address))
    }

    /// Resolve an address to a coordinate, falling back to coarser queries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SearchInProgress`] if another resolution is running
    /// on this instance.
    pub async fn resolve(&self, address: &str) -> Result<ResolutionOutcome> {
        self.resolver.resolve(address).await
    }

    /// Shared resolver, for building a [`LocationPicker`].
    pub fn resolver(&self) -> Arc<ProgressiveResolver> {
        Arc::clone(&self.resolver)
    }

    /// Create picker state driving `map`, publishing changes to `publisher`.
    pub fn location_picker<M: MapView>(
        &self,
        map: M,
        publisher: Arc<dyn LocationPublisher>,
    ) -> LocationPicker<M> {
        LocationPicker::new(self.resolver(), map, publisher)
            .with_fallback_location(self.config.fallback_location)
    }

    /// Get the configuration used by this instance.
    pub fn config(&self) -> &MapPickerConfig {
        &self.config
    }
}
