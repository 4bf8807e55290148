//! Location picker state.
//!
//! Drives a map view from three coordinate sources: the initial saved or
//! device location, direct picks (map click, marker drag) and address
//! searches through the [`ProgressiveResolver`]. Every change made by the
//! user is published to listeners exactly once.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::resolver::ProgressiveResolver;
use crate::throttle::Clock;
use crate::types::{Coordinate, LocationChange, ResolutionOutcome};

/// Zoom used when a saved location is shown.
pub const SAVED_LOCATION_ZOOM: u8 = 18;

/// Zoom used for a device or fallback location.
pub const APPROXIMATE_LOCATION_ZOOM: u8 = 16;

/// Decimal places kept for picked coordinates.
const COORDINATE_PRECISION: i32 = 14;

/// The map widget the picker drives.
pub trait MapView {
    /// Recenter the map.
    fn set_center(&mut self, coordinate: Coordinate, zoom: u8);

    /// Move (and show) the marker.
    fn set_marker(&mut self, coordinate: Coordinate);

    /// Highest zoom the map supports.
    fn max_zoom(&self) -> u8 {
        19
    }
}

/// Receives coordinate changes made through the picker.
pub trait LocationPublisher: Send + Sync {
    /// Notify listeners of a new selected coordinate.
    fn publish(&self, change: LocationChange);
}

/// Publisher fanning changes out over a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    sender: broadcast::Sender<LocationChange>,
}

impl BroadcastPublisher {
    /// Create a publisher buffering up to `capacity` unread changes per
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to future changes.
    pub fn subscribe(&self) -> broadcast::Receiver<LocationChange> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastPublisher {
    fn default() -> Self {
        Self::new(16)
    }
}

impl LocationPublisher for BroadcastPublisher {
    fn publish(&self, change: LocationChange) {
        if self.sender.send(change).is_err() {
            debug!("location change published with no subscribers");
        }
    }
}

/// User-visible search feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchMessage {
    /// Submitted without any text
    EmptyQuery,
    /// Submitted again before the request floor elapsed
    RateLimited,
    /// Every attempt came back empty
    NotFound,
    /// Unexpected failure while searching
    SearchFailed,
}

impl SearchMessage {
    /// Stable code for the message.
    pub fn code(&self) -> &'static str {
        match self {
            SearchMessage::EmptyQuery => "empty-query",
            SearchMessage::RateLimited => "rate-limited-retry",
            SearchMessage::NotFound => "not-found",
            SearchMessage::SearchFailed => "transport-error",
        }
    }
}

impl fmt::Display for SearchMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SearchMessage::EmptyQuery => "検索する住所を入力してください。",
            SearchMessage::RateLimited => "しばらくしてからもう一度お試しください。",
            SearchMessage::NotFound => "住所が見つかりませんでした。",
            SearchMessage::SearchFailed => "検索中にエラーが発生しました。",
        };
        f.write_str(text)
    }
}

/// State behind a map location picker.
pub struct LocationPicker<M: MapView> {
    resolver: Arc<ProgressiveResolver>,
    map: M,
    publisher: Arc<dyn LocationPublisher>,
    clock: Arc<dyn Clock>,
    min_search_interval: Duration,
    fallback_location: Coordinate,
    readonly: bool,
    location: Option<Coordinate>,
    query: String,
    message: Option<SearchMessage>,
    last_search: Option<Instant>,
}

impl<M: MapView> LocationPicker<M> {
    /// Create a picker. Searches share the resolver's clock and request
    /// floor.
    pub fn new(
        resolver: Arc<ProgressiveResolver>,
        map: M,
        publisher: Arc<dyn LocationPublisher>,
    ) -> Self {
        let throttle = resolver.client().throttle();
        let clock = throttle.clock().clone();
        let min_search_interval = throttle.min_interval();
        Self {
            resolver,
            map,
            publisher,
            clock,
            min_search_interval,
            fallback_location: Coordinate::TOKYO_STATION,
            readonly: false,
            location: None,
            query: String::new(),
            message: None,
            last_search: None,
        }
    }

    /// Disable searching and picking.
    pub fn with_readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }

    /// Location shown when neither a saved nor a device location is known.
    pub fn with_fallback_location(mut self, location: Coordinate) -> Self {
        self.fallback_location = location;
        self
    }

    /// Show the initial view.
    ///
    /// A saved location wins and is shown close up; otherwise the device
    /// location, then the fallback, at a wider zoom.
    pub fn initialize(&mut self, saved: Option<Coordinate>, device: Option<Coordinate>) -> Coordinate {
        let (location, zoom) = match saved.filter(Coordinate::is_set) {
            Some(saved) => (saved, SAVED_LOCATION_ZOOM),
            None => (
                device
                    .filter(Coordinate::is_set)
                    .unwrap_or(self.fallback_location),
                APPROXIMATE_LOCATION_ZOOM,
            ),
        };

        self.location = Some(location);
        self.map.set_center(location, zoom);
        self.map.set_marker(location);
        location
    }

    /// Apply a map click or marker drag.
    ///
    /// Returns `false` and changes nothing in readonly mode.
    pub fn pick(&mut self, latitude: f64, longitude: f64) -> bool {
        if self.readonly {
            return false;
        }
        self.apply_location(Coordinate::new(latitude, longitude));
        true
    }

    /// Set the location from the hosting page without notifying listeners.
    pub fn set_location(&mut self, coordinate: Coordinate) {
        self.location = Some(coordinate);
        self.map.set_marker(coordinate);
        self.map.set_center(coordinate, self.map.max_zoom());
    }

    /// Currently selected location.
    pub fn location(&self) -> Option<Coordinate> {
        self.location
    }

    /// Update the search text, clearing any previous message.
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.message = None;
    }

    /// Current search text.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Feedback from the last search.
    pub fn message(&self) -> Option<SearchMessage> {
        self.message
    }

    /// Whether a search is running on the underlying resolver.
    ///
    /// Read from the resolver's search lane, so a search whose future was
    /// dropped mid-flight no longer counts.
    pub fn is_searching(&self) -> bool {
        self.resolver.is_searching()
    }

    /// Whether the search box is offered at all.
    pub fn show_search(&self) -> bool {
        !self.readonly
    }

    /// Whether the submit action should be disabled.
    pub fn is_search_disabled(&self) -> bool {
        self.query.trim().is_empty() || self.is_searching()
    }

    /// The map view.
    pub fn map(&self) -> &M {
        &self.map
    }

    /// Resolve the current query and move the map to the result.
    ///
    /// Returns the resolver outcome, or `None` when the search was rejected
    /// before reaching the resolver or failed unexpectedly; [`message`](Self::message)
    /// says why.
    pub async fn search(&mut self) -> Option<ResolutionOutcome> {
        if self.readonly {
            return None;
        }
        if self.query.trim().is_empty() {
            self.message = Some(SearchMessage::EmptyQuery);
            return None;
        }

        let now = self.clock.now();
        if let Some(last) = self.last_search {
            if now.saturating_duration_since(last) < self.min_search_interval {
                debug!("search submitted too soon after the previous one");
                self.message = Some(SearchMessage::RateLimited);
                return None;
            }
        }
        self.last_search = Some(now);

        self.message = None;
        let result = self.resolver.resolve(&self.query).await;

        match result {
            Ok(outcome) => {
                match (outcome.coordinate, outcome.zoom) {
                    (Some(coordinate), Some(zoom)) if outcome.matched => {
                        let applied = self.apply_location(coordinate);
                        self.map.set_center(applied, zoom);
                    }
                    _ => self.message = Some(SearchMessage::NotFound),
                }
                Some(outcome)
            }
            Err(Error::SearchInProgress) => {
                self.message = Some(SearchMessage::RateLimited);
                None
            }
            Err(e) => {
                warn!(error = %e, "address search failed");
                self.message = Some(SearchMessage::SearchFailed);
                None
            }
        }
    }

    fn apply_location(&mut self, coordinate: Coordinate) -> Coordinate {
        let rounded = coordinate.rounded(COORDINATE_PRECISION);
        self.location = Some(rounded);
        self.map.set_marker(rounded);
        self.publisher.publish(rounded.into());
        info!(latitude = rounded.latitude, longitude = rounded.longitude, "location changed");
        rounded
    }
}

impl<M: MapView + fmt::Debug> fmt::Debug for LocationPicker<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocationPicker")
            .field("map", &self.map)
            .field("readonly", &self.readonly)
            .field("location", &self.location)
            .field("query", &self.query)
            .field("message", &self.message)
            .field("searching", &self.is_searching())
            .finish_non_exhaustive()
    }
}
