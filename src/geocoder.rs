//! Geocoding provider abstraction and the rate-limited client around it.

#[cfg(feature = "nominatim")]
pub mod nominatim;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::config::MIN_REQUEST_INTERVAL;
use crate::error::{Error, Result};
use crate::throttle::{Clock, Throttle, TokioClock};
use crate::types::GeocodeResult;

/// A forward-geocoding provider.
///
/// Implementations perform exactly one outbound request per call and report
/// failures as errors; throttling and soft-failure handling live in
/// [`RateLimitedGeocodeClient`].
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve a query to at most `limit` candidates, best first.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<GeocodeResult>>;
}

/// Geocode client enforcing the provider's request floor.
///
/// Never fails: transport errors, non-success statuses, malformed payloads,
/// timeouts and empty result sets all come back as `None`.
pub struct RateLimitedGeocodeClient {
    geocoder: Arc<dyn Geocoder>,
    throttle: Throttle,
    timeout: Duration,
}

impl RateLimitedGeocodeClient {
    /// Default floor between requests.
    pub const DEFAULT_MIN_INTERVAL: Duration = MIN_REQUEST_INTERVAL;

    /// Default budget for a single request.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Wrap a provider with the default floor, timeout and wall clock.
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self::with_clock(
            geocoder,
            Self::DEFAULT_MIN_INTERVAL,
            Self::DEFAULT_TIMEOUT,
            Arc::new(TokioClock),
        )
    }

    /// Wrap a provider with an explicit floor, timeout and clock.
    ///
    /// Floors below [`DEFAULT_MIN_INTERVAL`](Self::DEFAULT_MIN_INTERVAL) are
    /// raised to it.
    pub fn with_clock(
        geocoder: Arc<dyn Geocoder>,
        min_interval: Duration,
        timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            geocoder,
            throttle: Throttle::new(min_interval.max(Self::DEFAULT_MIN_INTERVAL), clock),
            timeout,
        }
    }

    /// The throttle guarding outbound requests.
    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    /// Geocode `query`, returning the first candidate.
    ///
    /// Every call claims a throttle slot, including ones that fail.
    pub async fn geocode(&self, query: &str, limit: usize) -> Option<GeocodeResult> {
        self.throttle.acquire().await;

        let search = self.geocoder.search(query, limit.max(1));
        let outcome = match tokio::time::timeout(self.timeout, search).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(self.timeout)),
        };

        match outcome {
            Ok(results) => {
                let first = results.into_iter().next();
                if first.is_none() {
                    debug!(query, "geocode returned no candidates");
                }
                first
            }
            Err(e) if e.is_soft() => {
                warn!(query, error = %e, "geocode attempt failed");
                None
            }
            Err(e) => {
                error!(query, error = %e, "geocode provider unusable");
                None
            }
        }
    }
}

impl std::fmt::Debug for RateLimitedGeocodeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitedGeocodeClient")
            .field("throttle", &self.throttle)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::throttle::ManualClock;
    use crate::types::Coordinate;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Instant;

    /// Scripted provider recording every query with the clock reading at
    /// dispatch.
    pub(crate) struct ScriptedGeocoder {
        clock: Arc<dyn Clock>,
        answers: HashMap<String, std::result::Result<Vec<GeocodeResult>, u16>>,
        pub(crate) calls: Mutex<Vec<(String, Instant)>>,
    }

    impl ScriptedGeocoder {
        pub(crate) fn new(clock: Arc<dyn Clock>) -> Self {
            Self {
                clock,
                answers: HashMap::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn answer(mut self, query: &str, coordinate: Coordinate) -> Self {
            self.answers.insert(
                query.to_string(),
                Ok(vec![GeocodeResult {
                    coordinate,
                    display_name: Some(query.to_string()),
                }]),
            );
            self
        }

        pub(crate) fn fail(mut self, query: &str, status: u16) -> Self {
            self.answers.insert(query.to_string(), Err(status));
            self
        }

        pub(crate) fn queries(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(query, _)| query.clone())
                .collect()
        }

        pub(crate) fn stamps(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().iter().map(|(_, at)| *at).collect()
        }
    }

    #[async_trait]
    impl Geocoder for ScriptedGeocoder {
        async fn search(&self, query: &str, _limit: usize) -> Result<Vec<GeocodeResult>> {
            self.calls
                .lock()
                .unwrap()
                .push((query.to_string(), self.clock.now()));
            match self.answers.get(query) {
                Some(Ok(results)) => Ok(results.clone()),
                Some(Err(status)) => Err(Error::http_status(*status)),
                None => Ok(Vec::new()),
            }
        }
    }

    struct HangingGeocoder;

    #[async_trait]
    impl Geocoder for HangingGeocoder {
        async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<GeocodeResult>> {
            std::future::pending().await
        }
    }

    struct RejectingGeocoder;

    #[async_trait]
    impl Geocoder for RejectingGeocoder {
        async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<GeocodeResult>> {
            Err(Error::configuration("provider rejected the user agent"))
        }
    }

    fn client(geocoder: Arc<ScriptedGeocoder>, clock: &ManualClock) -> RateLimitedGeocodeClient {
        RateLimitedGeocodeClient::with_clock(
            geocoder,
            Duration::from_millis(1000),
            Duration::from_secs(10),
            Arc::new(clock.clone()),
        )
    }

    #[tokio::test]
    async fn test_returns_first_candidate() {
        let clock = ManualClock::new();
        let geocoder = Arc::new(
            ScriptedGeocoder::new(Arc::new(clock.clone()))
                .answer("東京都", Coordinate::new(35.6895, 139.6917)),
        );
        let client = client(geocoder.clone(), &clock);

        let result = client.geocode("東京都", 1).await.unwrap();
        assert_eq!(result.coordinate, Coordinate::new(35.6895, 139.6917));
        assert_eq!(geocoder.queries(), ["東京都"]);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_failures_are_soft() {
        let clock = ManualClock::new();
        let geocoder = Arc::new(
            ScriptedGeocoder::new(Arc::new(clock.clone()))
                .fail("broken", 500),
        );
        let client = client(geocoder.clone(), &clock);

        assert!(client.geocode("broken", 1).await.is_none());
        assert!(client.geocode("unknown", 1).await.is_none());
        assert_eq!(geocoder.queries().len(), 2);
        assert!(logs_contain("geocode attempt failed"));
    }

    #[tokio::test]
    async fn test_calls_never_closer_than_floor() {
        let clock = ManualClock::new();
        let geocoder = Arc::new(ScriptedGeocoder::new(Arc::new(clock.clone())));
        let client = client(geocoder.clone(), &clock);

        for query in ["a", "b", "c", "d", "e"] {
            client.geocode(query, 1).await;
            clock.advance(Duration::from_millis(250));
        }

        let stamps = geocoder.stamps();
        assert_eq!(stamps.len(), 5);
        for pair in stamps.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(1000));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_soft_failure() {
        let client = RateLimitedGeocodeClient::with_clock(
            Arc::new(HangingGeocoder),
            Duration::from_millis(1000),
            Duration::from_secs(2),
            Arc::new(TokioClock),
        );

        assert!(client.geocode("東京都", 1).await.is_none());
    }

    #[test]
    fn test_floor_below_one_second_is_raised() {
        let client = RateLimitedGeocodeClient::with_clock(
            Arc::new(HangingGeocoder),
            Duration::ZERO,
            Duration::from_secs(2),
            Arc::new(ManualClock::new()),
        );
        assert_eq!(client.throttle().min_interval(), Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_zero_floor_still_spaces_calls() {
        let clock = ManualClock::new();
        let geocoder = Arc::new(ScriptedGeocoder::new(Arc::new(clock.clone())));
        let client = RateLimitedGeocodeClient::with_clock(
            geocoder.clone(),
            Duration::ZERO,
            Duration::from_secs(10),
            Arc::new(clock.clone()),
        );

        client.geocode("a", 1).await;
        client.geocode("b", 1).await;

        let stamps = geocoder.stamps();
        assert!(stamps[1] - stamps[0] >= Duration::from_millis(1000));
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_hard_failures_are_logged_as_errors() {
        let client = RateLimitedGeocodeClient::with_clock(
            Arc::new(RejectingGeocoder),
            Duration::from_millis(1000),
            Duration::from_secs(10),
            Arc::new(ManualClock::new()),
        );

        assert!(client.geocode("東京都", 1).await.is_none());
        assert!(logs_contain("geocode provider unusable"));
        assert!(!logs_contain("geocode attempt failed"));
    }
}
