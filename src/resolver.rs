//! Progressive address resolution.
//!
//! Geocodes the full normalized input first. When the provider cannot
//! resolve it, the address is segmented and retried from the most specific
//! prefix (prefecture through gō) down to the prefecture alone, stopping at
//! the first match. The zoom hint follows the finest segment of the query
//! that matched.

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::geocoder::RateLimitedGeocodeClient;
use crate::normalizer::AddressNormalizer;
use crate::segmenter::{AddressSegmenter, AddressSegments};
use crate::types::{ResolutionOutcome, SearchAttempt, SpecificityLevel, ZoomPolicy};

/// Build the ordered fallback attempts for a segmented address.
///
/// Attempts run from `prefecture..go` down to `prefecture`; empty queries and
/// queries equal to an earlier one are dropped.
pub fn fallback_attempts(segments: &AddressSegments, policy: &ZoomPolicy) -> Vec<SearchAttempt> {
    let mut attempts: Vec<SearchAttempt> =
        Vec::with_capacity(SpecificityLevel::FALLBACK_ORDER.len());

    for level in SpecificityLevel::FALLBACK_ORDER {
        let prefix = segments.through(level);
        let query = prefix.query();
        if query.is_empty() || attempts.iter().any(|attempt| attempt.query == query) {
            continue;
        }
        let specificity = prefix.finest_level();
        attempts.push(SearchAttempt {
            query,
            specificity,
            zoom: policy.zoom_for(specificity),
        });
    }

    attempts
}

/// Resolves free-text addresses through a rate-limited geocode client.
#[derive(Debug)]
pub struct ProgressiveResolver {
    normalizer: AddressNormalizer,
    segmenter: AddressSegmenter,
    client: RateLimitedGeocodeClient,
    zoom_policy: ZoomPolicy,
    result_limit: usize,
    lane: tokio::sync::Mutex<()>,
}

impl ProgressiveResolver {
    /// Create a resolver with the default zoom policy.
    pub fn new(client: RateLimitedGeocodeClient) -> Self {
        Self {
            normalizer: AddressNormalizer::new(),
            segmenter: AddressSegmenter::new(),
            client,
            zoom_policy: ZoomPolicy::default(),
            result_limit: 1,
            lane: tokio::sync::Mutex::new(()),
        }
    }

    /// Set the zoom policy.
    pub fn with_zoom_policy(mut self, policy: ZoomPolicy) -> Self {
        self.zoom_policy = policy;
        self
    }

    /// Set the number of candidates requested per attempt.
    pub fn with_result_limit(mut self, limit: usize) -> Self {
        self.result_limit = limit.max(1);
        self
    }

    /// The underlying geocode client.
    pub fn client(&self) -> &RateLimitedGeocodeClient {
        &self.client
    }

    /// The zoom policy in use.
    pub fn zoom_policy(&self) -> &ZoomPolicy {
        &self.zoom_policy
    }

    /// Whether a `resolve` call is currently in flight.
    pub fn is_searching(&self) -> bool {
        self.lane.try_lock().is_err()
    }

    /// Every attempt `resolve` would make for `raw`, in order, assuming none
    /// of them matches.
    pub fn plan(&self, raw: &str) -> Vec<SearchAttempt> {
        let normalized = self.normalizer.normalize(raw);
        if normalized.is_empty() {
            return Vec::new();
        }

        let full = self.full_attempt(normalized.as_str());
        let segments = self.segmenter.segment(&normalized);
        let mut plan = vec![full];
        for attempt in fallback_attempts(&segments, &self.zoom_policy) {
            if attempt.query != plan[0].query {
                plan.push(attempt);
            }
        }
        plan
    }

    fn full_attempt(&self, query: &str) -> SearchAttempt {
        SearchAttempt {
            query: query.to_string(),
            specificity: SpecificityLevel::Full,
            zoom: self.zoom_policy.zoom_for(SpecificityLevel::Full),
        }
    }

    /// Resolve a raw user query to a coordinate.
    ///
    /// Empty input returns an unmatched outcome without any network call.
    /// Individual attempt failures are never surfaced; only exhaustion of all
    /// attempts produces `matched: false`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SearchInProgress`] if another search on this resolver
    /// has not finished yet.
    pub async fn resolve(&self, raw: &str) -> Result<ResolutionOutcome> {
        let _lane = self.lane.try_lock().map_err(|_| Error::SearchInProgress)?;

        if raw.trim().is_empty() {
            debug!("empty query, nothing to resolve");
            return Ok(ResolutionOutcome::not_found(0));
        }

        let normalized = self.normalizer.normalize(raw);
        if normalized.is_empty() {
            debug!(raw, "query normalized to nothing");
            return Ok(ResolutionOutcome::not_found(0));
        }

        let full = self.full_attempt(normalized.as_str());
        let mut dispatched = 1;
        if let Some(result) = self.client.geocode(&full.query, self.result_limit).await {
            info!(query = %full.query, "resolved full address");
            return Ok(ResolutionOutcome::found(result, &full, dispatched));
        }

        let segments = self.segmenter.segment(&normalized);
        debug!(?segments, "full address unresolved, falling back to segments");

        for attempt in fallback_attempts(&segments, &self.zoom_policy) {
            if attempt.query == full.query {
                continue;
            }
            dispatched += 1;
            debug!(query = %attempt.query, specificity = %attempt.specificity, "trying fallback");
            if let Some(result) = self.client.geocode(&attempt.query, self.result_limit).await {
                info!(
                    query = %attempt.query,
                    specificity = %attempt.specificity,
                    attempts = dispatched,
                    "resolved partial address"
                );
                return Ok(ResolutionOutcome::found(result, &attempt, dispatched));
            }
        }

        info!(query = %full.query, attempts = dispatched, "address not found");
        Ok(ResolutionOutcome::not_found(dispatched))
    }
}
