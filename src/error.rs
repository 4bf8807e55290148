//! Error types and handling for mappicker-rs.

use std::time::Duration;

/// Result type alias for mappicker operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for address resolution and picker operations.
///
/// Most of these never reach the picker's caller: the throttled geocode
/// client downgrades provider failures to "no match at this level".
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration could not be built or parsed
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message
        message: String,
    },

    /// Transport-level failure talking to the geocoding provider
    #[cfg(feature = "nominatim")]
    #[error("Network error: {message}")]
    Network {
        /// Error message
        message: String,
    },

    /// The provider answered with a non-success status
    #[error("Geocoding provider returned status {status}")]
    HttpStatus {
        /// HTTP status code
        status: u16,
    },

    /// The provider payload could not be interpreted
    #[error("Malformed geocoding response: {message}")]
    MalformedResponse {
        /// Error message
        message: String,
    },

    /// A single geocode attempt exceeded its time budget
    #[error("Geocode attempt timed out after {timeout:?}")]
    Timeout {
        /// The budget that was exceeded
        timeout: Duration,
    },

    /// Another search is still resolving on the same resolver
    #[error("A search is already in progress")]
    SearchInProgress,
}

impl Error {
    /// Create a new configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a new network error
    #[cfg(feature = "nominatim")]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a new HTTP status error
    pub fn http_status(status: u16) -> Self {
        Self::HttpStatus { status }
    }

    /// Create a new malformed response error
    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout(timeout: Duration) -> Self {
        Self::Timeout { timeout }
    }

    /// Whether this error only means "nothing usable at this specificity".
    ///
    /// The geocode client logs soft errors as warnings and the resolver moves
    /// on to the next, coarser attempt. Anything else points at the setup
    /// rather than the query and is logged as an error.
    pub fn is_soft(&self) -> bool {
        !matches!(self, Self::Configuration { .. } | Self::SearchInProgress)
    }
}
