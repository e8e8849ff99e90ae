//! Error types for Mockwire

use std::io;
use thiserror::Error;

/// Result type for Mockwire operations
pub type Result<T> = std::result::Result<T, MockwireError>;

/// Errors that can occur in Mockwire
#[derive(Debug, Error)]
pub enum MockwireError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Outbound call reached the guard with a destination that is not wired up
    #[error("A request was made to \"{url}\" which is not a mocked upstream service")]
    UnmockedRequest {
        /// Requested URL
        url: String,
    },

    /// Replay routing found no stand-in server for the destination
    #[error("A mocked server for \"{url}\" cannot be found")]
    MockedServerNotFound {
        /// Requested URL
        url: String,
    },

    /// A recorded exchange could not be attributed to a registered service
    #[error("'{url}' doesn't match with an existing mocked server")]
    UnknownService {
        /// Requested URL
        url: String,
    },

    /// Response body could not be captured as JSON
    #[error("Response body is not valid JSON: {0}")]
    NonJsonBody(#[source] serde_json::Error),

    /// Mapping document could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Underlying HTTP call failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// Request/response body too large to buffer
    #[error("Data too large: {size} bytes exceeds limit of {limit} bytes")]
    DataTooLarge {
        /// Actual size
        size: usize,
        /// Size limit
        limit: usize,
    },

    /// URL could not be parsed into an origin
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// Offending URL
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid scenario name
    #[error("Invalid scenario name: {0}")]
    InvalidScenarioName(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl MockwireError {
    /// True for failures that signal a dependency the test has not wired up.
    ///
    /// These are never transient; retrying cannot make them succeed.
    #[must_use]
    pub fn is_wiring_gap(&self) -> bool {
        matches!(
            self,
            Self::UnmockedRequest { .. }
                | Self::MockedServerNotFound { .. }
                | Self::UnknownService { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wiring_gap_classification() {
        let unmocked = MockwireError::UnmockedRequest {
            url: "https://evil.example.com/".to_string(),
        };
        assert!(unmocked.is_wiring_gap());
        assert!(unmocked.to_string().contains("not a mocked upstream service"));

        let io = MockwireError::Io(io::Error::new(io::ErrorKind::PermissionDenied, "nope"));
        assert!(!io.is_wiring_gap());
    }
}
