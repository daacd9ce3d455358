//! Error types for heximage-core
//!
//! Every failure the live update hub can report, with a stable code for
//! protocol and HTTP error bodies.

use thiserror::Error;

/// Canvas error type
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed numeric field or malformed draw message
    #[error("parse error: {0}")]
    Parse(String),

    /// Coordinate outside the canvas
    #[error("pixel ({x}, {y}) is outside the {width}x{height} canvas")]
    OutOfBounds {
        /// Requested column (1-indexed)
        x: u32,
        /// Requested row (1-indexed)
        y: u32,
        /// Canvas width
        width: u32,
        /// Canvas height
        height: u32,
    },

    /// The backing store call failed
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The change-feed subscription ended or reported an error
    #[error("subscription terminated: {0}")]
    SubscriptionTerminated(String),

    /// Change message could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid canvas or hub configuration
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl Error {
    /// Create a parse error
    #[must_use]
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a store error
    #[must_use]
    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    /// Create a subscription error
    #[must_use]
    pub fn terminated(msg: impl Into<String>) -> Self {
        Self::SubscriptionTerminated(msg.into())
    }

    /// Whether the caller can retry or skip the operation and carry on.
    ///
    /// A terminated subscription is the only fatal kind: the feed reader stops.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::SubscriptionTerminated(_) | Self::Configuration(_))
    }

    /// Whether the error was caused by the client's input
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::OutOfBounds { .. })
    }

    /// Get error code for protocol messages
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Parse(_) => "parse_error",
            Self::OutOfBounds { .. } => "out_of_bounds",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::SubscriptionTerminated(_) => "subscription_terminated",
            Self::Serialization(_) => "serialization_error",
            Self::Configuration(_) => "configuration_error",
        }
    }
}

impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

/// Result type alias for canvas operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = Error::parse("x");
        assert_eq!(err.code(), "parse_error");

        let err = Error::OutOfBounds {
            x: 0,
            y: 1,
            width: 3,
            height: 3,
        };
        assert_eq!(err.code(), "out_of_bounds");
        assert_eq!(err.to_string(), "pixel (0, 1) is outside the 3x3 canvas");
    }

    #[test]
    fn test_error_is_recoverable() {
        assert!(Error::store("connection refused").is_recoverable());
        assert!(Error::parse("bad colour").is_recoverable());
        assert!(!Error::terminated("closed").is_recoverable());
    }

    #[test]
    fn test_client_errors() {
        assert!(Error::parse("bad").is_client_error());
        assert!(!Error::store("down").is_client_error());
    }

    #[test]
    fn test_from_redis_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "broken pipe");
        let redis_err = redis::RedisError::from(io_err);
        let err: Error = redis_err.into();
        assert_eq!(err.code(), "store_unavailable");
    }
}
