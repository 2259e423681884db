//! Error types for request tracking

use cdp_types::{CdpError, PayloadError, RequestId};
use thiserror::Error;

/// Result type for tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Errors raised while tracking requests or fetching their bodies
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Protocol-level failure returned by the browser
    #[error("Protocol error: {0}")]
    Protocol(#[from] CdpError),

    /// Event params that do not decode into the expected shape
    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error("Request not found: {0}")]
    RequestNotFound(RequestId),

    /// The browser no longer holds a body for the request
    #[error("No response body available for request {0}")]
    BodyUnavailable(RequestId),

    #[error("Invalid base64 body: {0}")]
    InvalidBodyEncoding(#[from] base64::DecodeError),

    #[error("Unknown resource type filter: {0}")]
    UnknownTypeFilter(String),
}
