//! Error types for the inspector session

use delivery_bridge::{BridgeError, TabId};
use request_tracker::{RequestId, TrackerError};
use thiserror::Error;

/// Errors that can occur in inspector session operations
#[derive(Error, Debug)]
pub enum InspectorError {
    #[error("Inspector is already attached to tab {0}")]
    AlreadyAttached(TabId),

    #[error("Inspector is not attached")]
    NotAttached,

    #[error("Request not found: {0}")]
    RequestNotFound(RequestId),

    /// Bodies were requested but no fetcher was configured
    #[error("No body fetcher configured")]
    NoBodyFetcher,

    #[error("Tracker error: {0}")]
    Tracker(#[from] TrackerError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// Other errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type for inspector operations
pub type Result<T> = std::result::Result<T, InspectorError>;
