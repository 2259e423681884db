// CDP protocol types, events, and error definitions
//
// This module is part of the network inspector workspace. Only the subset of the
// protocol that the inspector consumes (Network and Page events) is modelled here.

pub mod domains;
pub mod errors;

// Re-export commonly used types
pub use domains::network::{Headers, RequestId};
pub use errors::{CdpError, PayloadError};

use serde::{Deserialize, Serialize};

/// CDP Event message
/// Represents an unsolicited event emitted by the browser for an attached target
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CdpEvent {
    /// Event name in format "Domain.event"
    pub method: String,
    /// Event parameters
    #[serde(default)]
    pub params: serde_json::Value,
}

impl CdpEvent {
    /// Create a new event
    pub fn new(method: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Get the domain of this event ("Network" for "Network.loadingFinished")
    pub fn domain(&self) -> Option<&str> {
        self.method
            .split_once('.')
            .map(|(domain, _)| domain)
            .filter(|domain| !domain.is_empty())
    }

    /// Decode the parameters into a typed payload
    pub fn decode<T>(&self) -> Result<T, PayloadError>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_value(self.params.clone()).map_err(|source| PayloadError::Decode {
            method: self.method.clone(),
            source,
        })
    }
}
