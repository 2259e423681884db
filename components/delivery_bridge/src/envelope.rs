//! Messages carried by the bridge

use cdp_types::CdpEvent;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Browser tab identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TabId(pub i64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TabId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A protocol event tagged with the tab it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub tab_id: TabId,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl Envelope {
    pub fn new(tab_id: impl Into<TabId>, method: impl Into<String>, params: Value) -> Self {
        Self {
            tab_id: tab_id.into(),
            method: method.into(),
            params,
        }
    }

    /// Protocol domain, e.g. `Network`
    pub fn domain(&self) -> Option<&str> {
        self.method
            .split_once('.')
            .map(|(domain, _)| domain)
            .filter(|domain| !domain.is_empty())
    }

    /// Strip the tab tag
    pub fn into_event(self) -> CdpEvent {
        CdpEvent::new(self.method, self.params)
    }
}
