//! Bridge configuration

use serde::{Deserialize, Serialize};

/// Default per-tab queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeConfig {
    /// Messages buffered per tab before the oldest is dropped
    pub queue_capacity: usize,
    /// Protocol domains that are forwarded; everything else is filtered out
    pub forwarded_domains: Vec<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            forwarded_domains: vec!["Network".to_string(), "Page".to_string()],
        }
    }
}

impl BridgeConfig {
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_forwarded_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.forwarded_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    /// Whether events of `domain` cross the bridge
    pub fn forwards(&self, domain: Option<&str>) -> bool {
        domain.is_some_and(|d| self.forwarded_domains.iter().any(|f| f == d))
    }
}
