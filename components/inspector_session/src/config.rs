//! Configuration for the inspector session

use request_tracker::reducer::DEFAULT_MAX_RESPONSE_BODY_SIZE;
use request_tracker::ReducerConfig;
use serde::{Deserialize, Serialize};

/// Default interval between watchdog checks
pub const DEFAULT_WATCHDOG_INTERVAL_MS: u64 = 5_000;

/// Default capacity of the update broadcast channel
pub const DEFAULT_UPDATE_CHANNEL_CAPACITY: usize = 256;

/// Configuration for a [`crate::NetworkInspector`]
///
/// Built with [`InspectorConfig::builder`]; unset options keep their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectorConfig {
    /// Clear recorded requests when the top-level frame navigates
    clear_on_navigation: bool,

    /// URL prefixes whose requests are never recorded
    ignored_url_prefixes: Vec<String>,

    /// Response bodies longer than this are truncated
    max_response_body_size: usize,

    /// Fetch the response body of every finished request
    fetch_response_bodies: bool,

    /// Whether recording is on when the session starts
    start_recording: bool,

    /// Watchdog period; `None` disables the watchdog
    watchdog_interval_ms: Option<u64>,

    update_channel_capacity: usize,
}

impl InspectorConfig {
    /// Create a new builder
    ///
    /// # Example
    ///
    /// ```
    /// use inspector_session::InspectorConfig;
    ///
    /// let config = InspectorConfig::builder()
    ///     .clear_on_navigation(false)
    ///     .ignore_extension("abcdefgh")
    ///     .build();
    ///
    /// assert!(!config.clear_on_navigation());
    /// ```
    pub fn builder() -> InspectorConfigBuilder {
        InspectorConfigBuilder::default()
    }

    pub fn clear_on_navigation(&self) -> bool {
        self.clear_on_navigation
    }

    pub fn ignored_url_prefixes(&self) -> &[String] {
        &self.ignored_url_prefixes
    }

    pub fn max_response_body_size(&self) -> usize {
        self.max_response_body_size
    }

    pub fn fetch_response_bodies(&self) -> bool {
        self.fetch_response_bodies
    }

    pub fn start_recording(&self) -> bool {
        self.start_recording
    }

    pub fn watchdog_interval_ms(&self) -> Option<u64> {
        self.watchdog_interval_ms
    }

    pub fn update_channel_capacity(&self) -> usize {
        self.update_channel_capacity
    }

    /// Reducer policy derived from this configuration
    pub fn reducer_config(&self) -> ReducerConfig {
        let mut config = ReducerConfig::default()
            .with_clear_on_navigation(self.clear_on_navigation)
            .with_max_response_body_size(self.max_response_body_size);
        for prefix in &self.ignored_url_prefixes {
            config = config.with_ignored_url_prefix(prefix.clone());
        }
        config
    }
}

impl Default for InspectorConfig {
    /// Default values:
    /// - clear_on_navigation: true
    /// - max_response_body_size: 10 MB
    /// - fetch_response_bodies: true
    /// - start_recording: true
    /// - watchdog_interval_ms: 5000
    fn default() -> Self {
        Self {
            clear_on_navigation: true,
            ignored_url_prefixes: Vec::new(),
            max_response_body_size: DEFAULT_MAX_RESPONSE_BODY_SIZE,
            fetch_response_bodies: true,
            start_recording: true,
            watchdog_interval_ms: Some(DEFAULT_WATCHDOG_INTERVAL_MS),
            update_channel_capacity: DEFAULT_UPDATE_CHANNEL_CAPACITY,
        }
    }
}

/// Builder for [`InspectorConfig`]
#[derive(Debug, Clone, Default)]
pub struct InspectorConfigBuilder {
    clear_on_navigation: Option<bool>,
    ignored_url_prefixes: Vec<String>,
    max_response_body_size: Option<usize>,
    fetch_response_bodies: Option<bool>,
    start_recording: Option<bool>,
    watchdog_interval_ms: Option<Option<u64>>,
    update_channel_capacity: Option<usize>,
}

impl InspectorConfigBuilder {
    pub fn clear_on_navigation(mut self, clear: bool) -> Self {
        self.clear_on_navigation = Some(clear);
        self
    }

    /// Never record requests whose URL starts with `prefix`
    pub fn ignored_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.ignored_url_prefixes.push(prefix.into());
        self
    }

    /// Never record the inspector extension's own requests
    pub fn ignore_extension(self, extension_id: &str) -> Self {
        self.ignored_url_prefix(format!("chrome-extension://{}", extension_id))
    }

    pub fn max_response_body_size(mut self, size: usize) -> Self {
        self.max_response_body_size = Some(size);
        self
    }

    pub fn fetch_response_bodies(mut self, enabled: bool) -> Self {
        self.fetch_response_bodies = Some(enabled);
        self
    }

    pub fn start_recording(mut self, recording: bool) -> Self {
        self.start_recording = Some(recording);
        self
    }

    /// Watchdog period in milliseconds
    pub fn watchdog_interval_ms(mut self, interval_ms: u64) -> Self {
        self.watchdog_interval_ms = Some(Some(interval_ms));
        self
    }

    pub fn disable_watchdog(mut self) -> Self {
        self.watchdog_interval_ms = Some(None);
        self
    }

    pub fn update_channel_capacity(mut self, capacity: usize) -> Self {
        self.update_channel_capacity = Some(capacity);
        self
    }

    /// Build the config, using defaults for anything not set
    pub fn build(self) -> InspectorConfig {
        let default = InspectorConfig::default();

        InspectorConfig {
            clear_on_navigation: self
                .clear_on_navigation
                .unwrap_or(default.clear_on_navigation),
            ignored_url_prefixes: self.ignored_url_prefixes,
            max_response_body_size: self
                .max_response_body_size
                .unwrap_or(default.max_response_body_size),
            fetch_response_bodies: self
                .fetch_response_bodies
                .unwrap_or(default.fetch_response_bodies),
            start_recording: self.start_recording.unwrap_or(default.start_recording),
            watchdog_interval_ms: self
                .watchdog_interval_ms
                .unwrap_or(default.watchdog_interval_ms)
                .filter(|ms| *ms > 0),
            update_channel_capacity: self
                .update_channel_capacity
                .unwrap_or(default.update_channel_capacity)
                .max(1),
        }
    }
}
