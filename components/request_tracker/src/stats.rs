//! Aggregate statistics over the store

use crate::record::LogicalRequest;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Page lifecycle timing, measured from the start of the current session
///
/// The anchor resets with the store, so a navigation that clears records starts a new page.
#[derive(Debug, Clone)]
pub struct SessionTiming {
    started: Instant,
    dom_content_loaded: Option<Duration>,
    load: Option<Duration>,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionTiming {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            dom_content_loaded: None,
            load: None,
        }
    }

    /// Restart the page clock and forget both marks
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn mark_dom_content_loaded(&mut self) -> Duration {
        let elapsed = self.started.elapsed();
        self.dom_content_loaded = Some(elapsed);
        elapsed
    }

    pub fn mark_load(&mut self) -> Duration {
        let elapsed = self.started.elapsed();
        self.load = Some(elapsed);
        elapsed
    }

    pub fn dom_content_loaded(&self) -> Option<Duration> {
        self.dom_content_loaded
    }

    pub fn load(&self) -> Option<Duration> {
        self.load
    }
}

/// Summary shown in the inspector footer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatistics {
    pub requests: usize,
    /// Bytes over the wire for finished requests
    pub transferred: u64,
    /// Bytes of every request with a known size
    pub resources: u64,
    /// Milliseconds from the earliest request start to the latest finished response
    pub finish_time_ms: Option<f64>,
    pub dom_content_loaded_ms: Option<f64>,
    pub load_ms: Option<f64>,
}

impl NetworkStatistics {
    /// Compute statistics over `records`
    pub fn compute<'a, I>(records: I, timing: &SessionTiming) -> Self
    where
        I: IntoIterator<Item = &'a LogicalRequest>,
    {
        let mut stats = NetworkStatistics {
            dom_content_loaded_ms: timing.dom_content_loaded().map(millis),
            load_ms: timing.load().map(millis),
            ..Default::default()
        };

        let mut earliest_start: Option<f64> = None;
        let mut latest_response: Option<f64> = None;

        for record in records {
            stats.requests += 1;
            let size = record.size_bytes.unwrap_or(0);
            stats.resources += size;

            if let Some(ts) = record.timestamp {
                earliest_start = Some(earliest_start.map_or(ts, |min| min.min(ts)));
            }
            if record.finished {
                stats.transferred += size;
                if let Some(ts) = record.response_timestamp {
                    latest_response = Some(latest_response.map_or(ts, |max| max.max(ts)));
                }
            }
        }

        if let (Some(start), Some(end)) = (earliest_start, latest_response) {
            stats.finish_time_ms = Some(((end - start) * 1000.0).max(0.0));
        }
        stats
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
