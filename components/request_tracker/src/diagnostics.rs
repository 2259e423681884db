//! Diagnostic counters for dropped, raced and unrepresentable events

use cdp_types::RequestId;
use serde::Serialize;
use std::collections::HashSet;

/// Counters kept by the reducer; purely informational
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    /// Every event handed to the reducer, valid or not
    pub events_received: u64,
    pub requests_created: u64,
    pub redirects: u64,
    /// Initiating events re-delivered for a known id
    pub duplicate_initiations: u64,
    /// Initiating events without a URL
    pub missing_urls: u64,
    /// Initiating events dropped by an ignored URL prefix
    pub ignored_urls: u64,
    /// Events missing their correlating id or a required field
    pub malformed_events: u64,
    /// Methods the reducer does not handle
    pub unhandled_events: u64,
    /// Request-scoped events whose record does not exist
    pub orphan_events: u64,
    /// Cache hits reported without any initiating event
    pub cached_without_request: u64,
    /// Body fetch results that arrived after their record was cleared
    pub late_bodies: u64,
    pub body_fetch_failures: u64,
    #[serde(skip)]
    duplicate_ids: HashSet<RequestId>,
}

impl Diagnostics {
    /// Record a duplicate initiating event for `id`
    pub fn record_duplicate(&mut self, id: &RequestId) {
        self.duplicate_initiations += 1;
        self.duplicate_ids.insert(id.clone());
    }

    /// Number of distinct ids that saw a duplicate initiating event since the store was last
    /// cleared
    pub fn distinct_duplicate_ids(&self) -> usize {
        self.duplicate_ids.len()
    }

    /// Drop per-record state when the store is cleared; counters keep running for the session
    pub(crate) fn forget_records(&mut self) {
        self.duplicate_ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_tracking() {
        let mut diagnostics = Diagnostics::default();
        let id = RequestId::from("1");
        diagnostics.record_duplicate(&id);
        diagnostics.record_duplicate(&id);
        diagnostics.record_duplicate(&RequestId::from("2"));

        assert_eq!(diagnostics.duplicate_initiations, 3);
        assert_eq!(diagnostics.distinct_duplicate_ids(), 2);

        diagnostics.forget_records();
        assert_eq!(diagnostics.distinct_duplicate_ids(), 0);
        assert_eq!(diagnostics.duplicate_initiations, 3);
    }
}
