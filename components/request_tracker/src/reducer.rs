//! Event reducer
//!
//! Folds decoded events into the [`RequestStore`]. Every event, valid or not, yields a
//! [`Transition`]; nothing here returns an error or panics on bad input.

use crate::diagnostics::Diagnostics;
use crate::events::{EventKind, NetworkEvent};
use crate::filter::FilterSpec;
use crate::record::{LogicalRequest, RequestPatch, RequestStatus, ResponseBody};
use crate::resolver::{resolve_initiated, Resolution};
use crate::stats::{NetworkStatistics, SessionTiming};
use crate::store::RequestStore;
use cdp_types::domains::network::{
    LoadingFailed, LoadingFinished, RequestWillBeSent, ResponseReceived, ResponseReceivedExtraInfo,
};
use cdp_types::domains::page::FrameNavigated;
use cdp_types::{CdpEvent, PayloadError, RequestId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Default maximum response body size (10MB)
pub const DEFAULT_MAX_RESPONSE_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Reducer policy knobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReducerConfig {
    /// Clear the store when the top-level frame navigates
    pub clear_on_navigation: bool,
    /// Initiating events whose URL starts with one of these are dropped
    pub ignored_url_prefixes: Vec<String>,
    /// Bodies longer than this are truncated
    pub max_response_body_size: usize,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            clear_on_navigation: true,
            ignored_url_prefixes: Vec::new(),
            max_response_body_size: DEFAULT_MAX_RESPONSE_BODY_SIZE,
        }
    }
}

impl ReducerConfig {
    pub fn with_clear_on_navigation(mut self, clear: bool) -> Self {
        self.clear_on_navigation = clear;
        self
    }

    pub fn with_ignored_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.ignored_url_prefixes.push(prefix.into());
        self
    }

    pub fn with_max_response_body_size(mut self, size: usize) -> Self {
        self.max_response_body_size = size;
        self
    }

    fn is_ignored(&self, url: &str) -> bool {
        self.ignored_url_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && url.starts_with(prefix.as_str()))
    }
}

/// Why an event left the store untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unchanged {
    /// Request-scoped event raced ahead of (or outlived) its record
    UnknownRequest(EventKind),
    /// Cache hit with no initiating event
    UnrepresentableCacheHit,
    ChildFrameNavigation,
    /// Main-frame navigation while clearing is disabled
    NavigationKept,
    IgnoredUrl,
    Malformed,
    UnhandledEvent,
}

/// Outcome of applying one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Created(RequestId),
    Redirected(RequestId),
    /// Fields merged into an existing record
    Merged(RequestId),
    /// Loading finished; the body should be fetched
    Finished(RequestId),
    Failed(RequestId),
    Cleared,
    TimingRecorded,
    Unchanged(Unchanged),
}

impl Transition {
    /// Whether any record was created, mutated or removed
    pub fn changes_records(&self) -> bool {
        !matches!(self, Transition::Unchanged(_) | Transition::TimingRecorded)
    }

    /// Request whose body should now be fetched
    pub fn body_fetch_target(&self) -> Option<&RequestId> {
        match self {
            Transition::Finished(id) => Some(id),
            _ => None,
        }
    }
}

/// Whether a failure text denotes a user or page cancellation
pub fn is_cancellation(error_text: &str) -> bool {
    let lower = error_text.to_ascii_lowercase();
    lower.contains("err_aborted") || lower.contains("aborted") || lower.contains("canceled")
}

/// The request lifecycle state machine
#[derive(Debug, Default)]
pub struct EventReducer {
    store: RequestStore,
    config: ReducerConfig,
    diagnostics: Diagnostics,
    timing: SessionTiming,
}

impl EventReducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ReducerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Apply a raw `(method, params)` pair
    pub fn apply_raw(&mut self, method: &str, params: Value) -> Transition {
        let parsed = NetworkEvent::parse(method, params);
        self.apply_parsed(method, parsed)
    }

    /// Apply a protocol event envelope
    pub fn apply_cdp(&mut self, event: CdpEvent) -> Transition {
        let method = event.method.clone();
        let parsed = NetworkEvent::from_cdp(event);
        self.apply_parsed(&method, parsed)
    }

    fn apply_parsed(
        &mut self,
        method: &str,
        parsed: Result<Option<NetworkEvent>, PayloadError>,
    ) -> Transition {
        match parsed {
            Ok(Some(event)) => self.apply(event),
            Ok(None) => {
                self.diagnostics.events_received += 1;
                self.diagnostics.unhandled_events += 1;
                debug!("Ignoring unhandled event {}", method);
                Transition::Unchanged(Unchanged::UnhandledEvent)
            }
            Err(e) => {
                self.diagnostics.events_received += 1;
                self.diagnostics.malformed_events += 1;
                warn!("Dropping malformed event: {}", e);
                Transition::Unchanged(Unchanged::Malformed)
            }
        }
    }

    /// Apply a decoded event
    pub fn apply(&mut self, event: NetworkEvent) -> Transition {
        self.diagnostics.events_received += 1;

        match event {
            NetworkEvent::RequestInitiated(e) => self.on_request_initiated(e),
            NetworkEvent::ResponseReceived(e) => self.on_response_received(e),
            NetworkEvent::LoadingFinished(e) => self.on_loading_finished(e),
            NetworkEvent::LoadingFailed(e) => self.on_loading_failed(e),
            NetworkEvent::RequestExtraInfo(e) => self.merge_or_orphan(
                &e.request_id,
                EventKind::RequestExtraInfo,
                RequestPatch {
                    request_headers: Some(e.headers),
                    ..Default::default()
                },
            ),
            NetworkEvent::ResponseExtraInfo(e) => self.on_response_extra_info(e),
            NetworkEvent::ServedFromCache(e) => {
                let patch = RequestPatch {
                    served_from_cache: Some(true),
                    ..Default::default()
                };
                if self.store.merge(&e.request_id, patch) {
                    Transition::Merged(e.request_id)
                } else {
                    self.diagnostics.cached_without_request += 1;
                    debug!(
                        "Cache hit for {} has no initiating event, dropping",
                        e.request_id
                    );
                    Transition::Unchanged(Unchanged::UnrepresentableCacheHit)
                }
            }
            NetworkEvent::FrameNavigated(e) => self.on_frame_navigated(e),
            NetworkEvent::DomContentLoaded(_) => {
                let elapsed = self.timing.mark_dom_content_loaded();
                debug!("DOMContentLoaded after {:?}", elapsed);
                Transition::TimingRecorded
            }
            NetworkEvent::LoadFired(_) => {
                let elapsed = self.timing.mark_load();
                debug!("Load fired after {:?}", elapsed);
                Transition::TimingRecorded
            }
        }
    }

    fn on_request_initiated(&mut self, event: RequestWillBeSent) -> Transition {
        match event.request.url.as_deref() {
            Some(url) if self.config.is_ignored(url) => {
                self.diagnostics.ignored_urls += 1;
                debug!("Ignoring request {} to {}", event.request_id, url);
                return Transition::Unchanged(Unchanged::IgnoredUrl);
            }
            Some(_) => {}
            None => self.diagnostics.missing_urls += 1,
        }

        match resolve_initiated(&mut self.store, event) {
            Resolution::Created(id) => {
                self.diagnostics.requests_created += 1;
                Transition::Created(id)
            }
            Resolution::Redirected { id, .. } => {
                self.diagnostics.redirects += 1;
                Transition::Redirected(id)
            }
            Resolution::Duplicate(id) => {
                self.diagnostics.record_duplicate(&id);
                Transition::Merged(id)
            }
        }
    }

    fn on_response_received(&mut self, event: ResponseReceived) -> Transition {
        let response = event.response;
        let status = match response.status {
            Some(code) => RequestStatus::Code(code),
            None => RequestStatus::Pending,
        };
        let patch = RequestPatch {
            status: Some(status),
            status_text: response.status_text,
            response_headers: Some(response.headers),
            mime_type: response.mime_type,
            resource_type: event.resource_type,
            response_timestamp: event.timestamp,
            served_from_cache: response.from_disk_cache.filter(|cached| *cached),
            ..Default::default()
        };
        self.merge_or_orphan(&event.request_id, EventKind::ResponseReceived, patch)
    }

    fn on_response_extra_info(&mut self, event: ResponseReceivedExtraInfo) -> Transition {
        // The code only fills a record without one; a late redirect hop must not replace it
        let status = event
            .status_code
            .filter(|_| {
                self.store
                    .get(&event.request_id)
                    .is_some_and(|record| record.status.code().is_none())
            })
            .map(RequestStatus::Code);
        let patch = RequestPatch {
            response_headers: Some(event.headers),
            status,
            ..Default::default()
        };
        self.merge_or_orphan(&event.request_id, EventKind::ResponseExtraInfo, patch)
    }

    fn on_loading_finished(&mut self, event: LoadingFinished) -> Transition {
        let id = event.request_id;
        let size = event
            .encoded_data_length
            .filter(|len| len.is_finite() && *len >= 0.0)
            .map(|len| len as u64);

        let Some(failed) = self.store.get(&id).map(|record| record.failed) else {
            return self.orphan(&id, EventKind::LoadingFinished);
        };

        let patch = RequestPatch {
            size_bytes: size,
            finished: (!failed).then_some(true),
            ..Default::default()
        };
        self.store.merge(&id, patch);

        if failed {
            debug!("Request {} finished after failing, keeping failure", id);
            Transition::Merged(id)
        } else {
            Transition::Finished(id)
        }
    }

    fn on_loading_failed(&mut self, event: LoadingFailed) -> Transition {
        let id = event.request_id;
        let error_text = event.error_text.unwrap_or_default();
        let canceled = event.canceled.unwrap_or(false) || is_cancellation(&error_text);
        let status = if canceled {
            RequestStatus::Canceled
        } else {
            RequestStatus::Failed
        };

        let patch = RequestPatch {
            failed: Some(true),
            canceled: Some(canceled),
            status: Some(status),
            error_text: (!error_text.is_empty()).then_some(error_text),
            ..Default::default()
        };
        if self.store.merge(&id, patch) {
            Transition::Failed(id)
        } else {
            self.orphan(&id, EventKind::LoadingFailed)
        }
    }

    fn on_frame_navigated(&mut self, event: FrameNavigated) -> Transition {
        let frame = event.frame;
        if !frame.is_main_frame() {
            debug!("Child frame {} navigated, keeping requests", frame.id);
            return Transition::Unchanged(Unchanged::ChildFrameNavigation);
        }
        if !self.config.clear_on_navigation {
            return Transition::Unchanged(Unchanged::NavigationKept);
        }

        info!(
            "Main frame navigated to {}, clearing {} requests",
            frame.url.as_deref().unwrap_or_default(),
            self.store.len()
        );
        self.clear();
        Transition::Cleared
    }

    fn merge_or_orphan(
        &mut self,
        id: &RequestId,
        kind: EventKind,
        patch: RequestPatch,
    ) -> Transition {
        if self.store.merge(id, patch) {
            Transition::Merged(id.clone())
        } else {
            self.orphan(id, kind)
        }
    }

    fn orphan(&mut self, id: &RequestId, kind: EventKind) -> Transition {
        self.diagnostics.orphan_events += 1;
        debug!("{} for unknown request {}", kind, id);
        Transition::Unchanged(Unchanged::UnknownRequest(kind))
    }

    /// Drop every record and restart session timing
    pub fn clear(&mut self) {
        self.store.clear();
        self.diagnostics.forget_records();
        self.timing.reset();
    }

    /// Mark every pending record as canceled, returning how many were flipped
    pub fn cancel_pending(&mut self) -> usize {
        let pending: Vec<RequestId> = self
            .store
            .list_all()
            .filter(|record| record.is_pending())
            .map(|record| record.id.clone())
            .collect();

        for id in &pending {
            self.store.merge(
                id,
                RequestPatch {
                    failed: Some(true),
                    canceled: Some(true),
                    status: Some(RequestStatus::Canceled),
                    ..Default::default()
                },
            );
        }
        if !pending.is_empty() {
            info!("Canceled {} pending requests", pending.len());
        }
        pending.len()
    }

    /// Attach a fetched body to its record
    ///
    /// Returns false when the record no longer exists.
    pub fn store_response_body(&mut self, id: &RequestId, mut body: ResponseBody) -> bool {
        let max = self.config.max_response_body_size;
        if body.body.len() > max {
            warn!(
                "Response body for {} is {} bytes, truncating to {}",
                id,
                body.body.len(),
                max
            );
            body.truncate(max);
        }

        let stored = self.store.merge(
            id,
            RequestPatch {
                response_body: Some(body),
                ..Default::default()
            },
        );
        if !stored {
            self.diagnostics.late_bodies += 1;
            debug!("Discarding body for cleared request {}", id);
        }
        stored
    }

    /// Count a failed body fetch
    pub fn record_body_fetch_failure(&mut self) {
        self.diagnostics.body_fetch_failures += 1;
    }

    pub fn get(&self, id: &RequestId) -> Option<&LogicalRequest> {
        self.store.get(id)
    }

    /// Filtered snapshot in insertion order
    pub fn query(&self, filter: &FilterSpec) -> Vec<LogicalRequest> {
        filter.apply(self.store.list_all())
    }

    pub fn store(&self) -> &RequestStore {
        &self.store
    }

    pub fn statistics(&self) -> NetworkStatistics {
        NetworkStatistics::compute(self.store.list_all(), &self.timing)
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn config(&self) -> &ReducerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn initiated(reducer: &mut EventReducer, id: &str, url: &str) -> Transition {
        reducer.apply_raw(
            "Network.requestWillBeSent",
            json!({"requestId": id, "request": {"url": url, "method": "GET"}, "type": "Fetch"}),
        )
    }

    #[test]
    fn test_cancellation_markers() {
        assert!(is_cancellation("net::ERR_ABORTED"));
        assert!(is_cancellation("Request Canceled"));
        assert!(is_cancellation("aborted by user"));
        assert!(!is_cancellation("net::ERR_CONNECTION_REFUSED"));
    }

    #[test]
    fn test_extra_info_status_fills_missing_code_only() {
        let mut reducer = EventReducer::new();
        reducer.apply_raw(
            "Network.requestWillBeSent",
            json!({"requestId": "1", "request": {"url": "https://a/"}}),
        );
        reducer.apply_raw(
            "Network.responseReceivedExtraInfo",
            json!({"requestId": "1", "headers": {}, "statusCode": 301}),
        );
        assert_eq!(reducer.get(&RequestId::from("1")).unwrap().status, RequestStatus::Code(301));

        reducer.apply_raw(
            "Network.responseReceived",
            json!({"requestId": "1", "response": {"status": 200}}),
        );
        reducer.apply_raw(
            "Network.responseReceivedExtraInfo",
            json!({"requestId": "1", "headers": {}, "statusCode": 302}),
        );
        assert_eq!(reducer.get(&RequestId::from("1")).unwrap().status, RequestStatus::Code(200));
    }

    #[test]
    fn test_protocol_envelope_is_applied() {
        let mut reducer = EventReducer::new();
        let transition = reducer.apply_cdp(CdpEvent::new(
            "Network.requestWillBeSent",
            json!({"requestId": "1", "request": {"url": "https://a/"}}),
        ));
        assert_eq!(transition, Transition::Created(RequestId::from("1")));
        assert_eq!(
            reducer.apply_cdp(CdpEvent::new("Network.loadingFinished", json!({}))),
            Transition::Unchanged(Unchanged::Malformed)
        );
    }

    #[test]
    fn test_unknown_method_is_ignored() {
        let mut reducer = EventReducer::new();
        let t = reducer.apply_raw("Network.dataReceived", json!({"requestId": "1"}));
        assert_eq!(t, Transition::Unchanged(Unchanged::UnhandledEvent));
        assert_eq!(reducer.diagnostics().unhandled_events, 1);
    }

    #[test]
    fn test_malformed_event_is_counted() {
        let mut reducer = EventReducer::new();
        let t = reducer.apply_raw("Network.loadingFinished", json!({"encodedDataLength": 1}));
        assert_eq!(t, Transition::Unchanged(Unchanged::Malformed));
        let t = reducer.apply_raw("Network.loadingFinished", json!({"requestId": ""}));
        assert_eq!(t, Transition::Unchanged(Unchanged::Malformed));
        assert_eq!(reducer.diagnostics().malformed_events, 2);
        assert!(reducer.store().is_empty());
    }

    #[test]
    fn test_finished_requests_body_fetch() {
        let mut reducer = EventReducer::new();
        initiated(&mut reducer, "1", "https://a/x");
        let t = reducer.apply_raw(
            "Network.loadingFinished",
            json!({"requestId": "1", "encodedDataLength": 512.0}),
        );
        assert_eq!(t.body_fetch_target(), Some(&RequestId::from("1")));
        assert_eq!(reducer.get(&RequestId::from("1")).unwrap().size_bytes, Some(512));
    }

    #[test]
    fn test_failed_record_ignores_finish() {
        let mut reducer = EventReducer::new();
        initiated(&mut reducer, "1", "https://a/x");
        reducer.apply_raw(
            "Network.loadingFailed",
            json!({"requestId": "1", "errorText": "net::ERR_FAILED"}),
        );
        let t = reducer.apply_raw(
            "Network.loadingFinished",
            json!({"requestId": "1", "encodedDataLength": 10}),
        );

        assert_eq!(t.body_fetch_target(), None);
        let record = reducer.get(&RequestId::from("1")).unwrap();
        assert!(record.failed);
        assert!(!record.finished);
        assert_eq!(record.status, RequestStatus::Failed);
        assert_eq!(record.size_bytes, Some(10));
    }

    #[test]
    fn test_canceled_flag_from_payload() {
        let mut reducer = EventReducer::new();
        initiated(&mut reducer, "1", "https://a/x");
        reducer.apply_raw(
            "Network.loadingFailed",
            json!({"requestId": "1", "errorText": "", "canceled": true}),
        );
        let record = reducer.get(&RequestId::from("1")).unwrap();
        assert!(record.canceled && record.failed);
        assert_eq!(record.status, RequestStatus::Canceled);
        assert_eq!(record.status.to_string(), "(canceled)");
    }

    #[test]
    fn test_response_keeps_initiator_type() {
        let mut reducer = EventReducer::new();
        initiated(&mut reducer, "1", "https://a/x");
        reducer.apply_raw(
            "Network.responseReceived",
            json!({
                "requestId": "1",
                "type": "XHR",
                "timestamp": 2.0,
                "response": {"url": "https://a/x", "status": 201, "statusText": "Created",
                             "headers": {"Content-Type": "application/json"},
                             "mimeType": "application/json"}
            }),
        );
        let record = reducer.get(&RequestId::from("1")).unwrap();
        assert_eq!(record.resource_type.as_deref(), Some("Fetch"));
        assert_eq!(record.status, RequestStatus::Code(201));
        assert_eq!(record.status_text.as_deref(), Some("Created"));
        assert_eq!(record.response_header("content-type"), Some("application/json"));
        assert_eq!(record.response_timestamp, Some(2.0));
    }

    #[test]
    fn test_ignored_url_prefix() {
        let config = ReducerConfig::default().with_ignored_url_prefix("chrome-extension://abc");
        let mut reducer = EventReducer::with_config(config);
        let t = initiated(&mut reducer, "1", "chrome-extension://abc/panel.html");
        assert_eq!(t, Transition::Unchanged(Unchanged::IgnoredUrl));
        assert!(reducer.store().is_empty());
        assert_eq!(reducer.diagnostics().ignored_urls, 1);
    }

    #[test]
    fn test_navigation_without_clearing() {
        let config = ReducerConfig::default().with_clear_on_navigation(false);
        let mut reducer = EventReducer::with_config(config);
        initiated(&mut reducer, "1", "https://a/x");
        let t = reducer.apply_raw(
            "Page.frameNavigated",
            json!({"frame": {"id": "main", "url": "https://a/"}}),
        );
        assert_eq!(t, Transition::Unchanged(Unchanged::NavigationKept));
        assert_eq!(reducer.store().len(), 1);
    }

    #[test]
    fn test_cancel_pending() {
        let mut reducer = EventReducer::new();
        initiated(&mut reducer, "1", "https://a/1");
        initiated(&mut reducer, "2", "https://a/2");
        initiated(&mut reducer, "3", "https://a/3");
        reducer.apply_raw("Network.loadingFinished", json!({"requestId": "2"}));
        reducer.apply_raw(
            "Network.loadingFailed",
            json!({"requestId": "3", "errorText": "net::ERR_FAILED"}),
        );

        assert_eq!(reducer.cancel_pending(), 1);
        let record = reducer.get(&RequestId::from("1")).unwrap();
        assert!(record.canceled && record.failed);
        assert_eq!(reducer.get(&RequestId::from("3")).unwrap().status, RequestStatus::Failed);
        assert_eq!(reducer.cancel_pending(), 0);
    }

    #[test]
    fn test_store_response_body_truncates() {
        let config = ReducerConfig::default().with_max_response_body_size(4);
        let mut reducer = EventReducer::with_config(config);
        initiated(&mut reducer, "1", "https://a/x");

        let id = RequestId::from("1");
        assert!(reducer.store_response_body(&id, ResponseBody::new("abcdef", false)));
        let body = reducer.get(&id).unwrap().response_body.clone().unwrap();
        assert_eq!(body.body, "abcd");
        assert!(body.is_truncated());

        let gone = RequestId::from("9");
        assert!(!reducer.store_response_body(&gone, ResponseBody::new("x", false)));
        assert_eq!(reducer.diagnostics().late_bodies, 1);
    }

    #[test]
    fn test_timing_and_statistics() {
        let mut reducer = EventReducer::new();
        assert_eq!(
            reducer.apply_raw("Page.domContentEventFired", json!({"timestamp": 1.0})),
            Transition::TimingRecorded
        );
        reducer.apply_raw("Page.loadEventFired", Value::Null);

        let stats = reducer.statistics();
        assert!(stats.dom_content_loaded_ms.is_some());
        assert!(stats.load_ms.is_some());

        reducer.clear();
        assert!(reducer.statistics().load_ms.is_none());
    }
}
