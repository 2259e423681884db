//! The inspector session host

use crate::config::InspectorConfig;
use crate::error::{InspectorError, Result};
use crate::updates::InspectorUpdate;
use crate::watchdog;
use delivery_bridge::{ConnectionId, DeliveryBridge, Envelope, TabId};
use parking_lot::{Mutex, RwLock};
use request_tracker::{
    BodyFetcher, CdpEvent, Diagnostics, EventReducer, FilterSpec, LogicalRequest, NetworkStatistics,
    RequestId, RequestPayload, ResponseBody, Transition,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Counters kept by the session host, outside the reducer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCounters {
    /// Events that reached the session, accepted or not
    pub events_received: u64,
    /// Events dropped because recording was paused
    pub skipped_paused: u64,
    /// Envelopes for a tab other than the attached one
    pub skipped_other_tab: u64,
}

/// State shared with the pump, body-fetch and watchdog tasks
pub(crate) struct Shared {
    pub(crate) reducer: RwLock<EventReducer>,
    fetcher: Option<Arc<dyn BodyFetcher>>,
    fetch_bodies: bool,
    version: AtomicU64,
    updates: broadcast::Sender<InspectorUpdate>,
    selected: RwLock<Option<RequestId>>,
    recording: AtomicBool,
    tab_id: RwLock<Option<TabId>>,
    events_received: AtomicU64,
    skipped_paused: AtomicU64,
    skipped_other_tab: AtomicU64,
    fetches_in_flight: AtomicUsize,
    fetches_done: Notify,
}

impl Shared {
    pub(crate) fn counters(&self) -> SessionCounters {
        SessionCounters {
            events_received: self.events_received.load(Ordering::SeqCst),
            skipped_paused: self.skipped_paused.load(Ordering::SeqCst),
            skipped_other_tab: self.skipped_other_tab.load(Ordering::SeqCst),
        }
    }

    fn publish(&self, update: InspectorUpdate) {
        // No subscribers is fine
        let _ = self.updates.send(update);
    }

    fn bump(&self, cleared: bool) -> u64 {
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        self.publish(if cleared {
            InspectorUpdate::Cleared { version }
        } else {
            InspectorUpdate::Changed { version }
        });
        version
    }

    fn ingest_envelope(self: &Arc<Self>, envelope: Envelope) -> Option<Transition> {
        if let Some(tab_id) = *self.tab_id.read() {
            if envelope.tab_id != tab_id {
                self.events_received.fetch_add(1, Ordering::SeqCst);
                self.skipped_other_tab.fetch_add(1, Ordering::SeqCst);
                warn!(
                    "Ignoring {} from tab {}, attached to tab {}",
                    envelope.method, envelope.tab_id, tab_id
                );
                return None;
            }
        }
        self.ingest(envelope.into_event())
    }

    fn ingest(self: &Arc<Self>, event: CdpEvent) -> Option<Transition> {
        self.events_received.fetch_add(1, Ordering::SeqCst);
        if !self.recording.load(Ordering::SeqCst) {
            self.skipped_paused.fetch_add(1, Ordering::SeqCst);
            debug!("Recording paused, skipping {}", event.method);
            return None;
        }

        let transition = self.reducer.write().apply_cdp(event);
        match &transition {
            Transition::Cleared => {
                *self.selected.write() = None;
                self.bump(true);
            }
            t if t.changes_records() => {
                self.bump(false);
            }
            _ => {}
        }

        if let Some(id) = transition.body_fetch_target() {
            self.spawn_body_fetch(id.clone());
        }
        Some(transition)
    }

    fn spawn_body_fetch(self: &Arc<Self>, id: RequestId) {
        if !self.fetch_bodies {
            return;
        }
        let Some(fetcher) = self.fetcher.clone() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime, skipping body fetch for {}", id);
            return;
        };

        self.fetches_in_flight.fetch_add(1, Ordering::SeqCst);
        let shared = Arc::clone(self);
        runtime.spawn(async move {
            match fetcher.fetch_body(&id).await {
                Ok(body) => {
                    shared.accept_body(&id, body);
                }
                Err(e) => {
                    shared.reducer.write().record_body_fetch_failure();
                    debug!("Body fetch for {} failed: {}", id, e);
                }
            }
            shared.fetches_in_flight.fetch_sub(1, Ordering::SeqCst);
            shared.fetches_done.notify_waiters();
        });
    }

    /// Merge a fetched body; returns the stored body if the record still exists
    fn accept_body(&self, id: &RequestId, body: ResponseBody) -> Option<ResponseBody> {
        let stored = {
            let mut reducer = self.reducer.write();
            if !reducer.store_response_body(id, body) {
                return None;
            }
            reducer.get(id).and_then(|r| r.response_body.clone())
        };

        self.bump(false);
        if self.selected.read().as_ref() == Some(id) {
            self.publish(InspectorUpdate::SelectedRequestUpdated { id: id.clone() });
        }
        stored
    }
}

type EventReceiver = Arc<Mutex<mpsc::UnboundedReceiver<Envelope>>>;

struct Attachment {
    tab_id: TabId,
    connection: ConnectionId,
    pump: JoinHandle<()>,
    receiver: EventReceiver,
    bridge: DeliveryBridge,
}

impl Attachment {
    /// Stop the pump and give the bridge back whatever it forwarded but the pump never took
    ///
    /// The consumer is released first so nothing new lands in the channel while it drains.
    fn release(self, bridge: &DeliveryBridge) -> Result<usize> {
        self.pump.abort();
        let released = bridge.disconnect(self.tab_id, self.connection);

        let mut receiver = self.receiver.lock();
        receiver.close();
        let mut undelivered = Vec::new();
        while let Ok(envelope) = receiver.try_recv() {
            undelivered.push(envelope);
        }
        drop(receiver);

        let requeued = bridge.requeue_front(self.tab_id, undelivered);
        released?;
        Ok(requeued)
    }
}

/// A network inspector session
///
/// Owns the reducer and exposes the query surface used by a UI. Events arrive either through a
/// [`DeliveryBridge`] after [`NetworkInspector::attach`], or directly through
/// [`NetworkInspector::ingest`].
///
/// # Example
///
/// ```
/// use inspector_session::{InspectorConfig, NetworkInspector};
/// use request_tracker::FilterSpec;
/// use serde_json::json;
///
/// let inspector = NetworkInspector::new(InspectorConfig::default());
/// inspector.ingest(
///     "Network.requestWillBeSent",
///     json!({"requestId": "1", "request": {"url": "https://a/x"}}),
/// );
/// assert_eq!(inspector.query(&FilterSpec::all()).len(), 1);
/// assert_eq!(inspector.version(), 1);
/// ```
pub struct NetworkInspector {
    config: InspectorConfig,
    shared: Arc<Shared>,
    attachment: Mutex<Option<Attachment>>,
    watchdog: Mutex<Option<JoinHandle<()>>>,
}

impl NetworkInspector {
    /// Create a session without a body fetcher
    pub fn new(config: InspectorConfig) -> Self {
        Self::build(config, None)
    }

    /// Create a session that fetches response bodies with `fetcher`
    pub fn with_body_fetcher(config: InspectorConfig, fetcher: Arc<dyn BodyFetcher>) -> Self {
        Self::build(config, Some(fetcher))
    }

    fn build(config: InspectorConfig, fetcher: Option<Arc<dyn BodyFetcher>>) -> Self {
        debug!("Creating NetworkInspector with config: {:?}", config);
        let (updates, _) = broadcast::channel(config.update_channel_capacity());

        let shared = Arc::new(Shared {
            reducer: RwLock::new(EventReducer::with_config(config.reducer_config())),
            fetcher,
            fetch_bodies: config.fetch_response_bodies(),
            version: AtomicU64::new(0),
            updates,
            selected: RwLock::new(None),
            recording: AtomicBool::new(config.start_recording()),
            tab_id: RwLock::new(None),
            events_received: AtomicU64::new(0),
            skipped_paused: AtomicU64::new(0),
            skipped_other_tab: AtomicU64::new(0),
            fetches_in_flight: AtomicUsize::new(0),
            fetches_done: Notify::new(),
        });

        Self {
            config,
            shared,
            attachment: Mutex::new(None),
            watchdog: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }

    /// Complete the ready handshake for `tab_id` and start pumping its events
    ///
    /// Returns the number of backlog messages the bridge had queued. Must be called within a
    /// tokio runtime.
    pub fn attach(&self, bridge: &DeliveryBridge, tab_id: TabId) -> Result<usize> {
        let mut attachment = self.attachment.lock();
        if let Some(current) = attachment.as_ref() {
            return Err(InspectorError::AlreadyAttached(current.tab_id));
        }

        *self.shared.tab_id.write() = Some(tab_id);
        let ack = bridge.ready(tab_id);
        let queued_count = ack.queued_count;
        let receiver: EventReceiver = Arc::new(Mutex::new(ack.receiver));

        let shared = Arc::clone(&self.shared);
        let pump_receiver = Arc::clone(&receiver);
        let pump = tokio::spawn(async move {
            // The lock is only held while polling, so a detach can drain what is left
            while let Some(envelope) =
                std::future::poll_fn(|cx| pump_receiver.lock().poll_recv(cx)).await
            {
                shared.ingest_envelope(envelope);
            }
            debug!("Event stream for tab {} closed", tab_id);
        });

        *attachment = Some(Attachment {
            tab_id,
            connection: ack.connection,
            pump,
            receiver,
            bridge: bridge.clone(),
        });
        drop(attachment);

        self.start_watchdog();
        info!(
            "Inspector attached to tab {} with {} queued events",
            tab_id, queued_count
        );
        Ok(queued_count)
    }

    /// Stop pumping events and hand the tab back to the bridge's buffer
    ///
    /// Events the bridge already forwarded but the pump had not applied are requeued ahead of
    /// the tab's backlog, so the next consumer replays them. Returns how many were requeued.
    pub fn detach(&self, bridge: &DeliveryBridge) -> Result<usize> {
        let attachment = self
            .attachment
            .lock()
            .take()
            .ok_or(InspectorError::NotAttached)?;

        if let Some(watchdog) = self.watchdog.lock().take() {
            watchdog.abort();
        }
        *self.shared.tab_id.write() = None;

        let tab_id = attachment.tab_id;
        let requeued = attachment.release(bridge)?;
        info!(
            "Inspector detached from tab {}, requeued {} undelivered events",
            tab_id, requeued
        );
        Ok(requeued)
    }

    pub fn tab_id(&self) -> Option<TabId> {
        *self.shared.tab_id.read()
    }

    pub fn is_attached(&self) -> bool {
        self.attachment.lock().is_some()
    }

    /// Start the advisory watchdog if configured and not already running
    pub fn start_watchdog(&self) -> bool {
        let Some(interval_ms) = self.config.watchdog_interval_ms() else {
            return false;
        };
        let mut watchdog = self.watchdog.lock();
        if watchdog.is_some() {
            return false;
        }
        *watchdog = Some(watchdog::spawn(
            Arc::clone(&self.shared),
            Duration::from_millis(interval_ms),
        ));
        true
    }

    /// Feed one raw event
    ///
    /// Returns `None` when recording is paused.
    pub fn ingest(&self, method: &str, params: Value) -> Option<Transition> {
        self.shared.ingest(CdpEvent::new(method, params))
    }

    /// Feed one tab-tagged event, honouring tab affinity
    pub fn ingest_envelope(&self, envelope: Envelope) -> Option<Transition> {
        self.shared.ingest_envelope(envelope)
    }

    /// Filtered snapshot in insertion order
    pub fn query(&self, filter: &FilterSpec) -> Vec<LogicalRequest> {
        self.shared.reducer.read().query(filter)
    }

    pub fn get(&self, id: &RequestId) -> Option<LogicalRequest> {
        self.shared.reducer.read().get(id).cloned()
    }

    /// Drop every record
    pub fn clear(&self) {
        self.shared.reducer.write().clear();
        *self.shared.selected.write() = None;
        self.shared.bump(true);
    }

    /// Mark every pending request as canceled
    pub fn cancel_pending(&self) -> usize {
        let canceled = self.shared.reducer.write().cancel_pending();
        if canceled > 0 {
            self.shared.bump(false);
        }
        canceled
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InspectorUpdate> {
        self.shared.updates.subscribe()
    }

    /// Monotonic change counter
    pub fn version(&self) -> u64 {
        self.shared.version.load(Ordering::SeqCst)
    }

    pub fn set_recording(&self, recording: bool) {
        let previous = self.shared.recording.swap(recording, Ordering::SeqCst);
        if previous != recording {
            info!("Recording {}", if recording { "resumed" } else { "paused" });
        }
    }

    pub fn is_recording(&self) -> bool {
        self.shared.recording.load(Ordering::SeqCst)
    }

    /// Flip recording, returning the new state
    pub fn toggle_recording(&self) -> bool {
        let recording = !self.is_recording();
        self.set_recording(recording);
        recording
    }

    /// Select the request shown in detail; body arrivals for it publish
    /// [`InspectorUpdate::SelectedRequestUpdated`]
    pub fn select(&self, id: Option<RequestId>) {
        *self.shared.selected.write() = id;
    }

    pub fn selected(&self) -> Option<RequestId> {
        self.shared.selected.read().clone()
    }

    /// Response body for `id`, fetching it on demand when not yet present
    pub async fn fetch_body(&self, id: &RequestId) -> Result<ResponseBody> {
        let existing = self
            .shared
            .reducer
            .read()
            .get(id)
            .map(|record| record.response_body.clone());
        match existing {
            None => return Err(InspectorError::RequestNotFound(id.clone())),
            Some(Some(body)) => return Ok(body),
            Some(None) => {}
        }

        let fetcher = self
            .shared
            .fetcher
            .clone()
            .ok_or(InspectorError::NoBodyFetcher)?;
        let body = fetcher.fetch_body(id).await?;
        self.shared
            .accept_body(id, body)
            .ok_or_else(|| InspectorError::RequestNotFound(id.clone()))
    }

    /// Wait until every spawned body fetch has completed
    pub async fn wait_for_body_fetches(&self) {
        loop {
            let done = self.shared.fetches_done.notified();
            if self.shared.fetches_in_flight.load(Ordering::SeqCst) == 0 {
                return;
            }
            done.await;
        }
    }

    /// Query string, form fields and body of a request
    pub fn payload(&self, id: &RequestId) -> Option<RequestPayload> {
        self.shared
            .reducer
            .read()
            .get(id)
            .map(RequestPayload::from_request)
    }

    pub fn statistics(&self) -> NetworkStatistics {
        self.shared.reducer.read().statistics()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.shared.reducer.read().diagnostics().clone()
    }

    pub fn counters(&self) -> SessionCounters {
        self.shared.counters()
    }
}

impl Drop for NetworkInspector {
    fn drop(&mut self) {
        if let Some(attachment) = self.attachment.get_mut().take() {
            let bridge = attachment.bridge.clone();
            if let Err(err) = attachment.release(&bridge) {
                debug!("Releasing tab on drop: {}", err);
            }
        }
        if let Some(watchdog) = self.watchdog.get_mut().take() {
            watchdog.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn quiet() -> InspectorConfig {
        InspectorConfig::builder().disable_watchdog().build()
    }

    fn initiated(id: &str) -> Value {
        json!({"requestId": id, "request": {"url": format!("https://a/{}", id)}})
    }

    #[test]
    fn test_version_counts_record_changes_only() {
        let inspector = NetworkInspector::new(quiet());
        inspector.ingest("Network.requestWillBeSent", initiated("1"));
        inspector.ingest(
            "Network.responseReceived",
            json!({"requestId": "2", "response": {}}),
        );
        inspector.ingest("Page.loadEventFired", json!({}));
        assert_eq!(inspector.version(), 1);
    }

    #[test]
    fn test_paused_recording_drops_events() {
        let inspector = NetworkInspector::new(quiet());
        inspector.set_recording(false);
        assert_eq!(inspector.ingest("Network.requestWillBeSent", initiated("1")), None);
        assert!(inspector.query(&FilterSpec::all()).is_empty());

        assert!(inspector.toggle_recording());
        assert!(inspector.ingest("Network.requestWillBeSent", initiated("1")).is_some());

        let counters = inspector.counters();
        assert_eq!(counters.events_received, 2);
        assert_eq!(counters.skipped_paused, 1);
    }

    #[test]
    fn test_clear_publishes_cleared() {
        let inspector = NetworkInspector::new(quiet());
        let mut updates = inspector.subscribe();
        inspector.ingest("Network.requestWillBeSent", initiated("1"));
        inspector.select(Some(RequestId::from("1")));
        inspector.clear();

        assert_eq!(updates.try_recv().unwrap(), InspectorUpdate::Changed { version: 1 });
        assert_eq!(updates.try_recv().unwrap(), InspectorUpdate::Cleared { version: 2 });
        assert_eq!(inspector.selected(), None);
    }

    #[test]
    fn test_cancel_pending_bumps_version() {
        let inspector = NetworkInspector::new(quiet());
        inspector.ingest("Network.requestWillBeSent", initiated("1"));
        assert_eq!(inspector.cancel_pending(), 1);
        assert_eq!(inspector.version(), 2);
        assert_eq!(inspector.cancel_pending(), 0);
        assert_eq!(inspector.version(), 2);
    }

    #[tokio::test]
    async fn test_fetch_body_without_fetcher() {
        let inspector = NetworkInspector::new(quiet());
        inspector.ingest("Network.requestWillBeSent", initiated("1"));

        let err = inspector.fetch_body(&RequestId::from("1")).await.unwrap_err();
        assert!(matches!(err, InspectorError::NoBodyFetcher));
        let err = inspector.fetch_body(&RequestId::from("2")).await.unwrap_err();
        assert!(matches!(err, InspectorError::RequestNotFound(_)));
    }

    #[test]
    fn test_envelope_tab_affinity_without_attachment() {
        let inspector = NetworkInspector::new(quiet());
        let envelope = Envelope::new(5, "Network.requestWillBeSent", initiated("1"));
        let transition = inspector.ingest_envelope(envelope);
        assert_eq!(transition, Some(Transition::Created(RequestId::from("1"))));
    }
}
