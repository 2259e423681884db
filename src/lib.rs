//! Network traffic inspector core
//!
//! Reconstructs one record per user-perceived HTTP(S) exchange from the `Network.*` and `Page.*`
//! events of an attached browser tab.
//!
//! # Example
//!
//! ```no_run
//! use network_inspector::{DeliveryBridge, Envelope, FilterSpec, InspectorConfig, NetworkInspector, TabId};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bridge = DeliveryBridge::new();
//!     bridge.publish(Envelope::new(
//!         1,
//!         "Network.requestWillBeSent",
//!         json!({"requestId": "1", "request": {"url": "https://example.com/"}}),
//!     ));
//!
//!     let inspector = NetworkInspector::new(InspectorConfig::default());
//!     inspector.attach(&bridge, TabId(1))?;
//!
//!     for request in inspector.query(&FilterSpec::all()) {
//!         println!("{} {} {}", request.method, request.url, request.status);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub use cdp_types::{CdpError, CdpEvent, Headers, PayloadError, RequestId};
pub use delivery_bridge::{
    BridgeConfig, BridgeError, BridgeStats, DeliveryBridge, Envelope, MailboxState,
    PublishOutcome, ReadyAck, TabId,
};
pub use inspector_session::{
    InspectorConfig, InspectorConfigBuilder, InspectorError, InspectorUpdate, NetworkInspector,
    Result, SessionCounters,
};
pub use request_tracker::{
    display, BodyCache, BodyFetcher, CommandSender, Diagnostics, EventKind, EventReducer,
    FilterSpec, LogicalRequest, NetworkEvent, NetworkStatistics, PostBody, ProtocolBodyFetcher,
    ReducerConfig, RequestPayload, RequestStatus, ResponseBody, Transition, TrackerError,
    TypeFilter,
};
