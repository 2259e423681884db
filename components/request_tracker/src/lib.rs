//! Request lifecycle reconstruction
//!
//! Folds the unordered, partial and occasionally duplicated stream of `Network.*` and `Page.*`
//! protocol events into one [`LogicalRequest`] per user-perceived exchange.
//!
//! # Components
//! - [`RequestStore`]: insertion-ordered table of records
//! - [`resolve_initiated`]: identity and redirect-chain collapsing
//! - [`EventReducer`]: per-event state machine, total over all input
//! - [`FilterSpec`]: filtered projections for display
//!
//! ```
//! use request_tracker::{EventReducer, FilterSpec};
//! use serde_json::json;
//!
//! let mut reducer = EventReducer::new();
//! reducer.apply_raw(
//!     "Network.requestWillBeSent",
//!     json!({"requestId": "1", "request": {"url": "https://a/x"}}),
//! );
//! assert_eq!(reducer.query(&FilterSpec::all()).len(), 1);
//! ```

pub mod body;
pub mod diagnostics;
pub mod display;
pub mod error;
pub mod events;
pub mod filter;
pub mod payload;
pub mod record;
pub mod reducer;
pub mod resolver;
pub mod stats;
pub mod store;

pub use body::{BodyCache, BodyFetcher, CommandSender, ProtocolBodyFetcher};
pub use diagnostics::Diagnostics;
pub use error::{Result, TrackerError};
pub use events::{EventKind, NetworkEvent};
pub use filter::{FilterSpec, TypeFilter};
pub use payload::{PostBody, RequestPayload};
pub use record::{LogicalRequest, RequestPatch, RequestStatus, ResponseBody};
pub use reducer::{EventReducer, ReducerConfig, Transition, Unchanged};
pub use resolver::{resolve_initiated, Resolution};
pub use stats::{NetworkStatistics, SessionTiming};
pub use store::RequestStore;

pub use cdp_types::{CdpEvent, Headers, RequestId};
