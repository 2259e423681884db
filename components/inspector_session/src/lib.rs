//! Network inspector session host
//!
//! Wires the [`request_tracker`] reducer to a [`delivery_bridge::DeliveryBridge`]: pumps events
//! for one tab, fetches response bodies after loading finishes, and publishes change
//! notifications for a UI.
//!
//! # Example
//!
//! ```no_run
//! use delivery_bridge::{DeliveryBridge, TabId};
//! use inspector_session::{InspectorConfig, NetworkInspector};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bridge = DeliveryBridge::new();
//!     let inspector = NetworkInspector::new(InspectorConfig::default());
//!
//!     let backlog = inspector.attach(&bridge, TabId(1))?;
//!     println!("Replayed {} queued events", backlog);
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod session;
mod updates;
mod watchdog;

pub use config::{InspectorConfig, InspectorConfigBuilder};
pub use error::{InspectorError, Result};
pub use session::{NetworkInspector, SessionCounters};
pub use updates::InspectorUpdate;
