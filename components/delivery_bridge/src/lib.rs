//! Delivery bridge between the event source and the inspector
//!
//! The source publishes [`Envelope`]s as they happen. Until a consumer for the tab signals
//! readiness they are held in a bounded per-tab queue. [`DeliveryBridge::ready`] hands the
//! backlog over in original order on a fresh channel and switches the tab to live forwarding.
//! Delivery is at-least-once; duplicates are the consumer's problem.

pub mod bridge;
pub mod config;
pub mod envelope;
pub mod error;
pub mod mailbox;

pub use bridge::{BridgeStats, DeliveryBridge, PublishOutcome, ReadyAck};
pub use config::BridgeConfig;
pub use envelope::{Envelope, TabId};
pub use error::{BridgeError, Result};
pub use mailbox::{ConnectionId, Delivery, MailboxState};
