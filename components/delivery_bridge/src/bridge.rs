//! The delivery bridge
//!
//! Producers publish tab-tagged events; a consumer completes a ready handshake for its tab and
//! receives the queued backlog, in order, followed by live events on the same channel.

use crate::config::BridgeConfig;
use crate::envelope::{Envelope, TabId};
use crate::error::{BridgeError, Result};
use crate::mailbox::{ConnectionId, Delivery, Mailbox, MailboxState};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Delivery counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeStats {
    /// Messages handed to `publish`, forwarded or not
    pub published: u64,
    /// Messages outside the forwarded domains
    pub filtered: u64,
    pub delivered_live: u64,
    pub queued: u64,
    /// Queued messages handed over during ready handshakes
    pub flushed: u64,
    /// Queued messages evicted by the capacity limit
    pub dropped: u64,
    /// Live deliveries handed back unprocessed by a departing consumer
    pub requeued: u64,
}

/// Reply to a ready handshake
#[derive(Debug)]
pub struct ReadyAck {
    pub tab_id: TabId,
    pub connection: ConnectionId,
    /// Number of backlog messages already waiting in `receiver`
    pub queued_count: usize,
    pub receiver: mpsc::UnboundedReceiver<Envelope>,
}

/// Result of [`DeliveryBridge::publish`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Delivered(Delivery),
    /// Not a forwarded domain
    Filtered,
}

/// Store-and-forward mailbox per tab
#[derive(Clone)]
pub struct DeliveryBridge {
    config: BridgeConfig,
    mailboxes: Arc<DashMap<TabId, Mailbox>>,
    stats: Arc<Mutex<BridgeStats>>,
}

impl Default for DeliveryBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl DeliveryBridge {
    pub fn new() -> Self {
        Self::with_config(BridgeConfig::default())
    }

    pub fn with_config(config: BridgeConfig) -> Self {
        Self {
            config,
            mailboxes: Arc::new(DashMap::new()),
            stats: Arc::new(Mutex::new(BridgeStats::default())),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Publish an event for its tab
    ///
    /// Never fails: without a live consumer the event is queued.
    pub fn publish(&self, envelope: Envelope) -> PublishOutcome {
        self.stats.lock().published += 1;

        if !self.config.forwards(envelope.domain()) {
            self.stats.lock().filtered += 1;
            return PublishOutcome::Filtered;
        }

        let delivery = self
            .mailboxes
            .entry(envelope.tab_id)
            .or_insert_with(|| Mailbox::new(self.config.queue_capacity))
            .push(envelope);

        let mut stats = self.stats.lock();
        match delivery {
            Delivery::Live => stats.delivered_live += 1,
            Delivery::Queued { evicted } => {
                stats.queued += 1;
                if evicted {
                    stats.dropped += 1;
                }
            }
        }
        PublishOutcome::Delivered(delivery)
    }

    /// Ready handshake
    ///
    /// Atomically flushes the tab's backlog into a fresh channel and switches the mailbox to
    /// live forwarding. A previous consumer for the tab is superseded.
    pub fn ready(&self, tab_id: TabId) -> ReadyAck {
        let (connection, receiver, queued_count) = self
            .mailboxes
            .entry(tab_id)
            .or_insert_with(|| Mailbox::new(self.config.queue_capacity))
            .attach();

        self.stats.lock().flushed += queued_count as u64;
        info!(
            "Consumer {} ready for tab {}, flushed {} queued messages",
            connection, tab_id, queued_count
        );

        ReadyAck {
            tab_id,
            connection,
            queued_count,
            receiver,
        }
    }

    /// Return the tab to buffering if `connection` is its current consumer
    pub fn disconnect(&self, tab_id: TabId, connection: ConnectionId) -> Result<()> {
        let mut mailbox = self
            .mailboxes
            .get_mut(&tab_id)
            .ok_or(BridgeError::UnknownTab(tab_id))?;

        if mailbox.release(connection) {
            debug!("Consumer {} disconnected from tab {}", connection, tab_id);
            Ok(())
        } else {
            Err(BridgeError::StaleConnection { tab_id, connection })
        }
    }

    /// Hand back messages a departing consumer received but never processed
    ///
    /// They go ahead of anything queued since, in the given order, so the next ready handshake
    /// replays them first. Returns the number kept; an unknown tab keeps nothing.
    pub fn requeue_front(&self, tab_id: TabId, envelopes: Vec<Envelope>) -> usize {
        if envelopes.is_empty() {
            return 0;
        }
        let count = envelopes.len();
        let Some(mut mailbox) = self.mailboxes.get_mut(&tab_id) else {
            debug!("Tab {} is gone, discarding {} returned messages", tab_id, count);
            return 0;
        };
        let evicted = mailbox.requeue_front(envelopes);
        drop(mailbox);

        let mut stats = self.stats.lock();
        stats.requeued += count as u64;
        stats.dropped += evicted as u64;
        info!("Requeued {} undelivered messages for tab {}", count, tab_id);
        count - evicted
    }

    /// Forget the tab entirely, discarding its backlog
    pub fn detach(&self, tab_id: TabId) -> Option<usize> {
        let (_, mailbox) = self.mailboxes.remove(&tab_id)?;
        let discarded = mailbox.queued();
        debug!("Detached tab {}, discarding {} queued", tab_id, discarded);
        Some(discarded)
    }

    pub fn state(&self, tab_id: TabId) -> Option<MailboxState> {
        self.mailboxes.get(&tab_id).map(|m| m.state())
    }

    pub fn queued(&self, tab_id: TabId) -> usize {
        self.mailboxes.get(&tab_id).map_or(0, |m| m.queued())
    }

    pub fn tabs(&self) -> Vec<TabId> {
        let mut tabs: Vec<TabId> = self.mailboxes.iter().map(|e| *e.key()).collect();
        tabs.sort();
        tabs
    }

    pub fn stats(&self) -> BridgeStats {
        self.stats.lock().clone()
    }
}
