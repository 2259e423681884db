//! Per-tab mailbox
//!
//! A mailbox is either buffering (no consumer attached) or live (forwarding into the channel of
//! the consumer that completed the ready handshake).

use crate::envelope::Envelope;
use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Identifies one ready handshake; a later handshake for the same tab supersedes it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| BridgeError::InvalidConnectionId(s.to_string()))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MailboxState {
    Buffering,
    Live,
}

/// Where a published message ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Sent to the attached consumer
    Live,
    /// Held until the next ready handshake
    Queued {
        /// An older message was evicted to make room
        evicted: bool,
    },
}

struct Consumer {
    id: ConnectionId,
    sender: mpsc::UnboundedSender<Envelope>,
}

pub(crate) struct Mailbox {
    queue: VecDeque<Envelope>,
    consumer: Option<Consumer>,
    capacity: usize,
}

impl Mailbox {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            consumer: None,
            capacity: capacity.max(1),
        }
    }

    pub(crate) fn state(&self) -> MailboxState {
        if self.consumer.is_some() {
            MailboxState::Live
        } else {
            MailboxState::Buffering
        }
    }

    pub(crate) fn queued(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn connection(&self) -> Option<ConnectionId> {
        self.consumer.as_ref().map(|c| c.id)
    }

    /// Forward to the consumer, or queue when there is none
    ///
    /// A send failure means the consumer went away; the mailbox falls back to buffering and the
    /// message is kept.
    pub(crate) fn push(&mut self, envelope: Envelope) -> Delivery {
        let envelope = match &self.consumer {
            Some(consumer) => match consumer.sender.send(envelope) {
                Ok(()) => return Delivery::Live,
                Err(mpsc::error::SendError(envelope)) => {
                    warn!(
                        "Consumer {} for tab {} is gone, buffering",
                        consumer.id, envelope.tab_id
                    );
                    self.consumer = None;
                    envelope
                }
            },
            None => envelope,
        };
        self.enqueue(envelope)
    }

    fn enqueue(&mut self, envelope: Envelope) -> Delivery {
        let mut evicted = false;
        if self.queue.len() >= self.capacity {
            if let Some(dropped) = self.queue.pop_front() {
                debug!(
                    "Queue for tab {} full, dropping oldest {}",
                    dropped.tab_id, dropped.method
                );
                evicted = true;
            }
        }
        self.queue.push_back(envelope);
        Delivery::Queued { evicted }
    }

    /// Put messages a consumer received but never processed back at the head of the queue
    ///
    /// `envelopes` must be in delivery order. Capacity still applies, so the oldest messages are
    /// evicted first. Returns the number evicted.
    pub(crate) fn requeue_front(&mut self, envelopes: Vec<Envelope>) -> usize {
        for envelope in envelopes.into_iter().rev() {
            self.queue.push_front(envelope);
        }
        let mut evicted = 0;
        while self.queue.len() > self.capacity {
            if let Some(dropped) = self.queue.pop_front() {
                debug!(
                    "Queue for tab {} full, dropping requeued {}",
                    dropped.tab_id, dropped.method
                );
                evicted += 1;
            }
        }
        evicted
    }

    /// Attach a fresh consumer channel, flushing the queue into it first
    ///
    /// Returns the connection id, the receiver and the number of flushed messages.
    pub(crate) fn attach(&mut self) -> (ConnectionId, mpsc::UnboundedReceiver<Envelope>, usize) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let flushed = self.queue.len();
        for envelope in self.queue.drain(..) {
            // The receiver is held locally, so this send cannot fail
            let _ = sender.send(envelope);
        }

        let id = ConnectionId::new();
        if let Some(previous) = self.consumer.replace(Consumer { id, sender }) {
            debug!("Connection {} superseded by {}", previous.id, id);
        }
        (id, receiver, flushed)
    }

    /// Detach the consumer if it is `connection`
    pub(crate) fn release(&mut self, connection: ConnectionId) -> bool {
        match &self.consumer {
            Some(consumer) if consumer.id == connection => {
                self.consumer = None;
                true
            }
            _ => false,
        }
    }
}
