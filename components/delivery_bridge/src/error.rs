//! Bridge error types

use crate::envelope::TabId;
use crate::mailbox::ConnectionId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BridgeError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("No mailbox for tab {0}")]
    UnknownTab(TabId),

    /// The connection was replaced by a newer `ready` handshake
    #[error("Connection {connection} is no longer attached to tab {tab_id}")]
    StaleConnection {
        tab_id: TabId,
        connection: ConnectionId,
    },

    #[error("Invalid connection id: {0}")]
    InvalidConnectionId(String),
}
