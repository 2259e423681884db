//! Change notifications published to subscribers

use request_tracker::RequestId;
use serde::Serialize;

/// Published on the session's broadcast channel
///
/// Subscribers that fall behind may miss updates; [`crate::NetworkInspector::version`] is the
/// authoritative change counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InspectorUpdate {
    /// One or more records changed
    Changed { version: u64 },
    /// The store was emptied
    Cleared { version: u64 },
    /// The selected request's body arrived
    SelectedRequestUpdated { id: RequestId },
}

impl InspectorUpdate {
    pub fn version(&self) -> Option<u64> {
        match self {
            InspectorUpdate::Changed { version } | InspectorUpdate::Cleared { version } => {
                Some(*version)
            }
            InspectorUpdate::SelectedRequestUpdated { .. } => None,
        }
    }
}
