// Page domain types

use serde::{Deserialize, Serialize};

/// Frame description carried by `Page.frameNavigated`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub id: String,
    /// Absent for the top-level frame
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub loader_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl Frame {
    /// Whether this is the top-level frame of the tab
    pub fn is_main_frame(&self) -> bool {
        self.parent_id.as_deref().map_or(true, str::is_empty)
    }
}

/// `Page.frameNavigated`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FrameNavigated {
    pub frame: Frame,
}

/// `Page.domContentEventFired` and `Page.loadEventFired`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageLifecycleEvent {
    #[serde(default)]
    pub timestamp: Option<f64>,
}
