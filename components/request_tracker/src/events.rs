//! Typed inspector events
//!
//! Raw `(method, params)` pairs are decoded once, at the edge, into [`NetworkEvent`]. Handlers
//! downstream never check for field existence.

use cdp_types::domains::network::{
    LoadingFailed, LoadingFinished, RequestServedFromCache, RequestWillBeSent,
    RequestWillBeSentExtraInfo, ResponseReceived, ResponseReceivedExtraInfo,
};
use cdp_types::domains::page::{FrameNavigated, PageLifecycleEvent};
use cdp_types::{CdpEvent, PayloadError, RequestId};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;

/// The event types the reducer understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    RequestInitiated,
    ResponseReceived,
    LoadingFinished,
    LoadingFailed,
    RequestExtraInfo,
    ResponseExtraInfo,
    ServedFromCache,
    FrameNavigated,
    DomContentLoaded,
    LoadFired,
}

impl EventKind {
    /// Resolve a protocol method name or its short alias
    pub fn from_method(method: &str) -> Option<Self> {
        let kind = match method {
            "Network.requestWillBeSent" | "RequestInitiated" => EventKind::RequestInitiated,
            "Network.responseReceived" | "ResponseReceived" => EventKind::ResponseReceived,
            "Network.loadingFinished" | "LoadingFinished" => EventKind::LoadingFinished,
            "Network.loadingFailed" | "LoadingFailed" => EventKind::LoadingFailed,
            "Network.requestWillBeSentExtraInfo" | "RequestExtraInfo" => {
                EventKind::RequestExtraInfo
            }
            "Network.responseReceivedExtraInfo" | "ResponseExtraInfo" => {
                EventKind::ResponseExtraInfo
            }
            "Network.requestServedFromCache" | "ServedFromCache" => EventKind::ServedFromCache,
            "Page.frameNavigated" | "FrameNavigated" => EventKind::FrameNavigated,
            "Page.domContentEventFired" | "DOMContentLoaded" => EventKind::DomContentLoaded,
            "Page.loadEventFired" | "LoadFired" => EventKind::LoadFired,
            _ => return None,
        };
        Some(kind)
    }

    /// Short name used in logs and diagnostics
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::RequestInitiated => "RequestInitiated",
            EventKind::ResponseReceived => "ResponseReceived",
            EventKind::LoadingFinished => "LoadingFinished",
            EventKind::LoadingFailed => "LoadingFailed",
            EventKind::RequestExtraInfo => "RequestExtraInfo",
            EventKind::ResponseExtraInfo => "ResponseExtraInfo",
            EventKind::ServedFromCache => "ServedFromCache",
            EventKind::FrameNavigated => "FrameNavigated",
            EventKind::DomContentLoaded => "DOMContentLoaded",
            EventKind::LoadFired => "LoadFired",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded event, carrying only the fields relevant to its type
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkEvent {
    RequestInitiated(RequestWillBeSent),
    ResponseReceived(ResponseReceived),
    LoadingFinished(LoadingFinished),
    LoadingFailed(LoadingFailed),
    RequestExtraInfo(RequestWillBeSentExtraInfo),
    ResponseExtraInfo(ResponseReceivedExtraInfo),
    ServedFromCache(RequestServedFromCache),
    FrameNavigated(FrameNavigated),
    DomContentLoaded(PageLifecycleEvent),
    LoadFired(PageLifecycleEvent),
}

impl NetworkEvent {
    /// Decode a protocol event
    ///
    /// Returns `Ok(None)` for methods the reducer does not handle.
    pub fn from_cdp(event: CdpEvent) -> Result<Option<Self>, PayloadError> {
        Self::parse(&event.method, event.params)
    }

    /// Decode a raw `(method, params)` pair
    pub fn parse(method: &str, params: Value) -> Result<Option<Self>, PayloadError> {
        let Some(kind) = EventKind::from_method(method) else {
            return Ok(None);
        };
        let params = if params.is_null() {
            Value::Object(Map::new())
        } else {
            params
        };

        let event = match kind {
            EventKind::RequestInitiated => Self::RequestInitiated(decode(method, params)?),
            EventKind::ResponseReceived => Self::ResponseReceived(decode(method, params)?),
            EventKind::LoadingFinished => Self::LoadingFinished(decode(method, params)?),
            EventKind::LoadingFailed => Self::LoadingFailed(decode(method, params)?),
            EventKind::RequestExtraInfo => Self::RequestExtraInfo(decode(method, params)?),
            EventKind::ResponseExtraInfo => Self::ResponseExtraInfo(decode(method, params)?),
            EventKind::ServedFromCache => Self::ServedFromCache(decode(method, params)?),
            EventKind::FrameNavigated => Self::FrameNavigated(decode(method, params)?),
            EventKind::DomContentLoaded => Self::DomContentLoaded(decode(method, params)?),
            EventKind::LoadFired => Self::LoadFired(decode(method, params)?),
        };

        if event.request_id().is_some_and(RequestId::is_empty) {
            return Err(PayloadError::EmptyField {
                method: method.to_string(),
                field: "requestId",
            });
        }
        Ok(Some(event))
    }

    /// The event type
    pub fn kind(&self) -> EventKind {
        match self {
            NetworkEvent::RequestInitiated(_) => EventKind::RequestInitiated,
            NetworkEvent::ResponseReceived(_) => EventKind::ResponseReceived,
            NetworkEvent::LoadingFinished(_) => EventKind::LoadingFinished,
            NetworkEvent::LoadingFailed(_) => EventKind::LoadingFailed,
            NetworkEvent::RequestExtraInfo(_) => EventKind::RequestExtraInfo,
            NetworkEvent::ResponseExtraInfo(_) => EventKind::ResponseExtraInfo,
            NetworkEvent::ServedFromCache(_) => EventKind::ServedFromCache,
            NetworkEvent::FrameNavigated(_) => EventKind::FrameNavigated,
            NetworkEvent::DomContentLoaded(_) => EventKind::DomContentLoaded,
            NetworkEvent::LoadFired(_) => EventKind::LoadFired,
        }
    }

    /// Correlation id for request-scoped events
    pub fn request_id(&self) -> Option<&RequestId> {
        match self {
            NetworkEvent::RequestInitiated(e) => Some(&e.request_id),
            NetworkEvent::ResponseReceived(e) => Some(&e.request_id),
            NetworkEvent::LoadingFinished(e) => Some(&e.request_id),
            NetworkEvent::LoadingFailed(e) => Some(&e.request_id),
            NetworkEvent::RequestExtraInfo(e) => Some(&e.request_id),
            NetworkEvent::ResponseExtraInfo(e) => Some(&e.request_id),
            NetworkEvent::ServedFromCache(e) => Some(&e.request_id),
            NetworkEvent::FrameNavigated(_)
            | NetworkEvent::DomContentLoaded(_)
            | NetworkEvent::LoadFired(_) => None,
        }
    }
}

fn decode<T: DeserializeOwned>(method: &str, params: Value) -> Result<T, PayloadError> {
    serde_json::from_value(params).map_err(|source| PayloadError::Decode {
        method: method.to_string(),
        source,
    })
}
