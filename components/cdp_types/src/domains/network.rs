// Network domain types

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// HTTP header map (name → value)
pub type Headers = HashMap<String, String>;

/// Unique request identifier
///
/// The browser reuses the same identifier for every hop of a redirect chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub String);

impl RequestId {
    /// Create a request identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is the empty string
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RequestId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Decode a header object, stringifying non-string values instead of rejecting the event
pub fn lenient_headers<'de, D>(deserializer: D) -> Result<Headers, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<HashMap<String, Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(name, value)| {
            let value = match value {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (name, value)
        })
        .collect())
}

/// Decode a status code sent either as an integer or as a float
fn lenient_status<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(Value::as_f64)
        .filter(|code| (0.0..=f64::from(u16::MAX)).contains(code))
        .map(|code| code as u16))
}

/// HTTP request as carried by `Network.requestWillBeSent`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Request URL (absent for some internal requests)
    #[serde(default)]
    pub url: Option<String>,
    /// HTTP method
    #[serde(default)]
    pub method: Option<String>,
    /// HTTP request headers
    #[serde(default, deserialize_with = "lenient_headers")]
    pub headers: Headers,
    /// POST data (if applicable)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_data: Option<String>,
    /// Whether request has POST data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_post_data: Option<bool>,
}

/// HTTP response as carried by `Network.responseReceived` and redirect hops
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// Response URL
    #[serde(default)]
    pub url: Option<String>,
    /// HTTP status code
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: Option<u16>,
    /// HTTP status text
    #[serde(default)]
    pub status_text: Option<String>,
    /// HTTP response headers
    #[serde(default, deserialize_with = "lenient_headers")]
    pub headers: Headers,
    /// MIME type
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Whether response came from disk cache
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_disk_cache: Option<bool>,
}

impl Response {
    /// A response object with no populated fields (`{}` on the wire)
    pub fn is_empty(&self) -> bool {
        self.url.is_none()
            && self.status.is_none()
            && self.status_text.is_none()
            && self.headers.is_empty()
            && self.mime_type.is_none()
    }
}

/// `Network.requestWillBeSent`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestWillBeSent {
    pub request_id: RequestId,
    #[serde(default)]
    pub request: Request,
    /// Monotonic timestamp in seconds
    #[serde(default)]
    pub timestamp: Option<f64>,
    /// Wall time in seconds since epoch
    #[serde(default)]
    pub wall_time: Option<f64>,
    /// Resource type (Document, Script, Fetch, XHR, ...)
    #[serde(default, rename = "type")]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub frame_id: Option<String>,
    /// Present when this event continues a redirect chain
    #[serde(default)]
    pub redirect_response: Option<Response>,
}

/// `Network.responseReceived`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResponseReceived {
    pub request_id: RequestId,
    pub response: Response,
    #[serde(default)]
    pub timestamp: Option<f64>,
    #[serde(default, rename = "type")]
    pub resource_type: Option<String>,
}

/// `Network.loadingFinished`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoadingFinished {
    pub request_id: RequestId,
    #[serde(default)]
    pub timestamp: Option<f64>,
    #[serde(default)]
    pub encoded_data_length: Option<f64>,
}

/// `Network.loadingFailed`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoadingFailed {
    pub request_id: RequestId,
    #[serde(default)]
    pub timestamp: Option<f64>,
    #[serde(default)]
    pub error_text: Option<String>,
    /// Set by the browser when the load was canceled
    #[serde(default)]
    pub canceled: Option<bool>,
}

/// `Network.requestWillBeSentExtraInfo`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestWillBeSentExtraInfo {
    pub request_id: RequestId,
    #[serde(default, deserialize_with = "lenient_headers")]
    pub headers: Headers,
}

/// `Network.responseReceivedExtraInfo`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResponseReceivedExtraInfo {
    pub request_id: RequestId,
    #[serde(default, deserialize_with = "lenient_headers")]
    pub headers: Headers,
    #[serde(default, deserialize_with = "lenient_status")]
    pub status_code: Option<u16>,
}

/// `Network.requestServedFromCache`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestServedFromCache {
    pub request_id: RequestId,
}

/// Result of `Network.getResponseBody`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GetResponseBodyResult {
    pub body: String,
    #[serde(default)]
    pub base64_encoded: bool,
}
