//! The logical request record
//!
//! One [`LogicalRequest`] represents one user-perceived exchange. Redirect hops that share a
//! protocol identifier collapse into the same record and accumulate in `redirect_chain`.

use cdp_types::{Headers, RequestId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Resource type assigned when the initiating event carries none
pub const DEFAULT_RESOURCE_TYPE: &str = "other";

/// Method assigned when the initiating event carries none
pub const DEFAULT_METHOD: &str = "GET";

/// Label used in place of a missing URL so the record stays visible and addressable
pub fn placeholder_url(request_id: &RequestId) -> String {
    format!("(no URL) {}", request_id)
}

/// Response status of a logical request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "code", rename_all = "camelCase")]
pub enum RequestStatus {
    /// Nothing known yet
    #[default]
    Unset,
    /// Response headers expected but no numeric code yet
    Pending,
    /// Numeric HTTP status
    Code(u16),
    /// Load was canceled or aborted
    Canceled,
    /// Load failed for another reason
    Failed,
}

impl RequestStatus {
    /// Whether this status is terminal (a failure of some kind)
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Canceled | RequestStatus::Failed)
    }

    /// Whether nothing conclusive has been observed
    pub fn is_pending(&self) -> bool {
        matches!(self, RequestStatus::Unset | RequestStatus::Pending)
    }

    fn rank(&self) -> u8 {
        match self {
            RequestStatus::Unset => 0,
            RequestStatus::Pending => 1,
            RequestStatus::Code(_) => 2,
            RequestStatus::Canceled | RequestStatus::Failed => 3,
        }
    }

    /// Whether replacing `self` with `next` keeps the status at least as informative
    pub fn accepts(&self, next: &RequestStatus) -> bool {
        next.rank() >= self.rank()
    }

    /// Numeric code, if any
    pub fn code(&self) -> Option<u16> {
        match self {
            RequestStatus::Code(code) => Some(*code),
            _ => None,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestStatus::Unset | RequestStatus::Pending => f.write_str("Pending"),
            RequestStatus::Code(code) => write!(f, "{}", code),
            RequestStatus::Canceled => f.write_str("(canceled)"),
            RequestStatus::Failed => f.write_str("Failed"),
        }
    }
}

/// Response body attached after an explicit fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBody {
    /// Body content (base64 when `base64_encoded`)
    pub body: String,
    /// Whether `body` is base64 encoded
    pub base64_encoded: bool,
    /// Length of the body before any truncation
    pub original_len: usize,
}

impl ResponseBody {
    /// Create a body from its wire representation
    pub fn new(body: impl Into<String>, base64_encoded: bool) -> Self {
        let body = body.into();
        let original_len = body.len();
        Self {
            body,
            base64_encoded,
            original_len,
        }
    }

    /// Whether the stored body was cut short
    pub fn is_truncated(&self) -> bool {
        self.body.len() < self.original_len
    }

    /// Truncate to at most `max_len` bytes, on a character boundary
    pub fn truncate(&mut self, max_len: usize) {
        if self.body.len() <= max_len {
            return;
        }
        let mut cut = max_len;
        while !self.body.is_char_boundary(cut) {
            cut -= 1;
        }
        self.body.truncate(cut);
    }
}

/// One user-perceived HTTP(S) exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicalRequest {
    /// First protocol identifier seen for this exchange; never changes
    pub id: RequestId,
    /// Current URL (the destination of the latest redirect)
    pub url: String,
    /// Prior URLs, oldest first
    #[serde(default)]
    pub redirect_chain: Vec<String>,
    pub redirected: bool,
    /// Status of the last redirect response
    pub redirect_status: Option<u16>,
    pub method: String,
    #[serde(default)]
    pub request_headers: Headers,
    #[serde(default)]
    pub response_headers: Headers,
    pub status: RequestStatus,
    pub status_text: Option<String>,
    pub error_text: Option<String>,
    pub mime_type: Option<String>,
    pub resource_type: Option<String>,
    /// Encoded transfer size, known once loading finishes
    pub size_bytes: Option<u64>,
    pub post_data: Option<String>,
    pub has_post_data: bool,
    pub response_body: Option<ResponseBody>,
    pub finished: bool,
    pub failed: bool,
    pub canceled: bool,
    pub served_from_cache: bool,
    /// Protocol timestamp (seconds) of the initiating event
    pub timestamp: Option<f64>,
    /// Protocol timestamp (seconds) of the response
    pub response_timestamp: Option<f64>,
    /// Wall clock creation time (ms since epoch)
    pub created_at_ms: f64,
    pub frame_id: Option<String>,
}

impl LogicalRequest {
    /// Create a record with defaults for everything but the identity
    pub fn new(id: RequestId, url: impl Into<String>) -> Self {
        let created_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64() * 1000.0)
            .unwrap_or(0.0);

        Self {
            id,
            url: url.into(),
            redirect_chain: Vec::new(),
            redirected: false,
            redirect_status: None,
            method: DEFAULT_METHOD.to_string(),
            request_headers: Headers::new(),
            response_headers: Headers::new(),
            status: RequestStatus::Unset,
            status_text: None,
            error_text: None,
            mime_type: None,
            resource_type: None,
            size_bytes: None,
            post_data: None,
            has_post_data: false,
            response_body: None,
            finished: false,
            failed: false,
            canceled: false,
            served_from_cache: false,
            timestamp: None,
            response_timestamp: None,
            created_at_ms,
            frame_id: None,
        }
    }

    /// Neither finished nor in a terminal failure state
    pub fn is_pending(&self) -> bool {
        !self.finished && !self.failed && !self.canceled && self.status.is_pending()
    }

    /// Resource type lower-cased, empty when unknown
    pub fn resource_type_lower(&self) -> String {
        self.resource_type
            .as_deref()
            .unwrap_or_default()
            .to_ascii_lowercase()
    }

    /// Case-insensitive header lookup on the request side
    pub fn request_header(&self, name: &str) -> Option<&str> {
        find_header(&self.request_headers, name)
    }

    /// Case-insensitive header lookup on the response side
    pub fn response_header(&self, name: &str) -> Option<&str> {
        find_header(&self.response_headers, name)
    }
}

fn find_header<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Sparse update applied with [`crate::RequestStore::merge`]
///
/// `None` fields are left untouched; header maps are unioned with override on conflict.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestPatch {
    pub url: Option<String>,
    pub method: Option<String>,
    pub request_headers: Option<Headers>,
    pub response_headers: Option<Headers>,
    pub status: Option<RequestStatus>,
    pub status_text: Option<String>,
    pub error_text: Option<String>,
    pub mime_type: Option<String>,
    pub resource_type: Option<String>,
    pub size_bytes: Option<u64>,
    pub post_data: Option<String>,
    pub has_post_data: Option<bool>,
    pub response_body: Option<ResponseBody>,
    pub finished: Option<bool>,
    pub failed: Option<bool>,
    pub canceled: Option<bool>,
    pub served_from_cache: Option<bool>,
    pub timestamp: Option<f64>,
    pub response_timestamp: Option<f64>,
    pub frame_id: Option<String>,
}

impl RequestPatch {
    /// Apply to a record, honouring the record invariants
    ///
    /// A resource type that is already set is kept, a status never becomes less informative
    /// and a terminal failure is never cleared.
    pub(crate) fn apply_to(self, record: &mut LogicalRequest) {
        if let Some(url) = self.url {
            record.url = url;
        }
        if let Some(method) = self.method {
            record.method = method;
        }
        if let Some(headers) = self.request_headers {
            record.request_headers.extend(headers);
        }
        if let Some(headers) = self.response_headers {
            record.response_headers.extend(headers);
        }
        if let Some(status) = self.status {
            if record.status.accepts(&status) {
                record.status = status;
            }
        }
        if let Some(text) = self.status_text {
            record.status_text = Some(text);
        }
        if let Some(text) = self.error_text {
            record.error_text = Some(text);
        }
        if let Some(mime_type) = self.mime_type {
            record.mime_type = Some(mime_type);
        }
        if let Some(resource_type) = self.resource_type.filter(|t| !t.is_empty()) {
            if record.resource_type.as_deref().map_or(true, str::is_empty) {
                record.resource_type = Some(resource_type);
            }
        }
        if let Some(size) = self.size_bytes {
            record.size_bytes = Some(size);
        }
        if let Some(post_data) = self.post_data {
            record.post_data = Some(post_data);
        }
        if let Some(has_post_data) = self.has_post_data {
            record.has_post_data = has_post_data;
        }
        if let Some(body) = self.response_body {
            record.response_body = Some(body);
        }
        if let Some(finished) = self.finished {
            record.finished = record.finished || finished;
        }
        if let Some(failed) = self.failed {
            record.failed = record.failed || failed;
        }
        if let Some(canceled) = self.canceled {
            record.canceled = record.canceled || canceled;
            record.failed = record.failed || record.canceled;
        }
        if let Some(cached) = self.served_from_cache {
            record.served_from_cache = record.served_from_cache || cached;
        }
        if let Some(ts) = self.timestamp {
            record.timestamp = Some(ts);
        }
        if let Some(ts) = self.response_timestamp {
            record.response_timestamp = Some(ts);
        }
        if let Some(frame_id) = self.frame_id {
            record.frame_id = Some(frame_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> LogicalRequest {
        LogicalRequest::new(RequestId::from("1"), "https://a/x")
    }

    #[test]
    fn test_new_record_defaults() {
        let r = record();
        assert_eq!(r.method, "GET");
        assert_eq!(r.status, RequestStatus::Unset);
        assert!(r.is_pending());
        assert!(r.created_at_ms > 0.0);
    }

    #[test]
    fn test_placeholder_url() {
        assert_eq!(placeholder_url(&RequestId::from("42.1")), "(no URL) 42.1");
    }

    #[test]
    fn test_patch_keeps_established_resource_type() {
        let mut r = record();
        r.resource_type = Some("Script".to_string());

        RequestPatch {
            resource_type: Some("Other".to_string()),
            ..Default::default()
        }
        .apply_to(&mut r);

        assert_eq!(r.resource_type.as_deref(), Some("Script"));
    }

    #[test]
    fn test_patch_never_clears_failure() {
        let mut r = record();
        r.status = RequestStatus::Canceled;
        r.failed = true;
        r.canceled = true;

        RequestPatch {
            status: Some(RequestStatus::Code(200)),
            failed: Some(false),
            canceled: Some(false),
            ..Default::default()
        }
        .apply_to(&mut r);

        assert_eq!(r.status, RequestStatus::Canceled);
        assert!(r.failed);
        assert!(r.canceled);
    }

    #[test]
    fn test_patch_never_downgrades_status_code() {
        let mut r = record();
        r.status = RequestStatus::Code(200);

        for status in [RequestStatus::Pending, RequestStatus::Unset] {
            RequestPatch {
                status: Some(status),
                ..Default::default()
            }
            .apply_to(&mut r);
        }
        assert_eq!(r.status, RequestStatus::Code(200));

        RequestPatch {
            status: Some(RequestStatus::Code(304)),
            ..Default::default()
        }
        .apply_to(&mut r);
        assert_eq!(r.status, RequestStatus::Code(304));
    }

    #[test]
    fn test_canceled_implies_failed() {
        let mut r = record();
        RequestPatch {
            canceled: Some(true),
            ..Default::default()
        }
        .apply_to(&mut r);
        assert!(r.failed);
    }

    #[test]
    fn test_header_patch_merges() {
        let mut r = record();
        r.request_headers.insert("a".into(), "1".into());

        let mut extra = Headers::new();
        extra.insert("b".into(), "2".into());
        RequestPatch {
            request_headers: Some(extra),
            ..Default::default()
        }
        .apply_to(&mut r);

        assert_eq!(r.request_headers.len(), 2);
        assert_eq!(r.request_header("B"), Some("2"));
    }

    #[test]
    fn test_body_truncation_on_char_boundary() {
        let mut body = ResponseBody::new("héllo", false);
        body.truncate(2);
        assert_eq!(body.body, "h");
        assert!(body.is_truncated());
        assert_eq!(body.original_len, 6);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(RequestStatus::Unset.to_string(), "Pending");
        assert_eq!(RequestStatus::Code(404).to_string(), "404");
        assert_eq!(RequestStatus::Canceled.to_string(), "(canceled)");
        assert_eq!(RequestStatus::Failed.to_string(), "Failed");
    }
}
