//! Request payload inspection: query string, form fields and JSON bodies

use crate::record::LogicalRequest;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::{form_urlencoded, Url};

/// Decoded request body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum PostBody {
    Json(Value),
    Form(Vec<(String, String)>),
    Text(String),
    /// The browser reported a body that has not been delivered yet
    Pending,
}

/// Structured view of what a request sent
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPayload {
    /// Query-string parameters in URL order
    pub query_params: Vec<(String, String)>,
    pub body: Option<PostBody>,
}

impl RequestPayload {
    /// Inspect a record
    pub fn from_request(record: &LogicalRequest) -> Self {
        let query_params = query_params(&record.url);
        let content_type = record
            .request_header("content-type")
            .map(str::to_ascii_lowercase);

        let body = match record.post_data.as_deref() {
            Some(data) => Some(decode_body(data, content_type.as_deref())),
            None if record.has_post_data => Some(PostBody::Pending),
            None => None,
        };

        Self { query_params, body }
    }

    /// Neither query parameters nor a body
    pub fn is_empty(&self) -> bool {
        self.query_params.is_empty() && self.body.is_none()
    }
}

/// Parse the query string of `url`
///
/// Placeholder or otherwise unparseable URLs yield no parameters.
pub fn query_params(url: &str) -> Vec<(String, String)> {
    match Url::parse(url) {
        Ok(parsed) => parsed.query_pairs().into_owned().collect(),
        Err(e) => {
            debug!("Skipping query params for {}: {}", url, e);
            Vec::new()
        }
    }
}

/// Parse an `application/x-www-form-urlencoded` body
pub fn form_fields(data: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(data.as_bytes())
        .into_owned()
        .collect()
}

fn decode_body(data: &str, content_type: Option<&str>) -> PostBody {
    let content_type = content_type.unwrap_or_default();

    if content_type.contains("application/json") {
        return match serde_json::from_str(data) {
            Ok(value) => PostBody::Json(value),
            Err(_) => PostBody::Text(data.to_string()),
        };
    }
    if content_type.contains("application/x-www-form-urlencoded") {
        let fields = form_fields(data);
        return if fields.is_empty() {
            PostBody::Text(data.to_string())
        } else {
            PostBody::Form(fields)
        };
    }

    // Unknown content type: JSON first, then form fields, then raw text
    if let Ok(value) = serde_json::from_str::<Value>(data) {
        return PostBody::Json(value);
    }
    if data.contains('=') {
        let fields = form_fields(data);
        if !fields.is_empty() {
            return PostBody::Form(fields);
        }
    }
    PostBody::Text(data.to_string())
}
