//! Presentation helpers for request records

use crate::record::{LogicalRequest, RequestStatus};

/// Coarse status bucket used for colouring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Canceled,
    Pending,
    Success,
    Redirect,
    Error,
}

impl StatusClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusClass::Canceled => "canceled",
            StatusClass::Pending => "pending",
            StatusClass::Success => "success",
            StatusClass::Redirect => "redirect",
            StatusClass::Error => "error",
        }
    }
}

/// Bucket a record's status
pub fn status_class(record: &LogicalRequest) -> StatusClass {
    if record.canceled {
        return StatusClass::Canceled;
    }
    match record.status {
        RequestStatus::Canceled => StatusClass::Canceled,
        RequestStatus::Failed => StatusClass::Error,
        RequestStatus::Unset | RequestStatus::Pending => StatusClass::Pending,
        RequestStatus::Code(code) => match code {
            200..=299 => StatusClass::Success,
            300..=399 => StatusClass::Redirect,
            400.. => StatusClass::Error,
            _ => StatusClass::Pending,
        },
    }
}

/// Short MIME category such as `javascript`, `json` or `image`
///
/// Unrecognised types fall back to their subtype.
pub fn mime_category(mime_type: Option<&str>) -> String {
    let Some(mime) = mime_type.filter(|m| !m.is_empty()) else {
        return "unknown".to_string();
    };
    let category = ["javascript", "json", "html", "css", "image", "font", "xml"]
        .into_iter()
        .find(|needle| mime.contains(needle));
    match category {
        Some(category) => category.to_string(),
        None => mime
            .split('/')
            .nth(1)
            .filter(|subtype| !subtype.is_empty())
            .unwrap_or("other")
            .to_string(),
    }
}

/// Short label for a protocol resource type, e.g. `doc` for `Document`
pub fn resource_type_label(resource_type: Option<&str>) -> String {
    let Some(raw) = resource_type.filter(|t| !t.is_empty()) else {
        return "unknown".to_string();
    };
    let lower = raw.to_ascii_lowercase();
    let label = match lower.as_str() {
        "document" => "doc",
        "stylesheet" => "css",
        "script" => "js",
        "image" => "img",
        "websocket" => "ws",
        _ => return lower,
    };
    label.to_string()
}

/// Type column text: the resource type label, else the MIME category
pub fn type_label(record: &LogicalRequest) -> String {
    match record.resource_type.as_deref().filter(|t| !t.is_empty()) {
        Some(resource_type) => resource_type_label(Some(resource_type)),
        None => mime_category(record.mime_type.as_deref()),
    }
}

/// Format a byte count with binary units, e.g. `1.5 KB`
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut exponent = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && exponent < UNITS.len() - 1 {
        value /= 1024.0;
        exponent += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[exponent])
}

/// Format milliseconds as `N ms`, `X.XX s` or `N min M s`
pub fn format_duration(ms: f64) -> String {
    if ms < 1000.0 {
        format!("{} ms", ms.round() as i64)
    } else if ms < 60_000.0 {
        format!("{:.2} s", ms / 1000.0)
    } else {
        let minutes = (ms / 60_000.0).floor() as u64;
        let seconds = ((ms % 60_000.0) / 1000.0).round() as u64;
        format!("{} min {} s", minutes, seconds)
    }
}
