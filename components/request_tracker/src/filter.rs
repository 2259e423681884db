//! Filter and query view over the request store
//!
//! Every query produces a fresh projection; there is no incremental index.

use crate::error::TrackerError;
use crate::record::LogicalRequest;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Resource types with a dedicated filter bucket; anything else falls under [`TypeFilter::Other`]
pub const KNOWN_RESOURCE_TYPES: [&str; 11] = [
    "fetch",
    "xhr",
    "document",
    "script",
    "image",
    "stylesheet",
    "font",
    "media",
    "manifest",
    "websocket",
    "wasm",
];

/// Resource-type bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeFilter {
    #[default]
    All,
    /// Fetch and XHR together
    Fetch,
    Doc,
    Css,
    Js,
    Font,
    Img,
    Media,
    Manifest,
    Socket,
    Wasm,
    /// Complement of every known type (not the literal tag)
    Other,
}

impl TypeFilter {
    /// Whether a lower-cased resource type falls into this bucket
    pub fn matches(&self, resource_type: &str) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Fetch => resource_type == "fetch" || resource_type == "xhr",
            TypeFilter::Doc => resource_type == "document",
            TypeFilter::Css => resource_type == "stylesheet",
            TypeFilter::Js => resource_type == "script",
            TypeFilter::Font => resource_type == "font",
            TypeFilter::Img => resource_type == "image",
            TypeFilter::Media => resource_type == "media",
            TypeFilter::Manifest => resource_type == "manifest",
            TypeFilter::Socket => resource_type == "websocket",
            TypeFilter::Wasm => resource_type == "wasm",
            TypeFilter::Other => {
                !resource_type.is_empty() && !KNOWN_RESOURCE_TYPES.contains(&resource_type)
            }
        }
    }
}

impl FromStr for TypeFilter {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let filter = match s.to_ascii_lowercase().as_str() {
            "" | "all" => TypeFilter::All,
            "fetch" | "xhr" | "fetch/xhr" => TypeFilter::Fetch,
            "doc" | "document" => TypeFilter::Doc,
            "css" | "stylesheet" => TypeFilter::Css,
            "js" | "script" => TypeFilter::Js,
            "font" => TypeFilter::Font,
            "img" | "image" => TypeFilter::Img,
            "media" => TypeFilter::Media,
            "manifest" => TypeFilter::Manifest,
            "socket" | "ws" | "websocket" => TypeFilter::Socket,
            "wasm" => TypeFilter::Wasm,
            "other" => TypeFilter::Other,
            _ => return Err(TrackerError::UnknownTypeFilter(s.to_string())),
        };
        Ok(filter)
    }
}

/// Text and type filter over the request store
///
/// The type bucket is AND'ed with the text filter; the text filter is OR'ed across the enabled
/// fields. An empty text matches everything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterSpec {
    pub text: String,
    pub match_url: bool,
    pub match_headers: bool,
    pub match_method: bool,
    pub resource_type: TypeFilter,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            text: String::new(),
            match_url: true,
            match_headers: false,
            match_method: false,
            resource_type: TypeFilter::All,
        }
    }
}

impl FilterSpec {
    /// Filter matching every record
    pub fn all() -> Self {
        Self::default()
    }

    /// Set the search text
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Restrict to a resource-type bucket
    pub fn with_type(mut self, resource_type: TypeFilter) -> Self {
        self.resource_type = resource_type;
        self
    }

    /// Choose which fields the search text is matched against
    pub fn matching(mut self, url: bool, headers: bool, method: bool) -> Self {
        self.match_url = url;
        self.match_headers = headers;
        self.match_method = method;
        self
    }

    /// Whether this filter can exclude anything
    pub fn is_active(&self) -> bool {
        !self.text.trim().is_empty() || self.resource_type != TypeFilter::All
    }

    /// Whether `record` passes the filter
    pub fn matches(&self, record: &LogicalRequest) -> bool {
        if !self.resource_type.matches(&record.resource_type_lower()) {
            return false;
        }
        if self.text.is_empty() {
            return true;
        }

        let needle = self.text.to_lowercase();
        if self.match_url && record.url.to_lowercase().contains(&needle) {
            return true;
        }
        if self.match_headers
            && record
                .request_headers
                .iter()
                .chain(record.response_headers.iter())
                .any(|(name, value)| {
                    name.to_lowercase().contains(&needle) || value.to_lowercase().contains(&needle)
                })
        {
            return true;
        }
        self.match_method && record.method.to_lowercase().contains(&needle)
    }

    /// Project the matching records, preserving order
    pub fn apply<'a, I>(&self, records: I) -> Vec<LogicalRequest>
    where
        I: IntoIterator<Item = &'a LogicalRequest>,
    {
        records
            .into_iter()
            .filter(|record| self.matches(record))
            .cloned()
            .collect()
    }
}
