//! Response body retrieval
//!
//! Bodies are fetched out of band after `LoadingFinished` and merged back by id.

use crate::error::{Result, TrackerError};
use crate::record::ResponseBody;
use async_trait::async_trait;
use base64::Engine;
use cdp_types::domains::network::GetResponseBodyResult;
use cdp_types::{CdpError, RequestId};
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Protocol command used to retrieve a finished request's body
pub const GET_RESPONSE_BODY: &str = "Network.getResponseBody";

impl ResponseBody {
    /// Raw bytes, decoding base64 when the browser encoded the body
    pub fn decoded_bytes(&self) -> Result<Vec<u8>> {
        if self.base64_encoded {
            Ok(base64::engine::general_purpose::STANDARD.decode(self.body.as_bytes())?)
        } else {
            Ok(self.body.as_bytes().to_vec())
        }
    }

    /// Body as text, lossy for non-UTF-8 binary content
    pub fn decoded_text(&self) -> Result<String> {
        if !self.base64_encoded {
            return Ok(self.body.clone());
        }
        let bytes = self.decoded_bytes()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Source of response bodies
#[async_trait]
pub trait BodyFetcher: Send + Sync {
    async fn fetch_body(&self, request_id: &RequestId) -> Result<ResponseBody>;
}

/// Sends a protocol command to the attached target and awaits its result
#[async_trait]
pub trait CommandSender: Send + Sync {
    async fn send_command(&self, method: &str, params: Value) -> std::result::Result<Value, CdpError>;
}

/// Fetches bodies with `Network.getResponseBody`
pub struct ProtocolBodyFetcher<S> {
    sender: S,
}

impl<S: CommandSender> ProtocolBodyFetcher<S> {
    pub fn new(sender: S) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl<S: CommandSender> BodyFetcher for ProtocolBodyFetcher<S> {
    async fn fetch_body(&self, request_id: &RequestId) -> Result<ResponseBody> {
        let result = self
            .sender
            .send_command(GET_RESPONSE_BODY, json!({ "requestId": request_id }))
            .await?;

        if result.is_null() {
            return Err(TrackerError::BodyUnavailable(request_id.clone()));
        }
        let decoded: GetResponseBodyResult = serde_json::from_value(result).map_err(|e| {
            CdpError::new(-32603, format!("Invalid {} result: {}", GET_RESPONSE_BODY, e))
        })?;

        debug!(
            "Fetched body for request {} ({} bytes, base64: {})",
            request_id,
            decoded.body.len(),
            decoded.base64_encoded
        );
        Ok(ResponseBody::new(decoded.body, decoded.base64_encoded))
    }
}

/// In-memory body source, for replaying captures and for tests
#[derive(Debug, Clone, Default)]
pub struct BodyCache {
    bodies: Arc<RwLock<HashMap<RequestId, ResponseBody>>>,
}

impl BodyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, request_id: impl Into<RequestId>, body: ResponseBody) {
        self.bodies.write().insert(request_id.into(), body);
    }

    pub fn remove(&self, request_id: &RequestId) -> Option<ResponseBody> {
        self.bodies.write().remove(request_id)
    }

    pub fn len(&self) -> usize {
        self.bodies.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.read().is_empty()
    }
}

#[async_trait]
impl BodyFetcher for BodyCache {
    async fn fetch_body(&self, request_id: &RequestId) -> Result<ResponseBody> {
        self.bodies
            .read()
            .get(request_id)
            .cloned()
            .ok_or_else(|| TrackerError::BodyUnavailable(request_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct FakeBrowser {
        reply: std::result::Result<Value, CdpError>,
    }

    #[async_trait]
    impl CommandSender for FakeBrowser {
        async fn send_command(
            &self,
            method: &str,
            params: Value,
        ) -> std::result::Result<Value, CdpError> {
            assert_eq!(method, GET_RESPONSE_BODY);
            assert_eq!(params["requestId"], "7");
            self.reply.clone()
        }
    }

    #[test]
    fn test_decode_base64_body() {
        let body = ResponseBody::new("aGVsbG8=", true);
        assert_eq!(body.decoded_bytes().unwrap(), b"hello".to_vec());
        assert_eq!(body.decoded_text().unwrap(), "hello");

        let plain = ResponseBody::new("hello", false);
        assert_eq!(plain.decoded_text().unwrap(), "hello");
    }

    #[test]
    fn test_invalid_base64() {
        let body = ResponseBody::new("not base64!!", true);
        assert!(matches!(
            body.decoded_bytes(),
            Err(TrackerError::InvalidBodyEncoding(_))
        ));
    }

    #[tokio::test]
    async fn test_protocol_fetcher() {
        let fetcher = ProtocolBodyFetcher::new(FakeBrowser {
            reply: Ok(json!({"body": "{}", "base64Encoded": false})),
        });
        let body = fetcher.fetch_body(&RequestId::from("7")).await.unwrap();
        assert_eq!(body.body, "{}");
        assert!(!body.base64_encoded);
    }

    #[tokio::test]
    async fn test_protocol_fetcher_error() {
        let fetcher = ProtocolBodyFetcher::new(FakeBrowser {
            reply: Err(CdpError::resource_not_found("7")),
        });
        match fetcher.fetch_body(&RequestId::from("7")).await {
            Err(TrackerError::Protocol(error)) => {
                assert_eq!(error.message, "No resource with given identifier found: 7");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_body_cache() {
        let cache = BodyCache::new();
        cache.insert("1", ResponseBody::new("ok", false));

        assert_eq!(cache.fetch_body(&RequestId::from("1")).await.unwrap().body, "ok");
        assert!(matches!(
            cache.fetch_body(&RequestId::from("2")).await,
            Err(TrackerError::BodyUnavailable(_))
        ));
    }
}
