//! Identity and redirect resolution for initiating events
//!
//! The browser reuses one request id across every hop of a redirect chain. An initiating event
//! that carries a redirect response for a known id therefore continues the existing record
//! instead of starting a new one.

use crate::record::{placeholder_url, LogicalRequest, RequestPatch, DEFAULT_RESOURCE_TYPE};
use crate::store::{RequestStore, Upsert};
use cdp_types::domains::network::RequestWillBeSent;
use cdp_types::RequestId;
use tracing::debug;

/// How an initiating event was folded into the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// First sighting of the id; a record was appended
    Created(RequestId),
    /// Redirect continuation of an existing record
    Redirected {
        id: RequestId,
        from: String,
        to: String,
    },
    /// Re-delivery of an initiating event for a known id; fields were merged
    Duplicate(RequestId),
}

impl Resolution {
    /// The record the event resolved to
    pub fn id(&self) -> &RequestId {
        match self {
            Resolution::Created(id) | Resolution::Duplicate(id) => id,
            Resolution::Redirected { id, .. } => id,
        }
    }
}

/// Fold a `requestWillBeSent` event into the store
pub fn resolve_initiated(store: &mut RequestStore, event: RequestWillBeSent) -> Resolution {
    let id = event.request_id.clone();
    let is_redirect = event
        .redirect_response
        .as_ref()
        .is_some_and(|response| !response.is_empty());

    if is_redirect && store.contains(&id) {
        let to = event
            .request
            .url
            .clone()
            .unwrap_or_else(|| placeholder_url(&id));
        let redirect_status = event.redirect_response.as_ref().and_then(|r| r.status);
        let mut from = String::new();

        store.update(&id, |record| {
            from = std::mem::replace(&mut record.url, to.clone());
            record.redirect_chain.push(from.clone());
            record.redirected = true;
            if redirect_status.is_some() {
                record.redirect_status = redirect_status;
            }
        });

        debug!("Redirect for request {}: {} -> {}", id, from, to);
        return Resolution::Redirected { id, from, to };
    }

    let record = initial_record(&event);
    // A re-delivery may fill in a missing URL but never undoes a redirect
    let keep_url = store
        .get(&id)
        .is_some_and(|existing| existing.url != placeholder_url(&id));
    let mut patch = duplicate_patch(event);
    if keep_url {
        patch.url = None;
    }
    match store.upsert_create(record, patch) {
        Upsert::Created => Resolution::Created(id),
        Upsert::Merged => {
            debug!("Duplicate initiating event for request {}", id);
            Resolution::Duplicate(id)
        }
    }
}

fn initial_record(event: &RequestWillBeSent) -> LogicalRequest {
    let request = &event.request;
    let url = request
        .url
        .clone()
        .unwrap_or_else(|| placeholder_url(&event.request_id));

    let mut record = LogicalRequest::new(event.request_id.clone(), url);
    if let Some(method) = request.method.as_ref().filter(|m| !m.is_empty()) {
        record.method = method.clone();
    }
    record.request_headers = request.headers.clone();
    record.post_data = request.post_data.clone();
    record.has_post_data = request.has_post_data.unwrap_or(request.post_data.is_some());
    record.timestamp = event.timestamp;
    if let Some(wall_time) = event.wall_time.filter(|t| t.is_finite() && *t > 0.0) {
        record.created_at_ms = wall_time * 1000.0;
    }
    record.resource_type = Some(
        event
            .resource_type
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_RESOURCE_TYPE.to_string()),
    );
    record.frame_id = event.frame_id.clone();
    record
}

/// Fields a re-delivered initiating event may contribute without disturbing response state
fn duplicate_patch(event: RequestWillBeSent) -> RequestPatch {
    let request = event.request;
    RequestPatch {
        url: request.url,
        method: request.method.filter(|m| !m.is_empty()),
        request_headers: Some(request.headers).filter(|h| !h.is_empty()),
        has_post_data: request
            .has_post_data
            .or(request.post_data.as_ref().map(|_| true)),
        post_data: request.post_data,
        resource_type: event.resource_type,
        frame_id: event.frame_id,
        ..Default::default()
    }
}
