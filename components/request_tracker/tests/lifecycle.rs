// Lifecycle reconstruction scenarios driven through the public reducer API

use pretty_assertions::assert_eq;
use request_tracker::{
    EventReducer, FilterSpec, RequestId, RequestStatus, Transition, TypeFilter, Unchanged,
};
use serde_json::{json, Value};

fn id(s: &str) -> RequestId {
    RequestId::from(s)
}

fn initiated(request_id: &str, url: &str, resource_type: &str) -> Value {
    json!({
        "requestId": request_id,
        "request": {"url": url, "method": "GET", "headers": {"Accept": "*/*"}},
        "timestamp": 100.0,
        "type": resource_type,
        "frameId": "main"
    })
}

fn ids(records: &[request_tracker::LogicalRequest]) -> Vec<&str> {
    records.iter().map(|r| r.id.as_str()).collect()
}

#[test]
fn test_idempotent_creation() {
    let mut reducer = EventReducer::new();
    let event = initiated("A", "https://a/x", "Document");

    assert_eq!(
        reducer.apply_raw("Network.requestWillBeSent", event.clone()),
        Transition::Created(id("A"))
    );
    assert_eq!(
        reducer.apply_raw("Network.requestWillBeSent", event),
        Transition::Merged(id("A"))
    );

    assert_eq!(reducer.store().ids(), &[id("A")]);
    assert_eq!(reducer.diagnostics().duplicate_initiations, 1);
    assert_eq!(reducer.diagnostics().distinct_duplicate_ids(), 1);
}

#[test]
fn test_duplicate_initiation_keeps_response_state() {
    let mut reducer = EventReducer::new();
    let event = initiated("A", "https://a/x", "Document");
    reducer.apply_raw("Network.requestWillBeSent", event.clone());
    reducer.apply_raw(
        "Network.responseReceived",
        json!({"requestId": "A", "response": {"status": 200}}),
    );
    reducer.apply_raw("Network.requestWillBeSent", event);

    assert_eq!(reducer.get(&id("A")).unwrap().status, RequestStatus::Code(200));
}

#[test]
fn test_duplicate_ids_reset_on_clear() {
    let mut reducer = EventReducer::new();
    let event = initiated("A", "https://a/x", "Document");
    reducer.apply_raw("Network.requestWillBeSent", event.clone());
    reducer.apply_raw("Network.requestWillBeSent", event);
    assert_eq!(reducer.diagnostics().distinct_duplicate_ids(), 1);

    reducer.clear();
    assert_eq!(reducer.diagnostics().distinct_duplicate_ids(), 0);
    assert_eq!(reducer.diagnostics().duplicate_initiations, 1);
}

#[test]
fn test_partial_response_keeps_known_status() {
    let mut reducer = EventReducer::new();
    reducer.apply_raw("Network.requestWillBeSent", initiated("A", "https://a/x", "Fetch"));
    reducer.apply_raw(
        "Network.responseReceived",
        json!({"requestId": "A", "response": {"status": 200}}),
    );
    reducer.apply_raw(
        "Network.responseReceived",
        json!({"requestId": "A", "response": {}}),
    );

    let record = reducer.get(&id("A")).unwrap();
    assert_eq!(record.status, RequestStatus::Code(200));
    assert!(!record.is_pending());

    assert_eq!(reducer.cancel_pending(), 0);
    assert_eq!(reducer.get(&id("A")).unwrap().status, RequestStatus::Code(200));
}

#[test]
fn test_redirect_collapse() {
    let mut reducer = EventReducer::new();
    reducer.apply_raw("Network.requestWillBeSent", initiated("A", "https://a/u1", "Document"));
    let transition = reducer.apply_raw(
        "Network.requestWillBeSent",
        json!({
            "requestId": "A",
            "request": {"url": "https://a/u2", "method": "GET"},
            "redirectResponse": {"url": "https://a/u1", "status": 302, "headers": {}}
        }),
    );

    assert_eq!(transition, Transition::Redirected(id("A")));
    let all = reducer.query(&FilterSpec::all());
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].url, "https://a/u2");
    assert_eq!(all[0].redirect_chain, vec!["https://a/u1".to_string()]);
    assert!(all[0].redirected);
    assert_eq!(all[0].redirect_status, Some(302));
    assert_eq!(reducer.store().ids().len(), 1);
}

#[test]
fn test_out_of_order_response_is_dropped() {
    let mut reducer = EventReducer::new();
    let transition = reducer.apply_raw(
        "Network.responseReceived",
        json!({"requestId": "B", "response": {"status": 404, "headers": {"X-Early": "1"}}}),
    );
    assert_eq!(
        transition,
        Transition::Unchanged(Unchanged::UnknownRequest(
            request_tracker::EventKind::ResponseReceived
        ))
    );
    assert!(reducer.store().is_empty());

    reducer.apply_raw("Network.requestWillBeSent", initiated("B", "https://a/b", "Fetch"));
    let record = reducer.get(&id("B")).unwrap();
    assert_eq!(record.status, RequestStatus::Unset);
    assert!(record.response_headers.is_empty());
    assert_eq!(reducer.diagnostics().orphan_events, 1);
}

#[test]
fn test_extra_info_headers_merge() {
    let mut reducer = EventReducer::new();
    reducer.apply_raw("Network.requestWillBeSent", initiated("C", "https://a/c", "Fetch"));
    reducer.apply_raw(
        "Network.requestWillBeSentExtraInfo",
        json!({"requestId": "C", "headers": {"Cookie": "a=1", "X-Shared": "first"}}),
    );
    reducer.apply_raw(
        "Network.requestWillBeSentExtraInfo",
        json!({"requestId": "C", "headers": {"Origin": "https://a", "X-Shared": "second"}}),
    );

    let headers = &reducer.get(&id("C")).unwrap().request_headers;
    assert_eq!(headers.get("Cookie").map(String::as_str), Some("a=1"));
    assert_eq!(headers.get("Origin").map(String::as_str), Some("https://a"));
    assert_eq!(headers.get("X-Shared").map(String::as_str), Some("second"));
    assert_eq!(headers.get("Accept").map(String::as_str), Some("*/*"));
}

#[test]
fn test_failure_is_terminal() {
    let mut reducer = EventReducer::new();
    reducer.apply_raw("Network.requestWillBeSent", initiated("D", "https://a/d", "Script"));
    reducer.apply_raw(
        "Network.loadingFailed",
        json!({"requestId": "D", "errorText": "net::ERR_ABORTED"}),
    );
    reducer.apply_raw(
        "Network.responseReceived",
        json!({"requestId": "D", "response": {"status": 200}}),
    );

    let record = reducer.get(&id("D")).unwrap();
    assert!(record.failed);
    assert!(record.canceled);
    assert_eq!(record.status, RequestStatus::Canceled);
    assert_eq!(record.error_text.as_deref(), Some("net::ERR_ABORTED"));
}

#[test]
fn test_type_filter_buckets() {
    let mut reducer = EventReducer::new();
    for (request_id, resource_type) in [
        ("f", "Fetch"),
        ("x", "XHR"),
        ("s", "Script"),
        ("o", "Other"),
        ("b", "Beacon"),
    ] {
        reducer.apply_raw(
            "Network.requestWillBeSent",
            initiated(request_id, &format!("https://a/{}", request_id), resource_type),
        );
    }

    let fetch = reducer.query(&FilterSpec::all().with_type(TypeFilter::Fetch));
    assert_eq!(ids(&fetch), vec!["f", "x"]);

    // "other" is not a known type, so the literal tag lands in the complement bucket too
    let other = reducer.query(&FilterSpec::all().with_type(TypeFilter::Other));
    assert_eq!(ids(&other), vec!["o", "b"]);

    let js = reducer.query(&FilterSpec::all().with_type("js".parse().unwrap()));
    assert_eq!(ids(&js), vec!["s"]);
}

#[test]
fn test_served_from_cache() {
    let mut reducer = EventReducer::new();
    reducer.apply_raw("Network.requestWillBeSent", initiated("E", "https://a/e", "Image"));
    reducer.apply_raw("Network.requestServedFromCache", json!({"requestId": "E"}));
    assert!(reducer.get(&id("E")).unwrap().served_from_cache);

    let transition = reducer.apply_raw("Network.requestServedFromCache", json!({"requestId": "Z"}));
    assert_eq!(transition, Transition::Unchanged(Unchanged::UnrepresentableCacheHit));
    assert_eq!(reducer.diagnostics().cached_without_request, 1);
    assert_eq!(reducer.store().len(), 1);
}

#[test]
fn test_clear_on_main_frame_navigation_only() {
    let mut reducer = EventReducer::new();
    reducer.apply_raw("Network.requestWillBeSent", initiated("F", "https://a/f", "Document"));

    let child = reducer.apply_raw(
        "Page.frameNavigated",
        json!({"frame": {"id": "child", "parentId": "main", "url": "https://ads/"}}),
    );
    assert_eq!(child, Transition::Unchanged(Unchanged::ChildFrameNavigation));
    assert_eq!(reducer.store().len(), 1);

    let main = reducer.apply_raw(
        "Page.frameNavigated",
        json!({"frame": {"id": "main", "url": "https://a/next"}}),
    );
    assert_eq!(main, Transition::Cleared);
    assert!(reducer.store().is_empty());
}

#[test]
fn test_end_to_end_scenario() {
    let mut reducer = EventReducer::new();
    reducer.apply_raw(
        "RequestInitiated",
        json!({"requestId": "1", "request": {"url": "https://a/x", "method": "GET"}}),
    );
    reducer.apply_raw(
        "ResponseReceived",
        json!({"requestId": "1", "response": {"status": 200}}),
    );
    let finished = reducer.apply_raw(
        "LoadingFinished",
        json!({"requestId": "1", "encodedDataLength": 512}),
    );
    assert_eq!(finished.body_fetch_target(), Some(&id("1")));

    let records = reducer.query(&FilterSpec::default());
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.url, "https://a/x");
    assert_eq!(record.method, "GET");
    assert_eq!(record.status, RequestStatus::Code(200));
    assert!(record.finished);
    assert_eq!(record.size_bytes, Some(512));
}

#[test]
fn test_missing_url_gets_placeholder() {
    let mut reducer = EventReducer::new();
    reducer.apply_raw("Network.requestWillBeSent", json!({"requestId": "42"}));

    let record = reducer.get(&id("42")).unwrap();
    assert_eq!(record.url, "(no URL) 42");
    assert_eq!(record.method, "GET");
    assert_eq!(record.resource_type.as_deref(), Some("other"));
    assert_eq!(reducer.diagnostics().missing_urls, 1);
}

#[test]
fn test_reducer_survives_garbage() {
    let mut reducer = EventReducer::new();
    let inputs = [
        ("Network.requestWillBeSent", json!("not an object")),
        ("Network.responseReceived", json!({"requestId": 5})),
        ("Network.responseReceived", json!({"requestId": "5"})),
        ("Page.frameNavigated", json!({})),
        ("Runtime.consoleAPICalled", json!({"args": []})),
        ("", Value::Null),
    ];
    for (method, params) in inputs {
        let transition = reducer.apply_raw(method, params);
        assert!(!transition.changes_records());
    }
    assert_eq!(reducer.diagnostics().events_received, 6);
    assert!(reducer.store().is_empty());
}

#[test]
fn test_statistics() {
    let mut reducer = EventReducer::new();
    reducer.apply_raw("Network.requestWillBeSent", initiated("1", "https://a/1", "Document"));
    reducer.apply_raw("Network.requestWillBeSent", initiated("2", "https://a/2", "Script"));
    reducer.apply_raw(
        "Network.responseReceived",
        json!({"requestId": "1", "timestamp": 100.25, "response": {"status": 200}}),
    );
    reducer.apply_raw(
        "Network.loadingFinished",
        json!({"requestId": "1", "encodedDataLength": 2048}),
    );
    reducer.apply_raw(
        "Network.loadingFailed",
        json!({"requestId": "2", "errorText": "net::ERR_FAILED"}),
    );
    reducer.apply_raw(
        "Network.loadingFinished",
        json!({"requestId": "2", "encodedDataLength": 100}),
    );

    let stats = reducer.statistics();
    assert_eq!(stats.requests, 2);
    assert_eq!(stats.transferred, 2048);
    assert_eq!(stats.resources, 2148);
    assert_eq!(stats.finish_time_ms, Some(250.0));
}
