//! Forwarding of unmatched requests to project origins.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};

mod common;

use common::OriginResponse;

fn remote_config(origin: &str) -> Value {
    json!({
        "projects": [{
            "uuid": "p-remote",
            "name": "remote",
            "urlPrefix": origin,
            "endpoints": [
                {"uuid": "known", "path": "/known", "method": "GET", "enable": true,
                 "request": {"params": "?id=1", "body": {}}, "response": "mocked"}
            ]
        }]
    })
}

#[tokio::test]
async fn unmatched_request_is_forwarded() {
    let (origin, mut seen) = common::start_fixed_origin(OriginResponse::text(200, "from origin")).await;
    let server = common::start_server(remote_config(&format!("http://{origin}"))).await;

    let res = common::client()
        .get(format!("{}/remote/users/7?active=true", server.base_url))
        .header("x-trace", "abc")
        .header("accept-encoding", "br")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "from origin");

    let request = seen.recv().await.unwrap();
    assert_eq!(request.method, "GET");
    assert_eq!(request.target, "/users/7?active=true");
    assert_eq!(request.header("host"), Some("127.0.0.1"));
    assert_eq!(request.header("x-trace"), Some("abc"));
    assert_ne!(request.header("accept-encoding"), Some("br"));
    assert!(request.body.is_empty());
}

#[tokio::test]
async fn post_body_and_upstream_status_pass_through() {
    let (origin, mut seen) = common::start_fixed_origin(OriginResponse::text(409, "conflict")).await;
    let server = common::start_server(remote_config(&format!("http://{origin}/"))).await;

    let res = common::client()
        .post(format!("{}/remote/orders", server.base_url))
        .json(&json!({"qty": 2}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(res.text().await.unwrap(), "conflict");

    let request = seen.recv().await.unwrap();
    assert_eq!(request.target, "/orders");
    assert_eq!(serde_json::from_slice::<Value>(&request.body).unwrap(), json!({"qty": 2}));
}

#[tokio::test]
async fn gzip_upstream_is_decoded() {
    let (origin, _seen) = common::start_fixed_origin(OriginResponse::gzip(200, "compressed hello")).await;
    let server = common::start_server(remote_config(&format!("http://{origin}"))).await;

    let res = common::client()
        .get(format!("{}/remote/zipped", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get("content-encoding").is_none());
    assert_eq!(res.text().await.unwrap(), "compressed hello");
}

#[tokio::test]
async fn relaxed_match_beats_forwarding() {
    let (origin, mut seen) = common::start_fixed_origin(OriginResponse::text(200, "from origin")).await;
    let server = common::start_server(remote_config(&format!("http://{origin}"))).await;
    let client = common::client();

    let res = client
        .get(format!("{}/remote/known?id=1&x=2", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.text().await.unwrap(), "mocked");

    // different value for the declared key: no candidate, forwarded
    let res = client
        .get(format!("{}/remote/known?id=2", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.text().await.unwrap(), "from origin");
    assert_eq!(seen.recv().await.unwrap().target, "/known?id=2");
    assert!(tokio::time::timeout(Duration::from_millis(50), seen.recv()).await.is_err());
}

#[tokio::test]
async fn unreachable_origin_is_bad_gateway() {
    // bind and drop to get a port nobody listens on
    let closed = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let origin = closed.local_addr().unwrap();
    drop(closed);

    let server = common::start_server(remote_config(&format!("http://{origin}"))).await;
    let mut events = server.app.events().subscribe();

    let res = common::client()
        .get(format!("{}/remote/anything", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

    let event = events.recv().await.unwrap();
    assert_eq!(event.kind, apimocker::observability::EventKind::Error);
    assert_eq!(event.matched, Some(false));
    assert_eq!(event.path.as_deref(), Some("/remote/anything"));
}
