//! Tests for the HTTP API

use super::*;
use crate::hub::OverlayHub;
use crate::resolver::{ResolveError, StaticNameResolver};
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request};
use futures::StreamExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

struct FailingResolver;

#[async_trait]
impl NameResolver for FailingResolver {
    async fn names(&self, _mode: &str) -> Result<Vec<String>, ResolveError> {
        Err(ResolveError::Status {
            url: "http://upstream.test".to_string(),
            status: 500,
        })
    }
}

fn make_state(resolver: Arc<dyn NameResolver>, temp: &TempDir) -> Arc<ApiState> {
    Arc::new(ApiState {
        hub: Arc::new(OverlayHub::default()),
        resolver,
        providers: Arc::new(ProviderStore::new(temp.path().join("providers.json"))),
        keep_alive: Duration::from_secs(15),
    })
}

fn default_state(temp: &TempDir) -> Arc<ApiState> {
    let resolver = StaticNameResolver::new()
        .with_names("pokemon", ["pikachu", "charmander"])
        .with_names("digimon", ["Agumon"]);
    make_state(Arc::new(resolver), temp)
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(state: &Arc<ApiState>, request: Request<Body>) -> (StatusCode, Value) {
    let response = build_router(Arc::clone(state)).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_update_scenario() {
    let temp = TempDir::new().unwrap();
    let state = default_state(&temp);

    send(&state, post_json("/update", r#"{"action": "set_mode", "mode": "digimon"}"#)).await;
    let (status, body) = send(&state, post_json("/update", r#"{"action": "inc"}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "success": true,
            "state": {
                "counter": 1,
                "mode": "digimon",
                "shiny": false,
                "name": "",
                "generation": "default"
            }
        })
    );
}

#[tokio::test]
async fn test_update_malformed_body() {
    let temp = TempDir::new().unwrap();
    let state = default_state(&temp);
    let before = state.hub.snapshot();

    let (status, body) = send(&state, post_json("/update", "{oops")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("malformed"));

    let (status, _) = send(&state, post_json("/update", r#"{"name": "eevee"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(state.hub.snapshot(), before);
}

#[tokio::test]
async fn test_update_unknown_action_succeeds() {
    let temp = TempDir::new().unwrap();
    let state = default_state(&temp);

    let (status, body) = send(&state, post_json("/update", r#"{"action": "set_scale", "scale": 1.2}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["state"]["name"], json!("pikachu"));
}

#[tokio::test]
async fn test_names_follow_mode() {
    let temp = TempDir::new().unwrap();
    let state = default_state(&temp);

    let (_, body) = send(&state, get("/names")).await;
    assert_eq!(body, json!(["pikachu", "charmander"]));

    send(&state, post_json("/update", r#"{"action": "set_mode", "mode": "digimon"}"#)).await;
    let (_, body) = send(&state, get("/names")).await;
    assert_eq!(body, json!(["Agumon"]));

    send(&state, post_json("/update", r#"{"action": "set_mode", "mode": "monstercrown"}"#)).await;
    let (_, body) = send(&state, get("/names")).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_names_resolver_failure_is_empty() {
    let temp = TempDir::new().unwrap();
    let state = make_state(Arc::new(FailingResolver), &temp);

    let (status, body) = send(&state, get("/names")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_providers_round_trip() {
    let temp = TempDir::new().unwrap();
    let state = default_state(&temp);

    let (_, body) = send(&state, get("/api/providers")).await;
    assert_eq!(body, json!({}));

    let settings = r#"{"pokemon": {"enabled": true, "label": "Pokémon"}, "digimon": {"enabled": false}}"#;
    let (status, body) = send(&state, post_json("/api/providers", settings)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));

    let (_, body) = send(&state, get("/api/providers")).await;
    assert_eq!(body["pokemon"], json!({"enabled": true, "label": "Pokémon"}));
    assert_eq!(body["digimon"], json!({"enabled": false}));
}

async fn send_raw(state: &Arc<ApiState>, request: Request<Body>) -> (StatusCode, String) {
    let response = build_router(Arc::clone(state)).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn test_providers_are_stored_verbatim() {
    let temp = TempDir::new().unwrap();
    let state = default_state(&temp);

    let settings = r#"{"temtem":{"enabled":"yes","order":3},"pokemon":true,"digimon":{},"coromon":{"label":null}}"#;
    let (status, body) = send(&state, post_json("/api/providers", settings)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));

    let (status, body) = send_raw(&state, get("/api/providers")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, settings);
}

#[tokio::test]
async fn test_providers_rejects_non_object() {
    let temp = TempDir::new().unwrap();
    let state = default_state(&temp);

    let (status, _) = send(&state, post_json("/api/providers", "[1, 2]")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_providers_storage_failure() {
    let temp = TempDir::new().unwrap();
    let state = Arc::new(ApiState {
        hub: Arc::new(OverlayHub::default()),
        resolver: Arc::new(StaticNameResolver::new()),
        providers: Arc::new(ProviderStore::new(temp.path().join("missing").join("p.json"))),
        keep_alive: Duration::from_secs(15),
    });

    let (status, body) = send(&state, post_json("/api/providers", r#"{"pokemon": {"enabled": true}}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": false}));
}

#[tokio::test]
async fn test_state_and_health() {
    let temp = TempDir::new().unwrap();
    let state = default_state(&temp);

    let (_, body) = send(&state, get("/api/state")).await;
    assert_eq!(body["mode"], json!("pokemon"));

    let _sub = state.hub.subscribe().unwrap();
    let (_, body) = send(&state, get("/api/health")).await;
    assert_eq!(body, json!({"status": "ok", "subscribers": 1}));
}

#[tokio::test]
async fn test_stream_sends_state_immediately() {
    let temp = TempDir::new().unwrap();
    let state = default_state(&temp);

    let response = build_router(Arc::clone(&state)).oneshot(get("/stream")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
        "text/event-stream"
    );

    let mut body = response.into_body().into_data_stream();
    let frame = tokio::time::timeout(Duration::from_secs(2), body.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let text = String::from_utf8(frame.to_vec()).unwrap();
    assert!(text.starts_with("data:"));
    assert!(text.contains(r#""name":"pikachu""#));
    assert_eq!(state.hub.subscriber_count(), 1);

    drop(body);
    assert_eq!(state.hub.subscriber_count(), 0);
}

#[tokio::test]
async fn test_bind_accepts_hostname() {
    let listener = bind("localhost", 0).await.unwrap();
    let addr = listener.local_addr().unwrap();
    assert!(addr.ip().is_loopback());
    assert_ne!(addr.port(), 0);
}

#[tokio::test]
async fn test_bind_accepts_ip_literal() {
    let listener = bind("127.0.0.1", 0).await.unwrap();
    assert!(listener.local_addr().unwrap().ip().is_loopback());
}

/// Read SSE frames until one carries data, returning that data
async fn next_event(response: &mut reqwest::Response, buffer: &mut String) -> String {
    loop {
        if let Some(end) = buffer.find("\n\n") {
            let frame: String = buffer.drain(..end + 2).collect();
            let data: Vec<&str> = frame
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(str::trim_start)
                .collect();
            if data.is_empty() {
                continue;
            }
            return data.join("\n");
        }

        let chunk = tokio::time::timeout(Duration::from_secs(5), response.chunk())
            .await
            .expect("timed out waiting for stream data")
            .unwrap()
            .expect("stream ended");
        buffer.push_str(std::str::from_utf8(&chunk).unwrap());
    }
}

#[tokio::test]
async fn test_two_streams_receive_update_end_to_end() {
    let temp = TempDir::new().unwrap();
    let state = default_state(&temp);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(serve(listener, Arc::clone(&state), async move {
        let _ = shutdown_rx.await;
    }));

    let client = reqwest::Client::new();
    let base = format!("http://{}", addr);

    let mut streams = Vec::new();
    for _ in 0..2 {
        let mut response = client.get(format!("{}/stream", base)).send().await.unwrap();
        let mut buffer = String::new();
        let initial = next_event(&mut response, &mut buffer).await;
        assert!(initial.contains(r#""name":"pikachu""#));
        streams.push((response, buffer));
    }
    assert_eq!(state.hub.subscriber_count(), 2);

    let update: Value = client
        .post(format!("{}/update", base))
        .json(&json!({"action": "set_name", "name": "eevee"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(update["state"]["name"], json!("eevee"));

    for (response, buffer) in &mut streams {
        let event = next_event(response, buffer).await;
        let received: OverlayState = serde_json::from_str(&event).unwrap();
        assert_eq!(received.name, "eevee");
    }

    // Shutdown must close the open streams, otherwise serve never returns
    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not shut down")
        .unwrap()
        .unwrap();
    assert_eq!(state.hub.subscriber_count(), 0);
}
