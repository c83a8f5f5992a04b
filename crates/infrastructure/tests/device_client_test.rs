use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use telemetry_core::TelemetryError;
use telemetry_infrastructure::device::DeviceClientSettings;
use telemetry_infrastructure::flasharray::{FlashArrayApi, FlashArrayClient};
use telemetry_infrastructure::flashblade::{FlashBladeApi, FlashBladeClient};

#[derive(Default)]
struct DeviceState {
    script: VecDeque<StatusCode>,
    info_gets: usize,
    session_posts: usize,
    credentials: Vec<Option<String>>,
    performance_queries: Vec<HashMap<String, String>>,
}

/// Scripted management endpoint speaking both families' dialects
#[derive(Clone, Default)]
struct MockDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl MockDevice {
    fn scripted(statuses: &[u16]) -> Self {
        let device = Self::default();
        device.state.lock().unwrap().script = statuses
            .iter()
            .map(|s| StatusCode::from_u16(*s).unwrap())
            .collect();
        device
    }

    /// Record an info GET and return the scripted status
    fn next_status(&self, credential: Option<String>) -> StatusCode {
        let mut state = self.state.lock().unwrap();
        state.info_gets += 1;
        state.credentials.push(credential);
        state.script.pop_front().unwrap_or(StatusCode::OK)
    }

    fn info_gets(&self) -> usize {
        self.state.lock().unwrap().info_gets
    }

    fn session_posts(&self) -> usize {
        self.state.lock().unwrap().session_posts
    }

    fn credentials(&self) -> Vec<Option<String>> {
        self.state.lock().unwrap().credentials.clone()
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn api_version() -> Json<serde_json::Value> {
    Json(json!({ "version": ["1.5", "1.7"], "versions": ["1.4", "1.5"] }))
}

async fn fa_session(State(device): State<MockDevice>) -> Response {
    device.state.lock().unwrap().session_posts += 1;
    (
        [("set-cookie", "session=abc123; Path=/; HttpOnly")],
        Json(json!({ "username": "pureuser" })),
    )
        .into_response()
}

async fn fa_array(State(device): State<MockDevice>, headers: HeaderMap) -> Response {
    match device.next_status(header(&headers, "cookie")) {
        StatusCode::OK => Json(json!({
            "array_name": "fa-mock",
            "id": "dev-1",
            "version": "5.3.0"
        }))
        .into_response(),
        status => status.into_response(),
    }
}

async fn fa_hosts() -> Response {
    ([("x-total-item-count", "12")], Json(json!([{ "name": "h1" }]))).into_response()
}

async fn fb_login(State(device): State<MockDevice>, headers: HeaderMap) -> Response {
    if header(&headers, "api-token").as_deref() != Some("fb-token") {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    device.state.lock().unwrap().session_posts += 1;
    ([("x-auth-token", "fb-session")], Json(json!({}))).into_response()
}

async fn fb_arrays(State(device): State<MockDevice>, headers: HeaderMap) -> Response {
    match device.next_status(header(&headers, "x-auth-token")) {
        StatusCode::OK => Json(json!({
            "items": [{ "id": "blade-1", "name": "fb-mock", "version": "2.1.0" }],
            "pagination_info": { "total_item_count": 1, "continuation_token": null }
        }))
        .into_response(),
        status => status.into_response(),
    }
}

async fn fb_file_system_performance(
    State(device): State<MockDevice>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let token = query.get("token").cloned();
    device
        .state
        .lock()
        .unwrap()
        .performance_queries
        .push(query);

    let (name, next) = match token.as_deref() {
        None => ("fs1", json!("page-2")),
        Some("page-2") => ("fs2", json!("")),
        Some(_) => return StatusCode::BAD_REQUEST.into_response(),
    };
    Json(json!({
        "items": [{ "name": name, "reads_per_sec": 10.5, "time": 1_700_000_000_000i64 }],
        "pagination_info": { "total_item_count": 2, "continuation_token": next }
    }))
    .into_response()
}

async fn spawn(device: MockDevice) -> String {
    let app = Router::new()
        .route("/api/api_version", get(api_version))
        .route("/api/1.7/auth/session", post(fa_session))
        .route("/api/1.7/array", get(fa_array))
        .route("/api/1.7/host", get(fa_hosts))
        .route("/api/login", post(fb_login))
        .route("/api/1.5/arrays", get(fb_arrays))
        .route(
            "/api/1.5/file-systems/performance",
            get(fb_file_system_performance),
        )
        .with_state(device);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr.to_string()
}

async fn flash_array(device: &MockDevice) -> FlashArrayClient {
    let endpoint = spawn(device.clone()).await;
    FlashArrayClient::connect("mock-fa", &endpoint, "fa-token", &DeviceClientSettings::plain_http())
        .await
        .unwrap()
}

async fn flash_blade(device: &MockDevice) -> FlashBladeClient {
    let endpoint = spawn(device.clone()).await;
    FlashBladeClient::connect("mock-fb", &endpoint, "fb-token", &DeviceClientSettings::plain_http())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_api_version_negotiation() {
    let device = MockDevice::default();
    assert_eq!(flash_array(&device).await.api_version(), "1.7");
    assert_eq!(flash_blade(&device).await.api_version(), "1.5");
}

#[tokio::test]
async fn test_expired_session_is_refreshed_exactly_once() {
    let device = MockDevice::scripted(&[401, 200]);
    let client = flash_array(&device).await;

    let info = client.get_array_info().await.unwrap();

    assert_eq!(info.array_name, "fa-mock");
    assert_eq!(device.session_posts(), 1);
    assert_eq!(device.info_gets(), 2);
    assert_eq!(
        device.credentials(),
        vec![None, Some("session=abc123".to_string())]
    );
}

#[tokio::test]
async fn test_three_server_errors_exhaust_the_attempt_budget() {
    let device = MockDevice::scripted(&[500, 500, 500]);
    let client = flash_array(&device).await;

    let result = client.get_array_info().await;

    assert!(matches!(
        result,
        Err(TelemetryError::NoSuccessfulRequest { ref url }) if url.ends_with("/api/1.7/array")
    ));
    assert_eq!(device.info_gets(), 3);
    assert_eq!(device.session_posts(), 0);
}

#[tokio::test]
async fn test_server_error_then_success() {
    let device = MockDevice::scripted(&[500, 200]);
    let client = flash_array(&device).await;

    assert!(client.get_array_info().await.is_ok());
    assert_eq!(device.info_gets(), 2);
}

#[tokio::test]
async fn test_unexpected_status_fails_without_retry() {
    let device = MockDevice::scripted(&[404]);
    let client = flash_array(&device).await;

    let result = client.get_array_info().await;

    assert!(matches!(result, Err(TelemetryError::NoSuccessfulRequest { .. })));
    assert_eq!(device.info_gets(), 1);
}

#[tokio::test]
async fn test_transport_error_fails_immediately() {
    let closed_port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let result = FlashArrayClient::connect(
        "offline",
        &format!("127.0.0.1:{closed_port}"),
        "fa-token",
        &DeviceClientSettings::plain_http(),
    )
    .await;

    assert!(matches!(result, Err(TelemetryError::Network(_))));
}

#[tokio::test]
async fn test_count_comes_from_total_item_header() {
    let device = MockDevice::default();
    let client = flash_array(&device).await;

    assert_eq!(client.get_host_count().await.unwrap(), 12);
}

#[tokio::test]
async fn test_flash_blade_session_travels_as_auth_header() {
    let device = MockDevice::scripted(&[403, 200]);
    let client = flash_blade(&device).await;

    let info = client.get_array_info().await.unwrap();

    assert_eq!(info.name, "fb-mock");
    assert_eq!(device.session_posts(), 1);
    assert_eq!(
        device.credentials(),
        vec![None, Some("fb-session".to_string())]
    );
}

#[tokio::test]
async fn test_file_system_performance_follows_continuation_tokens() {
    let device = MockDevice::default();
    let client = flash_blade(&device).await;

    let samples = client.get_file_system_performance_metrics(30).await.unwrap();

    let names: Vec<&str> = samples.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["fs1", "fs2"]);

    let queries = device.state.lock().unwrap().performance_queries.clone();
    assert_eq!(queries.len(), 2);
    let first = &queries[0];
    assert_eq!(first["protocol"], "nfs");
    let start: i64 = first["start_time"].parse().unwrap();
    let end: i64 = first["end_time"].parse().unwrap();
    assert_eq!(end - start, 31_000);
    assert_eq!(end % 1000, 0);
    assert_eq!(queries[1]["token"], "page-2");
}
