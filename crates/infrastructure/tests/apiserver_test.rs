use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use telemetry_domain::{ArrayDiscovery, ArrayMetadata, ArrayPatchInfo, DeviceType};
use telemetry_infrastructure::ApiServerConnection;

#[derive(Clone, Default)]
struct MockApiServer {
    patches: Arc<Mutex<Vec<(String, Value)>>>,
    reject_patches: bool,
}

async fn list_arrays() -> Json<Value> {
    Json(json!({
        "response": [
            {
                "id": "a1",
                "name": "fa-one",
                "mgmt_endpoint": "10.0.0.1",
                "api_token": "t1",
                "device_type": "FlashArray"
            },
            {
                "id": "b1",
                "name": "fb-one",
                "mgmt_endpoint": "10.0.0.2",
                "api_token": "t2",
                "device_type": "FlashBlade"
            }
        ]
    }))
}

async fn patch_array(
    State(server): State<MockApiServer>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    if server.reject_patches {
        return (StatusCode::BAD_REQUEST, "no such array").into_response();
    }
    let id = query.get("ids").cloned().unwrap_or_default();
    server.patches.lock().unwrap().push((id, body));
    StatusCode::OK.into_response()
}

async fn array_tags(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    match query.get("ids").map(String::as_str) {
        Some("a1") => Json(json!({
            "response": [
                { "id": "other", "tags": [{ "key": "site", "namespace": "pure1", "value": "wrong" }] },
                {
                    "id": "a1",
                    "tags": [
                        { "key": "site", "namespace": "pure1", "value": "lab" },
                        { "key": "", "namespace": "pure1", "value": "ignored" },
                        { "key": "owner", "namespace": "pure1", "value": "storage-team" }
                    ]
                }
            ]
        })),
        Some("mismatch") => Json(json!({ "response": [{ "id": "someone-else", "tags": [] }] })),
        _ => Json(json!({ "response": [] })),
    }
}

async fn spawn(server: MockApiServer) -> String {
    let app = Router::new()
        .route("/arrays", get(list_arrays).patch(patch_array))
        .route("/arrays/tags", get(array_tags))
        .with_state(server);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/")
}

#[tokio::test]
async fn test_discovers_registered_arrays() {
    let base = spawn(MockApiServer::default()).await;
    let connection = ApiServerConnection::new(&base).unwrap();

    let arrays = connection.get_arrays().await.unwrap();

    assert_eq!(arrays.len(), 2);
    assert_eq!(arrays[0].device_type, DeviceType::FlashArray);
    assert_eq!(arrays[1].device_type, DeviceType::FlashBlade);
    assert_eq!(arrays[1].mgmt_endpoint, "10.0.0.2");
}

#[tokio::test]
async fn test_patch_omits_empty_fields() {
    let server = MockApiServer::default();
    let base = spawn(server.clone()).await;
    let connection = ApiServerConnection::new(&base).unwrap();

    let patch = ArrayPatchInfo {
        status: "Connected".to_string(),
        model: "FA-X70R3".to_string(),
        version: String::new(),
        as_of: "2024-03-10T12:00:00.000".to_string(),
    };
    connection.patch("a1", &patch).await.unwrap();

    let patches = server.patches.lock().unwrap().clone();
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0].0, "a1");
    assert_eq!(
        patches[0].1,
        json!({ "status": "Connected", "model": "FA-X70R3", "_as_of": "2024-03-10T12:00:00.000" })
    );
}

#[tokio::test]
async fn test_rejected_patch_is_an_error() {
    let base = spawn(MockApiServer {
        reject_patches: true,
        ..Default::default()
    })
    .await;
    let connection = ApiServerConnection::new(&base).unwrap();

    assert!(connection
        .patch("a1", &ArrayPatchInfo::default())
        .await
        .is_err());
}

#[tokio::test]
async fn test_tags_for_matching_array() {
    let base = spawn(MockApiServer::default()).await;
    let connection = ApiServerConnection::new(&base).unwrap();

    let tags = connection.get_tags("a1").await.unwrap();

    assert_eq!(tags.len(), 2);
    assert_eq!(tags["site"], "lab");
    assert_eq!(tags["owner"], "storage-team");
}

#[tokio::test]
async fn test_tag_lookup_failures() {
    let base = spawn(MockApiServer::default()).await;
    let connection = ApiServerConnection::new(&base).unwrap();

    let empty = connection.get_tags("unknown").await.unwrap_err();
    assert!(empty.to_string().contains("Response contained no arrays"));

    let mismatch = connection.get_tags("mismatch").await.unwrap_err();
    assert!(mismatch
        .to_string()
        .contains("Response did not contain an array with the matching ID"));
}

#[tokio::test]
async fn test_array_id_is_url_encoded() {
    let server = MockApiServer::default();
    let base = spawn(server.clone()).await;
    let connection = ApiServerConnection::new(&base).unwrap();

    let id = "fa 01&ids=other#x";
    connection
        .patch(id, &ArrayPatchInfo::default())
        .await
        .unwrap();

    let patches = server.patches.lock().unwrap().clone();
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0].0, id);

    // Unknown id round-trips intact and matches nothing
    let err = connection.get_tags(id).await.unwrap_err();
    assert!(err.to_string().contains("Response contained no arrays"));
}
