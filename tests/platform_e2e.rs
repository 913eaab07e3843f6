//! End-to-end tests: dispatcher and MCP server against a mock platform API.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use genymotion_mcp::adb::AdbCli;
use genymotion_mcp::dispatch::{Dispatcher, ToolCall};
use genymotion_mcp::mcp::McpServer;
use genymotion_mcp::platform::PlatformClient;
use genymotion_mcp::tools::PlatformTools;
use genymotion_mcp::types::{AdbConfig, ApiToken, ErrorKind, PlatformConfig};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;

/// Request counters per endpoint.
#[derive(Default)]
struct Hits {
    recipes: AtomicUsize,
    instances: AtomicUsize,
    start: AtomicUsize,
    stop: AtomicUsize,
}

/// Helper: serve the mock platform on an ephemeral port, return its base URL.
async fn start_mock_platform(hits: Arc<Hits>) -> String {
    let app = Router::new()
        .route(
            "/v1/recipes",
            get(|State(hits): State<Arc<Hits>>| async move {
                hits.recipes.fetch_add(1, Ordering::SeqCst);
                Json(json!([{"id": "r1", "name": "Pixel6", "os": "13"}]))
            }),
        )
        .route(
            "/v1/recipes/{id}/start-disposable",
            post(
                |State(hits): State<Arc<Hits>>, Path(id): Path<String>, Json(body): Json<Value>| async move {
                    hits.start.fetch_add(1, Ordering::SeqCst);
                    Json(json!({
                        "instance": {
                            "uuid": "i-new",
                            "name": body["instance_name"],
                            "recipe": {"uuid": id},
                            "state": "CREATING",
                        }
                    }))
                },
            ),
        )
        .route(
            "/v1/instances",
            get(|State(hits): State<Arc<Hits>>| async move {
                hits.instances.fetch_add(1, Ordering::SeqCst);
                (StatusCode::INTERNAL_SERVER_ERROR, "backend unavailable")
            }),
        )
        .route(
            "/v1/instances/{id}/stop-disposable",
            post(|State(hits): State<Arc<Hits>>, Path(id): Path<String>| async move {
                hits.stop.fetch_add(1, Ordering::SeqCst);
                Json(json!({"uuid": id, "state": "OFF"}))
            }),
        )
        .with_state(hits);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
}

fn dispatcher_for(base_url: &str) -> Dispatcher {
    let mut config = PlatformConfig::new(base_url, ApiToken::new("e2e-token"));
    config.retry_delay = Duration::from_millis(10);
    config.request_timeout = Duration::from_secs(2);
    let platform = PlatformClient::new(&config).unwrap();
    let adb = AdbCli::new(&AdbConfig::default());
    Dispatcher::new(Arc::new(PlatformTools::new(Arc::new(platform), Arc::new(adb))))
}

#[tokio::test]
async fn test_list_recipes_end_to_end() {
    let hits = Arc::new(Hits::default());
    let dispatcher = dispatcher_for(&start_mock_platform(hits.clone()).await);

    let result = dispatcher
        .dispatch(ToolCall::without_arguments("list_recipes"))
        .await;
    let payload = result.payload().unwrap();
    assert_eq!(payload["count"], 1);
    assert_eq!(payload["recipes"][0]["id"], "r1");
    assert_eq!(payload["recipes"][0]["name"], "Pixel6");
    assert_eq!(payload["recipes"][0]["os"], "13");
    assert_eq!(hits.recipes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_server_error_retried_once_then_transient() {
    let hits = Arc::new(Hits::default());
    let dispatcher = dispatcher_for(&start_mock_platform(hits.clone()).await);

    let result = dispatcher
        .dispatch(ToolCall::without_arguments("list_instances"))
        .await;
    assert_eq!(result.error_kind(), Some(ErrorKind::ApiTransient));
    assert_eq!(hits.instances.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_empty_recipe_id_never_reaches_platform() {
    let hits = Arc::new(Hits::default());
    let dispatcher = dispatcher_for(&start_mock_platform(hits.clone()).await);

    let result = dispatcher
        .dispatch(ToolCall::new("start_instance", json!({"recipe_id": ""})))
        .await;
    assert_eq!(result.error_kind(), Some(ErrorKind::Validation));
    assert_eq!(hits.start.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_start_instance_unwraps_envelope() {
    let hits = Arc::new(Hits::default());
    let dispatcher = dispatcher_for(&start_mock_platform(hits.clone()).await);

    let result = dispatcher
        .dispatch(ToolCall::new(
            "start_instance",
            json!({"recipe_id": "r1", "instance_name": "qa-run"}),
        ))
        .await;
    let payload = result.payload().unwrap();
    assert_eq!(payload["id"], "i-new");
    assert_eq!(payload["name"], "qa-run");
    assert_eq!(payload["state"], "STARTING");
    assert_eq!(hits.start.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stop_reports_off_state() {
    let hits = Arc::new(Hits::default());
    let dispatcher = dispatcher_for(&start_mock_platform(hits.clone()).await);

    let result = dispatcher
        .dispatch(ToolCall::new("stop_instance", json!({"instance_id": "i1"})))
        .await;
    assert_eq!(
        result.payload().unwrap(),
        &json!({"instance_id": "i1", "stopped": true, "state": "OFF"})
    );
}

#[tokio::test]
async fn test_mcp_session_over_stdio_streams() {
    let hits = Arc::new(Hits::default());
    let server = McpServer::new(dispatcher_for(&start_mock_platform(hits).await));

    let input = [
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {"protocolVersion": "2024-11-05"}}),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
        json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call", "params": {"name": "list_recipes", "arguments": {}}}),
        json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call", "params": {"name": "reboot_device", "arguments": {}}}),
    ]
    .iter()
    .map(|m| format!("{}\n", m))
    .collect::<String>();

    let (writer, mut reader) = tokio::io::duplex(64 * 1024);
    server.serve(input.as_bytes(), writer).await.unwrap();

    let mut output = String::new();
    reader.read_to_string(&mut output).await.unwrap();
    let responses: Vec<Value> = output
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(responses.len(), 4);

    assert_eq!(responses[0]["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(responses[1]["result"]["tools"].as_array().unwrap().len(), 10);

    assert_eq!(responses[2]["result"]["isError"], false);
    let text = responses[2]["result"]["content"][0]["text"].as_str().unwrap();
    let payload: Value = serde_json::from_str(text).unwrap();
    assert_eq!(payload["recipes"][0]["name"], "Pixel6");

    assert_eq!(responses[3]["id"], 4);
    assert_eq!(responses[3]["result"]["isError"], true);
    let text = responses[3]["result"]["content"][0]["text"].as_str().unwrap();
    let error: Value = serde_json::from_str(text).unwrap();
    assert_eq!(error["kind"], "SCHEMA");
}

#[tokio::test]
async fn test_crafted_instance_id_cannot_reach_start_route() {
    let hits = Arc::new(Hits::default());
    let dispatcher = dispatcher_for(&start_mock_platform(hits.clone()).await);

    let crafted = "../recipes/r1/start-disposable#";
    let result = dispatcher
        .dispatch(ToolCall::new("stop_instance", json!({"instance_id": crafted})))
        .await;
    assert_eq!(result.payload().unwrap()["instance_id"], crafted);
    assert_eq!(hits.start.load(Ordering::SeqCst), 0);
    assert_eq!(hits.stop.load(Ordering::SeqCst), 1);

    let dotted = dispatcher
        .dispatch(ToolCall::new("stop_instance", json!({"instance_id": ".."})))
        .await;
    assert_eq!(dotted.error_kind(), Some(ErrorKind::Validation));
    assert_eq!(hits.stop.load(Ordering::SeqCst), 1);
}
