//! MCP stdio server: read loop and per-message handling.
//!
//! One JSON-RPC message per line. Each request is answered before the next
//! line is read.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

use super::protocol::{
    CallToolParams, JsonRpcError, JsonRpcRequest, JsonRpcResponse, ReadResourceParams, RequestId,
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR,
    PROTOCOL_VERSION,
};
use crate::dispatch::{Dispatcher, ToolCall, ToolResult};
use crate::tools::ToolKind;

/// The one resource exposed: the OS image catalog.
pub const OS_VERSIONS_URI: &str = "genymotion://os-versions";

const SERVER_NAME: &str = "genymotion-mcp";

/// MCP server wrapping the dispatcher.
#[derive(Debug)]
pub struct McpServer {
    dispatcher: Dispatcher,
    cancel: CancellationToken,
}

impl McpServer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            cancel: CancellationToken::new(),
        }
    }

    /// Serve on the process's stdin/stdout.
    pub async fn serve_stdio(&self) -> std::io::Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    /// Run until EOF on `reader` or shutdown.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        tracing::info!(tools = self.dispatcher.catalog().len(), "MCP server ready");

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("MCP server shutting down");
                    break;
                }
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        tracing::info!("stdin closed");
                        break;
                    };
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    if let Some(response) = self.handle_line(line).await {
                        let mut bytes = serde_json::to_vec(&response)?;
                        bytes.push(b'\n');
                        writer.write_all(&bytes).await?;
                        writer.flush().await?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Request graceful shutdown.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Handle one line. `None` for notifications.
    pub(crate) async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let raw: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "unparseable message");
                return Some(JsonRpcResponse::failure(
                    None,
                    JsonRpcError::new(PARSE_ERROR, format!("Parse error: {}", e)),
                ));
            }
        };

        let request: JsonRpcRequest = match serde_json::from_value(raw.clone()) {
            Ok(r) => r,
            Err(e) => {
                let id = raw
                    .get("id")
                    .and_then(|v| serde_json::from_value::<RequestId>(v.clone()).ok());
                return Some(JsonRpcResponse::failure(
                    id,
                    JsonRpcError::new(INVALID_REQUEST, format!("Invalid request: {}", e)),
                ));
            }
        };

        let Some(id) = request.id.clone() else {
            tracing::debug!(method = %request.method, "notification");
            return None;
        };

        tracing::debug!(method = %request.method, id = %id, "request");
        let outcome = self.handle_request(&request.method, request.params).await;
        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(Some(id), result),
            Err(error) => JsonRpcResponse::failure(Some(id), error),
        })
    }

    async fn handle_request(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, JsonRpcError> {
        match method {
            "initialize" => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {},
                    "resources": {},
                },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION"),
                },
            })),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.dispatcher.catalog().definitions() })),
            "tools/call" => {
                let params: CallToolParams = decode_params(params)?;
                let call = ToolCall::new(params.name, params.arguments.unwrap_or(Value::Null));
                let result = self.dispatcher.dispatch(call).await;
                Ok(call_tool_result(&result))
            }
            "resources/list" => Ok(json!({
                "resources": [{
                    "uri": OS_VERSIONS_URI,
                    "name": "Android OS versions",
                    "description": ToolKind::ListOsVersions.description(),
                    "mimeType": "application/json",
                }],
            })),
            "resources/read" => {
                let params: ReadResourceParams = decode_params(params)?;
                self.read_resource(&params.uri).await
            }
            other => Err(JsonRpcError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
            )),
        }
    }

    async fn read_resource(&self, uri: &str) -> Result<Value, JsonRpcError> {
        if uri != OS_VERSIONS_URI {
            return Err(JsonRpcError::new(
                INVALID_PARAMS,
                format!("Unknown resource: {}", uri),
            ));
        }

        let result = self
            .dispatcher
            .dispatch(ToolCall::without_arguments(ToolKind::ListOsVersions.name()))
            .await;
        match result {
            ToolResult::Success { payload } => Ok(json!({
                "contents": [{
                    "uri": OS_VERSIONS_URI,
                    "mimeType": "application/json",
                    "text": pretty(&payload),
                }],
            })),
            ToolResult::Failure { error } => Err(JsonRpcError::new(INTERNAL_ERROR, error.message.clone())
                .with_data(json!({ "kind": error.kind }))),
        }
    }
}

fn decode_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, JsonRpcError> {
    let params = params.ok_or_else(|| JsonRpcError::new(INVALID_PARAMS, "Missing params"))?;
    serde_json::from_value(params)
        .map_err(|e| JsonRpcError::new(INVALID_PARAMS, format!("Invalid params: {}", e)))
}

fn call_tool_result(result: &ToolResult) -> Value {
    let (text, is_error) = match result {
        ToolResult::Success { payload } => (pretty(payload), false),
        ToolResult::Failure { error } => (pretty(&json!(error)), true),
    };
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error,
    })
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::MockToolHandler;
    use crate::types::Error;
    use std::sync::Arc;
    use tokio::io::AsyncReadExt;

    fn server(handler: MockToolHandler) -> McpServer {
        McpServer::new(Dispatcher::new(Arc::new(handler)))
    }

    async fn request(server: &McpServer, message: Value) -> Value {
        let response = server.handle_line(&message.to_string()).await.unwrap();
        serde_json::to_value(response).unwrap()
    }

    #[tokio::test]
    async fn test_initialize_advertises_tools_and_resources() {
        let server = server(MockToolHandler::new());
        let resp = request(
            &server,
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
        )
        .await;
        assert_eq!(resp["id"], 1);
        assert_eq!(resp["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(resp["result"]["serverInfo"]["name"], "genymotion-mcp");
        assert!(resp["result"]["capabilities"]["resources"].is_object());
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let server = server(MockToolHandler::new());
        let line = json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string();
        assert!(server.handle_line(&line).await.is_none());
    }

    #[tokio::test]
    async fn test_tools_list_covers_catalog() {
        let server = server(MockToolHandler::new());
        let resp = request(&server, json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"})).await;
        let tools = resp["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), ToolKind::ALL.len());
        assert!(tools.iter().any(|t| t["name"] == "connect_adb"));
        assert_eq!(tools[0]["inputSchema"]["type"], "object");
    }

    #[tokio::test]
    async fn test_tool_failure_is_error_result_not_rpc_error() {
        let mut handler = MockToolHandler::new();
        handler
            .expect_invoke()
            .returning(|_, _| Err(Error::unavailable("instance i1 is not running")));
        let server = server(handler);

        let resp = request(
            &server,
            json!({
                "jsonrpc": "2.0", "id": 3, "method": "tools/call",
                "params": {"name": "connect_adb", "arguments": {"instance_id": "i1"}}
            }),
        )
        .await;
        assert!(resp.get("error").is_none());
        assert_eq!(resp["result"]["isError"], true);
        let text: Value =
            serde_json::from_str(resp["result"]["content"][0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(text["kind"], "UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let server = server(MockToolHandler::new());

        let parse = serde_json::to_value(server.handle_line("{not json").await.unwrap()).unwrap();
        assert_eq!(parse["error"]["code"], PARSE_ERROR);
        assert_eq!(parse["id"], Value::Null);

        let unknown =
            request(&server, json!({"jsonrpc": "2.0", "id": 4, "method": "prompts/list"})).await;
        assert_eq!(unknown["error"]["code"], METHOD_NOT_FOUND);

        let missing =
            request(&server, json!({"jsonrpc": "2.0", "id": 5, "method": "tools/call"})).await;
        assert_eq!(missing["error"]["code"], INVALID_PARAMS);

        let resource = request(
            &server,
            json!({"jsonrpc": "2.0", "id": 6, "method": "resources/read", "params": {"uri": "genymotion://nope"}}),
        )
        .await;
        assert_eq!(resource["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_os_versions_resource_reads_through_dispatcher() {
        let mut handler = MockToolHandler::new();
        handler
            .expect_invoke()
            .withf(|kind, _| *kind == ToolKind::ListOsVersions)
            .times(1)
            .returning(|_, _| Ok(json!({"os_versions": [{"version": "14"}], "count": 1})));
        let server = server(handler);

        let resp = request(
            &server,
            json!({"jsonrpc": "2.0", "id": 7, "method": "resources/read", "params": {"uri": OS_VERSIONS_URI}}),
        )
        .await;
        let text = resp["result"]["contents"][0]["text"].as_str().unwrap();
        let payload: Value = serde_json::from_str(text).unwrap();
        assert_eq!(payload["count"], 1);
    }

    #[tokio::test]
    async fn test_serve_answers_line_by_line_until_eof() {
        let server = server(MockToolHandler::new());
        let input = concat!(
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n",
            "\n",
            "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n",
        );
        let (out_writer, mut out_reader) = tokio::io::duplex(4096);

        server.serve(input.as_bytes(), out_writer).await.unwrap();

        let mut output = String::new();
        out_reader.read_to_string(&mut output).await.unwrap();
        let lines: Vec<Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[1]["id"], 2);
        assert_eq!(lines[1]["result"], json!({}));
    }

    #[tokio::test]
    async fn test_shutdown_stops_serving() {
        let server = server(MockToolHandler::new());
        let (_client, server_side) = tokio::io::duplex(64);
        let (reader, writer) = tokio::io::split(server_side);

        server.shutdown();
        tokio::time::timeout(
            std::time::Duration::from_secs(1),
            server.serve(BufReader::new(reader), writer),
        )
        .await
        .unwrap()
        .unwrap();
    }
}
