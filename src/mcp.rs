//! MCP (Model Context Protocol) Server
//!
//! Manual JSON-RPC 2.0 over stdio, one message per line.
//!
//! # Architecture
//!
//! - **Transport**: newline-delimited JSON on stdin/stdout (tokio io)
//! - **Dependencies**: `serde_json` and `anyhow` only, no MCP-specific crates
//! - **Concurrency**: every request runs on its own task; responses go through
//!   a single writer task so lines never interleave
//!
//! # Methods
//!
//! - `initialize`: protocol version, capabilities, server info
//! - `ping`: empty result
//! - `tools/list`: the catalog of the served mode
//! - `tools/call`: one operation through the [`Dispatcher`]
//! - notifications (no `id`): accepted, never answered
//!
//! # Usage
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "sakila": {
//!       "command": "sakila-mcp",
//!       "args": ["serve", "--mode", "intent"]
//!     }
//!   }
//! }
//! ```

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::dispatch::{Dispatcher, Mode};
use crate::engine::Database;

/// Protocol revision this server speaks
pub const PROTOCOL_VERSION: &str = "2024-11-05";

// ============================================================================
// JSON-RPC 2.0 Structures
// ============================================================================

/// JSON-RPC 2.0 Request
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    fn result(id: Option<Value>, result: Value) -> Self {
        Self { jsonrpc: "2.0", id, result: Some(result), error: None }
    }

    fn error(id: Option<Value>, error: JsonRpcError) -> Self {
        Self { jsonrpc: "2.0", id, result: None, error: Some(error) }
    }
}

/// JSON-RPC 2.0 Error
#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

impl JsonRpcError {
    fn parse_error(detail: impl std::fmt::Display) -> Self {
        Self { code: -32700, message: format!("Parse error: {detail}") }
    }

    fn invalid_request(detail: impl std::fmt::Display) -> Self {
        Self { code: -32600, message: format!("Invalid Request: {detail}") }
    }

    fn method_not_found(method: &str) -> Self {
        Self { code: -32601, message: format!("Method not found: {method}") }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self { code: -32602, message: message.into() }
    }

    fn internal(detail: impl std::fmt::Display) -> Self {
        Self { code: -32603, message: format!("Internal error: {detail}") }
    }
}

// ============================================================================
// MCP Server
// ============================================================================

/// Run the server until stdin closes.
///
/// In-flight calls are allowed to finish before returning.
///
/// # Errors
///
/// Returns an error if stdin or stdout fails.
pub async fn serve<D: Database + 'static>(dispatcher: Arc<Dispatcher<D>>) -> Result<()> {
    info!(mode = ?dispatcher.mode(), "MCP server listening on stdio");

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = rx.recv().await {
            stdout.write_all(line.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight = JoinSet::new();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let dispatcher = Arc::clone(&dispatcher);
        let tx = tx.clone();
        in_flight.spawn(async move {
            if let Some(response) = respond(&dispatcher, &line).await {
                if tx.send(response.to_string()).is_err() {
                    warn!("response dropped: writer has stopped");
                }
            }
        });

        // Reap finished tasks so the set does not grow without bound
        while in_flight.try_join_next().is_some() {}
    }

    while in_flight.join_next().await.is_some() {}
    drop(tx);
    writer.await??;

    info!("stdin closed, MCP server stopped");
    Ok(())
}

/// Answer one protocol line.
///
/// Returns `None` for notifications, which must not be answered.
pub async fn respond<D: Database>(dispatcher: &Dispatcher<D>, line: &str) -> Option<Value> {
    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => return encode(&JsonRpcResponse::error(None, JsonRpcError::parse_error(e))),
    };

    // Well-formed JSON that is not a request object is answered, never dropped
    let request: JsonRpcRequest = match &value {
        Value::Object(object) => match serde_json::from_value(value.clone()) {
            Ok(request) => request,
            Err(e) => {
                let id = object.get("id").cloned().unwrap_or(Value::Null);
                return encode(&JsonRpcResponse::error(Some(id), JsonRpcError::invalid_request(e)));
            }
        },
        Value::Array(_) => {
            let error = JsonRpcError::invalid_request("batch requests are not supported");
            return encode(&JsonRpcResponse::error(Some(Value::Null), error));
        }
        _ => {
            let error = JsonRpcError::invalid_request("expected a request object");
            return encode(&JsonRpcResponse::error(Some(Value::Null), error));
        }
    };

    let Some(id) = request.id.clone() else {
        debug!(method = %request.method, "notification");
        return None;
    };

    let response = match handle_request(dispatcher, request).await {
        Ok(result) => JsonRpcResponse::result(Some(id), result),
        Err(error) => JsonRpcResponse::error(Some(id), error),
    };
    encode(&response)
}

fn encode(response: &JsonRpcResponse) -> Option<Value> {
    match serde_json::to_value(response) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, "failed to encode response");
            None
        }
    }
}

/// Route a request to its method handler
async fn handle_request<D: Database>(
    dispatcher: &Dispatcher<D>,
    request: JsonRpcRequest,
) -> std::result::Result<Value, JsonRpcError> {
    match request.method.as_str() {
        "initialize" => Ok(handle_initialize(dispatcher.mode())),
        "ping" => Ok(json!({})),
        "tools/list" => handle_list_tools(dispatcher),
        "tools/call" => handle_call_tool(dispatcher, request.params).await,
        other => Err(JsonRpcError::method_not_found(other)),
    }
}

// ============================================================================
// MCP Protocol Handlers
// ============================================================================

fn handle_initialize(mode: Mode) -> Value {
    let name = match mode {
        Mode::Raw => "sakila-mcp-raw",
        Mode::Intent => "sakila-mcp",
    };
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": {}
        },
        "serverInfo": {
            "name": name,
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

fn handle_list_tools<D: Database>(dispatcher: &Dispatcher<D>) -> std::result::Result<Value, JsonRpcError> {
    let tools = serde_json::to_value(dispatcher.catalog()).map_err(JsonRpcError::internal)?;
    Ok(json!({ "tools": tools }))
}

async fn handle_call_tool<D: Database>(
    dispatcher: &Dispatcher<D>,
    params: Option<Value>,
) -> std::result::Result<Value, JsonRpcError> {
    let params = params.ok_or_else(|| JsonRpcError::invalid_params("Missing params"))?;
    let name = params
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| JsonRpcError::invalid_params("Missing tool name"))?;

    let arguments = match params.get("arguments") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(_) => return Err(JsonRpcError::invalid_params("Tool arguments must be an object")),
    };

    let response = dispatcher.call(name, &arguments).await;
    serde_json::to_value(response).map_err(JsonRpcError::internal)
}
