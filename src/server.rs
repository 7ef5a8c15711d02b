//! MCP server: stdio transport, newline-delimited JSON-RPC 2.0.
//!
//! Reads one JSON-RPC message per line, dispatches it to the tool router and
//! writes one response line per request. Notifications get no response. The
//! loop ends when the client closes its end of the stream.
//!
//! Supported methods: `initialize`, `notifications/initialized`, `ping`,
//! `tools/list`, `tools/call`.

use std::io::{BufRead, Read, Write};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::RunnerConfig;
use crate::runner::AgentRunner;
use crate::tools::{ToolRouter, text_result};

/// Maximum size of a single JSON-RPC line (10 MiB).
const MAX_LINE_BYTES: u64 = 10 * 1024 * 1024;

/// MCP protocol revision this server speaks.
pub const PROTOCOL_VERSION: &str = "2025-06-18";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

// ---------------------------------------------------------------------------
// JSON-RPC 2.0 types
// ---------------------------------------------------------------------------

/// JSON-RPC 2.0 request or notification.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<serde_json::Value>,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcResponse {
    fn ok(id: Option<serde_json::Value>, result: &impl Serialize) -> Self {
        match serde_json::to_value(result) {
            Ok(value) => Self {
                jsonrpc: "2.0".to_owned(),
                id,
                result: Some(value),
                error: None,
            },
            Err(e) => {
                error!(error = %e, "failed to serialize result");
                Self::err(id, INTERNAL_ERROR, format!("internal error: {e}"))
            }
        }
    }

    fn err(id: Option<serde_json::Value>, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_owned(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// MCP protocol types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InitializeResult {
    protocol_version: &'static str,
    capabilities: serde_json::Value,
    server_info: ServerInfo,
    instructions: &'static str,
}

#[derive(Debug, Serialize)]
struct ServerInfo {
    name: &'static str,
    version: &'static str,
}

/// MCP tool definition for tools/list.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct ToolsListResult {
    tools: Vec<ToolDefinition>,
}

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

/// MCP content item in tools/call response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

/// MCP tools/call result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    pub content: Vec<ContentItem>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// MCP server over an arbitrary line-oriented transport.
#[derive(Debug)]
pub struct McpServer {
    router: ToolRouter,
}

impl McpServer {
    pub const fn new(router: ToolRouter) -> Self {
        Self { router }
    }

    pub const fn router(&self) -> &ToolRouter {
        &self.router
    }

    /// Serve requests from `reader` until EOF, writing responses to `writer`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the transport itself fails.
    pub fn serve(&self, mut reader: impl BufRead, mut writer: impl Write) -> Result<()> {
        let mut line = Vec::new();
        loop {
            line.clear();
            let n = (&mut reader)
                .take(MAX_LINE_BYTES + 1)
                .read_until(b'\n', &mut line)
                .context("failed to read request line")?;
            if n == 0 {
                info!("input closed, shutting down");
                return Ok(());
            }

            if n as u64 > MAX_LINE_BYTES {
                warn!(bytes = n, "request line too long, discarding");
                if line.last() != Some(&b'\n') {
                    skip_rest_of_line(&mut reader)?;
                }
                let resp = JsonRpcResponse::err(
                    None,
                    INVALID_REQUEST,
                    format!("request exceeds {MAX_LINE_BYTES} bytes"),
                );
                write_response(&mut writer, &resp)?;
                continue;
            }

            let Ok(text) = std::str::from_utf8(&line) else {
                let resp = JsonRpcResponse::err(None, PARSE_ERROR, "request is not valid UTF-8");
                write_response(&mut writer, &resp)?;
                continue;
            };

            if let Some(resp) = self.handle_line(text) {
                write_response(&mut writer, &resp)?;
            }
        }
    }

    /// Handle one raw message line. Returns `None` for notifications and blank lines.
    pub fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        debug!(raw = trimmed, "received message");

        let request: JsonRpcRequest = match serde_json::from_str(trimmed) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "unparseable JSON-RPC message");
                return Some(JsonRpcResponse::err(
                    None,
                    PARSE_ERROR,
                    format!("parse error: {e}"),
                ));
            }
        };

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::err(
                request.id,
                INVALID_REQUEST,
                format!(
                    "invalid request: jsonrpc version must be \"2.0\", got \"{}\"",
                    request.jsonrpc
                ),
            ));
        }

        let response = self.dispatch(&request);
        if request.id.is_none() {
            debug!(method = request.method, "notification handled");
            return None;
        }
        Some(response)
    }

    fn dispatch(&self, req: &JsonRpcRequest) -> JsonRpcResponse {
        let id = req.id.clone();
        match req.method.as_str() {
            "initialize" => JsonRpcResponse::ok(id, &initialize_result()),
            "notifications/initialized" => {
                info!("client initialized");
                JsonRpcResponse::ok(id, &serde_json::json!({}))
            }
            "ping" => JsonRpcResponse::ok(id, &serde_json::json!({})),
            "tools/list" => JsonRpcResponse::ok(
                id,
                &ToolsListResult {
                    tools: self.router.list_tools(),
                },
            ),
            "tools/call" => self.handle_tools_call(id, &req.params),
            other => {
                warn!(method = other, "unknown method");
                JsonRpcResponse::err(id, METHOD_NOT_FOUND, format!("method not found: {other}"))
            }
        }
    }

    fn handle_tools_call(
        &self,
        id: Option<serde_json::Value>,
        params: &serde_json::Value,
    ) -> JsonRpcResponse {
        let params: ToolCallParams = match serde_json::from_value(params.clone()) {
            Ok(p) => p,
            Err(e) => {
                return JsonRpcResponse::err(
                    id,
                    INVALID_PARAMS,
                    format!("invalid tools/call params: {e}"),
                );
            }
        };

        match self.router.call_tool(&params.name, params.arguments) {
            Ok(result) => JsonRpcResponse::ok(id, &result),
            Err(e) => {
                error!(tool = params.name, error = %e, "tool call rejected");
                JsonRpcResponse::ok(id, &text_result(format!("Error: {e:#}"), true))
            }
        }
    }
}

fn initialize_result() -> InitializeResult {
    InitializeResult {
        protocol_version: PROTOCOL_VERSION,
        capabilities: serde_json::json!({ "tools": { "listChanged": false } }),
        server_info: ServerInfo {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        },
        instructions: "Coding tools backed by the Cline CLI agent. Agent tools run in the \
            configured workspace and may modify files unless mode is plan.",
    }
}

fn skip_rest_of_line(reader: &mut impl BufRead) -> Result<()> {
    let mut sink = Vec::new();
    loop {
        sink.clear();
        let n = reader
            .by_ref()
            .take(MAX_LINE_BYTES)
            .read_until(b'\n', &mut sink)
            .context("failed to discard oversized request")?;
        if n == 0 || sink.last() == Some(&b'\n') {
            return Ok(());
        }
    }
}

fn write_response(out: &mut impl Write, resp: &JsonRpcResponse) -> Result<()> {
    let json = serde_json::to_string(resp).context("failed to serialize response")?;
    debug!(response = json, "sending response");
    out.write_all(json.as_bytes())
        .context("failed to write response")?;
    out.write_all(b"\n")
        .context("failed to write newline")?;
    out.flush().context("failed to flush output")?;
    Ok(())
}

/// Run the MCP server on stdin/stdout with the given runner configuration.
///
/// # Errors
///
/// Returns an error if stdin/stdout I/O fails fatally.
pub fn run_mcp_server(config: RunnerConfig) -> Result<()> {
    info!(
        workspace = %config.default_working_dir.display(),
        timeout_ms = config.default_timeout.as_millis(),
        "agentmesh MCP server starting"
    );

    let server = McpServer::new(ToolRouter::new(AgentRunner::new(config)));
    let stdin = std::io::stdin();
    server.serve(stdin.lock(), std::io::stdout().lock())?;

    info!("agentmesh MCP server stopped");
    Ok(())
}
