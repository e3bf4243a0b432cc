//! MCP Server implementation
//!
//! Implements the Model Context Protocol server over newline-delimited JSON-RPC.
//! Tool calls run on their own tasks; the run loop alone owns the table of
//! in-flight calls, so cancellations never race with completions.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot};

use crate::error::{Result, TacoBellMcpError};
use crate::mcp::tools::ToolHandler;
use crate::mcp::types::*;
use crate::tacobell::client::TacoBellClient;

/// MCP Server info
const SERVER_NAME: &str = "taco-bell";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A finished tool call, reported back to the run loop
type Completion = (RequestId, JsonRpcResponse);

/// Where the client is in the initialization handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    /// No `initialize` request yet; tool requests are refused
    New,
    /// `initialize` answered, `notifications/initialized` not seen yet
    Initializing,
    Ready,
}

/// MCP Server for Taco Bell
pub struct McpServer {
    /// Tool handler
    tool_handler: ToolHandler,

    state: SessionState,

    /// Tool calls still running, keyed by request id. The cancel handle is
    /// taken on cancellation; the entry stays until the call has answered.
    in_flight: HashMap<RequestId, Option<oneshot::Sender<String>>>,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(client: Arc<TacoBellClient>) -> Self {
        Self {
            tool_handler: ToolHandler::new(client),
            state: SessionState::New,
            in_flight: HashMap::new(),
        }
    }

    /// Whether the client has completed the initialization handshake
    pub fn is_initialized(&self) -> bool {
        self.state == SessionState::Ready
    }

    /// Run the server on stdio
    pub async fn run_stdio(&mut self) -> Result<()> {
        tracing::info!(server = SERVER_NAME, version = SERVER_VERSION, "MCP server listening on stdio");
        self.run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serve requests from `reader` until it closes and every call has answered
    pub async fn run<R, W>(&mut self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();
        let mut input_open = true;

        while input_open || !self.in_flight.is_empty() {
            tokio::select! {
                line = lines.next_line(), if input_open => {
                    match line? {
                        Some(line) => {
                            if let Some(response) = self.handle_message(&line, &done_tx) {
                                write_response(&mut writer, &response).await?;
                            }
                        }
                        None => {
                            tracing::debug!(pending = self.in_flight.len(), "Input closed");
                            input_open = false;
                        }
                    }
                }
                Some((id, response)) = done_rx.recv() => {
                    self.in_flight.remove(&id);
                    write_response(&mut writer, &response).await?;
                }
            }
        }

        Ok(())
    }

    /// Handle an incoming JSON-RPC message
    fn handle_message(
        &mut self,
        message: &str,
        done_tx: &mpsc::UnboundedSender<Completion>,
    ) -> Option<JsonRpcResponse> {
        if message.trim().is_empty() {
            return None;
        }

        let request: JsonRpcRequest = match serde_json::from_str(message) {
            Ok(req) => req,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    None,
                    JsonRpcError::parse_error(e.to_string()),
                ));
            }
        };

        if request.jsonrpc != JSONRPC_VERSION {
            tracing::warn!(version = %request.jsonrpc, method = %request.method, "Unsupported JSON-RPC version");
            return request.id.map(|id| {
                JsonRpcResponse::error(
                    Some(id),
                    JsonRpcError::invalid_request(format!(
                        "unsupported jsonrpc version '{}', expected '{}'",
                        request.jsonrpc, JSONRPC_VERSION
                    )),
                )
            });
        }

        let id = match request.id.clone() {
            Some(id) => id,
            None => {
                self.handle_notification(&request);
                return None;
            }
        };

        tracing::debug!(method = %request.method, ?id, "Handling request");

        let needs_session = matches!(
            request.method.as_str(),
            methods::LIST_TOOLS | methods::CALL_TOOL | methods::LIST_RESOURCES
        );
        if needs_session && self.state == SessionState::New {
            return Some(JsonRpcResponse::error(
                Some(id),
                JsonRpcError::invalid_request(format!(
                    "'{}' before 'initialize'",
                    request.method
                )),
            ));
        }

        match request.method.as_str() {
            methods::INITIALIZE => {
                if self.state == SessionState::New {
                    self.state = SessionState::Initializing;
                }
                Some(respond(id, &self.initialize_result()))
            }
            methods::PING => Some(JsonRpcResponse::success(id, serde_json::json!({}))),
            methods::LIST_TOOLS => Some(respond(
                id,
                &ListToolsResult {
                    tools: self.tool_handler.list_tools(),
                },
            )),
            methods::LIST_RESOURCES => Some(respond(id, &ListResourcesResult::default())),
            methods::CALL_TOOL => self.handle_call_tool(id, request.params, done_tx),
            _ => Some(JsonRpcResponse::error(
                Some(id),
                JsonRpcError::method_not_found(&request.method),
            )),
        }
    }

    fn handle_notification(&mut self, notification: &JsonRpcRequest) {
        match notification.method.as_str() {
            methods::INITIALIZED => {
                if self.state == SessionState::New {
                    tracing::warn!("Initialized notification before initialize request");
                }
                self.state = SessionState::Ready;
            }
            methods::CANCELLED => {
                let params = notification
                    .params
                    .clone()
                    .and_then(|p| serde_json::from_value::<CancelledParams>(p).ok());
                match params {
                    Some(params) => self.cancel(params),
                    None => tracing::warn!("Ignoring malformed cancellation"),
                }
            }
            other => tracing::debug!(method = other, "Ignoring notification"),
        }
    }

    fn initialize_result(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {}),
                resources: Some(ResourcesCapability::default()),
            },
        }
    }

    /// Handle call tool request; the answer arrives later through `done_tx`
    fn handle_call_tool(
        &mut self,
        id: RequestId,
        params: Option<Value>,
        done_tx: &mpsc::UnboundedSender<Completion>,
    ) -> Option<JsonRpcResponse> {
        let params: CallToolParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return Some(respond(
                        id,
                        &CallToolResult::error(format!("Invalid tool parameters: {}", e)),
                    ));
                }
            },
            None => {
                return Some(respond(id, &CallToolResult::error("Missing tool parameters")));
            }
        };

        if self.in_flight.contains_key(&id) {
            return Some(JsonRpcResponse::error(
                Some(id),
                JsonRpcError::invalid_request("request id is already in use by a running call"),
            ));
        }

        if self.state == SessionState::Initializing {
            tracing::debug!(tool = %params.name, "Tool called before initialized notification");
        }

        let (cancel_tx, cancel_rx) = oneshot::channel::<String>();
        self.in_flight.insert(id.clone(), Some(cancel_tx));

        let handler = self.tool_handler.clone();
        let done_tx = done_tx.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                result = handler.call_tool(&params.name, params.arguments) => result,
                Ok(reason) = cancel_rx => {
                    let err = TacoBellMcpError::Cancelled { reason };
                    tracing::info!(tool = %params.name, "{}", err);
                    CallToolResult::error(err.to_string())
                }
            };

            let response = respond(id.clone(), &result);
            let _ = done_tx.send((id, response));
        });

        None
    }

    /// Abort a running tool call; dropping its future drops the HTTP request
    fn cancel(&mut self, params: CancelledParams) {
        match self
            .in_flight
            .get_mut(&params.request_id)
            .and_then(Option::take)
        {
            Some(cancel_tx) => {
                let reason = params
                    .reason
                    .unwrap_or_else(|| "cancelled by client".to_string());
                let _ = cancel_tx.send(reason);
            }
            None => tracing::debug!(id = ?params.request_id, "Cancellation for unknown or already cancelled request"),
        }
    }
}

/// Serialize a result into a success response
fn respond<T: Serialize>(id: RequestId, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(Some(id), JsonRpcError::internal_error(e.to_string())),
    }
}

async fn write_response<W>(writer: &mut W, response: &JsonRpcResponse) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_string(response)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
