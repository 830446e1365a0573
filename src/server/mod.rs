//! MCP tool server over newline-delimited JSON-RPC.
//!
//! Requests are read line by line and each is handled on its own task, so
//! slow git invocations in one session do not hold up others. Responses go
//! through a single writer task and may be emitted out of request order;
//! clients match them by id.

pub mod protocol;
pub mod tools;

pub use tools::{GitCommitter, ToolCallError};

use anyhow::Result;
use protocol::{
    CallToolParams, CallToolResult, InitializeResult, JsonRpcRequest, JsonRpcResponse,
    MCP_PROTOCOL_VERSION, ServerInfo, error_codes,
};
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

pub const SERVER_NAME: &str = "git-committer";

/// Serve requests from `reader` until EOF, writing responses to `writer`.
pub async fn serve<R, W>(service: GitCommitter, reader: R, writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<JsonRpcResponse>();

    let writer_task = tokio::spawn(async move {
        let mut writer = writer;
        while let Some(response) = rx.recv().await {
            let mut line = serde_json::to_string(&response)?;
            line.push('\n');
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await?;
        }
        Ok::<_, anyhow::Error>(())
    });

    info!(server = SERVER_NAME, "serving MCP over stdio");

    let mut lines = reader.lines();
    let mut tasks = JoinSet::new();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let request = match parse_request(&line) {
            Ok(request) => request,
            Err(response) => {
                let _ = tx.send(response);
                continue;
            }
        };

        let service = service.clone();
        let tx = tx.clone();
        tasks.spawn(async move {
            if let Some(response) = handle_request(&service, request).await {
                let _ = tx.send(response);
            }
        });
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "request task failed");
        }
    }
    drop(tx);
    writer_task.await??;

    info!("input closed, server stopping");
    Ok(())
}

fn parse_request(line: &str) -> std::result::Result<JsonRpcRequest, JsonRpcResponse> {
    let value: Value = serde_json::from_str(line).map_err(|e| {
        JsonRpcResponse::error(None, error_codes::PARSE_ERROR, format!("Parse error: {e}"))
    })?;
    let id = value.get("id").cloned();

    let request: JsonRpcRequest = serde_json::from_value(value).map_err(|e| {
        JsonRpcResponse::error(id.clone(), error_codes::INVALID_REQUEST, format!("Invalid request: {e}"))
    })?;
    if request.jsonrpc != "2.0" {
        return Err(JsonRpcResponse::error(
            id,
            error_codes::INVALID_REQUEST,
            "Invalid request: jsonrpc must be \"2.0\"",
        ));
    }
    Ok(request)
}

/// Handle one request. Notifications produce no response.
pub async fn handle_request(service: &GitCommitter, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
    debug!(method = %request.method, id = ?request.id, "request");

    if request.is_notification() {
        return None;
    }

    let id = request.id;
    let response = match request.method.as_str() {
        "initialize" => {
            let result = InitializeResult {
                protocol_version: MCP_PROTOCOL_VERSION.to_string(),
                capabilities: json!({ "tools": { "listChanged": false } }),
                server_info: ServerInfo {
                    name: SERVER_NAME.to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                },
            };
            encode(id, result)
        }
        "ping" => JsonRpcResponse::success(id, json!({})),
        "tools/list" => JsonRpcResponse::success(id, json!({ "tools": service.tools() })),
        "tools/call" => call_tool(service, id, request.params).await,
        other => JsonRpcResponse::error(
            id,
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {other}"),
        ),
    };
    Some(response)
}

async fn call_tool(service: &GitCommitter, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
    let params: CallToolParams = match params.map(serde_json::from_value).transpose() {
        Ok(Some(params)) => params,
        Ok(None) => {
            return JsonRpcResponse::error(id, error_codes::INVALID_PARAMS, "Missing params");
        }
        Err(e) => {
            return JsonRpcResponse::error(id, error_codes::INVALID_PARAMS, format!("Invalid params: {e}"));
        }
    };

    let arguments = params.arguments.unwrap_or_else(|| json!({}));
    match service.call_tool(&params.name, arguments).await {
        Ok(result) => encode(id, CallToolResult::success(result)),
        Err(ToolCallError::Git(e)) => {
            warn!(tool = %params.name, kind = e.kind(), error = %e, "tool failed");
            encode(id, CallToolResult::failure(e.kind(), e.to_string()))
        }
        Err(e @ (ToolCallError::UnknownTool(_) | ToolCallError::InvalidArguments { .. })) => {
            JsonRpcResponse::error(id, error_codes::INVALID_PARAMS, e.to_string())
        }
        Err(e @ ToolCallError::Encode(_)) => {
            JsonRpcResponse::error(id, error_codes::INTERNAL_ERROR, e.to_string())
        }
    }
}

fn encode<T: serde::Serialize>(id: Option<Value>, result: T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(id, error_codes::INTERNAL_ERROR, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tokio::io::AsyncReadExt;

    async fn roundtrip(input: &str) -> Vec<Value> {
        let service = GitCommitter::new(Config::default());
        let (writer, mut reader) = tokio::io::duplex(1 << 20);
        serve(service, input.as_bytes(), writer).await.unwrap();

        let mut out = String::new();
        reader.read_to_string(&mut out).await.unwrap();
        out.lines().map(|l| serde_json::from_str(l).unwrap()).collect()
    }

    fn by_id(responses: &[Value], id: i64) -> &Value {
        responses.iter().find(|r| r["id"] == id).unwrap()
    }

    #[tokio::test]
    async fn test_initialize_and_list_tools() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n",
        );
        let responses = roundtrip(input).await;
        assert_eq!(responses.len(), 2);

        let init = by_id(&responses, 1);
        assert_eq!(init["result"]["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(init["result"]["serverInfo"]["name"], SERVER_NAME);

        let tools = by_id(&responses, 2)["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 4);
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let input = concat!(
            "not json\n",
            r#"{"jsonrpc":"2.0","id":3,"method":"resources/list"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"rebase"}}"#,
            "\n",
            r#"{"jsonrpc":"1.0","id":5,"method":"ping"}"#,
            "\n",
        );
        let responses = roundtrip(input).await;
        assert_eq!(responses.len(), 4);

        let parse = responses.iter().find(|r| r["id"].is_null()).unwrap();
        assert_eq!(parse["error"]["code"], error_codes::PARSE_ERROR);
        assert_eq!(by_id(&responses, 3)["error"]["code"], error_codes::METHOD_NOT_FOUND);
        assert_eq!(by_id(&responses, 4)["error"]["code"], error_codes::INVALID_PARAMS);
        assert_eq!(by_id(&responses, 5)["error"]["code"], error_codes::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_tool_failure_is_reported_in_result() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":"a","method":"tools/call","params":{"name":"get_file_diff","arguments":{"session_id":"missing","path":"x"}}}"#,
            "\n",
        );
        let responses = roundtrip(input).await;
        let result = &responses[0]["result"];
        assert_eq!(result["isError"], true);
        assert_eq!(result["structuredContent"]["error"], "invalid_session");
        assert!(result["content"][0]["text"].as_str().unwrap().contains("open_repo"));
    }
}
