use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, warn};

use super::ToolProvider;
use crate::config::ProviderConfig;
use crate::errors::{ProviderError, ProviderResult};
use crate::models::tool::ToolDescriptor;

const PROTOCOL_VERSION: &str = "2025-06-18";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A tool provider spoken to over newline-delimited JSON-RPC on the stdio
/// of a spawned subprocess (the MCP stdio transport).
pub struct StdioProvider {
    id: String,
    inner: Arc<Inner>,
}

struct Inner {
    id: String,
    writer: Mutex<BufWriter<ChildStdin>>,
    pending: Mutex<HashMap<u64, oneshot::Sender<Value>>>,
    next_id: AtomicU64,
    connected: AtomicBool,
    child: Mutex<Child>,
}

impl StdioProvider {
    /// Spawn the provider process and run the MCP initialize handshake.
    pub async fn spawn(id: &str, config: &ProviderConfig) -> ProviderResult<Self> {
        let mut command = Command::new(&config.command);
        command
            .args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| ProviderError::Spawn {
            provider: id.to_string(),
            source,
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| transport(id, "failed to capture provider stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| transport(id, "failed to capture provider stdout"))?;

        let inner = Arc::new(Inner {
            id: id.to_string(),
            writer: Mutex::new(BufWriter::new(stdin)),
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            connected: AtomicBool::new(true),
            child: Mutex::new(child),
        });

        let reader_inner = Arc::clone(&inner);
        tokio::spawn(async move {
            reader_inner.reader_loop(stdout).await;
        });

        let provider = StdioProvider {
            id: id.to_string(),
            inner,
        };
        provider.initialize().await?;
        Ok(provider)
    }

    async fn initialize(&self) -> ProviderResult<()> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
            "capabilities": {}
        });
        self.inner.request("initialize", params).await?;
        self.inner
            .notify("notifications/initialized", json!({}))
            .await
    }
}

#[async_trait]
impl ToolProvider for StdioProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    async fn list_tools(&self) -> ProviderResult<Vec<ToolDescriptor>> {
        let result = self.inner.request("tools/list", json!({})).await?;
        Ok(parse_tool_list(&self.id, &result))
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> ProviderResult<Vec<Value>> {
        let result = self
            .inner
            .request("tools/call", json!({"name": name, "arguments": arguments}))
            .await?;
        let content = match result.get("content") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        Ok(content)
    }

    async fn shutdown(&self) -> ProviderResult<()> {
        self.inner.connected.store(false, Ordering::SeqCst);
        let mut child = self.inner.child.lock().await;
        child.kill().await.map_err(|err| ProviderError::Transport {
            provider: self.id.clone(),
            message: format!("failed to stop provider process: {err}"),
        })
    }
}

impl Inner {
    async fn request(&self, method: &str, params: Value) -> ProviderResult<Value> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(ProviderError::Closed {
                provider: self.id.clone(),
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let frame = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        if let Err(err) = self.write_frame(&frame).await {
            self.pending.lock().await.remove(&id);
            return Err(err);
        }

        let response = match tokio::time::timeout(REQUEST_TIMEOUT, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                return Err(ProviderError::Closed {
                    provider: self.id.clone(),
                })
            }
            Err(_) => {
                self.pending.lock().await.remove(&id);
                return Err(transport(&self.id, &format!("request '{method}' timed out")));
            }
        };

        if let Some(error) = response.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or_else(|| error.to_string());
            return Err(ProviderError::Rpc {
                provider: self.id.clone(),
                message,
            });
        }
        Ok(response.get("result").cloned().unwrap_or(Value::Null))
    }

    async fn notify(&self, method: &str, params: Value) -> ProviderResult<()> {
        let frame = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        });
        self.write_frame(&frame).await
    }

    async fn write_frame(&self, frame: &Value) -> ProviderResult<()> {
        let mut line = frame.to_string();
        line.push('\n');
        let mut writer = self.writer.lock().await;
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|err| transport(&self.id, &err.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|err| transport(&self.id, &err.to_string()))
    }

    async fn reader_loop(self: Arc<Self>, stdout: ChildStdout) {
        let mut lines = BufReader::new(stdout).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    let frame: Value = match serde_json::from_str(trimmed) {
                        Ok(frame) => frame,
                        Err(err) => {
                            warn!(provider = %self.id, %err, "discarding malformed provider frame");
                            continue;
                        }
                    };
                    self.route(frame).await;
                }
                Ok(None) => break,
                Err(err) => {
                    warn!(provider = %self.id, %err, "provider stdout read failed");
                    break;
                }
            }
        }
        self.connected.store(false, Ordering::SeqCst);
        // Wake everything still waiting so calls fail as closed instead of
        // hanging until their timeout.
        self.pending.lock().await.clear();
        debug!(provider = %self.id, "provider connection closed");
    }

    async fn route(&self, frame: Value) {
        let Some(id) = frame.get("id").and_then(Value::as_u64) else {
            // Server-initiated notification; nothing to correlate.
            return;
        };
        match self.pending.lock().await.remove(&id) {
            Some(tx) => {
                let _ = tx.send(frame);
            }
            None => warn!(provider = %self.id, id, "response for unknown request id"),
        }
    }
}

fn transport(provider: &str, message: &str) -> ProviderError {
    ProviderError::Transport {
        provider: provider.to_string(),
        message: message.to_string(),
    }
}

/// Map a `tools/list` result into flattened descriptors owned by this
/// provider.
fn parse_tool_list(provider_id: &str, result: &Value) -> Vec<ToolDescriptor> {
    let Some(tools) = result.get("tools").and_then(Value::as_array) else {
        return Vec::new();
    };

    tools
        .iter()
        .filter_map(|tool| {
            let name = tool.get("name").and_then(Value::as_str)?;
            let description = tool
                .get("description")
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or_else(|| format!("Tool from {provider_id}"));
            let input_schema = tool
                .get("inputSchema")
                .cloned()
                .unwrap_or_else(|| json!({"type": "object"}));
            Some(ToolDescriptor::new(name, description, input_schema, provider_id))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tool_list() {
        let result = json!({
            "tools": [
                {
                    "name": "get_weather",
                    "description": "Current weather",
                    "inputSchema": {"type": "object", "properties": {"location": {"type": "string"}}}
                },
                {"name": "bare"}
            ]
        });

        let descriptors = parse_tool_list("weather", &result);
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].name, "get_weather");
        assert_eq!(descriptors[0].provider_id, "weather");
        assert_eq!(descriptors[1].description, "Tool from weather");
        assert_eq!(descriptors[1].input_schema, json!({"type": "object"}));
    }

    #[test]
    fn tool_list_without_tools_is_empty() {
        assert!(parse_tool_list("p", &Value::Null).is_empty());
        assert!(parse_tool_list("p", &json!({"tools": "nope"})).is_empty());
    }

    #[test]
    fn entries_without_names_are_dropped() {
        let result = json!({"tools": [{"description": "anonymous"}]});
        assert!(parse_tool_list("p", &result).is_empty());
    }

    #[tokio::test]
    async fn spawn_failure_is_reported() {
        let config = ProviderConfig {
            command: "/definitely/not/a/binary".to_string(),
            args: Vec::new(),
            env: HashMap::new(),
        };
        let result = StdioProvider::spawn("ghost", &config).await;
        assert!(matches!(result, Err(ProviderError::Spawn { .. })));
    }
}
