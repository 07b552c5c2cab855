use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::errors::DispatchError;
use crate::models::message::Message;
use crate::models::tool::ToolCall;
use crate::providers::ToolProvider;
use crate::registry::ToolRegistry;

/// Routes model-issued tool calls to the providers that own them.
///
/// The core guarantee: every input call yields exactly one tool message, in
/// input order, whether it succeeded or failed. Failures become structured
/// error content so the model can read them; they never abort the batch.
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    providers: HashMap<String, Arc<dyn ToolProvider>>,
}

impl ToolDispatcher {
    pub fn new(
        registry: Arc<ToolRegistry>,
        providers: HashMap<String, Arc<dyn ToolProvider>>,
    ) -> Self {
        ToolDispatcher {
            registry,
            providers,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Close every provider connection. Best effort: failures are logged,
    /// never propagated.
    pub async fn shutdown_all(&self) {
        for provider in self.providers.values() {
            if let Err(err) = provider.shutdown().await {
                tracing::warn!(provider = %provider.id(), %err, "failed to close provider");
            }
        }
    }

    /// Execute a batch of tool calls, one result message per call.
    ///
    /// Calls run concurrently since each is independent; results are
    /// reassembled in request order before anything reaches the transcript.
    pub async fn dispatch(&self, tool_calls: &[ToolCall]) -> Vec<Message> {
        let futures: Vec<_> = tool_calls.iter().map(|call| self.dispatch_one(call)).collect();
        futures::future::join_all(futures).await
    }

    async fn dispatch_one(&self, call: &ToolCall) -> Message {
        let content = match self.execute(call).await {
            Ok(text) => text,
            Err(err) => json!({"error": err.to_string()}).to_string(),
        };
        Message::tool(call.id.as_str(), call.function.name.as_str(), content)
    }

    async fn execute(&self, call: &ToolCall) -> Result<String, DispatchError> {
        let name = &call.function.name;
        let arguments: Value = serde_json::from_str(&call.function.arguments)
            .map_err(|err| DispatchError::InvalidArguments(err.to_string()))?;

        let descriptor = self
            .registry
            .resolve(name)
            .ok_or_else(|| DispatchError::ToolNotFound(name.clone()))?;

        let provider = self
            .providers
            .get(&descriptor.provider_id)
            .ok_or_else(|| DispatchError::CallFailed(format!("Server not found for tool: {name}")))?;

        debug!(tool = %name, provider = %descriptor.provider_id, "calling tool");
        let items = provider
            .call_tool(name, arguments)
            .await
            .map_err(|err| DispatchError::CallFailed(err.to_string()))?;

        Ok(render_content(&items))
    }
}

/// Reduce a provider's content items to text: text items pass through,
/// anything else is JSON-serialized, joined with newlines.
fn render_content(items: &[Value]) -> String {
    items
        .iter()
        .map(|item| match item.get("type").and_then(Value::as_str) {
            Some("text") => item
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            _ => item.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
