use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::wire::{WireMessage, WireTool};
use crate::models::tool::ToolCall;

/// One chat-completion request.
///
/// `tools` is present only on the first request of a turn; the follow-up
/// request after tool results deliberately omits it so the model cannot
/// open another tool round.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<WireTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
}

impl CompletionRequest {
    pub fn new<S: Into<String>>(model: S, messages: Vec<WireMessage>) -> Self {
        CompletionRequest {
            model: model.into(),
            messages,
            tools: None,
            tool_choice: None,
        }
    }

    /// Offer the tool catalog with `tool_choice: auto`
    pub fn with_tools(mut self, tools: Vec<WireTool>) -> Self {
        self.tools = Some(tools);
        self.tool_choice = Some("auto".to_string());
        self
    }
}

/// The assistant message extracted from a completion response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionReply {
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

impl CompletionReply {
    pub fn text<S: Into<String>>(content: S) -> Self {
        CompletionReply {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_requests(tool_calls: Vec<ToolCall>) -> Self {
        CompletionReply {
            content: None,
            tool_calls,
        }
    }
}

/// Base trait for chat-completion backends (OpenAI-compatible endpoints,
/// test doubles). Errors are opaque to the conversation engine; it surfaces
/// them to the user without interpreting status codes.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionReply>;
}
