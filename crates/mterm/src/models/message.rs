use serde::{Deserialize, Serialize};

use super::role::Role;
use super::tool::ToolCall;

/// A single transcript entry.
///
/// `tool_calls` appears only on assistant messages that request tool
/// execution; `tool_call_id` and `name` appear only on tool messages and
/// correlate the result back to the originating call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn new<S: Into<String>>(role: Role, content: S) -> Self {
        Message {
            role,
            content: content.into(),
            name: None,
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create a new system message
    pub fn system<S: Into<String>>(content: S) -> Self {
        Message::new(Role::System, content)
    }

    /// Create a new developer message
    pub fn developer<S: Into<String>>(content: S) -> Self {
        Message::new(Role::Developer, content)
    }

    /// Create a new user message
    pub fn user<S: Into<String>>(content: S) -> Self {
        Message::new(Role::User, content)
    }

    /// Create a new assistant message
    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Message::new(Role::Assistant, content)
    }

    /// Create a new tool result message correlated to the originating call
    pub fn tool<I, N, S>(tool_call_id: I, name: N, content: S) -> Self
    where
        I: Into<String>,
        N: Into<String>,
        S: Into<String>,
    {
        let mut message = Message::new(Role::Tool, content);
        message.tool_call_id = Some(tool_call_id.into());
        message.name = Some(name.into());
        message
    }

    /// Attach the tool calls requested by an assistant message
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = Some(tool_calls);
        self
    }

    /// Whether this assistant message requests any tool execution
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|calls| !calls.is_empty())
    }
}
