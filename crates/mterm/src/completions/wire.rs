use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::message::Message;
use crate::models::role::Role;
use crate::models::tool::{ToolCall, ToolDescriptor};

/// Prefix used when a tool message arrives without its correlation id and
/// has to be degraded to a plain user message.
pub const MISSING_TOOL_ID_PREFIX: &str = "Tool response without ID: ";

/// Roles understood by the completion API. The internal `developer` role
/// does not exist on the wire; it maps to `system`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireRole {
    System,
    User,
    Assistant,
    Tool,
}

/// One message in the shape the completion API expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: WireRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl WireMessage {
    fn plain(role: WireRole, content: &str) -> Self {
        WireMessage {
            role,
            content: content.to_string(),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }
}

/// Convert an internal transcript message to the completion API shape.
///
/// This mapping is compatibility-sensitive and deliberately exhaustive so
/// every role is handled in exactly one place. It is a pure function: no
/// side effects, same output for the same input, whether used for the
/// request payload or a mirrored log.
pub fn message_to_wire(message: &Message) -> WireMessage {
    match message.role {
        Role::System | Role::Developer => WireMessage::plain(WireRole::System, &message.content),
        Role::User => WireMessage::plain(WireRole::User, &message.content),
        Role::Assistant => WireMessage {
            role: WireRole::Assistant,
            content: message.content.clone(),
            tool_calls: message.tool_calls.clone(),
            tool_call_id: None,
            name: None,
        },
        Role::Tool => match &message.tool_call_id {
            Some(id) => WireMessage {
                role: WireRole::Tool,
                content: message.content.clone(),
                tool_calls: None,
                tool_call_id: Some(id.clone()),
                name: message.name.clone(),
            },
            // Should not occur given the transcript invariant, but a tool
            // message without its correlation id would be rejected by the
            // API, so degrade it to user content instead.
            None => WireMessage::plain(
                WireRole::User,
                &format!("{}{}", MISSING_TOOL_ID_PREFIX, message.content),
            ),
        },
    }
}

/// A tool in the completion API's function-calling catalog shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireTool {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: WireFunction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Convert a registry descriptor to the completion API tool shape.
pub fn descriptor_to_wire(descriptor: &ToolDescriptor) -> WireTool {
    WireTool {
        kind: "function".to_string(),
        function: WireFunction {
            name: descriptor.name.clone(),
            description: descriptor.description.clone(),
            parameters: descriptor.input_schema.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn developer_maps_to_system() {
        let wire = message_to_wire(&Message::developer("be brief"));
        assert_eq!(wire.role, WireRole::System);
        assert_eq!(wire.content, "be brief");
    }

    #[test]
    fn system_and_user_pass_through() {
        assert_eq!(message_to_wire(&Message::system("s")).role, WireRole::System);
        assert_eq!(message_to_wire(&Message::user("u")).role, WireRole::User);
    }

    #[test]
    fn assistant_keeps_tool_calls() {
        let call = ToolCall::function("c1", "search", "{}");
        let message = Message::assistant("").with_tool_calls(vec![call.clone()]);
        let wire = message_to_wire(&message);
        assert_eq!(wire.role, WireRole::Assistant);
        assert_eq!(wire.tool_calls, Some(vec![call]));
    }

    #[test]
    fn tool_with_id_maps_to_tool_role() {
        let wire = message_to_wire(&Message::tool("c1", "search", "result"));
        assert_eq!(wire.role, WireRole::Tool);
        assert_eq!(wire.tool_call_id.as_deref(), Some("c1"));
        assert_eq!(wire.name.as_deref(), Some("search"));
        assert_eq!(wire.content, "result");
    }

    #[test]
    fn tool_without_id_degrades_to_user() {
        let mut message = Message::tool("c1", "search", "orphaned");
        message.tool_call_id = None;
        let wire = message_to_wire(&message);
        assert_eq!(wire.role, WireRole::User);
        assert_eq!(wire.content, "Tool response without ID: orphaned");
        assert!(wire.name.is_none());
    }

    #[test]
    fn mapping_is_deterministic() {
        let message = Message::assistant("answer")
            .with_tool_calls(vec![ToolCall::function("c1", "f", "{}")]);
        assert_eq!(message_to_wire(&message), message_to_wire(&message));
    }

    #[test]
    fn descriptor_maps_to_function_catalog_entry() {
        let schema = json!({"type": "object", "properties": {}});
        let descriptor = ToolDescriptor::new("search", "Search the web", schema.clone(), "p1");
        let wire = descriptor_to_wire(&descriptor);

        let value = serde_json::to_value(&wire).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "function",
                "function": {
                    "name": "search",
                    "description": "Search the web",
                    "parameters": schema
                }
            })
        );
    }

    #[test]
    fn wire_message_omits_absent_fields() {
        let value = serde_json::to_value(message_to_wire(&Message::user("hi"))).unwrap();
        assert_eq!(value, json!({"role": "user", "content": "hi"}));
    }
}
