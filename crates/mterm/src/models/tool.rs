use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A model-issued request to invoke a named function.
///
/// `arguments` is the raw JSON text exactly as the model produced it; it is
/// parsed only at the dispatcher boundary, where a parse failure is a
/// recoverable per-call error rather than a fault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

impl ToolCall {
    /// Create a function-typed tool call
    pub fn function<I, N, A>(id: I, name: N, arguments: A) -> Self
    where
        I: Into<String>,
        N: Into<String>,
        A: Into<String>,
    {
        ToolCall {
            id: id.into(),
            kind: "function".to_string(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// A tool exposed by a provider, flattened into the shared catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    /// Id of the provider connection that owns this tool
    pub provider_id: String,
}

impl ToolDescriptor {
    pub fn new<N, D, P>(name: N, description: D, input_schema: Value, provider_id: P) -> Self
    where
        N: Into<String>,
        D: Into<String>,
        P: Into<String>,
    {
        ToolDescriptor {
            name: name.into(),
            description: description.into(),
            input_schema,
            provider_id: provider_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_call_serializes_openai_shape() {
        let call = ToolCall::function("call_1", "get_weather", "{\"location\":\"Boston\"}");
        let value = serde_json::to_value(&call).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "call_1",
                "type": "function",
                "function": {
                    "name": "get_weather",
                    "arguments": "{\"location\":\"Boston\"}"
                }
            })
        );
    }

    #[test]
    fn tool_call_round_trips() {
        let raw = json!({
            "id": "c2",
            "type": "function",
            "function": {"name": "search", "arguments": "{}"}
        });
        let call: ToolCall = serde_json::from_value(raw).unwrap();
        assert_eq!(call.function.name, "search");
        assert_eq!(call.kind, "function");
    }
}
