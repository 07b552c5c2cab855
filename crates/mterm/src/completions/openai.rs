use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

use super::base::{CompletionProvider, CompletionReply, CompletionRequest};
use crate::models::tool::ToolCall;

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub host: String,
    pub api_key: String,
}

pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    /// Read configuration from OPENAI_API_KEY / OPENAI_HOST
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow!("OPENAI_API_KEY environment variable is not set."))?;
        let host = std::env::var("OPENAI_HOST")
            .unwrap_or_else(|_| "https://api.openai.com".to_string());
        Self::new(OpenAiConfig { host, api_key })
    }

    async fn post(&self, payload: &CompletionRequest) -> Result<Value> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                Err(anyhow!("Server error: {}", status))
            }
            status => Err(anyhow!("Request failed: {}", status)),
        }
    }
}

/// Extract the assistant message out of a chat-completion response body.
fn response_to_reply(response: &Value) -> Result<CompletionReply> {
    if let Some(error) = response.get("error") {
        return Err(anyhow!("OpenAI API error: {}", error));
    }

    let message = response
        .pointer("/choices/0/message")
        .ok_or_else(|| anyhow!("No message in completion response"))?;

    let content = message
        .get("content")
        .and_then(Value::as_str)
        .map(String::from);

    let tool_calls = match message.get("tool_calls") {
        Some(Value::Array(calls)) => calls
            .iter()
            .map(|call| serde_json::from_value::<ToolCall>(call.clone()))
            .collect::<Result<Vec<_>, _>>()?,
        _ => Vec::new(),
    };

    Ok(CompletionReply {
        content,
        tool_calls,
    })
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionReply> {
        let response = self.post(&request).await?;
        response_to_reply(&response)
    }
}
