//! OpenAI-compatible chat completion client

use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Option<Vec<Value>>,
    pub tool_choice: Option<Value>,
    pub temperature: f32,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            tools: None,
            tool_choice: None,
            temperature: 0.0,
        }
    }

    pub fn with_tool(mut self, tool: Value, tool_choice: Value) -> Self {
        self.tools = Some(vec![tool]);
        self.tool_choice = Some(tool_choice);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

/// Either structured tool arguments or free text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatCompletion {
    pub content: Option<String>,
    pub tool_args: Option<Value>,
    pub usage: Option<TokenUsage>,
}

/// Text-generation provider seam.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatCompletion>;
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    arguments: Option<Value>,
}

pub struct LlmClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl LlmClient {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    fn request_body(&self, request: &ChatRequest) -> Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": request.messages,
            "temperature": request.temperature,
        });
        if let Some(tools) = &request.tools {
            body["tools"] = Value::Array(tools.clone());
        }
        if let Some(choice) = &request.tool_choice {
            body["tool_choice"] = choice.clone();
        }
        body
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatCompletion> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.request_body(request))
            .send()
            .await
            .map_err(|e| BridgeError::Llm(format!("LLM API call failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(BridgeError::Llm(format!(
                "LLM request failed: {} {}",
                status.as_u16(),
                text
            )));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| BridgeError::Llm(format!("Failed to parse LLM response: {}", e)))?;

        parse_completion(parsed)
    }
}

fn parse_completion(parsed: CompletionResponse) -> Result<ChatCompletion> {
    let usage = parsed.usage;
    let message = parsed.choices.into_iter().next().and_then(|c| c.message);

    let first_tool_args = message
        .as_ref()
        .and_then(|m| m.tool_calls.as_ref())
        .and_then(|calls| calls.first())
        .map(|call| call.function.as_ref().and_then(|f| f.arguments.clone()));

    if let Some(args) = first_tool_args {
        // Arguments usually arrive as a JSON-encoded string.
        let tool_args = match args {
            Some(Value::String(raw)) => Some(serde_json::from_str(&raw).unwrap_or(Value::String(raw))),
            other => other,
        };
        return Ok(ChatCompletion {
            content: None,
            tool_args,
            usage,
        });
    }

    match message.and_then(|m| m.content).filter(|c| !c.is_empty()) {
        Some(content) => Ok(ChatCompletion {
            content: Some(content),
            tool_args: None,
            usage,
        }),
        None => Err(BridgeError::Llm("LLM returned an empty response".to_string())),
    }
}
