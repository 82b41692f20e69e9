//! SQL generation from a natural-language question

use crate::error::{BridgeError, Result};
use crate::llm::client::{ChatMessage, ChatRequest, TextGenerator, TokenUsage};
use crate::llm::json_extract::extract_json_object;
use crate::llm::prompt;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

lazy_static! {
    /// Provider messages meaning "the model could not produce a tool call".
    static ref TOOL_CALL_FAILED: Regex =
        Regex::new(r"(?i)tool_use_failed|Failed to call a function").expect("valid regex");
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedSql {
    pub sql: String,
    pub params: Vec<Value>,
    pub explanation: Option<String>,
    pub usage: Option<TokenUsage>,
}

pub struct SqlGenerator {
    llm: Arc<dyn TextGenerator>,
}

impl SqlGenerator {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self { llm }
    }

    /// Ask the provider for one SELECT. Uses forced function calling and
    /// retries once in plain-text mode when the provider rejects the tool call.
    pub async fn generate(&self, question: &str, schema_context: &str) -> Result<GeneratedSql> {
        let messages = vec![
            ChatMessage::system(prompt::sql_system_prompt()),
            ChatMessage::user(prompt::sql_user_prompt(question, schema_context)),
        ];

        let tooled = ChatRequest::new(messages.clone())
            .with_tool(prompt::generate_sql_tool(), prompt::generate_sql_tool_choice());

        let completion = match self.llm.chat_completion(&tooled).await {
            Ok(completion) => completion,
            Err(BridgeError::Llm(msg)) if TOOL_CALL_FAILED.is_match(&msg) => {
                warn!(error = %msg, "tool call rejected, retrying without tools");
                self.llm.chat_completion(&ChatRequest::new(messages)).await?
            }
            Err(e) => return Err(e),
        };

        let object = match completion.tool_args {
            Some(Value::String(raw)) => extract_json_object(&raw)?,
            Some(args) => args,
            None => extract_json_object(completion.content.as_deref().unwrap_or(""))?,
        };

        let sql = object
            .get("sql")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BridgeError::Llm("LLM did not return a valid \"sql\" field".to_string()))?
            .to_string();

        let params = match object.get("params") {
            Some(Value::Array(params)) => params.clone(),
            _ => Vec::new(),
        };

        let explanation = object
            .get("explanation")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(GeneratedSql {
            sql,
            params,
            explanation,
            usage: completion.usage,
        })
    }
}
