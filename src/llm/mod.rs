//! Text-generation provider client and SQL generation

pub mod client;
pub mod generator;
pub mod json_extract;
pub mod prompt;

pub use client::{ChatCompletion, ChatMessage, ChatRequest, LlmClient, Role, TextGenerator, TokenUsage};
pub use generator::{GeneratedSql, SqlGenerator};
