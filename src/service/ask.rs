//! Natural-language question flow
//!
//! memo lookup -> catalog -> table selection -> generation -> validation ->
//! optional execution -> memo store. Only complete successes are memoized.

use crate::cache::{MemoFlags, MemoLookup};
use crate::db::{ExecutionError, JsonRow};
use crate::error::Result;
use crate::schema::format_schema_for_prompt;
use crate::service::{BridgeService, PROMPT_MAX_COLUMNS_PER_TABLE};
use crate::sql::ValidationOutcome;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tracing::{error, info};

const INVALID_COLUMN_HINT: &str =
    "The SQL referenced a column that does not exist. Use only columns from the schema returned by /v1/meta/schema.";

fn default_execute() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default = "default_execute")]
    pub execute: bool,
    #[serde(default)]
    pub debug: bool,
}

impl AskRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            execute: true,
            debug: false,
        }
    }

    fn flags(&self) -> MemoFlags {
        MemoFlags {
            execute: self.execute,
            debug: self.debug,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheInfo {
    pub hit: bool,
    pub age_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    pub question: String,
    pub selected_tables: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_context: Option<String>,
    pub sql: String,
    pub params: Vec<Value>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_explanation: Option<String>,
    pub llm_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<JsonRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationFailure {
    pub error: &'static str,
    pub message: String,
    pub question: String,
    pub selected_tables: Vec<String>,
    pub llm_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedSummary {
    pub sql: String,
    pub params: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub error: &'static str,
    pub question: String,
    pub selected_tables: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_context: Option<String>,
    pub llm: GeneratedSummary,
    pub validation: ValidationOutcome,
    pub llm_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionFailure {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    pub message: String,
    pub question: String,
    pub selected_tables: Vec<String>,
    pub sql: String,
    pub params: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_explanation: Option<String>,
    pub llm_ms: u64,
    pub db_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AskOutcome {
    Answered(AskResponse),
    GenerationFailed(GenerationFailure),
    Rejected(Rejection),
    ExecutionFailed(ExecutionFailure),
}

impl AskOutcome {
    pub fn status_code(&self) -> u16 {
        match self {
            AskOutcome::Answered(_) => 200,
            AskOutcome::GenerationFailed(_) => 502,
            AskOutcome::Rejected(_) => 400,
            AskOutcome::ExecutionFailed(f) if f.reason.is_some() => 400,
            AskOutcome::ExecutionFailed(_) => 500,
        }
    }
}

impl BridgeService {
    /// Answer a question. Fails only when the schema catalog is unavailable;
    /// generation, validation and execution problems are outcomes.
    pub async fn ask(&self, request: &AskRequest) -> Result<AskOutcome> {
        let flags = request.flags();
        let question = request.question.clone();

        if let MemoLookup::Hit { value, age, .. } = self.memo.get(&question, flags) {
            let age_ms = age.as_millis() as u64;
            info!(cache_hit = true, cache_age_ms = age_ms, "cache.hit");
            // A replayed response did no work, so it reports none.
            let mut response = value;
            response.llm_ms = 0;
            if response.db_ms.is_some() {
                response.db_ms = Some(0);
            }
            response.cache = Some(CacheInfo { hit: true, age_ms });
            return Ok(AskOutcome::Answered(response));
        }

        let catalog = self.catalog.get_catalog().await?;
        let selected = self.selector.select_tables(&question, &catalog.compact_tables());
        let selected_tables: Vec<String> = selected.iter().map(|t| t.table.clone()).collect();
        let schema_context = format_schema_for_prompt(&selected, PROMPT_MAX_COLUMNS_PER_TABLE);
        let debug_context = request.debug.then(|| schema_context.clone());

        let llm_start = Instant::now();
        let generated = match self.generator.generate(&question, &schema_context).await {
            Ok(generated) => generated,
            Err(e) => {
                let llm_ms = llm_start.elapsed().as_millis() as u64;
                error!(llm_ms, error = %e, "llm.error");
                return Ok(AskOutcome::GenerationFailed(GenerationFailure {
                    error: "LLM_FAILED",
                    message: e.to_string(),
                    question,
                    selected_tables,
                    llm_ms,
                    schema_context: debug_context,
                }));
            }
        };
        let llm_ms = llm_start.elapsed().as_millis() as u64;
        info!(
            llm_ms,
            total_tokens = generated.usage.as_ref().and_then(|u| u.total_tokens),
            "llm.ok"
        );

        let validation = self.validator.validate(&generated.sql).await?;
        let safe_sql = match validation.safe_sql.clone() {
            Some(sql) if validation.ok => sql,
            _ => {
                info!(validation_errors = ?validation.errors, "sql.validation_failed");
                return Ok(AskOutcome::Rejected(Rejection {
                    error: "SQL_GENERATED_BUT_REJECTED",
                    question,
                    selected_tables,
                    schema_context: debug_context,
                    llm: GeneratedSummary {
                        sql: generated.sql,
                        params: generated.params,
                        explanation: generated.explanation,
                    },
                    validation,
                    llm_ms,
                }));
            }
        };

        if !request.execute {
            let response = AskResponse {
                question: question.clone(),
                selected_tables,
                schema_context: Some(schema_context),
                sql: safe_sql,
                params: generated.params,
                warnings: validation.warnings,
                llm_explanation: generated.explanation,
                llm_ms,
                db_ms: None,
                rows: None,
                cache: None,
            };
            self.memo.put(&question, flags, response.clone());
            info!(cache_store = true, "cache.store");
            return Ok(AskOutcome::Answered(response));
        }

        let db_start = Instant::now();
        match self.executor.execute(&safe_sql, &generated.params).await {
            Ok(rows) => {
                let db_ms = db_start.elapsed().as_millis() as u64;
                info!(db_ms, rows = rows.len(), "db.ok");
                let response = AskResponse {
                    question: question.clone(),
                    selected_tables,
                    schema_context: debug_context,
                    sql: safe_sql,
                    params: generated.params,
                    warnings: validation.warnings,
                    llm_explanation: generated.explanation,
                    llm_ms,
                    db_ms: Some(db_ms),
                    rows: Some(rows),
                    cache: None,
                };
                self.memo.put(&question, flags, response.clone());
                info!(cache_store = true, "cache.store");
                Ok(AskOutcome::Answered(response))
            }
            Err(e) => {
                let db_ms = db_start.elapsed().as_millis() as u64;
                let (reason, hint) = match &e {
                    ExecutionError::UnknownColumn(_) => {
                        info!(db_ms, error = %e, "db.invalid_column");
                        (Some("INVALID_COLUMN"), Some(INVALID_COLUMN_HINT))
                    }
                    ExecutionError::Failed(_) => {
                        error!(db_ms, error = %e, "db.error");
                        (None, None)
                    }
                };
                Ok(AskOutcome::ExecutionFailed(ExecutionFailure {
                    error: "SQL_EXECUTION_FAILED",
                    reason,
                    message: e.to_string(),
                    question,
                    selected_tables,
                    sql: safe_sql,
                    params: generated.params,
                    llm_explanation: generated.explanation,
                    llm_ms,
                    db_ms,
                    hint,
                    schema_context: debug_context,
                }))
            }
        }
    }
}
