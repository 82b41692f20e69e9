//! Direct SQL endpoints: validation only, validated execution, schema dump.

use crate::db::{ExecutionError, JsonRow};
use crate::error::Result;
use crate::schema::CompactTable;
use crate::service::BridgeService;
use crate::sql::ValidationOutcome;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateRequest {
    pub sql: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub sql: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaResponse {
    pub tables: Vec<CompactTable>,
}

/// Fixed statement behind the demo endpoint.
pub const DEMO_TOP_PRODUCTS_SQL: &str =
    "SELECT id, product_name, list_price FROM products ORDER BY list_price DESC LIMIT 10";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemoResponse {
    pub sql: &'static str,
    pub data: Vec<JsonRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    pub sql: String,
    pub warnings: Vec<String>,
    pub latency_ms: u64,
    pub rows: Vec<JsonRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRejection {
    pub error: &'static str,
    #[serde(flatten)]
    pub validation: ValidationOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryFailure {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    pub message: String,
    pub sql: String,
    pub params: Vec<Value>,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryOutcome {
    Rows(QueryResponse),
    Rejected(QueryRejection),
    ExecutionFailed(QueryFailure),
}

impl QueryOutcome {
    pub fn status_code(&self) -> u16 {
        match self {
            QueryOutcome::Rows(_) => 200,
            QueryOutcome::Rejected(_) => 400,
            QueryOutcome::ExecutionFailed(f) if f.reason.is_some() => 400,
            QueryOutcome::ExecutionFailed(_) => 500,
        }
    }
}

impl BridgeService {
    pub async fn schema(&self) -> Result<SchemaResponse> {
        let catalog = self.catalog.get_catalog().await?;
        Ok(SchemaResponse {
            tables: catalog.compact_tables(),
        })
    }

    /// Ten most expensive products, straight from the executor.
    pub async fn demo_top_products(&self) -> std::result::Result<DemoResponse, ExecutionError> {
        let start = Instant::now();
        let data = self.executor.execute(DEMO_TOP_PRODUCTS_SQL, &[]).await?;
        info!(db_ms = start.elapsed().as_millis() as u64, rows = data.len(), "db.ok");
        Ok(DemoResponse {
            sql: DEMO_TOP_PRODUCTS_SQL,
            data,
        })
    }

    pub async fn validate_sql(&self, sql: &str) -> Result<ValidationOutcome> {
        let outcome = self.validator.validate(sql).await?;
        info!(ok = outcome.ok, errors = outcome.errors.len(), "sql.validate");
        Ok(outcome)
    }

    /// Validate, then execute the rewritten statement with `params`.
    pub async fn query_sql(&self, request: &QueryRequest) -> Result<QueryOutcome> {
        let validation = self.validator.validate(&request.sql).await?;
        let safe_sql = match validation.safe_sql.clone() {
            Some(sql) if validation.ok => sql,
            _ => {
                info!(validation_errors = ?validation.errors, "sql.validation_failed");
                return Ok(QueryOutcome::Rejected(QueryRejection {
                    error: "SQL_VALIDATION_FAILED",
                    validation,
                }));
            }
        };

        // Only the database round trip is timed.
        let start = Instant::now();
        match self.executor.execute(&safe_sql, &request.params).await {
            Ok(rows) => {
                let latency_ms = start.elapsed().as_millis() as u64;
                info!(db_ms = latency_ms, rows = rows.len(), "db.ok");
                Ok(QueryOutcome::Rows(QueryResponse {
                    sql: safe_sql,
                    warnings: validation.warnings,
                    latency_ms,
                    rows,
                }))
            }
            Err(e) => {
                let latency_ms = start.elapsed().as_millis() as u64;
                let reason = match &e {
                    ExecutionError::UnknownColumn(_) => {
                        info!(db_ms = latency_ms, error = %e, "db.invalid_column");
                        Some("INVALID_COLUMN")
                    }
                    ExecutionError::Failed(_) => {
                        error!(db_ms = latency_ms, error = %e, "db.error");
                        None
                    }
                };
                Ok(QueryOutcome::ExecutionFailed(QueryFailure {
                    error: "SQL_EXECUTION_FAILED",
                    reason,
                    message: e.to_string(),
                    sql: safe_sql,
                    params: request.params.clone(),
                    latency_ms,
                }))
            }
        }
    }
}
