//! In-memory stand-ins for the database and the text-generation provider.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use sql_bridge::db::{ExecutionError, JsonRow, QueryExecutor};
use sql_bridge::llm::{ChatCompletion, ChatRequest, TextGenerator};
use sql_bridge::schema::{CatalogCache, ColumnDescriptor, MetadataSource};
use sql_bridge::service::BridgeService;
use sql_bridge::{BridgeError, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn column(table: &str, column: &str, sql_type: &str) -> ColumnDescriptor {
    ColumnDescriptor {
        table: table.to_string(),
        column: column.to_string(),
        sql_type: sql_type.to_string(),
        nullable: column != "id",
    }
}

pub fn northwind_columns() -> Vec<ColumnDescriptor> {
    vec![
        column("customers", "id", "int"),
        column("customers", "company", "varchar(50)"),
        column("customers", "city", "varchar(50)"),
        column("employees", "id", "int"),
        column("employees", "last_name", "varchar(50)"),
        column("order_details", "id", "int"),
        column("order_details", "order_id", "int"),
        column("order_details", "product_id", "int"),
        column("order_details", "quantity", "decimal(18,4)"),
        column("order_details", "unit_price", "decimal(19,4)"),
        column("orders", "id", "int"),
        column("orders", "customer_id", "int"),
        column("orders", "order_date", "datetime"),
        column("products", "id", "int"),
        column("products", "product_name", "varchar(50)"),
        column("products", "list_price", "decimal(19,4)"),
    ]
}

/// Serves a fixed column list, or fails every load.
pub struct StaticMetadata {
    columns: Option<Vec<ColumnDescriptor>>,
    delay: Duration,
    pub loads: AtomicUsize,
}

impl StaticMetadata {
    pub fn northwind() -> Arc<Self> {
        Arc::new(Self {
            columns: Some(northwind_columns()),
            delay: Duration::ZERO,
            loads: AtomicUsize::new(0),
        })
    }

    /// Northwind, but every load takes `delay`.
    pub fn slow_northwind(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            columns: Some(northwind_columns()),
            delay,
            loads: AtomicUsize::new(0),
        })
    }

    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            columns: None,
            delay: Duration::ZERO,
            loads: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl MetadataSource for StaticMetadata {
    async fn load_columns(&self) -> Result<Vec<ColumnDescriptor>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.columns
            .clone()
            .ok_or_else(|| BridgeError::Catalog("connection refused".to_string()))
    }
}

/// Replays queued completions in order; errors once the queue is empty.
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<ChatCompletion>>>,
    pub calls: AtomicUsize,
}

impl ScriptedLlm {
    pub fn new(replies: Vec<Result<ChatCompletion>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        })
    }

    /// One forced-tool reply carrying `sql`.
    pub fn answering(sql: &str) -> Arc<Self> {
        Self::new(vec![Ok(tool_reply(sql))])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn tool_reply(sql: &str) -> ChatCompletion {
    ChatCompletion {
        content: None,
        tool_args: Some(json!({ "sql": sql, "params": [], "explanation": "generated" })),
        usage: None,
    }
}

#[async_trait]
impl TextGenerator for ScriptedLlm {
    async fn chat_completion(&self, _request: &ChatRequest) -> Result<ChatCompletion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Suspend like a network call so concurrent asks interleave.
        tokio::task::yield_now().await;
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BridgeError::Llm("LLM request failed: 503 unavailable".to_string())))
    }
}

/// Returns canned rows or a canned failure and records every statement.
pub struct RecordingExecutor {
    result: std::result::Result<Vec<JsonRow>, ExecutionError>,
    pub statements: Mutex<Vec<(String, Vec<Value>)>>,
}

impl RecordingExecutor {
    pub fn returning(rows: Vec<Value>) -> Arc<Self> {
        let rows = rows
            .into_iter()
            .filter_map(|row| match row {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        Arc::new(Self {
            result: Ok(rows),
            statements: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(error: ExecutionError) -> Arc<Self> {
        Arc::new(Self {
            result: Err(error),
            statements: Mutex::new(Vec::new()),
        })
    }

    pub fn executed(&self) -> Vec<String> {
        self.statements.lock().unwrap().iter().map(|(sql, _)| sql.clone()).collect()
    }
}

#[async_trait]
impl QueryExecutor for RecordingExecutor {
    async fn execute(&self, sql: &str, params: &[Value]) -> std::result::Result<Vec<JsonRow>, ExecutionError> {
        self.statements.lock().unwrap().push((sql.to_string(), params.to_vec()));
        self.result.clone()
    }
}

pub fn service(
    metadata: Arc<StaticMetadata>,
    llm: Arc<ScriptedLlm>,
    executor: Arc<RecordingExecutor>,
) -> BridgeService {
    BridgeService::new(Arc::new(CatalogCache::new(metadata)), llm, executor)
}
