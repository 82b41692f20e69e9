//! Read-only query execution against MySQL
//!
//! Rows come back as JSON objects keyed by column name. Failures are split
//! into "unknown column" (the generated SQL referenced a column that does not
//! exist) and everything else.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use sqlx::mysql::{MySqlArguments, MySqlPool, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, MySql, Row, TypeInfo, ValueRef};
use thiserror::Error;

/// SQLSTATE for MySQL's ER_BAD_FIELD_ERROR.
const UNKNOWN_COLUMN_SQLSTATE: &str = "42S22";

pub type JsonRow = Map<String, Value>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("{0}")]
    UnknownColumn(String),

    #[error("{0}")]
    Failed(String),
}

impl From<sqlx::Error> for ExecutionError {
    fn from(error: sqlx::Error) -> Self {
        let unknown_column = match &error {
            sqlx::Error::Database(db) => db.code().as_deref() == Some(UNKNOWN_COLUMN_SQLSTATE),
            _ => false,
        };
        if unknown_column {
            ExecutionError::UnknownColumn(error.to_string())
        } else {
            ExecutionError::Failed(error.to_string())
        }
    }
}

/// Runs an already-validated SELECT with positional parameters.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<Vec<JsonRow>, ExecutionError>;
}

pub struct MySqlExecutor {
    pool: MySqlPool,
}

impl MySqlExecutor {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueryExecutor for MySqlExecutor {
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<Vec<JsonRow>, ExecutionError> {
        let query = params.iter().fold(sqlx::query(sql), bind_param);
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_json).collect::<Result<Vec<_>, _>>().map_err(ExecutionError::from)
    }
}

fn bind_param<'q>(query: Query<'q, MySql, MySqlArguments>, param: &Value) -> Query<'q, MySql, MySqlArguments> {
    match param {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(u) = n.as_u64() {
                query.bind(u)
            } else {
                query.bind(n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) => query.bind(s.clone()),
        other => query.bind(other.to_string()),
    }
}

fn row_to_json(row: &MySqlRow) -> Result<JsonRow, sqlx::Error> {
    let mut object = Map::with_capacity(row.columns().len());
    for column in row.columns() {
        let value = decode_column(row, column.ordinal())?;
        object.insert(column.name().to_string(), value);
    }
    Ok(object)
}

fn decode_column(row: &MySqlRow, idx: usize) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_ascii_uppercase();

    let value = match type_name.as_str() {
        "BOOLEAN" => Value::Bool(row.try_get_unchecked::<bool, _>(idx)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            json!(row.try_get_unchecked::<i64, _>(idx)?)
        }
        t if t.ends_with(" UNSIGNED") || t == "BIT" => json!(row.try_get_unchecked::<u64, _>(idx)?),
        "FLOAT" => json!(row.try_get_unchecked::<f32, _>(idx)? as f64),
        "DOUBLE" => json!(row.try_get_unchecked::<f64, _>(idx)?),
        "DATE" => Value::String(row.try_get_unchecked::<chrono::NaiveDate, _>(idx)?.to_string()),
        "TIME" => Value::String(row.try_get_unchecked::<chrono::NaiveTime, _>(idx)?.to_string()),
        "DATETIME" => Value::String(row.try_get_unchecked::<chrono::NaiveDateTime, _>(idx)?.to_string()),
        "TIMESTAMP" => Value::String(
            row.try_get_unchecked::<chrono::DateTime<chrono::Utc>, _>(idx)?
                .to_rfc3339(),
        ),
        "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" => {
            let bytes = row.try_get_unchecked::<Vec<u8>, _>(idx)?;
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        }
        "JSON" => {
            let text = row.try_get_unchecked::<String, _>(idx)?;
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        }
        // DECIMAL stays textual to keep its exact digits; the rest are text types.
        _ => Value::String(row.try_get_unchecked::<String, _>(idx)?),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_are_opaque() {
        let err = ExecutionError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, ExecutionError::Failed(_)));
    }

    #[test]
    fn test_display_is_the_message() {
        let err = ExecutionError::UnknownColumn("Unknown column 'x' in 'field list'".to_string());
        assert_eq!(err.to_string(), "Unknown column 'x' in 'field list'");
    }
}
