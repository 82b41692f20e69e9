//! Metadata loading from the database's information catalog

use crate::error::{BridgeError, Result};
use crate::schema::catalog::ColumnDescriptor;
use async_trait::async_trait;
use sqlx::{MySqlPool, Row};

const COLUMNS_QUERY: &str = r#"
    SELECT
      CAST(table_name AS CHAR) AS table_name,
      CAST(column_name AS CHAR) AS column_name,
      CAST(data_type AS CHAR) AS data_type,
      CAST(is_nullable AS CHAR) AS is_nullable
    FROM information_schema.columns
    WHERE table_schema = DATABASE()
    ORDER BY table_name, ordinal_position
"#;

/// Read-only source of column metadata, ordered by table then ordinal position.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn load_columns(&self) -> Result<Vec<ColumnDescriptor>>;
}

/// Loads column metadata for `DATABASE()` from MySQL.
pub struct MySqlMetadataSource {
    pool: MySqlPool,
}

impl MySqlMetadataSource {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetadataSource for MySqlMetadataSource {
    async fn load_columns(&self) -> Result<Vec<ColumnDescriptor>> {
        let rows = sqlx::query(COLUMNS_QUERY)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| BridgeError::Catalog(format!("Failed to load columns: {}", e)))?;

        rows.iter()
            .map(|row| {
                let nullable: String = row.try_get("is_nullable")?;
                Ok(ColumnDescriptor {
                    table: row.try_get("table_name")?,
                    column: row.try_get("column_name")?,
                    sql_type: row.try_get("data_type")?,
                    nullable: nullable.eq_ignore_ascii_case("YES"),
                })
            })
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| BridgeError::Catalog(format!("Malformed column metadata row: {}", e)))
    }
}
