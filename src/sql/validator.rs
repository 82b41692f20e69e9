//! SQL Safety Validator
//!
//! Decides whether a candidate statement may run. Only a single, catalog-valid
//! SELECT is accepted, and every accepted statement leaves with a bounded LIMIT.
//! Rejections are returned as data, never as errors, and a rejected statement
//! is never rewritten.

use crate::error::Result;
use crate::schema::{CatalogCache, SchemaCatalog};
use crate::sql::{guards, shaping, tables};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_LIMIT: u64 = 200;
pub const LIMIT_CAP: u64 = 500;

pub const EMPTY_SQL: &str = "SQL is empty";
pub const ONLY_SELECT: &str = "Only SELECT statements are permitted.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub ok: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    #[serde(rename = "safeSql", skip_serializing_if = "Option::is_none", default)]
    pub safe_sql: Option<String>,
}

impl ValidationOutcome {
    fn rejected(errors: Vec<String>) -> Self {
        Self {
            ok: false,
            errors,
            warnings: Vec::new(),
            safe_sql: None,
        }
    }

    fn accepted(safe_sql: String, warnings: Vec<String>) -> Self {
        Self {
            ok: true,
            errors: Vec::new(),
            warnings,
            safe_sql: Some(safe_sql),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorConfig {
    pub default_limit: u64,
    pub limit_cap: u64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            limit_cap: LIMIT_CAP,
        }
    }
}

#[derive(Debug)]
pub struct SqlValidator {
    catalog: Arc<CatalogCache>,
    config: ValidatorConfig,
}

impl SqlValidator {
    pub fn new(catalog: Arc<CatalogCache>) -> Self {
        Self::with_config(catalog, ValidatorConfig::default())
    }

    pub fn with_config(catalog: Arc<CatalogCache>, config: ValidatorConfig) -> Self {
        Self { catalog, config }
    }

    pub fn config(&self) -> ValidatorConfig {
        self.config
    }

    /// Validate against the current catalog. Fails only when the catalog
    /// cannot be loaded.
    pub async fn validate(&self, raw_sql: &str) -> Result<ValidationOutcome> {
        if raw_sql.trim().is_empty() {
            return Ok(ValidationOutcome::rejected(vec![EMPTY_SQL.to_string()]));
        }
        let catalog = self.catalog.get_catalog().await?;
        Ok(check_sql(raw_sql, &catalog, self.config))
    }
}

/// The validation pipeline against a fixed catalog.
pub fn check_sql(raw_sql: &str, catalog: &SchemaCatalog, config: ValidatorConfig) -> ValidationOutcome {
    if raw_sql.trim().is_empty() {
        return ValidationOutcome::rejected(vec![EMPTY_SQL.to_string()]);
    }

    let mut errors = guards::scan(raw_sql);

    let sql = shaping::normalize_statement(raw_sql);

    if !shaping::starts_with_select(&sql) {
        errors.push(ONLY_SELECT.to_string());
    }

    for table in tables::extract_table_names(&sql) {
        if !catalog.contains_table(&table) {
            errors.push(format!("Table not allowed or does not exist: {}", table));
        }
    }

    if !errors.is_empty() {
        debug!(errors = errors.len(), "sql rejected");
        return ValidationOutcome::rejected(errors);
    }

    let mut warnings = Vec::new();

    let (sql, limited) = shaping::apply_default_limit(&sql, config.default_limit);
    if limited {
        warnings.push(format!("LIMIT {} applied automatically.", config.default_limit));
    }

    let (sql, capped) = shaping::enforce_limit_cap(&sql, config.limit_cap);
    if capped {
        warnings.push(format!("LIMIT capped at {}.", config.limit_cap));
    }

    ValidationOutcome::accepted(sql, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnDescriptor;

    fn catalog() -> SchemaCatalog {
        SchemaCatalog::from_columns(["products", "orders", "order_details"].iter().map(|t| ColumnDescriptor {
            table: t.to_string(),
            column: "id".to_string(),
            sql_type: "int".to_string(),
            nullable: false,
        }))
    }

    fn check(sql: &str) -> ValidationOutcome {
        check_sql(sql, &catalog(), ValidatorConfig::default())
    }

    #[test]
    fn test_empty_sql() {
        let outcome = check("   \n ");
        assert!(!outcome.ok);
        assert_eq!(outcome.errors, vec![EMPTY_SQL.to_string()]);
        assert!(outcome.safe_sql.is_none());
    }

    #[test]
    fn test_multi_statement_rejected_with_both_rules() {
        let outcome = check("SELECT * FROM products; DROP TABLE products");
        assert!(!outcome.ok);
        assert!(outcome.errors.iter().any(|e| e.contains("statement_separator")));
        assert!(outcome.errors.iter().any(|e| e.contains("write_statement")));
        assert!(outcome.warnings.is_empty());
        assert!(outcome.safe_sql.is_none());
    }

    #[test]
    fn test_only_select() {
        let outcome = check("SHOW TABLES");
        assert_eq!(outcome.errors, vec![ONLY_SELECT.to_string()]);

        let outcome = check("WITH x AS (SELECT 1) SELECT * FROM x");
        assert!(outcome.errors.contains(&ONLY_SELECT.to_string()));
    }

    #[test]
    fn test_unknown_tables_each_reported() {
        let outcome = check("SELECT * FROM products p JOIN users u ON 1 = 1 JOIN secrets s ON 1 = 1");
        assert_eq!(
            outcome.errors,
            vec![
                "Table not allowed or does not exist: users".to_string(),
                "Table not allowed or does not exist: secrets".to_string(),
            ]
        );
    }

    #[test]
    fn test_rejected_sql_not_limited() {
        let outcome = check("DELETE FROM products");
        assert!(!outcome.ok);
        assert!(outcome.warnings.is_empty());
        assert!(outcome.safe_sql.is_none());
    }

    #[test]
    fn test_default_limit_applied_once() {
        let outcome = check("SELECT product_name, list_price FROM products ORDER BY list_price DESC");
        assert!(outcome.ok);
        assert_eq!(
            outcome.safe_sql.as_deref(),
            Some("SELECT product_name, list_price FROM products ORDER BY list_price DESC LIMIT 200")
        );
        assert_eq!(outcome.warnings, vec!["LIMIT 200 applied automatically.".to_string()]);
    }

    #[test]
    fn test_trailing_separator_tolerated_only_after_blocklist() {
        // the raw input still trips the separator rule
        let outcome = check("SELECT * FROM products;");
        assert!(!outcome.ok);
        assert!(outcome.errors[0].contains("statement_separator"));
    }

    #[test]
    fn test_limit_cap() {
        let outcome = check("SELECT * FROM products LIMIT 10000");
        assert!(outcome.ok);
        assert_eq!(outcome.safe_sql.as_deref(), Some("SELECT * FROM products LIMIT 500"));
        assert_eq!(outcome.warnings, vec!["LIMIT capped at 500.".to_string()]);
    }

    #[test]
    fn test_small_limit_untouched() {
        let outcome = check("select *\n from products limit 10");
        assert!(outcome.ok);
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.safe_sql.as_deref(), Some("select * from products limit 10"));
    }

    #[test]
    fn test_idempotent() {
        let sql = "SELECT o.id FROM orders o JOIN order_details od ON od.order_id = o.id";
        assert_eq!(check(sql), check(sql));
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(check("SELECT * FROM products LIMIT 5")).unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["safeSql"], "SELECT * FROM products LIMIT 5");

        let json = serde_json::to_value(check("DROP TABLE products")).unwrap();
        assert!(json.get("safeSql").is_none());
    }
}
