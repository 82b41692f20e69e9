//! Lexical extraction of table identifiers following FROM / JOIN.
//!
//! This is an approximation of SQL grammar, not a parser: identifiers that
//! follow FROM in other constructs (e.g. `EXTRACT(YEAR FROM col)`) are
//! reported too, and tables reached without FROM/JOIN are missed.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DOUBLE_QUOTED: Regex = Regex::new(r#""([^"]+)""#).expect("valid regex");
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid regex");
    static ref TABLE_REF: Regex = Regex::new(
        r"(?i)\b(from|join)\s+([a-zA-Z_][a-zA-Z0-9_]*)(?:\s*\.\s*([a-zA-Z_][a-zA-Z0-9_]*))?"
    )
    .expect("valid regex");
}

/// Table names in first-seen order, de-duplicated. `schema.table` yields `table`.
pub fn extract_table_names(sql: &str) -> Vec<String> {
    let unquoted = sql.replace('`', "");
    let unquoted = DOUBLE_QUOTED.replace_all(&unquoted, "$1");
    let cleaned = WHITESPACE.replace_all(&unquoted, " ");

    let mut names: Vec<String> = Vec::new();
    for caps in TABLE_REF.captures_iter(&cleaned) {
        let name = caps.get(3).or_else(|| caps.get(2)).map(|m| m.as_str());
        if let Some(name) = name {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_and_joins() {
        let sql = "SELECT o.id FROM orders o JOIN order_details od ON od.order_id = o.id \
                   LEFT JOIN products p ON p.id = od.product_id";
        assert_eq!(extract_table_names(sql), vec!["orders", "order_details", "products"]);
    }

    #[test]
    fn test_schema_qualified_and_quoted() {
        let sql = "SELECT * FROM `northwind`.`orders` JOIN \"customers\" c ON 1 = 1";
        assert_eq!(extract_table_names(sql), vec!["orders", "customers"]);

        let sql = "SELECT * FROM shop . products";
        assert_eq!(extract_table_names(sql), vec!["products"]);
    }

    #[test]
    fn test_dedup_and_subquery() {
        let sql = "SELECT AVG(t.total) FROM (SELECT order_id, SUM(quantity) AS total \
                   FROM order_details GROUP BY order_id) t JOIN order_details x ON 1 = 1";
        assert_eq!(extract_table_names(sql), vec!["order_details"]);
    }
}
