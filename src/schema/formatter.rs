use crate::schema::catalog::CompactTable;

pub const DEFAULT_MAX_COLUMNS_PER_TABLE: usize = 20;

/// Render tables as `products(id, product_name, list_price, ...)`, one per line.
pub fn format_schema_for_prompt(tables: &[CompactTable], max_columns_per_table: usize) -> String {
    tables
        .iter()
        .map(|t| {
            let columns = t
                .columns
                .iter()
                .take(max_columns_per_table)
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            format!("{}({})", t.table, columns)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::catalog::CompactColumn;

    fn table(name: &str, columns: &[&str]) -> CompactTable {
        CompactTable {
            table: name.to_string(),
            columns: columns
                .iter()
                .map(|c| CompactColumn {
                    name: c.to_string(),
                    sql_type: "varchar".to_string(),
                    nullable: true,
                })
                .collect(),
        }
    }

    #[test]
    fn test_format_truncates_columns() {
        let tables = vec![
            table("products", &["id", "product_name", "list_price"]),
            table("orders", &["id", "ship_city"]),
        ];

        assert_eq!(
            format_schema_for_prompt(&tables, 2),
            "products(id, product_name)\norders(id, ship_city)"
        );
    }
}
