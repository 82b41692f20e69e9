//! Schema catalog model
//!
//! Column metadata of the active database, grouped by table.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// One column as reported by the database's information catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub table: String,
    pub column: String,
    pub sql_type: String,
    pub nullable: bool,
}

/// Table name -> columns in ordinal order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaCatalog {
    tables: BTreeMap<String, Vec<ColumnDescriptor>>,
}

impl SchemaCatalog {
    /// Group descriptors by table. Input order within a table is kept,
    /// so callers must supply columns already sorted by ordinal position.
    pub fn from_columns(columns: impl IntoIterator<Item = ColumnDescriptor>) -> Self {
        let mut tables: BTreeMap<String, Vec<ColumnDescriptor>> = BTreeMap::new();
        for column in columns {
            tables.entry(column.table.clone()).or_default().push(column);
        }
        Self { tables }
    }

    pub fn contains_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn columns(&self, table: &str) -> Option<&[ColumnDescriptor]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn table_set(&self) -> HashSet<&str> {
        self.table_names().collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Prompt/API friendly view of every table.
    pub fn compact_tables(&self) -> Vec<CompactTable> {
        self.tables
            .iter()
            .map(|(table, columns)| CompactTable {
                table: table.clone(),
                columns: columns
                    .iter()
                    .map(|c| CompactColumn {
                        name: c.column.clone(),
                        sql_type: c.sql_type.clone(),
                        nullable: c.nullable,
                    })
                    .collect(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub sql_type: String,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactTable {
    pub table: String,
    pub columns: Vec<CompactColumn>,
}
