//! Schema catalog, its cache, and question-driven table selection

pub mod cache;
pub mod catalog;
pub mod formatter;
pub mod loader;
pub mod selector;

pub use cache::CatalogCache;
pub use catalog::{ColumnDescriptor, CompactColumn, CompactTable, SchemaCatalog};
pub use formatter::format_schema_for_prompt;
pub use loader::{MetadataSource, MySqlMetadataSource};
pub use selector::{SelectorRules, TableSelector};
