//! Database module for MySQL connectivity and read-only execution

pub mod connection;
pub mod executor;

pub use connection::{init_pool, DbPool};
pub use executor::{ExecutionError, JsonRow, MySqlExecutor, QueryExecutor};
