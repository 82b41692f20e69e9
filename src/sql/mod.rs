//! SQL safety validation and query shaping

pub mod guards;
pub mod shaping;
pub mod tables;
pub mod validator;

pub use validator::{check_sql, SqlValidator, ValidationOutcome, ValidatorConfig};
