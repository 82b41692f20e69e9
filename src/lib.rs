pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod logging;
pub mod schema;
pub mod server;
pub mod service;
pub mod sql;
pub mod text;

pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
pub use service::{AskOutcome, AskRequest, AskResponse, BridgeService};
