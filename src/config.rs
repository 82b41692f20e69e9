//! Process configuration loaded from the environment (and `.env`).

use crate::error::{BridgeError, Result};
use crate::sql::ValidatorConfig;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_PORT: u16 = 3306;
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_LLM_MODEL: &str = "llama-3.1-70b-versatile";
const SUPPORTED_PROVIDER: &str = "openai_compat";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub provider: String,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub port: u16,
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub schema_cache_ttl: Duration,
    pub memo_ttl: Duration,
    pub memo_max_entries: usize,
    pub validator: ValidatorConfig,
}

impl BridgeConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let provider = env.or("LLM_PROVIDER", SUPPORTED_PROVIDER);
        if provider != SUPPORTED_PROVIDER {
            return Err(BridgeError::Config(format!(
                "LLM_PROVIDER must be '{}', got '{}'",
                SUPPORTED_PROVIDER, provider
            )));
        }

        let base_url = env.or("LLM_BASE_URL", DEFAULT_LLM_BASE_URL);
        reqwest::Url::parse(&base_url)
            .map_err(|e| BridgeError::Config(format!("LLM_BASE_URL is not a valid URL: {}", e)))?;

        let validator = ValidatorConfig {
            default_limit: env.parse_or("SQL_DEFAULT_LIMIT", crate::sql::validator::DEFAULT_LIMIT)?,
            limit_cap: env.parse_or("SQL_LIMIT_CAP", crate::sql::validator::LIMIT_CAP)?,
        };
        if validator.default_limit > validator.limit_cap {
            return Err(BridgeError::Config(format!(
                "SQL_DEFAULT_LIMIT ({}) must not exceed SQL_LIMIT_CAP ({})",
                validator.default_limit, validator.limit_cap
            )));
        }

        Ok(Self {
            port: env.parse_or("PORT", DEFAULT_PORT)?,
            database: DatabaseConfig {
                host: env.required("DB_HOST")?,
                port: env.parse_or("DB_PORT", DEFAULT_DB_PORT)?,
                user: env.required("DB_USER")?,
                password: env.required("DB_PASSWORD")?,
                name: env.required("DB_NAME")?,
            },
            llm: LlmConfig {
                provider,
                api_key: env.required("LLM_API_KEY")?,
                base_url,
                model: env.or("LLM_MODEL", DEFAULT_LLM_MODEL),
            },
            schema_cache_ttl: Duration::from_secs(env.parse_or("SCHEMA_CACHE_TTL_SECS", 300)?),
            memo_ttl: Duration::from_secs(env.parse_or("MEMO_TTL_SECS", 300)?),
            memo_max_entries: env.parse_or("MEMO_MAX_ENTRIES", crate::cache::memo::DEFAULT_CAPACITY)?,
            validator,
        })
    }
}

struct Env<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Unset and empty are treated the same.
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String> {
        self.get(key)
            .ok_or_else(|| BridgeError::Config(format!("{} is required", key)))
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T: FromStr>(&self, key: &str, default: T) -> Result<T> {
        match self.get(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| BridgeError::Config(format!("{} has an invalid value: {}", key, raw))),
            None => Ok(default),
        }
    }
}
