//! Request-level orchestration over the catalog cache, selector, validator,
//! generator, executor and response cache.
//!
//! All shared state lives in explicitly constructed instances owned here.

pub mod ask;
pub mod query;

pub use ask::{AskOutcome, AskRequest, AskResponse, CacheInfo};
pub use query::{
    DemoResponse, QueryOutcome, QueryRequest, QueryResponse, SchemaResponse, ValidateRequest, DEMO_TOP_PRODUCTS_SQL,
};

use crate::cache::ResponseCache;
use crate::config::BridgeConfig;
use crate::db::{init_pool, MySqlExecutor, QueryExecutor};
use crate::error::Result;
use crate::llm::{LlmClient, SqlGenerator, TextGenerator};
use crate::schema::{CatalogCache, MetadataSource, MySqlMetadataSource, TableSelector};
use crate::sql::{SqlValidator, ValidatorConfig};
use std::sync::Arc;
use std::time::Duration;

/// Max columns listed per table in the prompt's schema context.
pub const PROMPT_MAX_COLUMNS_PER_TABLE: usize = 25;

pub struct BridgeService {
    catalog: Arc<CatalogCache>,
    selector: TableSelector,
    validator: SqlValidator,
    generator: SqlGenerator,
    executor: Arc<dyn QueryExecutor>,
    memo: ResponseCache<AskResponse>,
}

impl BridgeService {
    pub fn new(
        catalog: Arc<CatalogCache>,
        llm: Arc<dyn TextGenerator>,
        executor: Arc<dyn QueryExecutor>,
    ) -> Self {
        Self {
            validator: SqlValidator::new(Arc::clone(&catalog)),
            catalog,
            selector: TableSelector::default(),
            generator: SqlGenerator::new(llm),
            executor,
            memo: ResponseCache::default(),
        }
    }

    /// Wire every component from process configuration.
    pub fn from_config(
        config: &BridgeConfig,
        metadata: Arc<dyn MetadataSource>,
        llm: Arc<dyn TextGenerator>,
        executor: Arc<dyn QueryExecutor>,
    ) -> Self {
        let catalog = Arc::new(CatalogCache::with_freshness_window(metadata, config.schema_cache_ttl));
        Self::new(catalog, llm, executor)
            .with_validator_config(config.validator)
            .with_memo_settings(config.memo_ttl, config.memo_max_entries)
    }

    /// Open the MySQL pool and build the production service.
    pub async fn connect(config: &BridgeConfig) -> Result<Self> {
        let pool = init_pool(&config.database).await?;
        let llm = LlmClient::new(
            config.llm.api_key.clone(),
            config.llm.base_url.clone(),
            config.llm.model.clone(),
        );
        Ok(Self::from_config(
            config,
            Arc::new(MySqlMetadataSource::new(pool.clone())),
            Arc::new(llm),
            Arc::new(MySqlExecutor::new(pool)),
        ))
    }

    pub fn with_selector(mut self, selector: TableSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_validator_config(mut self, config: ValidatorConfig) -> Self {
        self.validator = SqlValidator::with_config(Arc::clone(&self.catalog), config);
        self
    }

    pub fn with_memo_settings(mut self, ttl: Duration, capacity: usize) -> Self {
        self.memo = ResponseCache::new(ttl, capacity);
        self
    }

    pub fn catalog(&self) -> &Arc<CatalogCache> {
        &self.catalog
    }

    pub fn memo(&self) -> &ResponseCache<AskResponse> {
        &self.memo
    }
}
