//! Schema Catalog Cache
//!
//! Serves the catalog with a freshness window. A stale or missing catalog is
//! reloaded synchronously on demand; there is no background refresh and no
//! stale fallback when the reload fails.

use crate::error::Result;
use crate::schema::catalog::SchemaCatalog;
use crate::schema::loader::MetadataSource;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::info;

pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(5 * 60);

struct LoadedCatalog {
    catalog: Arc<SchemaCatalog>,
    loaded_at: Instant,
}

pub struct CatalogCache {
    source: Arc<dyn MetadataSource>,
    freshness_window: Duration,
    state: Mutex<Option<LoadedCatalog>>,
}

impl std::fmt::Debug for CatalogCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogCache")
            .field("freshness_window", &self.freshness_window)
            .finish_non_exhaustive()
    }
}

impl CatalogCache {
    pub fn new(source: Arc<dyn MetadataSource>) -> Self {
        Self::with_freshness_window(source, DEFAULT_FRESHNESS_WINDOW)
    }

    pub fn with_freshness_window(source: Arc<dyn MetadataSource>, freshness_window: Duration) -> Self {
        Self {
            source,
            freshness_window,
            state: Mutex::new(None),
        }
    }

    /// Return the held catalog, reloading it first if absent or stale.
    ///
    /// Concurrent callers that both observe a stale catalog both reload;
    /// whichever finishes last is what the cache keeps.
    pub async fn get_catalog(&self) -> Result<Arc<SchemaCatalog>> {
        let now = Instant::now();
        if let Some(catalog) = self.fresh_catalog(now) {
            return Ok(catalog);
        }

        let columns = self.source.load_columns().await?;
        let catalog = Arc::new(SchemaCatalog::from_columns(columns));
        info!(
            tables = catalog.len(),
            reload_ms = now.elapsed().as_millis() as u64,
            "schema.reload"
        );

        // The lock is never held across the await above.
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = Some(LoadedCatalog {
            catalog: Arc::clone(&catalog),
            loaded_at: now,
        });

        Ok(catalog)
    }

    fn fresh_catalog(&self, now: Instant) -> Option<Arc<SchemaCatalog>> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .as_ref()
            .filter(|loaded| now.saturating_duration_since(loaded.loaded_at) < self.freshness_window)
            .map(|loaded| Arc::clone(&loaded.catalog))
    }

    pub fn freshness_window(&self) -> Duration {
        self.freshness_window
    }
}
