//! Dataset handle pool.
//!
//! Opening a dataset (parsing headers, reading chromosome tables, opening file
//! or database handles) is expensive relative to a tile fetch, so opened
//! handles are kept in an LRU keyed by dataset id. The registry is an explicit
//! object injected into [`crate::tile::TileService`]; its lifetime is owned by
//! whoever hosts the service.
//!
//! # Example
//!
//! ```ignore
//! use genome_tiler::dataset::{DatasetOpener, DatasetRegistry};
//!
//! let registry = DatasetRegistry::new(MyOpener::new("/data/tilesets"));
//!
//! // Opens on first access, cached afterwards
//! let dataset = registry.get_dataset("hg19-rnaseq").await?;
//! println!("max zoom: {}", dataset.metadata().max_zoom());
//! ```

use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::{TilingConfig, DEFAULT_DATASET_CACHE_CAPACITY};
use crate::error::FetchError;

use super::source::Dataset;

// =============================================================================
// DatasetOpener Trait
// =============================================================================

/// Opens dataset handles by id.
///
/// This abstraction lets the registry work with any storage backend (local
/// files, object storage, a database of tilesets) without knowing about it.
#[async_trait]
pub trait DatasetOpener: Send + Sync {
    /// Open the dataset identified by `dataset_id`.
    async fn open(&self, dataset_id: &str) -> Result<Arc<dyn Dataset>, FetchError>;
}

// =============================================================================
// DatasetRegistry
// =============================================================================

/// LRU pool of opened dataset handles.
pub struct DatasetRegistry<O: DatasetOpener> {
    /// Opener used on cache misses
    opener: O,

    /// Opened datasets indexed by id
    cache: RwLock<LruCache<String, Arc<dyn Dataset>>>,
}

impl<O: DatasetOpener> DatasetRegistry<O> {
    /// Create a registry holding up to 100 open datasets.
    pub fn new(opener: O) -> Self {
        Self::with_capacity(opener, DEFAULT_DATASET_CACHE_CAPACITY)
    }

    /// Create a registry sized by `config.dataset_cache_capacity`.
    pub fn from_config(opener: O, config: &TilingConfig) -> Self {
        Self::with_capacity(opener, config.dataset_cache_capacity)
    }

    /// Create a registry holding up to `capacity` open datasets.
    ///
    /// A capacity of zero is treated as one.
    pub fn with_capacity(opener: O, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            opener,
            cache: RwLock::new(LruCache::new(capacity)),
        }
    }

    /// Get a dataset, opening it if not already cached.
    ///
    /// Failed opens are not cached; the next request retries the opener.
    pub async fn get_dataset(&self, dataset_id: &str) -> Result<Arc<dyn Dataset>, FetchError> {
        {
            let mut cache = self.cache.write().await;
            if let Some(dataset) = cache.get(dataset_id) {
                return Ok(dataset.clone());
            }
        }

        debug!(dataset_id, "opening dataset");
        let dataset = self.opener.open(dataset_id).await?;

        let mut cache = self.cache.write().await;
        cache.put(dataset_id.to_string(), dataset.clone());
        Ok(dataset)
    }

    /// Drop a cached handle so the next access reopens it.
    pub async fn invalidate(&self, dataset_id: &str) {
        let mut cache = self.cache.write().await;
        cache.pop(dataset_id);
    }

    /// Drop all cached handles.
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        cache.clear();
    }

    /// Number of cached handles.
    pub async fn cached_count(&self) -> usize {
        let cache = self.cache.read().await;
        cache.len()
    }

    /// The opener backing this registry.
    pub fn opener(&self) -> &O {
        &self.opener
    }
}

// =============================================================================
// Tests
// =============================================================================
