use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{PipelineError, Result};

pub trait ModelOptions {
    fn cache_key(&self) -> String;
}

// Entries hold STRONG references: a model loaded once stays resident for the
// rest of the process and is never reloaded.
type CacheStorage = HashMap<(TypeId, String), Arc<dyn Any + Send + Sync>>;

pub struct ModelCache {
    cache: Mutex<CacheStorage>,
    loads: AtomicUsize,
}

impl ModelCache {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
            loads: AtomicUsize::new(0),
        }
    }

    fn storage(&self) -> Result<MutexGuard<'_, CacheStorage>> {
        self.cache
            .lock()
            .map_err(|_| PipelineError::Unexpected("Model cache lock poisoned".into()))
    }

    /// Return the cached model for `key`, running `loader` only on the first request.
    ///
    /// The lock is held while loading so concurrent callers for the same model
    /// wait for the first load instead of starting their own.
    pub fn get_or_create<M, F>(&self, key: &str, loader: F) -> Result<Arc<M>>
    where
        M: Send + Sync + 'static,
        F: FnOnce() -> Result<M>,
    {
        let cache_key = (TypeId::of::<M>(), key.to_string());
        let mut cache = self.storage()?;

        if let Some(entry) = cache.get(&cache_key) {
            return Arc::clone(entry).downcast::<M>().map_err(|_| {
                PipelineError::Unexpected(format!("Cached model for '{key}' has the wrong type"))
            });
        }

        let started = std::time::Instant::now();
        let model = Arc::new(loader()?);
        self.loads.fetch_add(1, Ordering::SeqCst);
        tracing::info!(
            model = key,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "model loaded"
        );

        let entry: Arc<dyn Any + Send + Sync> = model.clone();
        cache.insert(cache_key, entry);

        Ok(model)
    }

    /// Number of loader invocations that completed successfully.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.storage().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ModelCache {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_MODEL_CACHE: once_cell::sync::Lazy<ModelCache> =
    once_cell::sync::Lazy::new(ModelCache::new);

pub fn global_cache() -> &'static ModelCache {
    &GLOBAL_MODEL_CACHE
}
