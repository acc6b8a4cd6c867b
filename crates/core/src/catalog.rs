//! The model catalog cache (C1): single-writer/multi-reader, atomic
//! full-map replacement. Readers never block the writer and vice
//! versa — `ArcSwap` gives us a lock-free pointer swap instead of the
//! Python original's `threading.Lock`-guarded list.

use crate::model::ModelDescriptor;
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct CatalogCache {
    inner: ArcSwap<HashMap<String, ModelDescriptor>>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self {
            inner: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// Atomically replace the whole catalog. Called only by C8.
    pub fn replace(&self, models: HashMap<String, ModelDescriptor>) {
        self.inner.store(Arc::new(models));
    }

    /// A consistent snapshot of the catalog at call time.
    pub fn snapshot(&self) -> Arc<HashMap<String, ModelDescriptor>> {
        self.inner.load_full()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.load().is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.load().len()
    }
}
