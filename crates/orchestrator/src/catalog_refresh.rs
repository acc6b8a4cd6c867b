//! The periodic model catalog refresh job (C8): aggregates models from
//! every configured backend into the catalog cache (C1), grounded on
//! `original_source/app/services.py::refresh_and_cache_models`.
//!
//! Per-backend failures are isolated from one another (spec 4.5): one
//! unreachable backend never prevents the others from populating, and
//! the final map replaces the cache atomically so a concurrent reader
//! (C9) never observes a partial mix of pre- and post-refresh entries.

use gateway_core::{BackendRegistry, CatalogCache, ModelDescriptor};
use gateway_llm::Connector;
use std::collections::HashMap;

/// Rebuild the catalog from scratch and atomically swap it into
/// `catalog`. Called once at startup and then on
/// `llm_cache_update_interval_minutes` by `gateway_tasks::schedule_periodic`.
pub async fn refresh_catalog(connector: &Connector, backends: &BackendRegistry, catalog: &CatalogCache) {
    let mut models: HashMap<String, ModelDescriptor> = HashMap::new();

    for backend in backends.iter() {
        if backend.auto_load {
            match connector.list_models(backend).await {
                Ok(discovered) => {
                    for descriptor in discovered {
                        models.insert(descriptor.id.clone(), descriptor);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        backend = backend.name.as_str(),
                        error = %e,
                        "failed to list models for backend, leaving it out of this refresh"
                    );
                }
            }
        } else if let Some(default_model) = &backend.default_model {
            let descriptor = ModelDescriptor::new(&backend.name, default_model);
            models.insert(descriptor.id.clone(), descriptor);
        } else {
            tracing::warn!(
                backend = backend.name.as_str(),
                "auto_load is disabled and no default_model is configured, skipping backend entirely"
            );
        }
    }

    let count = models.len();
    catalog.replace(models);
    tracing::info!(model_count = count, "catalog refresh complete");
}
