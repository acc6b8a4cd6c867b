//! Read-only, boot-constructed registries: the Backend Registry (C2)
//! and the Tool Registry half of C4. Built once in `main` and shared
//! via `Arc` — no locking, since nothing mutates them after boot.

use crate::model::BackendDescriptor;
use crate::tool::ToolDefinition;
use std::collections::HashMap;

#[derive(Debug)]
pub struct BackendRegistry {
    by_name: HashMap<String, BackendDescriptor>,
    /// Registry insertion order, used for failover iteration (spec 4.1,
    /// Design Notes 9: "the next backend in registry order").
    order: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate backend name: {0}")]
    DuplicateBackendName(String),
}

impl BackendRegistry {
    pub fn new(backends: Vec<BackendDescriptor>) -> Result<Self, RegistryError> {
        let mut by_name = HashMap::with_capacity(backends.len());
        let mut order = Vec::with_capacity(backends.len());
        for backend in backends {
            if by_name.contains_key(&backend.name) {
                return Err(RegistryError::DuplicateBackendName(backend.name));
            }
            order.push(backend.name.clone());
            by_name.insert(backend.name.clone(), backend);
        }
        Ok(Self { by_name, order })
    }

    pub fn get(&self, name: &str) -> Option<&BackendDescriptor> {
        self.by_name.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Backend names in registry (configuration) order, starting from
    /// `start`, wrapping around, for use by the failover loop.
    pub fn order_from(&self, start: &str) -> Vec<&str> {
        let Some(start_idx) = self.order.iter().position(|n| n == start) else {
            return Vec::new();
        };
        let (before, after) = self.order.split_at(start_idx);
        after
            .iter()
            .chain(before.iter())
            .map(|s| s.as_str())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BackendDescriptor> {
        self.order.iter().filter_map(|name| self.by_name.get(name))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[derive(Debug)]
pub struct ToolRegistry {
    by_name: HashMap<String, ToolDefinition>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<ToolDefinition>) -> Self {
        let by_name = tools.into_iter().map(|t| (t.name.clone(), t)).collect();
        Self { by_name }
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.by_name.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.by_name.values()
    }
}

#[derive(Debug)]
pub struct PrincipalMap {
    by_key: HashMap<String, crate::principal::Principal>,
}

impl PrincipalMap {
    pub fn new(principals: Vec<crate::principal::Principal>) -> Self {
        let by_key = principals.into_iter().map(|p| (p.key.clone(), p)).collect();
        Self { by_key }
    }

    /// Look up a principal by its bearer key. Compares `key` against
    /// every configured key with a constant-time comparison rather than
    /// a plain `HashMap::get`, so a caller probing keys can't learn
    /// anything from how long the lookup took (spec 4.7 auth check).
    /// Every entry is compared, not short-circuited on first match, so
    /// the total work done doesn't vary with how many keys happen to
    /// share `key`'s length.
    pub fn lookup(&self, key: &str) -> Option<&crate::principal::Principal> {
        let mut found: Option<&crate::principal::Principal> = None;
        for (candidate, principal) in self.by_key.iter() {
            if constant_time_eq(candidate.as_bytes(), key.as_bytes()) {
                found = Some(principal);
            }
        }
        found
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }
}

/// Constant-time byte comparison to prevent timing attacks on bearer
/// key lookup.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
