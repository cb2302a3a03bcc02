//! Process-wide catalog of module types keyed by path.
//!
//! Entries are factories rather than instances so every stack receives its own
//! module object. Registration overwrites (last write wins) and nothing is ever
//! removed. All traffic, reads included, goes through one exclusive lock; the
//! critical sections only clone an `Arc`, so lookups stay short.

use crate::error::{Error, Result};
use crate::identity::ModulePath;
use crate::module::{Module, ModuleDescriptor};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Builds a fresh, uninitialized module instance.
pub type ModuleFactory = Arc<dyn Fn() -> Box<dyn Module> + Send + Sync>;

#[derive(Default)]
pub struct Catalog {
    entries: Mutex<HashMap<ModulePath, ModuleFactory>>,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("paths", &self.paths())
            .finish()
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module type under `path`, replacing any previous entry.
    ///
    /// Instances already produced by an earlier registration are unaffected.
    pub fn register<F, M>(&self, path: impl Into<ModulePath>, factory: F)
    where
        F: Fn() -> M + Send + Sync + 'static,
        M: Module + 'static,
    {
        self.register_factory(path, Arc::new(move || Box::new(factory()) as Box<dyn Module>));
    }

    pub fn register_factory(&self, path: impl Into<ModulePath>, factory: ModuleFactory) {
        let path = path.into();
        let replaced = self.entries.lock().insert(path.clone(), factory).is_some();
        if replaced {
            info!(path = %path, "module registration replaced an existing entry");
        } else {
            debug!(path = %path, "registered module");
        }
    }

    /// Produce a new instance of the module registered under `path`.
    pub fn lookup(&self, path: &ModulePath) -> Result<Box<dyn Module>> {
        let factory = self
            .entries
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| Error::not_found(path))?;
        Ok(factory())
    }

    pub fn contains(&self, path: &ModulePath) -> bool {
        self.entries.lock().contains_key(path)
    }

    /// Registered paths in sorted order.
    pub fn paths(&self) -> Vec<ModulePath> {
        let mut paths: Vec<ModulePath> = self.entries.lock().keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Describe every registered module, sorted by path.
    pub fn descriptors(&self) -> Vec<ModuleDescriptor> {
        let mut factories: Vec<(ModulePath, ModuleFactory)> = self
            .entries
            .lock()
            .iter()
            .map(|(path, factory)| (path.clone(), Arc::clone(factory)))
            .collect();
        factories.sort_by(|a, b| a.0.cmp(&b.0));
        factories
            .into_iter()
            .map(|(_, factory)| factory().describe())
            .collect()
    }
}
