//! Per-(workspace, operator) stack of loaded module instances.
//!
//! A stack caches at most one instance per module path. Loading is lazy: the
//! first request for a path pulls a fresh instance from the catalog and binds
//! it to the stack's operator; later requests return the cached instance. Each
//! stack has its own lock, so unrelated operators never contend, while all
//! operations on one stack are serialized (including the catalog lookup and
//! initialization of a new instance). Lock order is always stack, then catalog.

use crate::catalog::Catalog;
use crate::error::Result;
use crate::identity::{ModulePath, OperatorIdentity, WorkspaceId};
use crate::module::{OperatorContext, SharedModule, share};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub struct Stack {
    context: OperatorContext,
    loaded: Mutex<HashMap<ModulePath, SharedModule>>,
}

impl std::fmt::Debug for Stack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stack")
            .field("workspace", &self.context.workspace)
            .field("operator", &self.context.operator)
            .field("loaded", &self.loaded_paths())
            .finish()
    }
}

impl Stack {
    pub fn new(workspace: WorkspaceId, operator: OperatorIdentity) -> Self {
        Self {
            context: OperatorContext::new(workspace, operator),
            loaded: Mutex::new(HashMap::new()),
        }
    }

    pub fn context(&self) -> &OperatorContext {
        &self.context
    }

    pub fn workspace(&self) -> WorkspaceId {
        self.context.workspace
    }

    pub fn operator(&self) -> &OperatorIdentity {
        &self.context.operator
    }

    /// Return the cached instance for `path`, loading and initializing it on first use.
    ///
    /// Catalog misses and initialization failures are returned as-is and leave
    /// the stack unchanged; the next call tries again from scratch.
    pub fn load_or_get(&self, catalog: &Catalog, path: &ModulePath) -> Result<SharedModule> {
        let mut loaded = self.loaded.lock();
        if let Some(module) = loaded.get(path) {
            return Ok(Arc::clone(module));
        }

        let mut module = catalog.lookup(path)?;
        module.initialize(&self.context)?;
        let module = share(module);
        loaded.insert(path.clone(), Arc::clone(&module));
        debug!(
            workspace = %self.context.workspace,
            operator = %self.context.operator,
            path = %path,
            "loaded module onto stack"
        );
        Ok(module)
    }

    /// Drop the cached instance for `path`, returning it if it was loaded.
    ///
    /// No teardown hook runs; releasing external resources is up to the module.
    pub fn unload(&self, path: &ModulePath) -> Option<SharedModule> {
        let removed = self.loaded.lock().remove(path);
        if removed.is_some() {
            debug!(
                workspace = %self.context.workspace,
                operator = %self.context.operator,
                path = %path,
                "unloaded module from stack"
            );
        }
        removed
    }

    pub fn get(&self, path: &ModulePath) -> Option<SharedModule> {
        self.loaded.lock().get(path).cloned()
    }

    pub fn contains(&self, path: &ModulePath) -> bool {
        self.loaded.lock().contains_key(path)
    }

    /// Loaded paths in sorted order.
    pub fn loaded_paths(&self) -> Vec<ModulePath> {
        let mut paths: Vec<ModulePath> = self.loaded.lock().keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.loaded.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
