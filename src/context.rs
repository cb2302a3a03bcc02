//! The explicitly constructed server context request handlers share.
//!
//! One context owns the catalog and the stack registry; handlers receive it by
//! reference. Tests build as many independent contexts as they need.

use crate::bootstrap::{
    self, CredentialStore, ReconcilePolicy, ReconcileReport, WorkspaceDirectory,
};
use crate::catalog::Catalog;
use crate::error::Result;
use crate::identity::{ModulePath, OperatorIdentity, WorkspaceId};
use crate::module::{ModuleManifest, SharedModule, load_manifest};
use crate::registry::StackRegistry;
use crate::stack::Stack;
use anyhow::Context;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct ServerContext {
    catalog: Catalog,
    registry: StackRegistry,
    policy: ReconcilePolicy,
}

impl ServerContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: ReconcilePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn registry(&self) -> &StackRegistry {
        &self.registry
    }

    pub fn policy(&self) -> ReconcilePolicy {
        self.policy
    }

    /// Register every module declared in `manifest`.
    pub fn register_manifest(&self, manifest: &ModuleManifest) -> usize {
        manifest.register_into(&self.catalog)
    }

    /// Load a manifest file and register its modules.
    pub fn register_manifest_file(&self, path: &Path) -> anyhow::Result<usize> {
        let manifest = load_manifest(path)?;
        Ok(self.register_manifest(&manifest))
    }

    pub fn stack(&self, workspace: WorkspaceId, operator: &OperatorIdentity) -> Arc<Stack> {
        self.registry.get_or_create_stack(workspace, operator)
    }

    /// Load-or-get `path` on the operator's stack in `workspace`.
    pub fn load_module(
        &self,
        workspace: WorkspaceId,
        operator: &OperatorIdentity,
        path: &ModulePath,
    ) -> Result<SharedModule> {
        self.stack(workspace, operator).load_or_get(&self.catalog, path)
    }

    /// Reconcile the registry against the given sources using this context's policy.
    pub fn reconcile(
        &self,
        credentials: &dyn CredentialStore,
        directory: &dyn WorkspaceDirectory,
    ) -> Result<ReconcileReport> {
        bootstrap::reconcile(&self.registry, credentials, directory, self.policy)
    }

    /// Build a context from configuration: policy plus every configured manifest.
    pub fn from_config(config: &crate::config::ServerConfig) -> anyhow::Result<Self> {
        let context = Self::with_policy(config.reconcile_policy);
        for manifest in &config.module_manifests {
            context
                .register_manifest_file(manifest)
                .with_context(|| format!("registering modules from {}", manifest.display()))?;
        }
        Ok(context)
    }
}
