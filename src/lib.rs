//! Module subsystem of a multi-operator command-and-control server.
//!
//! The crate keeps a process-wide [`Catalog`] of module types and, for every
//! (workspace, operator) pair, a [`Stack`] of loaded module instances indexed
//! by the [`StackRegistry`]. [`bootstrap::reconcile`] seeds the registry from
//! the credential store and workspace directory at startup, and
//! [`persistence`] writes listener records to a key-value store.
//!
//! Everything hangs off an explicitly constructed [`ServerContext`]; there is
//! no ambient global state.

pub mod bootstrap;
pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod identity;
pub mod logging;
pub mod module;
pub mod persistence;
pub mod registry;
pub mod stack;

pub use bootstrap::{
    CredentialStore, ReconcilePolicy, ReconcileReport, WorkspaceDirectory, WorkspaceRecord,
    reconcile,
};
pub use catalog::{Catalog, ModuleFactory};
pub use config::ServerConfig;
pub use context::ServerContext;
pub use error::{Error, Result};
pub use identity::{ModulePath, OperatorIdentity, StackKey, WorkspaceId};
pub use module::{
    Module, ModuleDescriptor, ModuleKind, ModuleOption, OperatorContext, OptionKind, OptionSet,
    SharedModule,
};
pub use persistence::{
    HttpsListener, JobDescriptor, ListenerConfig, ListenerPersistence, PersistedListener,
};
pub use registry::StackRegistry;
pub use stack::Stack;

/// Split comma- or whitespace-delimited lists (CLI flags, env values) into tokens.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .replace(',', " ")
        .split_whitespace()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
