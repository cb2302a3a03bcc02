//! The capability contract every pluggable module implements.
//!
//! Modules are created by catalog factories, bound to one operator through
//! [`Module::initialize`], and from then on live inside exactly one stack.
//! [`ModuleDescriptor`] is the transport-ready view handed to operator clients.

pub mod manifest;
pub mod options;

use crate::error::Result;
use crate::identity::{ModulePath, OperatorIdentity, WorkspaceId};
use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::sync::Arc;

pub use manifest::{ManifestModule, ModuleManifest, ModuleSpec, load_manifest};
pub use options::{ModuleOption, OptionKind, OptionSet};

/// A module instance cached in a stack. Callers lock it to execute or configure.
pub type SharedModule = Arc<Mutex<Box<dyn Module>>>;

/// Operator binding handed to [`Module::initialize`].
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct OperatorContext {
    pub workspace: WorkspaceId,
    pub operator: OperatorIdentity,
}

/// Fixed operation set of a pluggable module.
pub trait Module: Send {
    /// Bind the instance to an operator, allocating whatever it needs to run.
    fn initialize(&mut self, context: &OperatorContext) -> Result<()>;

    /// Perform the module's primary action.
    fn execute(&mut self, input: &str) -> Result<String>;

    /// Change one configurable option; invalid keys or values are an error.
    fn set_option(&mut self, key: &str, value: &str) -> Result<()>;

    /// Name, options and metadata for presentation to an operator client.
    fn describe(&self) -> ModuleDescriptor;
}

/// Module family. Unknown families round-trip through `Other`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ModuleKind {
    Exploit,
    Payload,
    Stager,
    Auxiliary,
    Listener,
    Other(String),
}

/// Transport-ready description of a module.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub path: ModulePath,
    pub name: String,
    pub kind: ModuleKind,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(default)]
    pub options: Vec<ModuleOption>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl OperatorContext {
    pub fn new(workspace: WorkspaceId, operator: OperatorIdentity) -> Self {
        Self {
            workspace,
            operator,
        }
    }
}

impl ModuleKind {
    pub fn as_str(&self) -> &str {
        match self {
            ModuleKind::Exploit => "exploit",
            ModuleKind::Payload => "payload",
            ModuleKind::Stager => "stager",
            ModuleKind::Auxiliary => "auxiliary",
            ModuleKind::Listener => "listener",
            ModuleKind::Other(value) => value.as_str(),
        }
    }

    fn from_str(value: &str) -> Self {
        match value {
            "exploit" => ModuleKind::Exploit,
            "payload" => ModuleKind::Payload,
            "stager" => ModuleKind::Stager,
            "auxiliary" => ModuleKind::Auxiliary,
            "listener" => ModuleKind::Listener,
            other => ModuleKind::Other(other.to_string()),
        }
    }
}

impl Serialize for ModuleKind {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ModuleKind {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Self::from_str(&value))
    }
}

/// Wrap a freshly initialized module for caching.
pub fn share(module: Box<dyn Module>) -> SharedModule {
    Arc::new(Mutex::new(module))
}
