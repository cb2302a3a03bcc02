//! Declarative modules loaded from a JSON manifest.
//!
//! A manifest lists module types by path together with their options. Loading
//! is strict: the file must satisfy `schema/module_manifest.schema.json`, paths
//! must be well formed and unique, and option defaults must parse for their
//! declared kind. Each entry is then registered in the catalog as a factory
//! producing a [`ManifestModule`].

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::identity::ModulePath;
use crate::module::{
    Module, ModuleDescriptor, ModuleKind, ModuleOption, OperatorContext, OptionSet,
};
use anyhow::{Context, anyhow, bail};
use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

pub const MANIFEST_SCHEMA_VERSION: &str = "module_manifest_v1";

const MANIFEST_SCHEMA: &str = include_str!("../../schema/module_manifest.schema.json");

/// Parsed module manifest.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModuleManifest {
    pub schema_version: String,
    pub modules: Vec<ModuleSpec>,
}

/// One module type declared in a manifest.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ModuleSpec {
    pub path: ModulePath,
    pub name: String,
    pub kind: ModuleKind,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub options: Vec<ModuleOption>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Module instance backed by a manifest entry.
///
/// Its primary action produces a JSON task record describing the invocation;
/// delivering that record to an implant is the transport layer's job.
pub struct ManifestModule {
    spec: Arc<ModuleSpec>,
    options: OptionSet,
    context: Option<OperatorContext>,
}

/// Read, schema-check and validate a manifest file.
pub fn load_manifest(path: &Path) -> anyhow::Result<ModuleManifest> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading module manifest {}", path.display()))?;
    let value: Value = serde_json::from_str(&data)
        .with_context(|| format!("parsing module manifest {}", path.display()))?;
    validate_against_schema(&value)
        .with_context(|| format!("module manifest {} failed schema validation", path.display()))?;

    let manifest: ModuleManifest = serde_json::from_value(value)
        .with_context(|| format!("decoding module manifest {}", path.display()))?;
    manifest
        .validate()
        .with_context(|| format!("validating module manifest {}", path.display()))?;
    Ok(manifest)
}

fn validate_against_schema(value: &Value) -> anyhow::Result<()> {
    let schema: Value =
        serde_json::from_str(MANIFEST_SCHEMA).context("parsing bundled manifest schema")?;
    let compiled = JSONSchema::compile(&schema)
        .map_err(|err| anyhow!("compiling bundled manifest schema: {err}"))?;

    if let Err(errors) = compiled.validate(value) {
        let details = errors
            .map(|err| err.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        bail!("{details}");
    }
    Ok(())
}

impl ModuleManifest {
    /// Semantic checks the schema cannot express.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.schema_version != MANIFEST_SCHEMA_VERSION {
            bail!(
                "schema_version '{}' is not {MANIFEST_SCHEMA_VERSION}",
                self.schema_version
            );
        }

        let mut seen = BTreeSet::new();
        for spec in &self.modules {
            if !spec.path.is_well_formed() {
                bail!("module path '{}' is malformed", spec.path);
            }
            if !seen.insert(&spec.path) {
                bail!("duplicate module path {}", spec.path);
            }
            if spec.name.trim().is_empty() {
                bail!("module {} has an empty name", spec.path);
            }

            let mut option_names = BTreeSet::new();
            for option in &spec.options {
                if !option_names.insert(option.name.as_str()) {
                    bail!("module {} declares option {} twice", spec.path, option.name);
                }
                if let Some(default) = &option.value {
                    if let Err(reason) = option.kind.check(default) {
                        bail!(
                            "module {} option {} has an invalid default: {reason}",
                            spec.path,
                            option.name
                        );
                    }
                }
            }
        }
        Ok(())
    }

    /// Register a factory for every declared module. Returns how many were registered.
    pub fn register_into(&self, catalog: &Catalog) -> usize {
        for spec in &self.modules {
            let spec = Arc::new(spec.clone());
            let path = spec.path.clone();
            catalog.register(path, move || ManifestModule::new(Arc::clone(&spec)));
        }
        self.modules.len()
    }
}

impl ManifestModule {
    pub fn new(spec: Arc<ModuleSpec>) -> Self {
        let options = spec.options.iter().cloned().collect();
        Self {
            spec,
            options,
            context: None,
        }
    }

    pub fn context(&self) -> Option<&OperatorContext> {
        self.context.as_ref()
    }
}

impl Module for ManifestModule {
    fn initialize(&mut self, context: &OperatorContext) -> Result<()> {
        match &self.context {
            Some(bound) if bound != context => Err(Error::init(
                self.spec.path.as_str(),
                format!("already bound to operator {}", bound.operator),
            )),
            _ => {
                self.context = Some(context.clone());
                Ok(())
            }
        }
    }

    fn execute(&mut self, input: &str) -> Result<String> {
        let module = self.spec.path.as_str();
        let Some(context) = &self.context else {
            return Err(Error::execution(module, "module is not initialized"));
        };

        let missing = self.options.missing_required();
        if !missing.is_empty() {
            return Err(Error::execution(
                module,
                format!("required options not set: {}", missing.join(", ")),
            ));
        }

        let task = json!({
            "module": module,
            "workspace": context.workspace,
            "operator": context.operator,
            "input": input,
            "options": self.options.values(),
        });
        serde_json::to_string(&task).map_err(|err| Error::execution(module, err))
    }

    fn set_option(&mut self, key: &str, value: &str) -> Result<()> {
        self.options
            .set(key, value)
            .map_err(|reason| Error::invalid_option(self.spec.path.as_str(), key, reason))
    }

    fn describe(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            path: self.spec.path.clone(),
            name: self.spec.name.clone(),
            kind: self.spec.kind.clone(),
            description: self.spec.description.clone(),
            authors: self.spec.authors.clone(),
            options: self.options.to_vec(),
            metadata: self.spec.metadata.clone(),
        }
    }
}
