use anyhow::{Context, Result, bail};
use modstack::{
    Error, Module, ModuleDescriptor, ModuleKind, ModuleOption, OperatorContext, OptionKind,
    OptionSet,
};
use serde_json::Value;
use std::path::Path;
use std::process::{Command, Output};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

/// Module that counts how often instances are initialized.
pub struct CountingModule {
    path: String,
    label: &'static str,
    inits: Arc<AtomicUsize>,
    options: OptionSet,
    context: Option<OperatorContext>,
}

impl CountingModule {
    pub fn new(path: &str, label: &'static str, inits: Arc<AtomicUsize>) -> Self {
        Self {
            path: path.to_string(),
            label,
            inits,
            options: OptionSet::from_iter([ModuleOption::new("LPORT", OptionKind::Port)]),
            context: None,
        }
    }
}

impl Module for CountingModule {
    fn initialize(&mut self, context: &OperatorContext) -> modstack::Result<()> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        self.context = Some(context.clone());
        Ok(())
    }

    fn execute(&mut self, input: &str) -> modstack::Result<String> {
        let Some(context) = &self.context else {
            return Err(Error::execution(&self.path, "not initialized"));
        };
        Ok(format!("{}:{}:{}", self.label, context.operator, input))
    }

    fn set_option(&mut self, key: &str, value: &str) -> modstack::Result<()> {
        self.options
            .set(key, value)
            .map_err(|reason| Error::invalid_option(&self.path, key, reason))
    }

    fn describe(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            path: self.path.as_str().into(),
            name: self.label.to_string(),
            kind: ModuleKind::Auxiliary,
            description: String::new(),
            authors: Vec::new(),
            options: self.options.to_vec(),
            metadata: Default::default(),
        }
    }
}

/// Module whose initialization parks until the test releases it.
///
/// `entered` is passed once initialization has started (with the stack lock
/// held); `release` lets it finish.
pub struct GateModule {
    entered: Arc<Barrier>,
    release: Arc<Barrier>,
}

impl GateModule {
    pub fn new(entered: Arc<Barrier>, release: Arc<Barrier>) -> Self {
        Self { entered, release }
    }
}

impl Module for GateModule {
    fn initialize(&mut self, _context: &OperatorContext) -> modstack::Result<()> {
        self.entered.wait();
        self.release.wait();
        Ok(())
    }

    fn execute(&mut self, input: &str) -> modstack::Result<String> {
        Ok(input.to_string())
    }

    fn set_option(&mut self, key: &str, _value: &str) -> modstack::Result<()> {
        Err(Error::invalid_option("auxiliary/gate", key, "unknown option"))
    }

    fn describe(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            path: "auxiliary/gate".into(),
            name: "gate".to_string(),
            kind: ModuleKind::Auxiliary,
            description: String::new(),
            authors: Vec::new(),
            options: Vec::new(),
            metadata: Default::default(),
        }
    }
}

pub fn write_json(path: &Path, value: &Value) -> Result<()> {
    let data = serde_json::to_vec_pretty(value)?;
    std::fs::write(path, data).with_context(|| format!("writing {}", path.display()))
}

pub fn run_command(mut cmd: Command) -> Result<Output> {
    let output = cmd
        .output()
        .with_context(|| format!("failed to run command: {:?}", cmd))?;
    if output.status.success() {
        Ok(output)
    } else {
        bail!(
            "command {:?} failed: status {:?}\nstdout: {}\nstderr: {}",
            cmd,
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )
    }
}
