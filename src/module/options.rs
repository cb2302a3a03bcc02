//! Typed, validated module options.
//!
//! Every module owns an [`OptionSet`]. Setting an option goes through
//! [`OptionSet::set`], which rejects unknown keys and values that do not parse
//! for the declared kind instead of dropping them on the floor.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Value type an option accepts.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OptionKind {
    String,
    Integer,
    Port,
    Bool,
}

/// One configurable option exposed by a module.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ModuleOption {
    pub name: String,
    pub kind: OptionKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Declared options of one module instance, keyed by name.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct OptionSet {
    options: BTreeMap<String, ModuleOption>,
}

impl OptionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionKind::String => "string",
            OptionKind::Integer => "integer",
            OptionKind::Port => "port",
            OptionKind::Bool => "bool",
        }
    }

    fn from_str(value: &str) -> Option<Self> {
        match value {
            "string" => Some(OptionKind::String),
            "integer" => Some(OptionKind::Integer),
            "port" => Some(OptionKind::Port),
            "bool" => Some(OptionKind::Bool),
            _ => None,
        }
    }

    /// Returns the normalized value, or a description of why it was refused.
    pub fn check(&self, raw: &str) -> Result<String, String> {
        let trimmed = raw.trim();
        match self {
            OptionKind::String => Ok(raw.to_string()),
            OptionKind::Integer => trimmed
                .parse::<i64>()
                .map(|v| v.to_string())
                .map_err(|_| format!("expected an integer, got '{raw}'")),
            OptionKind::Port => match trimmed.parse::<u16>() {
                Ok(0) | Err(_) => Err(format!("expected a port in 1-65535, got '{raw}'")),
                Ok(port) => Ok(port.to_string()),
            },
            OptionKind::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok("true".to_string()),
                "false" | "no" | "off" | "0" => Ok("false".to_string()),
                _ => Err(format!("expected true/false, got '{raw}'")),
            },
        }
    }
}

impl Serialize for OptionKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OptionKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::from_str(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown option kind '{value}'")))
    }
}

impl ModuleOption {
    pub fn new(name: impl Into<String>, kind: OptionKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            description: String::new(),
            value: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl OptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare (or redeclare) an option.
    pub fn declare(&mut self, option: ModuleOption) {
        self.options.insert(option.name.clone(), option);
    }

    /// Validate and store `value` under `key`.
    ///
    /// The stored value is left untouched when validation fails.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        let Some(option) = self.options.get_mut(key) else {
            return Err("unknown option".to_string());
        };
        option.value = Some(option.kind.check(value)?);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.options.get(key)?.value.as_deref()
    }

    /// Names of required options that still have no value.
    pub fn missing_required(&self) -> Vec<&str> {
        self.options
            .values()
            .filter(|opt| opt.required && opt.value.is_none())
            .map(|opt| opt.name.as_str())
            .collect()
    }

    /// Current values of every option that has one.
    pub fn values(&self) -> BTreeMap<String, String> {
        self.options
            .values()
            .filter_map(|opt| Some((opt.name.clone(), opt.value.clone()?)))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleOption> {
        self.options.values()
    }

    pub fn to_vec(&self) -> Vec<ModuleOption> {
        self.options.values().cloned().collect()
    }
}

impl FromIterator<ModuleOption> for OptionSet {
    fn from_iter<T: IntoIterator<Item = ModuleOption>>(iter: T) -> Self {
        let mut set = OptionSet::new();
        for option in iter {
            set.declare(option);
        }
        set
    }
}
