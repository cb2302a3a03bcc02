//! Identifiers shared by the catalog, stacks, and reconciliation.
//!
//! All three are thin newtypes with transparent serde so they read as plain
//! strings/numbers in JSON while staying distinct in signatures.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Path identifying a module type in the catalog (e.g. `exploit/linux/ssh/keys`).
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModulePath(pub String);

/// Numeric id of a workspace, as handed out by the workspace directory.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(pub u64);

/// Operator name, taken from the common name of the operator's client certificate.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperatorIdentity(pub String);

/// Composite key owning exactly one stack.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct StackKey {
    pub workspace: WorkspaceId,
    pub operator: OperatorIdentity,
}

impl ModulePath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks the `segment(/segment)*` shape required of manifest-declared paths.
    ///
    /// The catalog itself accepts any string; only declarative sources go
    /// through this check.
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty()
            && self.0.split('/').all(|segment| {
                !segment.is_empty()
                    && segment
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
            })
    }
}

impl OperatorIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl StackKey {
    pub fn new(workspace: WorkspaceId, operator: OperatorIdentity) -> Self {
        Self {
            workspace,
            operator,
        }
    }
}

impl From<&str> for ModulePath {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ModulePath {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for OperatorIdentity {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for OperatorIdentity {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for WorkspaceId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for OperatorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for StackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.workspace, self.operator)
    }
}
