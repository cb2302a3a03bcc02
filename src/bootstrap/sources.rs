//! External sources consulted during reconciliation.
//!
//! The real credential store and workspace directory live outside this crate;
//! these traits are the seam. In-memory implementations serve tests and
//! embedding, and JSON-file implementations back the `modstack` binary.

use crate::error::{Error, Result};
use crate::identity::WorkspaceId;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Issued operator client certificates.
pub trait CredentialStore {
    /// Common names of every currently valid client certificate. May repeat.
    fn client_common_names(&self) -> Result<Vec<String>>;
}

/// Known workspaces.
pub trait WorkspaceDirectory {
    fn workspaces(&self) -> Result<Vec<WorkspaceRecord>>;
}

/// Subset of an issued client certificate relevant to operator identity.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ClientCertificate {
    pub common_name: String,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceRecord {
    pub id: WorkspaceId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl WorkspaceRecord {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: WorkspaceId(id),
            name: name.into(),
            description: String::new(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct StaticCredentials {
    common_names: Vec<String>,
}

impl StaticCredentials {
    pub fn new<I, S>(common_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            common_names: common_names.into_iter().map(Into::into).collect(),
        }
    }
}

impl CredentialStore for StaticCredentials {
    fn client_common_names(&self) -> Result<Vec<String>> {
        Ok(self.common_names.clone())
    }
}

#[derive(Clone, Debug, Default)]
pub struct StaticWorkspaces {
    records: Vec<WorkspaceRecord>,
}

impl StaticWorkspaces {
    pub fn new(records: impl IntoIterator<Item = WorkspaceRecord>) -> Self {
        Self {
            records: records.into_iter().collect(),
        }
    }
}

impl WorkspaceDirectory for StaticWorkspaces {
    fn workspaces(&self) -> Result<Vec<WorkspaceRecord>> {
        Ok(self.records.clone())
    }
}

/// Credential store read from a JSON array of [`ClientCertificate`] records.
#[derive(Clone, Debug)]
pub struct JsonFileCredentials {
    path: PathBuf,
}

impl JsonFileCredentials {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialStore for JsonFileCredentials {
    fn client_common_names(&self) -> Result<Vec<String>> {
        let certs: Vec<ClientCertificate> = read_json_list(&self.path, "credential store")?;
        Ok(certs.into_iter().map(|cert| cert.common_name).collect())
    }
}

/// Workspace directory read from a JSON array of [`WorkspaceRecord`] records.
#[derive(Clone, Debug)]
pub struct JsonFileWorkspaces {
    path: PathBuf,
}

impl JsonFileWorkspaces {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl WorkspaceDirectory for JsonFileWorkspaces {
    fn workspaces(&self) -> Result<Vec<WorkspaceRecord>> {
        read_json_list(&self.path, "workspace directory")
    }
}

fn read_json_list<T>(path: &Path, collaborator: &'static str) -> Result<Vec<T>>
where
    T: for<'de> Deserialize<'de>,
{
    let data = fs::read_to_string(path)
        .map_err(|err| Error::source(collaborator, format!("{}: {err}", path.display())))?;
    serde_json::from_str(&data)
        .map_err(|err| Error::source(collaborator, format!("{}: {err}", path.display())))
}
