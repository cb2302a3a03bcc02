use thiserror::Error;

use crate::identity::ModulePath;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the module subsystem.
///
/// Every variant is returned to the immediate caller; nothing in this crate
/// retries on its own.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no module registered for path `{path}`")]
    NotFound { path: ModulePath },
    #[error("module `{module}` failed to initialize: {details}")]
    Init { module: String, details: String },
    #[error("module `{module}` failed to execute: {details}")]
    Execution { module: String, details: String },
    #[error("module `{module}` rejected option `{key}`: {details}")]
    InvalidOption {
        module: String,
        key: String,
        details: String,
    },
    #[error("{operation} failed: {details}")]
    Persistence {
        operation: &'static str,
        details: String,
    },
    #[error("{collaborator} unavailable: {details}")]
    Source {
        collaborator: &'static str,
        details: String,
    },
}

impl Error {
    pub fn not_found(path: &ModulePath) -> Self {
        Self::NotFound { path: path.clone() }
    }

    pub fn init(module: impl Into<String>, details: impl ToString) -> Self {
        Self::Init {
            module: module.into(),
            details: details.to_string(),
        }
    }

    pub fn execution(module: impl Into<String>, details: impl ToString) -> Self {
        Self::Execution {
            module: module.into(),
            details: details.to_string(),
        }
    }

    pub fn invalid_option(
        module: impl Into<String>,
        key: impl Into<String>,
        details: impl ToString,
    ) -> Self {
        Self::InvalidOption {
            module: module.into(),
            key: key.into(),
            details: details.to_string(),
        }
    }

    pub fn persistence(operation: &'static str, details: impl ToString) -> Self {
        Self::Persistence {
            operation,
            details: details.to_string(),
        }
    }

    pub fn source(collaborator: &'static str, details: impl ToString) -> Self {
        Self::Source {
            collaborator,
            details: details.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
