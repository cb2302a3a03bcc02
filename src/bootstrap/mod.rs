//! Startup reconciliation of the stack registry.
//!
//! The set of (workspace, operator) pairs is the cross product of two external
//! sources: operators are the common names of issued client certificates, and
//! workspaces come from the workspace directory. Reconciling fetches both,
//! computes the product, and applies it to the registry under the chosen
//! [`ReconcilePolicy`].

pub mod sources;

use crate::error::Result;
use crate::identity::{OperatorIdentity, StackKey, WorkspaceId};
use crate::registry::StackRegistry;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{info, warn};

pub use sources::{
    ClientCertificate, CredentialStore, JsonFileCredentials, JsonFileWorkspaces,
    StaticCredentials, StaticWorkspaces, WorkspaceDirectory, WorkspaceRecord,
};

/// How a computed pair set is applied to an already-populated registry.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcilePolicy {
    /// Insert empty stacks for missing pairs; existing stacks and their modules survive.
    #[default]
    Merge,
    /// Rebuild from scratch: every pair gets a fresh empty stack, everything else is dropped.
    Replace,
}

/// Summary of one reconciliation run.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub policy: ReconcilePolicy,
    pub operators: usize,
    pub workspaces: usize,
    pub created: usize,
    pub preserved: usize,
    pub discarded: usize,
}

impl ReconcilePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcilePolicy::Merge => "merge",
            ReconcilePolicy::Replace => "replace",
        }
    }
}

impl TryFrom<&str> for ReconcilePolicy {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> anyhow::Result<Self> {
        match value {
            "merge" => Ok(ReconcilePolicy::Merge),
            "replace" => Ok(ReconcilePolicy::Replace),
            other => anyhow::bail!("Unknown reconcile policy: {other}"),
        }
    }
}

/// Populate `registry` with one stack per (workspace, operator) pair.
///
/// Both sources are queried before the registry is touched, so a source
/// failure leaves it exactly as it was.
pub fn reconcile(
    registry: &StackRegistry,
    credentials: &dyn CredentialStore,
    directory: &dyn WorkspaceDirectory,
    policy: ReconcilePolicy,
) -> Result<ReconcileReport> {
    let operators = operator_identities(credentials.client_common_names()?);
    let workspaces = unique_workspaces(directory.workspaces()?);

    let pairs = workspaces.iter().flat_map(|workspace| {
        operators
            .iter()
            .map(move |operator| StackKey::new(*workspace, operator.clone()))
    });

    let counts = match policy {
        ReconcilePolicy::Merge => registry.merge_pairs(pairs),
        ReconcilePolicy::Replace => registry.replace_pairs(pairs),
    };

    if counts.discarded > 0 {
        warn!(
            discarded = counts.discarded,
            "replace reconciliation dropped existing stacks and their loaded modules"
        );
    }
    info!(
        policy = policy.as_str(),
        operators = operators.len(),
        workspaces = workspaces.len(),
        created = counts.created,
        preserved = counts.preserved,
        "reconciled module stacks"
    );

    Ok(ReconcileReport {
        policy,
        operators: operators.len(),
        workspaces: workspaces.len(),
        created: counts.created,
        preserved: counts.preserved,
        discarded: counts.discarded,
    })
}

/// Trim, drop empties, and de-duplicate preserving first-seen order.
fn operator_identities(common_names: Vec<String>) -> Vec<OperatorIdentity> {
    let mut seen = HashSet::new();
    common_names
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty() && seen.insert(name.clone()))
        .map(OperatorIdentity)
        .collect()
}

fn unique_workspaces(records: Vec<WorkspaceRecord>) -> Vec<WorkspaceId> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .map(|record| record.id)
        .filter(|id| seen.insert(*id))
        .collect()
}
