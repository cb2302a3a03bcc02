//! Index from (workspace, operator) to that pair's stack.
//!
//! The index is one flat map keyed by [`StackKey`] behind its own lock, distinct
//! from every stack's lock. Lookups take the read side; creating a stack or
//! rebuilding the index takes the write side, and a rebuild holds it for the
//! whole operation so no caller observes a half-built index.

use crate::identity::{OperatorIdentity, StackKey, WorkspaceId};
use crate::stack::Stack;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
pub struct StackRegistry {
    stacks: RwLock<HashMap<StackKey, Arc<Stack>>>,
}

/// Outcome of applying a computed set of pairs to the registry.
///
/// `preserved` counts only requested pairs whose stack was already present;
/// stacks outside the requested set are neither preserved nor discarded by a merge.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RebuildCounts {
    pub created: usize,
    pub preserved: usize,
    pub discarded: usize,
}

impl StackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the pair's stack, creating an empty one on first access.
    ///
    /// Exactly one stack object exists per pair until a destructive rebuild.
    pub fn get_or_create_stack(
        &self,
        workspace: WorkspaceId,
        operator: &OperatorIdentity,
    ) -> Arc<Stack> {
        let key = StackKey::new(workspace, operator.clone());
        if let Some(stack) = self.stacks.read().get(&key) {
            return Arc::clone(stack);
        }

        let mut stacks = self.stacks.write();
        let stack = stacks.entry(key).or_insert_with(|| {
            debug!(workspace = %workspace, operator = %operator, "created stack on demand");
            Arc::new(Stack::new(workspace, operator.clone()))
        });
        Arc::clone(stack)
    }

    pub fn get_stack(
        &self,
        workspace: WorkspaceId,
        operator: &OperatorIdentity,
    ) -> Option<Arc<Stack>> {
        let key = StackKey::new(workspace, operator.clone());
        self.stacks.read().get(&key).cloned()
    }

    pub fn len(&self) -> usize {
        self.stacks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every registered pair, sorted.
    pub fn keys(&self) -> Vec<StackKey> {
        let mut keys: Vec<StackKey> = self.stacks.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn workspaces(&self) -> BTreeSet<WorkspaceId> {
        self.stacks.read().keys().map(|key| key.workspace).collect()
    }

    pub fn operators_in(&self, workspace: WorkspaceId) -> BTreeSet<OperatorIdentity> {
        self.stacks
            .read()
            .keys()
            .filter(|key| key.workspace == workspace)
            .map(|key| key.operator.clone())
            .collect()
    }

    /// Add an empty stack for every pair not yet present; never removes or resets a stack.
    pub fn merge_pairs<I>(&self, pairs: I) -> RebuildCounts
    where
        I: IntoIterator<Item = StackKey>,
    {
        let mut stacks = self.stacks.write();
        let mut counts = RebuildCounts::default();
        for key in pairs {
            if stacks.contains_key(&key) {
                counts.preserved += 1;
                continue;
            }
            let stack = Stack::new(key.workspace, key.operator.clone());
            stacks.insert(key, Arc::new(stack));
            counts.created += 1;
        }
        counts
    }

    /// Replace the whole index with fresh empty stacks for exactly `pairs`.
    ///
    /// Every previous stack is dropped from the index, including stacks for
    /// pairs that reappear in `pairs`. Callers still holding an old `Arc<Stack>`
    /// keep a detached stack that the registry no longer returns.
    pub fn replace_pairs<I>(&self, pairs: I) -> RebuildCounts
    where
        I: IntoIterator<Item = StackKey>,
    {
        let mut fresh = HashMap::new();
        for key in pairs {
            let stack = Stack::new(key.workspace, key.operator.clone());
            fresh.insert(key, Arc::new(stack));
        }

        let mut stacks = self.stacks.write();
        let counts = RebuildCounts {
            created: fresh.len(),
            preserved: 0,
            discarded: stacks.len(),
        };
        *stacks = fresh;
        counts
    }
}
