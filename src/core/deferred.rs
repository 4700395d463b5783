//! Finalize-time actions executed once per run.
//!
//! Handlers schedule actions while the tree is traversed. After traversal the
//! driver executes every distinct action once, in first-schedule order.
//! Actions are identified by name, so the same action scheduled from many
//! handler invocations runs a single time.

use anyhow::Result;
use indexmap::IndexMap;
use swc_ecma_ast::Module;

use super::context::RunContext;

pub type DeferredFn = fn(&mut Module, &RunContext) -> Result<()>;

/// A named finalize-time action.
#[derive(Clone, Copy)]
pub struct DeferredAction {
    pub name: &'static str,
    pub apply: DeferredFn,
}

impl DeferredAction {
    pub const fn new(name: &'static str, apply: DeferredFn) -> Self {
        Self { name, apply }
    }
}

impl std::fmt::Debug for DeferredAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DeferredAction").field(&self.name).finish()
    }
}

/// Insertion-ordered set of deferred actions keyed by name.
#[derive(Debug, Default)]
pub struct DeferredQueue {
    actions: IndexMap<&'static str, DeferredAction>,
}

impl DeferredQueue {
    /// Schedule an action. Returns false when it was already scheduled.
    pub fn push(&mut self, action: DeferredAction) -> bool {
        if self.actions.contains_key(action.name) {
            return false;
        }
        self.actions.insert(action.name, action);
        true
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.actions.keys().copied()
    }

    /// Take all scheduled actions in first-schedule order, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<DeferredAction> {
        self.actions.drain(..).map(|(_, action)| action).collect()
    }
}
