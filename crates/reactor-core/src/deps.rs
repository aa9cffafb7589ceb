// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The dependency index: `cell -> {action}` forward map and
//! `action -> {cell}` inverse map, kept consistent by construction.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ids::{ActionId, CellId};
use crate::log::ReactivityLog;

/// Bidirectional index between cells and the actions currently subscribed to
/// them.
///
/// An action is in a cell's forward set if and only if its most recent
/// successful [`DependencyIndex::subscribe`] call included that cell in its
/// reads. Writes never create edges — only reads do.
#[derive(Debug, Default)]
pub struct DependencyIndex {
    forward: FxHashMap<CellId, FxHashSet<ActionId>>,
    inverse: FxHashMap<ActionId, FxHashSet<CellId>>,
}

impl DependencyIndex {
    /// An empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces `action`'s subscription set with the reads recorded in
    /// `log`. This is the only mutation that creates or removes forward
    /// edges; it is a full symmetric-difference replace, not an additive
    /// union, so an action that stops reading a cell is unsubscribed from it
    /// on its very next run.
    pub fn subscribe(&mut self, action: ActionId, log: &ReactivityLog) {
        let new_reads = log.reads();
        let previous = self.inverse.remove(&action).unwrap_or_default();

        for cell in previous.difference(new_reads) {
            if let Some(actions) = self.forward.get_mut(cell) {
                actions.remove(&action);
                if actions.is_empty() {
                    self.forward.remove(cell);
                }
            }
        }
        for &cell in new_reads {
            self.forward.entry(cell).or_default().insert(action);
        }
        self.inverse.insert(action, new_reads.clone());
    }

    /// Removes `action` from the index entirely, tearing down every forward
    /// edge it held.
    pub fn unsubscribe(&mut self, action: ActionId) {
        if let Some(cells) = self.inverse.remove(&action) {
            for cell in cells {
                if let Some(actions) = self.forward.get_mut(&cell) {
                    actions.remove(&action);
                    if actions.is_empty() {
                        self.forward.remove(&cell);
                    }
                }
            }
        }
    }

    /// Actions currently subscribed to `cell`.
    #[must_use]
    pub fn dependents(&self, cell: CellId) -> &FxHashSet<ActionId> {
        static EMPTY: std::sync::OnceLock<FxHashSet<ActionId>> = std::sync::OnceLock::new();
        self.forward
            .get(&cell)
            .unwrap_or_else(|| EMPTY.get_or_init(FxHashSet::default))
    }

    /// The cells `action` is currently subscribed to.
    #[must_use]
    pub fn subscriptions(&self, action: ActionId) -> &FxHashSet<CellId> {
        static EMPTY: std::sync::OnceLock<FxHashSet<CellId>> = std::sync::OnceLock::new();
        self.inverse
            .get(&action)
            .unwrap_or_else(|| EMPTY.get_or_init(FxHashSet::default))
    }
}
