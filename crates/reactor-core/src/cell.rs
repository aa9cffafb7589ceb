// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Reactive storage cells.
//!
//! Cells are owned by whatever document store a caller brings; the scheduler
//! itself never stores a `Cell<T>`, only the [`CellId`] values that flow
//! through the [`crate::log::ReactivityLog`] and
//! [`crate::deps::DependencyIndex`]. A cell's weak-reference framing in the
//! distilled spec falls out for free here: since the scheduler holds no
//! `Cell<T>` at all, there is nothing for it to keep alive or mutate outside
//! a transaction.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use crate::ids::CellId;
use crate::tx::Transaction;

/// A single reactive storage cell holding a value of type `T`.
///
/// Reads and writes performed through [`Cell::get`]/[`Cell::set`] are
/// attributed to the [`Transaction`] passed in; [`Cell::get_untracked`]
/// bypasses tracking entirely, matching the spec's "unmodified reads outside
/// a transaction are not tracked".
#[derive(Debug)]
pub struct Cell<T> {
    id: CellId,
    version: AtomicU64,
    value: RwLock<T>,
}

impl<T> Cell<T> {
    /// Creates a new cell with the given identity and initial value.
    pub fn new(id: CellId, initial: T) -> Self {
        Self {
            id,
            version: AtomicU64::new(0),
            value: RwLock::new(initial),
        }
    }

    /// This cell's stable identity.
    #[must_use]
    pub fn id(&self) -> CellId {
        self.id
    }

    /// The current version. Bumped by every [`Cell::set`] call.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Reads the value without recording a dependency. Intended for
    /// bootstrapping state outside of a settle pass; reads made this way
    /// never create a subscription edge.
    #[allow(clippy::significant_drop_in_scrutinee)]
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.value.read().map_or_else(|e| e.into_inner().clone(), |g| g.clone())
    }
}

impl<T: Clone> Cell<T> {
    /// Reads the value, recording this cell as a read in `tx`'s reactivity
    /// log.
    pub fn get(&self, tx: &Transaction) -> T {
        tx.record_read(self.id);
        self.value.read().map_or_else(|e| e.into_inner().clone(), |g| g.clone())
    }

    /// Writes a new value, recording this cell as a write in `tx`'s
    /// reactivity log and bumping the version counter.
    ///
    /// The write takes effect immediately: the document store this cell
    /// stands in for is an out-of-scope collaborator, so there is no
    /// deferred-apply-at-commit layer underneath it here. See `DESIGN.md`.
    pub fn set(&self, tx: &Transaction, value: T) {
        tx.record_write(self.id);
        if let Ok(mut guard) = self.value.write() {
            *guard = value;
        }
        self.version.fetch_add(1, Ordering::AcqRel);
    }
}
