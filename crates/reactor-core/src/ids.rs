// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Opaque identifiers for cells, actions, and transactions.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Stable, equality-comparable identity for a reactive storage cell.
///
/// `CellId` carries no information about the cell's value; the scheduler
/// never needs to inspect values, only to track which cells were read and
/// written by a transaction.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(u64);

impl CellId {
    /// Constructs a `CellId` from a raw value. Intended for external document
    /// stores that mint their own identity space.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying raw value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell:{}", self.0)
    }
}

/// Stable identity for an invocable action (derivation or event handler).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(u64);

impl ActionId {
    /// Constructs an `ActionId` from a raw value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying raw value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "action:{}", self.0)
    }
}

/// Transaction identifier. Monotonically increasing within one scheduler
/// instance; never reused after its transaction closes.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxId(u64);

impl TxId {
    /// Constructs a `TxId` from a raw value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying raw value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx:{}", self.0)
    }
}

/// Monotonic generator shared by the three id spaces above.
///
/// A single counter per space is sufficient since the scheduler is the only
/// caller minting `ActionId`/`TxId` values; `CellId` minting belongs to
/// whatever document store the caller brings (see [`crate::cell::Cell::new`]),
/// but the same generator type is reused there for consistency.
#[derive(Debug, Default)]
pub struct IdGen(AtomicU64);

impl IdGen {
    /// Creates a generator starting at `1` (`0` is reserved as a sentinel).
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    /// Returns the next raw value, skipping zero on wraparound.
    pub fn next_raw(&self) -> u64 {
        let v = self.0.fetch_add(1, Ordering::Relaxed);
        if v == 0 {
            self.0.fetch_add(1, Ordering::Relaxed)
        } else {
            v
        }
    }
}
