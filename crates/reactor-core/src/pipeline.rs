// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The commit pipeline: the collaborator seam standing in for the
//! out-of-scope UCAN/Ed25519-authorized, Automerge/SQLite-backed commit path
//! (spec §6, "Ambient addition — collaborator seams").
//!
//! A [`Pipeline`] is everything [`crate::tx::Transaction::commit`] hands a
//! sealed [`ReactivityLog`] to: it diffs the log against prior state,
//! authorizes the write, and enqueues it for durable storage. None of that
//! machinery is part of this crate's contract — only the shape of the
//! seam is. [`InMemoryPipeline`] is a realistic test double with simulated
//! authorization latency; production callers bring their own.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rustc_hash::FxHashSet;

use crate::ids::{CellId, TxId};
use crate::log::ReactivityLog;

/// The signed, authorization-ready package a [`Pipeline`] receives for one
/// transaction's commit.
///
/// Carries only what §4.3 says commit needs: the transaction identity and
/// its reads/writes. The actual signing and capability envelope belong to
/// the out-of-scope UCAN/Ed25519 layer.
#[derive(Debug, Clone)]
pub struct SignedPackage {
    tx: TxId,
    reads: FxHashSet<CellId>,
    writes: FxHashSet<CellId>,
}

impl SignedPackage {
    pub(crate) fn new(tx: TxId, log: &ReactivityLog) -> Self {
        Self {
            tx,
            reads: log.reads().clone(),
            writes: log.writes().clone(),
        }
    }

    /// The transaction this package commits.
    #[must_use]
    pub const fn tx(&self) -> TxId {
        self.tx
    }

    /// Cells this transaction read.
    #[must_use]
    pub fn reads(&self) -> &FxHashSet<CellId> {
        &self.reads
    }

    /// Cells this transaction wrote.
    #[must_use]
    pub fn writes(&self) -> &FxHashSet<CellId> {
        &self.writes
    }
}

/// Outcome reported back by a [`Pipeline`] commit, matching the taxonomy in
/// spec §4.3/§7.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The commit was diffed, authorized, and enqueued successfully.
    Ok,
    /// One of the transaction's reads was superseded by a committed write
    /// before this commit landed. Transient — the settle loop retries.
    StaleRead,
    /// Authorization or storage permanently refused the write.
    Rejected {
        /// Diagnostic reason, surfaced through the error sink.
        reason: String,
    },
}

/// The collaborator seam a [`crate::tx::Transaction`] hands its sealed log
/// to on commit.
///
/// Implementations own the diff-against-prior-state step (~0.3ms expected),
/// the authorize step (signature + capability check, 50-130ms expected —
/// the dominant cost), and handing the package to a send queue whose
/// draining is independent of the scheduler. None of those steps are part
/// of this crate's contract; only the `commit` signature is.
pub trait Pipeline: Send + Sync + 'static {
    /// Commits `package`, returning its outcome.
    fn commit(
        &self,
        package: SignedPackage,
    ) -> crate::BoxFuture<'static, CommitOutcome>;
}

/// An in-memory [`Pipeline`] that simulates the authorization latency
/// described in spec §4.3 (`tokio::time::sleep`, tens of milliseconds)
/// without depending on an actual crypto or storage crate (see
/// `DESIGN.md`).
///
/// Stale-reads are modeled explicitly: [`InMemoryPipeline::force_stale`]
/// queues a one-shot stale-read response for a specific cell, letting tests
/// exercise the retry path (spec §8 scenario 4) deterministically.
pub struct InMemoryPipeline {
    latency: Duration,
    committed_versions: std::sync::Mutex<rustc_hash::FxHashMap<CellId, u64>>,
    forced_stale: std::sync::Mutex<FxHashSet<CellId>>,
    commits_seen: AtomicU64,
}

impl InMemoryPipeline {
    /// Creates a pipeline with the given simulated authorization latency.
    #[must_use]
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            committed_versions: std::sync::Mutex::new(rustc_hash::FxHashMap::default()),
            forced_stale: std::sync::Mutex::new(FxHashSet::default()),
            commits_seen: AtomicU64::new(0),
        }
    }

    /// A pipeline matching the spec's dominant-cost estimate (50-130ms);
    /// picks the midpoint.
    #[must_use]
    pub fn with_realistic_latency() -> Self {
        Self::new(Duration::from_millis(90))
    }

    /// A pipeline with zero simulated latency, for tests that don't care
    /// about timing.
    #[must_use]
    pub fn instant() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Arranges for the next commit touching `cell` as a read to report
    /// `StaleRead` exactly once.
    pub fn force_stale(&self, cell: CellId) {
        self.forced_stale.lock().map_or_else(|e| e.into_inner().insert(cell), |mut g| g.insert(cell));
    }

    /// How many commits this pipeline has processed so far.
    #[must_use]
    pub fn commits_seen(&self) -> u64 {
        self.commits_seen.load(Ordering::Acquire)
    }
}

impl Pipeline for InMemoryPipeline {
    fn commit(&self, package: SignedPackage) -> crate::BoxFuture<'static, CommitOutcome> {
        let latency = self.latency;
        let reads: Vec<CellId> = package.reads().iter().copied().collect();
        let writes: Vec<CellId> = package.writes().iter().copied().collect();

        let stale = {
            let mut forced = self
                .forced_stale
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            reads.iter().any(|c| forced.remove(c))
        };

        self.commits_seen.fetch_add(1, Ordering::AcqRel);

        if stale {
            return Box::pin(async move { CommitOutcome::StaleRead });
        }

        // Diff step: bump every written cell's committed version. Cheap —
        // modeled without a sleep, matching the spec's ~0.3ms estimate.
        for cell in &writes {
            let mut versions = self
                .committed_versions
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *versions.entry(*cell).or_insert(0) += 1;
        }

        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            CommitOutcome::Ok
        })
    }
}

/// Test-only pipelines with no simulated latency and no failure modes,
/// used by unit tests elsewhere in this crate that only care about the
/// reactivity log, not commit timing.
pub mod test_support {
    use super::{CommitOutcome, Pipeline, SignedPackage};

    /// A pipeline that always reports `Ok` immediately, with no sleep.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct NoopPipeline;

    impl Pipeline for NoopPipeline {
        fn commit(&self, _package: SignedPackage) -> crate::BoxFuture<'static, CommitOutcome> {
            Box::pin(async { CommitOutcome::Ok })
        }
    }
}

/// Convenience constructor for an `Arc<dyn Pipeline>` wrapping
/// [`InMemoryPipeline::with_realistic_latency`].
#[must_use]
pub fn realistic_in_memory_pipeline() -> Arc<dyn Pipeline> {
    Arc::new(InMemoryPipeline::with_realistic_latency())
}
