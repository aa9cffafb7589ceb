// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The transaction boundary: scoped journal acquisition and the
//! fire-and-forget commit tail (spec §4.3).

use std::cell::RefCell;
use std::sync::Arc;

use crate::ids::{IdGen, TxId};
use crate::log::ReactivityLog;
use crate::pipeline::{CommitOutcome, Pipeline, SignedPackage};
use crate::BoxFuture;

/// A scoped acquisition of a journal for one action's execution.
///
/// Every cell access routed through a `Transaction` is attributed to its
/// [`ReactivityLog`]. The journal closes on every path out — normal commit,
/// an action error, or cancellation — by virtue of `Transaction` never being
/// reused after [`Transaction::commit`] consumes it (spec: "the transaction
/// object is never reused").
///
/// `Transaction` is not `Sync`: its log uses a plain [`RefCell`] because the
/// concurrency model (spec §5) guarantees exactly one execution context
/// ever touches a live transaction, and that context never suspends between
/// opening it and extracting its log.
#[derive(Debug)]
pub struct Transaction {
    id: TxId,
    log: RefCell<ReactivityLog>,
    pipeline: Arc<dyn Pipeline>,
}

impl Transaction {
    fn new(id: TxId, pipeline: Arc<dyn Pipeline>) -> Self {
        Self {
            id,
            log: RefCell::new(ReactivityLog::new()),
            pipeline,
        }
    }

    /// This transaction's identity.
    #[must_use]
    pub const fn id(&self) -> TxId {
        self.id
    }

    pub(crate) fn record_read(&self, cell: crate::ids::CellId) {
        self.log.borrow_mut().record_read(cell);
    }

    pub(crate) fn record_write(&self, cell: crate::ids::CellId) {
        self.log.borrow_mut().record_write(cell);
    }

    /// Returns a clone of the current reactivity log without closing the
    /// transaction. Used by the action runner's post-execute phase, which
    /// must extract the log *before* firing commit (spec §4.1 invariant).
    #[must_use]
    pub fn snapshot_log(&self) -> ReactivityLog {
        self.log.borrow().clone()
    }

    /// Closes the transaction and fires its commit. Returns the sealed log
    /// alongside a future resolving to the commit's outcome.
    ///
    /// The runner never awaits the returned future inline — it records it
    /// in `outstandingCommits` and moves on, per the "fire-and-forget
    /// commits vs await-in-runner" design note (spec §9).
    #[must_use]
    pub fn commit(self) -> (ReactivityLog, BoxFuture<'static, CommitOutcome>) {
        let log = self.log.into_inner();
        let package = SignedPackage::new(self.id, &log);
        let pipeline = self.pipeline;
        let fut = Box::pin(async move { pipeline.commit(package).await });
        (log, fut)
    }
}

/// Factory for opening new [`Transaction`]s, the `openTransaction()`
/// contract from spec §4.3.
pub trait TransactionFactory: Send + Sync + 'static {
    /// Opens a new transaction scope.
    fn open_transaction(&self) -> Transaction;
}

/// The shipped [`TransactionFactory`]: mints monotonically increasing
/// [`TxId`]s and routes every commit through one shared [`Pipeline`].
#[derive(Debug)]
pub struct PipelineTransactionFactory {
    ids: IdGen,
    pipeline: Arc<dyn Pipeline>,
}

impl PipelineTransactionFactory {
    /// Creates a factory that commits through `pipeline`.
    #[must_use]
    pub fn new(pipeline: Arc<dyn Pipeline>) -> Self {
        Self {
            ids: IdGen::new(),
            pipeline,
        }
    }
}

impl TransactionFactory for PipelineTransactionFactory {
    fn open_transaction(&self) -> Transaction {
        Transaction::new(TxId::from_raw(self.ids.next_raw()), Arc::clone(&self.pipeline))
    }
}
