// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! reactor-core: a reactive action scheduler for a live-document runtime.
//!
//! User-authored actions (reactive derivations and event handlers) read from
//! and write to a graph of cells. Whenever a cell changes, every action that
//! depends on it re-executes until the graph settles. Each execution is
//! wrapped in a transaction committed through an authorized, signed pipeline
//! (modeled here as a collaborator seam, since the actual UCAN/Ed25519 layer
//! is out of scope — see [`Pipeline`] and `DESIGN.md`). The [`Scheduler`]
//! drives the system to quiescence — [`Scheduler::idle`] — even when
//! individual commits take tens to hundreds of milliseconds and a single
//! event's fan-out can queue dozens of commits.
//!
//! The five cooperating pieces, leaves-first: [`ReactivityLog`], the
//! [`DependencyIndex`], the [`Transaction`] boundary, [`Action`] and
//! [`Scheduler`] (the action runner and settle loop/idle barrier).

mod action;
mod cell;
mod config;
mod deps;
mod error;
mod ids;
mod log;
mod pipeline;
mod scheduler;
mod telemetry;
mod tx;

use std::future::Future;
use std::pin::Pin;

/// A boxed, type-erased future, used at the few seams (commit futures) where
/// naming the concrete future type isn't practical. Hand-rolled rather than
/// pulled from the `futures` crate: nothing else in this crate needs that
/// dependency (see `DESIGN.md`).
pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Actions: the invocable units the scheduler drives to a fixpoint.
pub use action::{Action, ActionError, ActionResult, AlwaysValid, Validity};
/// Reactive storage cells.
pub use cell::Cell;
/// Scheduler configuration.
pub use config::{SchedulerConfig, SchedulerConfigBuilder, DEFAULT_MAX_REACTIVE_RETRIES, DEFAULT_MAX_SETTLE_ITERATIONS};
/// The dependency index between cells and actions.
pub use deps::DependencyIndex;
/// Error taxonomy and the error sink collaborator seam.
pub use error::{ErrorSink, IdleOutcome, ReportedError, SchedulerError, TracingErrorSink};
/// Opaque identifiers for cells, actions, and transactions.
pub use ids::{ActionId, CellId, IdGen, TxId};
/// The reactivity log.
pub use log::ReactivityLog;
/// The commit pipeline collaborator seam.
pub use pipeline::{realistic_in_memory_pipeline, test_support, CommitOutcome, InMemoryPipeline, Pipeline, SignedPackage};
/// The scheduler: settle loop, idle barrier, and external interface.
pub use scheduler::Scheduler;
/// The transaction boundary.
pub use tx::{PipelineTransactionFactory, Transaction, TransactionFactory};
