// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error taxonomy and the error sink collaborator seam.
//!
//! Mirrors `engine_impl::EngineError`'s shape: one `thiserror`-derived enum
//! per terminal failure kind, each carrying enough identity to act on
//! without re-deriving it from scheduler-internal state.

use thiserror::Error;

use crate::ids::ActionId;

/// A terminal error surfaced by an action's execution or its commit.
///
/// Transient outcomes (`stale-read`, `invalidated`) are handled internally
/// by the settle loop via retry and never reach this type — see
/// `crate::settle`.
#[derive(Debug, Clone, Error)]
pub enum ReportedError {
    /// The action's implementation returned an error.
    #[error("action {action} faulted: {message}")]
    ActionFault {
        /// The action that faulted.
        action: ActionId,
        /// The message the action's implementation reported.
        message: String,
    },
    /// The action's commit was rejected by the authorization collaborator.
    #[error("action {action} commit rejected: {reason}")]
    CommitRejected {
        /// The action whose commit was rejected.
        action: ActionId,
        /// The reason given by the `Authorizer`.
        reason: String,
    },
    /// An action exhausted `MAX_REACTIVE_RETRIES` stale-read retries.
    #[error("action {action} exhausted {retries} stale-read retries")]
    RetriesExhausted {
        /// The action that exhausted its retry budget.
        action: ActionId,
        /// The configured retry budget it hit.
        retries: u32,
    },
    /// A settle pass hit `MAX_SETTLE_ITERATIONS` with actions still dirty.
    #[error("settle loop exceeded {max_iterations} iterations with actions still dirty")]
    IterationCapExceeded {
        /// The configured iteration cap that was hit.
        max_iterations: u32,
    },
}

/// Collaborator seam for surfacing [`ReportedError`]s outside the scheduler.
///
/// A terminal error on one action must never abort its peers in the same
/// settle pass; reporting is fire-and-forget from the runner's perspective.
pub trait ErrorSink: Send + Sync + 'static {
    /// Reports a terminal error.
    fn report(&self, error: &ReportedError);
}

/// Default [`ErrorSink`] that logs via `tracing`, matching how
/// `echo-session-service` wires `tracing-subscriber` at its boundary.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, error: &ReportedError) {
        match error {
            ReportedError::ActionFault { action, message } => {
                tracing::error!(%action, %message, "action fault");
            }
            ReportedError::CommitRejected { action, reason } => {
                tracing::error!(%action, %reason, "commit rejected");
            }
            ReportedError::RetriesExhausted { action, retries } => {
                tracing::warn!(%action, retries, "stale-read retries exhausted");
            }
            ReportedError::IterationCapExceeded { max_iterations } => {
                tracing::error!(max_iterations, "settle loop iteration cap exceeded");
            }
        }
    }
}

/// Errors returned directly from the external interface calls (spec §6),
/// as distinct from [`ReportedError`]s, which surface asynchronously through
/// the error sink.
#[derive(Debug, Clone, Error)]
pub enum SchedulerError {
    /// `unregister`/`send` named an action that was never registered, or was
    /// already unregistered.
    #[error("action {0} is not registered")]
    UnknownAction(ActionId),
    /// `send` targeted an action that was registered as a derivation.
    #[error("action {0} is not an event handler")]
    NotAnEventHandler(ActionId),
    /// The call arrived after the scheduler's owning task had already shut
    /// down.
    #[error("scheduler has shut down")]
    ShutDown,
}

/// Outcome of an [`crate::scheduler::Scheduler::idle`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleOutcome {
    /// The graph settled: `dirty` is empty and there are no outstanding
    /// commits.
    Idle,
    /// The requested timeout elapsed while commits were still draining.
    /// Scheduler state is unchanged; the caller may call `idle()` again.
    TimedOutWhileDraining {
        /// How many commits were still outstanding at the timeout.
        outstanding: usize,
    },
}
