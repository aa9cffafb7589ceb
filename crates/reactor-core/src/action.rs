// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Actions: the invocable units the scheduler drives to a fixpoint (spec
//! §3 "Action").

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::ids::ActionId;
use crate::tx::Transaction;

/// Error an action's implementation reports back through the error channel
/// (spec §7 `ActionFault`).
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ActionError(pub String);

impl ActionError {
    /// Builds an [`ActionError`] from any displayable cause.
    pub fn new(cause: impl fmt::Display) -> Self {
        Self(cause.to_string())
    }
}

/// Outcome of one action invocation, as seen by the runner.
pub type ActionResult = Result<(), ActionError>;

/// Consulted per run by the settle loop (spec §6 "Validity source").
///
/// An action whose recipe has been torn down reports `false`; the runner
/// skips it without opening a transaction and marks it for cleanup.
pub trait Validity: Send + Sync + 'static {
    /// Whether this action may still execute.
    fn is_valid(&self) -> bool;
}

/// A [`Validity`] that is always valid, used by actions with no owning
/// recipe to tear down (e.g. the demo binary's top-level derivations).
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysValid;

impl Validity for AlwaysValid {
    fn is_valid(&self) -> bool {
        true
    }
}

/// The body of one action. Derivations and event handlers both reduce to
/// "run some code under a transaction"; the distinction the spec draws is
/// only in how they're triggered — [`crate::scheduler::Scheduler::register`]
/// for a derivation, [`crate::scheduler::Scheduler::send`] for an event
/// handler's payload.
pub(crate) enum ActionBody {
    Derivation(Box<dyn Fn(&Transaction) -> ActionResult + Send + Sync>),
    EventHandler(Box<dyn Fn(&Transaction, Box<dyn Any + Send>) -> ActionResult + Send + Sync>),
}

impl fmt::Debug for ActionBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Derivation(_) => f.write_str("ActionBody::Derivation"),
            Self::EventHandler(_) => f.write_str("ActionBody::EventHandler"),
        }
    }
}

/// A registerable unit of reactive work: identity, implementation, and
/// validity predicate (spec §3 "Action").
pub struct Action {
    pub(crate) id: ActionId,
    pub(crate) body: ActionBody,
    pub(crate) validity: Arc<dyn Validity>,
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("id", &self.id)
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

impl Action {
    /// Builds a reactive derivation: re-runs whenever a cell it last read
    /// changes, until the graph settles.
    pub fn derivation(
        id: ActionId,
        body: impl Fn(&Transaction) -> ActionResult + Send + Sync + 'static,
    ) -> Self {
        Self {
            id,
            body: ActionBody::Derivation(Box::new(body)),
            validity: Arc::new(AlwaysValid),
        }
    }

    /// Builds an event handler: invoked once per payload passed to
    /// [`crate::scheduler::Scheduler::send`].
    ///
    /// `P` must match the payload type passed to `send` for this action's
    /// identity; a mismatch surfaces as an [`ActionError`] rather than a
    /// panic (see `crate::scheduler`).
    pub fn event_handler<P, F>(id: ActionId, body: F) -> Self
    where
        P: Send + 'static,
        F: Fn(&Transaction, P) -> ActionResult + Send + Sync + 'static,
    {
        let body = move |tx: &Transaction, payload: Box<dyn Any + Send>| match payload.downcast::<P>() {
            Ok(payload) => body(tx, *payload),
            Err(_) => Err(ActionError::new(
                "event payload type did not match the handler's registered type",
            )),
        };
        Self {
            id,
            body: ActionBody::EventHandler(Box::new(body)),
            validity: Arc::new(AlwaysValid),
        }
    }

    /// Overrides this action's validity predicate (default: always valid).
    #[must_use]
    pub fn with_validity(mut self, validity: Arc<dyn Validity>) -> Self {
        self.validity = validity;
        self
    }

    /// This action's stable identity.
    #[must_use]
    pub const fn id(&self) -> ActionId {
        self.id
    }

    /// Whether this action is a derivation or an event handler.
    #[must_use]
    pub(crate) const fn is_event_handler(&self) -> bool {
        matches!(self.body, ActionBody::EventHandler(_))
    }
}
