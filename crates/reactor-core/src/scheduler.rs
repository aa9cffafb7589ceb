// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The scheduler: settle loop, idle barrier, and the external interface
//! (spec §4.4, §4.5, §5, §6).
//!
//! All scheduler state lives on one owning execution context, realized here
//! as a single Tokio task running an event loop fed by an `mpsc` channel.
//! [`Scheduler`] is a thin, `Clone`-free handle: every public method sends a
//! [`Command`] and awaits a reply, so commit continuations and external
//! stimuli (`register`/`unregister`/`send`/`idle`) are always messages into
//! that loop, never direct mutation from another task.

use std::any::Any;
use std::collections::{BTreeSet, VecDeque};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use rustc_hash::{FxHashMap, FxHashSet};
use tokio::sync::{mpsc, oneshot};

use crate::action::{Action, ActionBody, ActionResult};
use crate::config::SchedulerConfig;
use crate::deps::DependencyIndex;
use crate::error::{ErrorSink, IdleOutcome, ReportedError, SchedulerError, TracingErrorSink};
use crate::ids::{ActionId, CellId, TxId};
use crate::pipeline::{CommitOutcome, Pipeline};
use crate::tx::{PipelineTransactionFactory, Transaction, TransactionFactory};

enum Command {
    Register {
        action: Action,
        reply: oneshot::Sender<ActionId>,
    },
    Unregister {
        action: ActionId,
        reply: oneshot::Sender<Result<(), SchedulerError>>,
    },
    Send {
        action: ActionId,
        payload: Box<dyn Any + Send>,
        reply: oneshot::Sender<Result<(), SchedulerError>>,
    },
    CommitResolved {
        action: ActionId,
        tx: TxId,
        outcome: CommitOutcome,
    },
    Idle {
        timeout: Option<Duration>,
        reply: oneshot::Sender<IdleOutcome>,
    },
}

struct ActionEntry {
    action: Action,
    last_writes: FxHashSet<CellId>,
    registration_order: u64,
    pending_events: VecDeque<Box<dyn Any + Send>>,
}

struct IdleWaiter {
    reply: oneshot::Sender<IdleOutcome>,
    deadline: Option<tokio::time::Instant>,
}

struct SchedulerActor<F: TransactionFactory> {
    config: SchedulerConfig,
    tx_factory: F,
    error_sink: Arc<dyn ErrorSink>,
    self_tx: mpsc::UnboundedSender<Command>,
    actions: FxHashMap<ActionId, ActionEntry>,
    deps: DependencyIndex,
    dirty: FxHashSet<ActionId>,
    pending: FxHashSet<ActionId>,
    retries: FxHashMap<ActionId, u32>,
    outstanding: FxHashSet<TxId>,
    next_registration_order: u64,
    idle_waiters: Vec<IdleWaiter>,
}

impl<F: TransactionFactory> SchedulerActor<F> {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        loop {
            let next_deadline = self.idle_waiters.iter().filter_map(|w| w.deadline).min();
            if let Some(deadline) = next_deadline {
                tokio::select! {
                    maybe_cmd = commands.recv() => {
                        match maybe_cmd {
                            Some(cmd) => self.handle(cmd),
                            None => break,
                        }
                    }
                    () = tokio::time::sleep_until(deadline) => {
                        self.fire_expired_idle_waiters();
                    }
                }
            } else {
                match commands.recv().await {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                }
            }
        }
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Register { action, reply } => {
                let id = action.id();
                let registration_order = self.next_registration_order;
                self.next_registration_order += 1;
                self.actions.insert(
                    id,
                    ActionEntry {
                        action,
                        last_writes: FxHashSet::default(),
                        registration_order,
                        pending_events: VecDeque::new(),
                    },
                );
                self.dirty.insert(id);
                self.run_settle_to_fixpoint();
                let _ = reply.send(id);
            }
            Command::Unregister { action, reply } => {
                let result = if self.actions.remove(&action).is_some() {
                    self.deps.unsubscribe(action);
                    self.dirty.remove(&action);
                    self.pending.remove(&action);
                    self.retries.remove(&action);
                    Ok(())
                } else {
                    Err(SchedulerError::UnknownAction(action))
                };
                let _ = reply.send(result);
            }
            Command::Send {
                action,
                payload,
                reply,
            } => {
                let result = match self.actions.get_mut(&action) {
                    None => Err(SchedulerError::UnknownAction(action)),
                    Some(entry) if !entry.action.is_event_handler() => {
                        Err(SchedulerError::NotAnEventHandler(action))
                    }
                    Some(entry) => {
                        entry.pending_events.push_back(payload);
                        self.dirty.insert(action);
                        Ok(())
                    }
                };
                if result.is_ok() {
                    self.run_settle_to_fixpoint();
                }
                let _ = reply.send(result);
            }
            Command::CommitResolved { action, tx, outcome } => {
                self.outstanding.remove(&tx);
                self.handle_commit_outcome(action, tx, outcome);
                self.run_settle_to_fixpoint();
            }
            Command::Idle { timeout, reply } => {
                let effective = timeout.or_else(|| self.config.default_idle_timeout());
                let deadline = effective.map(|d| tokio::time::Instant::now() + d);
                self.idle_waiters.push(IdleWaiter { reply, deadline });
            }
        }
        self.check_idle_waiters();
    }

    fn handle_commit_outcome(&mut self, action: ActionId, tx: TxId, outcome: CommitOutcome) {
        match outcome {
            CommitOutcome::Ok => {
                crate::telemetry::commit_resolved(action, tx, "ok");
                self.retries.remove(&action);
            }
            CommitOutcome::StaleRead => {
                crate::telemetry::commit_resolved(action, tx, "stale-read");
                let count = self.retries.entry(action).or_insert(0);
                *count += 1;
                if *count > self.config.max_reactive_retries() {
                    let retries = *count;
                    self.retries.remove(&action);
                    self.error_sink
                        .report(&ReportedError::RetriesExhausted { action, retries });
                } else if self.actions.contains_key(&action) {
                    crate::telemetry::retry_scheduled(action, *count);
                    self.dirty.insert(action);
                }
            }
            CommitOutcome::Rejected { reason } => {
                crate::telemetry::commit_resolved(action, tx, "rejected");
                self.retries.remove(&action);
                self.error_sink
                    .report(&ReportedError::CommitRejected { action, reason });
            }
        }
    }

    fn check_idle_waiters(&mut self) {
        if self.dirty.is_empty() && self.outstanding.is_empty() && !self.idle_waiters.is_empty() {
            crate::telemetry::idle_resolved(0);
            for waiter in self.idle_waiters.drain(..) {
                let _ = waiter.reply.send(IdleOutcome::Idle);
            }
        }
    }

    fn fire_expired_idle_waiters(&mut self) {
        let now = tokio::time::Instant::now();
        let outstanding = self.outstanding.len();
        let (expired, remaining): (Vec<_>, Vec<_>) = self
            .idle_waiters
            .drain(..)
            .partition(|w| w.deadline.is_some_and(|d| d <= now));
        self.idle_waiters = remaining;
        for waiter in expired {
            let _ = waiter
                .reply
                .send(IdleOutcome::TimedOutWhileDraining { outstanding });
        }
    }

    /// Drains `dirty` to a fixpoint, one topologically-ordered pass per
    /// iteration (spec §4.5). Bounded by `max_settle_iterations`; a residual
    /// non-empty `dirty` at the cap (cyclic graphs, or a pathologically long
    /// dependency chain) reports `IterationCapExceeded` and abandons the
    /// remaining dirty set rather than looping forever.
    ///
    /// `pending` mirrors the spec's scheduler-state set of the same name: an
    /// action from this pass's batch only actually runs if it is still
    /// absent from `dirty` at the moment its turn in `order` comes up. An
    /// earlier action in the same pass can write a cell this one reads and
    /// re-add it to `dirty` before we get to it — running it anyway would
    /// execute it twice for one settled input, doubling its commit. Letting
    /// it sit in `dirty` instead means it runs once, in the next pass.
    fn run_settle_to_fixpoint(&mut self) {
        let mut iteration = 0u32;
        while !self.dirty.is_empty() {
            iteration += 1;
            if iteration > self.config.max_settle_iterations() {
                self.error_sink.report(&ReportedError::IterationCapExceeded {
                    max_iterations: self.config.max_settle_iterations(),
                });
                self.dirty.clear();
                self.pending.clear();
                break;
            }

            let batch: FxHashSet<ActionId> = std::mem::take(&mut self.dirty);
            self.pending.extend(batch.iter().copied());
            crate::telemetry::settle_iteration(iteration, batch.len());
            let order = self.topological_order(&batch);
            for action_id in order {
                if self.pending.contains(&action_id) && !self.dirty.contains(&action_id) {
                    self.run_action(action_id);
                }
            }
        }
        self.pending.clear();
    }

    /// Orders `batch` so that if action `a`'s last run wrote a cell action
    /// `b` currently subscribes to, `a` precedes `b`. Ties break on
    /// registration order for determinism. Cycles within `batch` are
    /// tolerated: any nodes Kahn's algorithm can't resolve are appended in
    /// stable registration order, letting the iteration cap (not this
    /// function) be the thing that bounds cyclic graphs.
    fn topological_order(&self, batch: &FxHashSet<ActionId>) -> Vec<ActionId> {
        let mut in_degree: FxHashMap<ActionId, u32> = batch.iter().map(|&a| (a, 0)).collect();
        let mut out_edges: FxHashMap<ActionId, FxHashSet<ActionId>> = FxHashMap::default();

        for &a in batch {
            let Some(entry) = self.actions.get(&a) else {
                continue;
            };
            let mut targets = FxHashSet::default();
            for &cell in &entry.last_writes {
                for &dependent in self.deps.dependents(cell) {
                    if dependent != a && batch.contains(&dependent) {
                        targets.insert(dependent);
                    }
                }
            }
            for &t in &targets {
                if let Some(d) = in_degree.get_mut(&t) {
                    *d += 1;
                }
            }
            out_edges.insert(a, targets);
        }

        let reg_order = |id: ActionId| -> u64 {
            self.actions.get(&id).map_or(u64::MAX, |e| e.registration_order)
        };

        let mut ready: BTreeSet<(u64, ActionId)> = in_degree
            .iter()
            .filter(|&(_, &degree)| degree == 0)
            .map(|(&a, _)| (reg_order(a), a))
            .collect();

        let mut order = Vec::with_capacity(batch.len());
        while let Some(&(order_key, action)) = ready.iter().next() {
            ready.remove(&(order_key, action));
            order.push(action);
            if let Some(targets) = out_edges.get(&action) {
                for &t in targets {
                    if let Some(d) = in_degree.get_mut(&t) {
                        *d -= 1;
                        if *d == 0 {
                            ready.insert((reg_order(t), t));
                        }
                    }
                }
            }
        }

        if order.len() < batch.len() {
            let ordered: FxHashSet<ActionId> = order.iter().copied().collect();
            let mut remaining: Vec<ActionId> = batch
                .iter()
                .copied()
                .filter(|a| !ordered.contains(a))
                .collect();
            remaining.sort_by_key(|&a| reg_order(a));
            order.extend(remaining);
        }

        order
    }

    /// Runner phases 1-2 (spec §4.4): validity check, then either pop the
    /// next queued event payload or run the derivation body.
    fn run_action(&mut self, action_id: ActionId) {
        let Some(is_valid) = self
            .actions
            .get(&action_id)
            .map(|e| e.action.validity.is_valid())
        else {
            return;
        };
        if !is_valid {
            self.deps.unsubscribe(action_id);
            self.actions.remove(&action_id);
            self.retries.remove(&action_id);
            return;
        }

        let tx = self.tx_factory.open_transaction();
        let is_event_handler = self.actions[&action_id].action.is_event_handler();

        let outcome: ActionResult = if is_event_handler {
            let Some(payload) = self
                .actions
                .get_mut(&action_id)
                .and_then(|e| e.pending_events.pop_front())
            else {
                return;
            };
            let ActionBody::EventHandler(body) = &self.actions[&action_id].action.body else {
                return;
            };
            body(&tx, payload)
        } else {
            let ActionBody::Derivation(body) = &self.actions[&action_id].action.body else {
                return;
            };
            body(&tx)
        };

        self.finish_run(action_id, tx, outcome);
    }

    /// Runner phases 3-4: post-execute (extract log, resubscribe, propagate
    /// dirty) and the fire-and-forget commit tail. The runner's own result
    /// resolves here, before the commit future is awaited anywhere (spec
    /// §4.4, §9 — commit latency never serializes behind dispatch).
    fn finish_run(&mut self, action_id: ActionId, tx: Transaction, result: ActionResult) {
        let Err(err) = result else {
            let tx_id = tx.id();
            let (log, fut) = tx.commit();
            self.deps.subscribe(action_id, &log);

            let mut newly_dirty = FxHashSet::default();
            for &cell in log.writes() {
                for &dependent in self.deps.dependents(cell) {
                    if dependent != action_id {
                        newly_dirty.insert(dependent);
                    }
                }
            }
            if let Some(entry) = self.actions.get_mut(&action_id) {
                entry.last_writes = log.writes().clone();
                if !entry.pending_events.is_empty() {
                    newly_dirty.insert(action_id);
                }
            }
            self.dirty.extend(newly_dirty);

            self.outstanding.insert(tx_id);
            let reply_tx = self.self_tx.clone();
            tokio::spawn(async move {
                let outcome = fut.await;
                let _ = reply_tx.send(Command::CommitResolved {
                    action: action_id,
                    tx: tx_id,
                    outcome,
                });
            });
            return;
        };

        self.error_sink.report(&ReportedError::ActionFault {
            action: action_id,
            message: err.0,
        });
        // A faulted event handler still owes a run to any payload `send()`
        // queued behind the one that just faulted — mirror the success
        // path's re-dirty so those payloads aren't stranded.
        if self
            .actions
            .get(&action_id)
            .is_some_and(|entry| !entry.pending_events.is_empty())
        {
            self.dirty.insert(action_id);
        }
    }
}

/// A handle to a running scheduler. Cheap to clone-by-hand (it's just a
/// channel sender), but doesn't derive `Clone` itself since callers are
/// expected to share one `Scheduler` behind an `Arc` the way they'd share
/// any other runtime handle.
///
/// Generic over the [`TransactionFactory`] the way the teacher's `Engine` is
/// generic over its store (spec §3, "ambient addition — `SchedulerConfig`").
pub struct Scheduler<F: TransactionFactory> {
    commands: mpsc::UnboundedSender<Command>,
    _factory: PhantomData<F>,
}

impl<F: TransactionFactory> Scheduler<F> {
    /// Starts a scheduler backed by `factory`, using default configuration
    /// and a [`TracingErrorSink`].
    #[must_use]
    pub fn new(factory: F) -> Self {
        Self::with_config(factory, SchedulerConfig::default(), Arc::new(TracingErrorSink))
    }

    /// Starts a scheduler with explicit configuration and error sink.
    #[must_use]
    pub fn with_config(factory: F, config: SchedulerConfig, error_sink: Arc<dyn ErrorSink>) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let actor = SchedulerActor {
            config,
            tx_factory: factory,
            error_sink,
            self_tx: commands_tx.clone(),
            actions: FxHashMap::default(),
            deps: DependencyIndex::new(),
            dirty: FxHashSet::default(),
            pending: FxHashSet::default(),
            retries: FxHashMap::default(),
            outstanding: FxHashSet::default(),
            next_registration_order: 0,
            idle_waiters: Vec::new(),
        };
        tokio::spawn(actor.run(commands_rx));
        Self {
            commands: commands_tx,
            _factory: PhantomData,
        }
    }

    /// Registers an action. Returns its identity once the scheduler has
    /// taken it up and run at least one settle pass over it.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::ShutDown`] if the scheduler's task has
    /// already exited.
    pub async fn register(&self, action: Action) -> Result<ActionId, SchedulerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::Register {
                action,
                reply: reply_tx,
            })
            .map_err(|_| SchedulerError::ShutDown)?;
        reply_rx.await.map_err(|_| SchedulerError::ShutDown)
    }

    /// Unregisters a previously-registered action, tearing down its
    /// subscriptions.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::UnknownAction`] if `action` isn't currently
    /// registered, or [`SchedulerError::ShutDown`] if the scheduler has
    /// exited.
    pub async fn unregister(&self, action: ActionId) -> Result<(), SchedulerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::Unregister {
                action,
                reply: reply_tx,
            })
            .map_err(|_| SchedulerError::ShutDown)?;
        reply_rx.await.map_err(|_| SchedulerError::ShutDown)?
    }

    /// Queues `payload` for the event handler registered as `action`,
    /// marking it dirty. Resolves once the scheduler has accepted the
    /// payload, not once the handler has run.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::UnknownAction`] if `action` isn't
    /// registered, [`SchedulerError::NotAnEventHandler`] if it was
    /// registered as a derivation, or [`SchedulerError::ShutDown`] if the
    /// scheduler has exited.
    pub async fn send<P: Send + 'static>(&self, action: ActionId, payload: P) -> Result<(), SchedulerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::Send {
                action,
                payload: Box::new(payload),
                reply: reply_tx,
            })
            .map_err(|_| SchedulerError::ShutDown)?;
        reply_rx.await.map_err(|_| SchedulerError::ShutDown)?
    }

    /// Waits until `dirty = ∅ ∧ outstandingCommits = ∅`, using the
    /// scheduler's configured default timeout, if any (spec §4.5).
    pub async fn idle(&self) -> IdleOutcome {
        self.idle_with_timeout(None).await
    }

    /// Waits until the graph settles, or `timeout` elapses while commits are
    /// still draining. Scheduler state is unchanged on timeout; the caller
    /// may call `idle` again (spec §5).
    pub async fn idle_timeout(&self, timeout: Duration) -> IdleOutcome {
        self.idle_with_timeout(Some(timeout)).await
    }

    async fn idle_with_timeout(&self, timeout: Option<Duration>) -> IdleOutcome {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .commands
            .send(Command::Idle {
                timeout,
                reply: reply_tx,
            })
            .is_err()
        {
            return IdleOutcome::Idle;
        }
        reply_rx.await.unwrap_or(IdleOutcome::Idle)
    }
}

impl Scheduler<PipelineTransactionFactory> {
    /// Convenience constructor for the common case: a scheduler that mints
    /// its own [`PipelineTransactionFactory`] around a shared [`Pipeline`].
    #[must_use]
    pub fn with_pipeline(pipeline: Arc<dyn Pipeline>) -> Self {
        Self::new(PipelineTransactionFactory::new(pipeline))
    }

    /// As [`Scheduler::with_pipeline`], with explicit configuration and
    /// error sink.
    #[must_use]
    pub fn with_pipeline_and_config(
        pipeline: Arc<dyn Pipeline>,
        config: SchedulerConfig,
        error_sink: Arc<dyn ErrorSink>,
    ) -> Self {
        Self::with_config(PipelineTransactionFactory::new(pipeline), config, error_sink)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::cell::Cell;
    use crate::pipeline::test_support::NoopPipeline;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn noop_scheduler() -> Scheduler<PipelineTransactionFactory> {
        Scheduler::with_pipeline(Arc::new(NoopPipeline))
    }

    #[tokio::test]
    async fn idle_resolves_with_no_actions() {
        let scheduler = noop_scheduler();
        assert_eq!(scheduler.idle().await, IdleOutcome::Idle);
    }

    #[tokio::test]
    async fn derivation_runs_once_on_registration_and_settles() {
        let scheduler = noop_scheduler();
        let runs = Arc::new(AtomicU32::new(0));
        let runs_clone = Arc::clone(&runs);
        let action = Action::derivation(ActionId::from_raw(1), move |_tx| {
            runs_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        scheduler.register(action).await.unwrap();
        assert_eq!(scheduler.idle().await, IdleOutcome::Idle);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn writing_a_cell_reruns_its_dependent() {
        let scheduler = noop_scheduler();
        let source = Arc::new(Cell::new(CellId::from_raw(1), 0i64));
        let derived = Arc::new(Cell::new(CellId::from_raw(2), 0i64));

        let source_for_writer = Arc::clone(&source);
        let writer = Action::derivation(ActionId::from_raw(10), move |tx| {
            source_for_writer.set(tx, 41);
            Ok(())
        });

        let (source_for_reader, derived_for_reader) = (Arc::clone(&source), Arc::clone(&derived));
        let reader = Action::derivation(ActionId::from_raw(11), move |tx| {
            let value = source_for_reader.get(tx);
            derived_for_reader.set(tx, value + 1);
            Ok(())
        });

        scheduler.register(reader).await.unwrap();
        scheduler.register(writer).await.unwrap();
        assert_eq!(scheduler.idle().await, IdleOutcome::Idle);
        assert_eq!(derived.get_untracked(), 42);
    }

    #[tokio::test]
    async fn send_runs_event_handler_once_per_payload() {
        let scheduler = noop_scheduler();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let handler = Action::event_handler(ActionId::from_raw(20), move |_tx: &Transaction, payload: i32| {
            seen_clone.lock().unwrap_or_else(|e| e.into_inner()).push(payload);
            Ok(())
        });
        let id = scheduler.register(handler).await.unwrap();
        scheduler.send(id, 1i32).await.unwrap();
        scheduler.send(id, 2i32).await.unwrap();
        assert_eq!(scheduler.idle().await, IdleOutcome::Idle);
        let collected = seen.lock().unwrap_or_else(|e| e.into_inner()).clone();
        assert_eq!(collected, vec![1, 2]);
    }

    #[tokio::test]
    async fn send_to_unknown_action_reports_unknown_action() {
        let scheduler = noop_scheduler();
        let err = scheduler.send(ActionId::from_raw(99), 1i32).await.unwrap_err();
        assert!(matches!(err, SchedulerError::UnknownAction(_)));
    }

    #[tokio::test]
    async fn send_to_derivation_reports_not_an_event_handler() {
        let scheduler = noop_scheduler();
        let action = Action::derivation(ActionId::from_raw(30), |_tx| Ok(()));
        let id = scheduler.register(action).await.unwrap();
        let err = scheduler.send(id, 1i32).await.unwrap_err();
        assert!(matches!(err, SchedulerError::NotAnEventHandler(_)));
    }

    #[tokio::test]
    async fn unregister_unknown_action_errors() {
        let scheduler = noop_scheduler();
        let err = scheduler.unregister(ActionId::from_raw(42)).await.unwrap_err();
        assert!(matches!(err, SchedulerError::UnknownAction(_)));
    }

    /// White-box: `run_action`/`finish_run` operate on a single popped
    /// payload regardless of how the queue got its backlog (normally one
    /// settle pass drains a handler's queue to empty before the next command
    /// is even read off the channel; a backlog of more than one payload can
    /// still arise, e.g. an iteration-cap abort leaves the rest of a pass
    /// un-run). Exercise `finish_run`'s fault path directly against a
    /// pre-loaded queue of two payloads to pin the re-dirty behavior without
    /// depending on the timing needed to build up that backlog through the
    /// public API.
    #[tokio::test]
    async fn faulted_event_handler_redirties_when_payloads_remain_queued() {
        let (self_tx, _self_rx) = mpsc::unbounded_channel();
        let mut actor = SchedulerActor {
            config: SchedulerConfig::default(),
            tx_factory: PipelineTransactionFactory::new(Arc::new(NoopPipeline)),
            error_sink: Arc::new(TracingErrorSink),
            self_tx,
            actions: FxHashMap::default(),
            deps: DependencyIndex::new(),
            dirty: FxHashSet::default(),
            pending: FxHashSet::default(),
            retries: FxHashMap::default(),
            outstanding: FxHashSet::default(),
            next_registration_order: 0,
            idle_waiters: Vec::new(),
        };

        let action_id = ActionId::from_raw(1);
        let handler = Action::event_handler(action_id, |_tx: &Transaction, payload: i32| {
            if payload == 0 {
                Err(crate::action::ActionError::new("boom"))
            } else {
                Ok(())
            }
        });
        actor.actions.insert(
            action_id,
            ActionEntry {
                action: handler,
                last_writes: FxHashSet::default(),
                registration_order: 0,
                pending_events: VecDeque::from(vec![
                    Box::new(0i32) as Box<dyn Any + Send>,
                    Box::new(1i32) as Box<dyn Any + Send>,
                ]),
            },
        );

        actor.run_action(action_id);

        assert!(
            actor.dirty.contains(&action_id),
            "a fault must re-dirty the action while payloads remain queued behind it"
        );
        assert_eq!(
            actor.actions[&action_id].pending_events.len(),
            1,
            "only the faulting payload should have been consumed"
        );
    }
}
