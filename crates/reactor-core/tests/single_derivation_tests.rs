// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use reactor_core::{Action, ActionId, Cell, CellId, IdleOutcome, InMemoryPipeline, Scheduler};

/// A single registered derivation runs exactly once and the scheduler
/// reports idle with no outstanding work.
#[tokio::test]
async fn derivation_runs_once_and_settles() {
    let scheduler = Scheduler::with_pipeline(Arc::new(InMemoryPipeline::instant()));
    let runs = Arc::new(AtomicU32::new(0));
    let cell = Arc::new(Cell::new(CellId::from_raw(1), 0i64));

    let runs_for_action = Arc::clone(&runs);
    let cell_for_action = Arc::clone(&cell);
    let action = Action::derivation(ActionId::from_raw(1), move |tx| {
        runs_for_action.fetch_add(1, Ordering::SeqCst);
        cell_for_action.set(tx, 7);
        Ok(())
    });

    scheduler.register(action).await.unwrap();
    assert_eq!(scheduler.idle().await, IdleOutcome::Idle);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(cell.get_untracked(), 7);

    // Idling again with nothing dirty resolves immediately.
    assert_eq!(scheduler.idle().await, IdleOutcome::Idle);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

/// Unregistering an action tears down its subscription; a later write to a
/// cell it used to read no longer reruns it.
#[tokio::test]
async fn unregistered_action_no_longer_reruns() {
    let scheduler = Scheduler::with_pipeline(Arc::new(InMemoryPipeline::instant()));
    let source = Arc::new(Cell::new(CellId::from_raw(1), 0i64));
    let runs = Arc::new(AtomicU32::new(0));

    let source_for_reader = Arc::clone(&source);
    let runs_for_reader = Arc::clone(&runs);
    let reader = Action::derivation(ActionId::from_raw(1), move |tx| {
        let _ = source_for_reader.get(tx);
        runs_for_reader.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    let reader_id = scheduler.register(reader).await.unwrap();
    scheduler.idle().await;
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    scheduler.unregister(reader_id).await.unwrap();

    let source_for_writer = Arc::clone(&source);
    let writer = Action::derivation(ActionId::from_raw(2), move |tx| {
        source_for_writer.set(tx, 99);
        Ok(())
    });
    scheduler.register(writer).await.unwrap();
    scheduler.idle().await;

    assert_eq!(runs.load(Ordering::SeqCst), 1, "unregistered action must not rerun");
}
