// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use reactor_core::{Action, ActionId, Cell, CellId, IdleOutcome, InMemoryPipeline, Scheduler};

/// One event payload writes `n` independent cells; `n` independent
/// derivations each depend on exactly one of them. A single `send` must
/// fan out to every dependent before `idle` resolves — modeling the
/// single-event-fans-out-to-dozens-of-commits case.
#[tokio::test]
async fn single_event_fans_out_to_many_dependents() {
    const N: usize = 40;

    let scheduler = Scheduler::with_pipeline(Arc::new(InMemoryPipeline::instant()));
    let sources: Vec<Arc<Cell<i64>>> = (0..N)
        .map(|i| Arc::new(Cell::new(CellId::from_raw(i as u64 + 1), 0i64)))
        .collect();
    let reruns = Arc::new(AtomicU32::new(0));

    for (i, source) in sources.iter().enumerate() {
        let source = Arc::clone(source);
        let reruns = Arc::clone(&reruns);
        let reader = Action::derivation(ActionId::from_raw(1000 + i as u64), move |tx| {
            let _ = source.get(tx);
            reruns.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        scheduler.register(reader).await.unwrap();
    }
    assert_eq!(scheduler.idle().await, IdleOutcome::Idle);
    assert_eq!(reruns.load(Ordering::SeqCst), N as u32, "initial registration run");

    let sources_for_handler = sources.clone();
    let pusher = Action::event_handler(ActionId::from_raw(1), move |tx, _payload: ()| {
        for (i, source) in sources_for_handler.iter().enumerate() {
            source.set(tx, i as i64 + 1);
        }
        Ok(())
    });
    let pusher_id = scheduler.register(pusher).await.unwrap();

    scheduler.send(pusher_id, ()).await.unwrap();
    assert_eq!(scheduler.idle().await, IdleOutcome::Idle);

    assert_eq!(reruns.load(Ordering::SeqCst), 2 * N as u32, "every dependent reran once");
    for (i, source) in sources.iter().enumerate() {
        assert_eq!(source.get_untracked(), i as i64 + 1);
    }
}
