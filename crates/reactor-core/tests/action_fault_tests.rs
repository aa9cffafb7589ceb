// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;

use reactor_core::{
    Action, ActionId, ErrorSink, IdleOutcome, InMemoryPipeline, Pipeline, ReportedError,
    Scheduler, SchedulerConfig,
};

use common::RecordingErrorSink;

/// An event handler must keep running later payloads after an earlier one
/// faults — a fault on one `send()` must not strand the ones sent after it,
/// even though `idle()` would otherwise see neither `dirty` nor
/// `outstandingCommits` holding the action. `reactor_core::scheduler`'s own
/// `faulted_event_handler_redirties_when_payloads_remain_queued` white-box
/// test pins the exact re-dirty mechanism against a pre-loaded queue; this
/// one exercises the same contract through the public API.
#[tokio::test]
async fn faulted_event_handler_still_runs_remaining_queued_payloads() {
    let pipeline: Arc<dyn Pipeline> = Arc::new(InMemoryPipeline::instant());
    let sink = Arc::new(RecordingErrorSink::new());
    let scheduler = Scheduler::with_pipeline_and_config(
        pipeline,
        SchedulerConfig::default(),
        Arc::clone(&sink) as Arc<dyn ErrorSink>,
    );

    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let seen_for_handler = Arc::clone(&seen);
    let handler = Action::event_handler(ActionId::from_raw(1), move |_tx, payload: i32| {
        if payload == 0 {
            return Err(reactor_core::ActionError::new("payload must be non-zero"));
        }
        seen_for_handler
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(payload);
        Ok(())
    });
    let id = scheduler.register(handler).await.unwrap();

    // Queue a faulting payload followed by two payloads that must still run.
    scheduler.send(id, 0i32).await.unwrap();
    scheduler.send(id, 1i32).await.unwrap();
    scheduler.send(id, 2i32).await.unwrap();

    assert_eq!(scheduler.idle().await, IdleOutcome::Idle);

    let collected = seen.lock().unwrap_or_else(|e| e.into_inner()).clone();
    assert_eq!(
        collected,
        vec![1, 2],
        "payloads queued behind a faulting one must still run"
    );

    let reports = sink.reports();
    let fault_count = reports
        .iter()
        .filter(|r| matches!(r, ReportedError::ActionFault { action, .. } if *action == id))
        .count();
    assert_eq!(fault_count, 1, "exactly the faulting payload should be reported");
}
