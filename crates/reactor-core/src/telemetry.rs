// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

// Telemetry helpers for JSONL logging when the `telemetry` feature is
// enabled. Manually formats JSON to avoid pulling in `serde_json` for a
// handful of fixed-shape lines (see `DESIGN.md`).

#![allow(unused_variables)]

use crate::ids::{ActionId, TxId};

#[cfg(feature = "telemetry")]
fn ts_micros() -> u128 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros()
}

#[cfg(feature = "telemetry")]
fn emit(line: &str) {
    use std::io::Write as _;
    let mut out = std::io::stdout().lock();
    let _ = out.write_all(line.as_bytes());
    let _ = out.write_all(b"\n");
}

/// Emits a settle-iteration event: one JSON line per `run_settle_to_fixpoint`
/// pass, carrying the batch size about to run.
///
/// Best-effort: a no-op entirely unless the `telemetry` feature is enabled.
pub fn settle_iteration(iteration: u32, batch_len: usize) {
    #[cfg(feature = "telemetry")]
    emit(&format!(
        r#"{{"timestamp_micros":{},"event":"settle_iteration","iteration":{iteration},"batch_len":{batch_len}}}"#,
        ts_micros()
    ));
}

/// Emits a commit-resolved event, recording the action, transaction, and
/// outcome kind.
pub fn commit_resolved(action: ActionId, tx: TxId, outcome: &str) {
    #[cfg(feature = "telemetry")]
    emit(&format!(
        r#"{{"timestamp_micros":{},"event":"commit_resolved","action":{},"tx":{},"outcome":"{outcome}"}}"#,
        ts_micros(),
        action.value(),
        tx.value(),
    ));
}

/// Emits a retry-scheduled event when a stale-read causes an action to be
/// re-dirtied.
pub fn retry_scheduled(action: ActionId, attempt: u32) {
    #[cfg(feature = "telemetry")]
    emit(&format!(
        r#"{{"timestamp_micros":{},"event":"retry_scheduled","action":{},"attempt":{attempt}}}"#,
        ts_micros(),
        action.value(),
    ));
}

/// Emits an idle-resolved event: how many commits were still outstanding at
/// resolution (always 0 for a clean resolution, but recorded for symmetry
/// with a would-be `TimedOutWhileDraining` line).
pub fn idle_resolved(outstanding: usize) {
    #[cfg(feature = "telemetry")]
    emit(&format!(
        r#"{{"timestamp_micros":{},"event":"idle_resolved","outstanding":{outstanding}}}"#,
        ts_micros()
    ));
}
