// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use reactor_core::{ErrorSink, ReportedError};

/// An [`ErrorSink`] that records every report it receives, for tests that
/// need to assert an error *did* or *did not* surface.
#[derive(Debug, Default, Clone)]
pub struct RecordingErrorSink {
    reports: Arc<Mutex<Vec<ReportedError>>>,
}

impl RecordingErrorSink {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots everything reported so far.
    pub fn reports(&self) -> Vec<ReportedError> {
        self.reports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl ErrorSink for RecordingErrorSink {
    fn report(&self, error: &ReportedError) {
        self.reports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(error.clone());
    }
}
