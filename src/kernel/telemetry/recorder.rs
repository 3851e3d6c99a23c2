use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use super::event::TelemetryEvent;
use super::metrics::{compute_snapshot, TelemetrySnapshot};

const MAX_EVENTS: usize = 10_000;

#[derive(Debug)]
pub struct TelemetryRecorder {
    buffer: VecDeque<TelemetryEvent>,
}

impl Default for TelemetryRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryRecorder {
    pub fn new() -> Self {
        Self {
            buffer: VecDeque::with_capacity(MAX_EVENTS),
        }
    }

    pub fn record(&mut self, event: TelemetryEvent) {
        if self.buffer.len() >= MAX_EVENTS {
            self.buffer.pop_front();
        }
        self.buffer.push_back(event);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        compute_snapshot(&self.buffer)
    }

    pub fn events(&self) -> impl Iterator<Item = &TelemetryEvent> {
        self.buffer.iter()
    }
}

/// Shared recorder handle for the transport and the sync engine.
#[derive(Debug, Clone, Default)]
pub struct Telemetry {
    recorder: Arc<Mutex<TelemetryRecorder>>,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: TelemetryEvent) {
        self.recorder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(event);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.recorder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }
}
