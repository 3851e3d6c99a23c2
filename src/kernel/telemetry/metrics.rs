use std::collections::VecDeque;

use super::event::TelemetryEvent;
use crate::kernel::event::OpOutcome;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub transport: TransportStats,
    pub sync: SyncStats,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportStats {
    pub completed: u64,
    pub degraded: u64,
    pub dropped: u64,
    pub lock_reclaims: u64,
    pub media_rejections: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncStats {
    pub drift_corrections: u64,
    pub max_drift_ms: u64,
    pub avg_drift_ms: f64,
    pub track_resumes: u64,
    pub clip_activations: u64,
    pub clip_failures: u64,
}

pub fn compute_snapshot(events: &VecDeque<TelemetryEvent>) -> TelemetrySnapshot {
    let mut snap = TelemetrySnapshot::default();
    let mut total_drift_ms = 0u64;

    for event in events {
        match event {
            TelemetryEvent::Operation { outcome, .. } => match outcome {
                OpOutcome::Completed => snap.transport.completed += 1,
                OpOutcome::Degraded => snap.transport.degraded += 1,
                OpOutcome::Dropped => snap.transport.dropped += 1,
            },
            TelemetryEvent::LockReclaimed { .. } => snap.transport.lock_reclaims += 1,
            TelemetryEvent::MediaRejected => snap.transport.media_rejections += 1,
            TelemetryEvent::DriftCorrected { drift_ms } => {
                snap.sync.drift_corrections += 1;
                total_drift_ms += drift_ms;
                snap.sync.max_drift_ms = snap.sync.max_drift_ms.max(*drift_ms);
            }
            TelemetryEvent::TrackResumed => snap.sync.track_resumes += 1,
            TelemetryEvent::ClipActivated { .. } => snap.sync.clip_activations += 1,
            TelemetryEvent::ClipFailed { .. } => snap.sync.clip_failures += 1,
        }
    }

    if snap.sync.drift_corrections > 0 {
        snap.sync.avg_drift_ms = total_drift_ms as f64 / snap.sync.drift_corrections as f64;
    }

    snap
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::telemetry::event::OperationKind;

    #[test]
    fn folds_counters_and_drift_average() {
        let events: VecDeque<TelemetryEvent> = vec![
            TelemetryEvent::Operation { kind: OperationKind::Seek, outcome: OpOutcome::Completed },
            TelemetryEvent::Operation { kind: OperationKind::Skip, outcome: OpOutcome::Dropped },
            TelemetryEvent::DriftCorrected { drift_ms: 400 },
            TelemetryEvent::DriftCorrected { drift_ms: 600 },
            TelemetryEvent::ClipActivated { index: 0 },
        ]
        .into();

        let snap = compute_snapshot(&events);
        assert_eq!(snap.transport.completed, 1);
        assert_eq!(snap.transport.dropped, 1);
        assert_eq!(snap.sync.drift_corrections, 2);
        assert_eq!(snap.sync.max_drift_ms, 600);
        assert_eq!(snap.sync.avg_drift_ms, 500.0);
        assert_eq!(snap.sync.clip_activations, 1);
    }
}
