use serde::{Deserialize, Serialize};

use crate::kernel::event::OpOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    TogglePlay,
    Seek,
    Skip,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryEvent {
    Operation {
        kind: OperationKind,
        outcome: OpOutcome,
    },

    /// A wedged operation lock was force-released.
    LockReclaimed {
        held_for_ms: u64,
    },

    DriftCorrected {
        drift_ms: u64,
    },

    TrackResumed,

    ClipActivated {
        index: usize,
    },

    ClipFailed {
        index: usize,
    },

    MediaRejected,
}
