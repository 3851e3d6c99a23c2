//! Playback telemetry.
//!
//! Telemetry is a READ-ONLY side-effect layer. It is never read inside
//! transport or sync decisions; it exists for observability and tests.

pub mod event;
pub mod metrics;
pub mod recorder;

pub use event::{OperationKind, TelemetryEvent};
pub use metrics::TelemetrySnapshot;
pub use recorder::{Telemetry, TelemetryRecorder};
