use std::time::Duration;

/// Media time in seconds, as media elements report it.
pub type Seconds = f64;

/// Default cadence of the long-form track drift check.
pub const DRIFT_TICK_MS: u64 = 500;

/// Default cadence of the segment activation / time-update check.
pub const SEGMENT_TICK_MS: u64 = 100;

/// Default hold ceiling of the transport operation lock.
pub const LOCK_CEILING_MS: u64 = 2_000;

/// Clamp a requested playhead position into `[0, duration]`.
///
/// A `duration` of zero (or anything non-positive) means metadata has not
/// loaded yet; only the lower bound applies then. Non-finite input lands at 0.
pub fn clamp_time(target: Seconds, duration: Seconds) -> Seconds {
    let target = if target.is_finite() { target.max(0.0) } else { 0.0 };
    if duration > 0.0 && duration.is_finite() {
        target.min(duration)
    } else {
        target
    }
}

/// Absolute distance between two independently clocked playheads.
pub fn drift(a: Seconds, b: Seconds) -> Seconds {
    (a - b).abs()
}

/// `M:SS` display form used by the transport bar and the commentary list.
pub fn format_time(seconds: Seconds) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let minutes = (seconds / 60.0).floor() as u64;
    let rest = (seconds % 60.0).floor() as u64;
    format!("{}:{:02}", minutes, rest)
}

pub fn millis(duration: Duration) -> u64 {
    duration.as_millis().min(u64::MAX as u128) as u64
}
