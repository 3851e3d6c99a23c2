use std::sync::{Arc, Mutex, PoisonError};

use super::time::{clamp_time, Seconds};

/// Transport state as the controller owns it and the UI mirrors it.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportState {
    pub is_playing: bool,
    pub current_time: Seconds,
    /// 0 until the video's metadata has loaded.
    pub duration: Seconds,
    /// 0..=100
    pub volume: u8,
    pub is_muted: bool,
}

impl Default for TransportState {
    fn default() -> Self {
        Self {
            is_playing: false,
            current_time: 0.0,
            duration: 0.0,
            volume: 100,
            is_muted: false,
        }
    }
}

/// Strict state delta. This is the ONLY way session state mutates.
#[derive(Debug, Clone, PartialEq)]
pub enum StateDelta {
    Played,
    Paused,
    TimeUpdated(Seconds),
    DurationKnown(Seconds),
    VolumeSet(u8),
    MutedSet(bool),
    SegmentActivated(usize),
    SegmentCleared,
}

#[derive(Debug, Clone, Default)]
pub struct SharedState {
    transport: TransportState,
    active_segment: Option<usize>,
    // Monotonic version, bumped on every reduction
    pub version: u64,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pure reduction: State + Delta -> Mutated State
    pub fn reduce(&mut self, delta: StateDelta) {
        self.version += 1;

        match delta {
            StateDelta::Played => self.transport.is_playing = true,
            StateDelta::Paused => self.transport.is_playing = false,
            StateDelta::TimeUpdated(t) => {
                self.transport.current_time = clamp_time(t, self.transport.duration);
            }
            StateDelta::DurationKnown(d) => {
                if d.is_finite() && d > 0.0 {
                    self.transport.duration = d;
                    self.transport.current_time = clamp_time(self.transport.current_time, d);
                }
            }
            StateDelta::VolumeSet(v) => {
                self.transport.volume = v.min(100);
                if self.transport.volume == 0 {
                    self.transport.is_muted = true;
                }
            }
            StateDelta::MutedSet(muted) => self.transport.is_muted = muted,
            StateDelta::SegmentActivated(index) => self.active_segment = Some(index),
            StateDelta::SegmentCleared => self.active_segment = None,
        }
    }

    pub fn transport(&self) -> &TransportState {
        &self.transport
    }

    pub fn active_segment(&self) -> Option<usize> {
        self.active_segment
    }
}

/// Session-wide handle onto [`SharedState`].
///
/// Critical sections are short and synchronous; a guard is never held across
/// an `.await`.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    inner: Arc<Mutex<SharedState>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reduce(&self, delta: StateDelta) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reduce(delta);
    }

    pub fn read<T>(&self, f: impl FnOnce(&SharedState) -> T) -> T {
        f(&self.inner.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn snapshot(&self) -> SharedState {
        self.read(SharedState::clone)
    }

    pub fn transport(&self) -> TransportState {
        self.read(|s| s.transport.clone())
    }

    pub fn is_playing(&self) -> bool {
        self.read(|s| s.transport.is_playing)
    }

    pub fn active_segment(&self) -> Option<usize> {
        self.read(|s| s.active_segment)
    }
}
