//! Transport controller: play/pause, seek, skip, volume and mute.
//!
//! Async operations are serialized through an [`OperationLock`]. A gesture
//! that arrives while another is in flight is dropped, not queued. Volume
//! and mute are synchronous and never take the lock.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use super::event::{Command, OpOutcome};
use super::lock::{Acquire, OperationLock, Ticket};
use super::state::{SessionState, StateDelta};
use super::telemetry::{OperationKind, Telemetry, TelemetryEvent};
use super::time::{clamp_time, millis, Seconds};
use crate::config::SyncConfig;
use crate::media::{MediaElement, MediaError, MediaSet};

/// Releases its hold on drop, including when the operation future is cancelled.
struct OpGuard<'a> {
    lock: &'a Mutex<OperationLock>,
    ticket: Ticket,
}

impl Drop for OpGuard<'_> {
    fn drop(&mut self) {
        let released = self
            .lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .release(self.ticket);
        if !released {
            debug!("operation settled after its lock hold was reclaimed");
        }
    }
}

pub struct TransportController<M> {
    media: Arc<MediaSet<M>>,
    state: SessionState,
    lock: Mutex<OperationLock>,
    config: SyncConfig,
    telemetry: Telemetry,
}

impl<M: MediaElement> TransportController<M> {
    pub fn new(
        media: Arc<MediaSet<M>>,
        state: SessionState,
        config: SyncConfig,
        telemetry: Telemetry,
    ) -> Self {
        let controller = Self {
            media,
            state,
            lock: Mutex::new(OperationLock::new(config.lock_ceiling())),
            config,
            telemetry,
        };
        controller.apply_levels();
        controller.refresh_duration();
        controller
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn media(&self) -> &Arc<MediaSet<M>> {
        &self.media
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    /// True while an async operation holds the lock.
    pub fn is_busy(&self) -> bool {
        self.lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_held()
    }

    pub async fn dispatch(&self, command: Command) -> OpOutcome {
        match command {
            Command::TogglePlay => self.toggle_play().await,
            Command::Seek(target) => self.seek(target).await,
            Command::Skip(delta) => self.skip(delta).await,
            Command::SeekFraction(tenths) => self.seek_to_fraction(tenths).await,
            Command::SeekStart => self.seek_to_start().await,
            Command::SeekEnd => self.seek_to_end().await,
            Command::SetVolume(volume) => {
                self.set_volume(volume);
                OpOutcome::Completed
            }
            Command::NudgeVolume(step) => {
                self.nudge_volume(step);
                OpOutcome::Completed
            }
            Command::ToggleMute => {
                self.toggle_mute();
                OpOutcome::Completed
            }
        }
    }

    pub async fn toggle_play(&self) -> OpOutcome {
        let Some(_guard) = self.begin(OperationKind::TogglePlay) else {
            return OpOutcome::Dropped;
        };

        let outcome = if self.state.is_playing() {
            self.media.pause_all();
            self.state.reduce(StateDelta::Paused);
            OpOutcome::Completed
        } else {
            self.resume_video().await
        };
        self.finish(OperationKind::TogglePlay, outcome)
    }

    pub async fn seek(&self, target: Seconds) -> OpOutcome {
        let Some(_guard) = self.begin(OperationKind::Seek) else {
            return OpOutcome::Dropped;
        };
        let outcome = self.seek_locked(target).await;
        self.finish(OperationKind::Seek, outcome)
    }

    /// Relative seek from the video's own playhead.
    pub async fn skip(&self, delta: Seconds) -> OpOutcome {
        let Some(_guard) = self.begin(OperationKind::Skip) else {
            return OpOutcome::Dropped;
        };
        let from = self.media.video().current_time();
        let outcome = self.seek_locked(from + delta).await;
        self.finish(OperationKind::Skip, outcome)
    }

    /// Seek to `tenths`/10 of the duration. Dropped while the duration is unknown.
    pub async fn seek_to_fraction(&self, tenths: u8) -> OpOutcome {
        let duration = self.refresh_duration();
        if duration <= 0.0 {
            debug!(tenths, "fractional seek ignored, duration unknown");
            return OpOutcome::Dropped;
        }
        self.seek(duration * f64::from(tenths.min(9)) / 10.0).await
    }

    pub async fn seek_to_start(&self) -> OpOutcome {
        self.seek(0.0).await
    }

    pub async fn seek_to_end(&self) -> OpOutcome {
        let duration = self.refresh_duration();
        if duration <= 0.0 {
            debug!("seek to end ignored, duration unknown");
            return OpOutcome::Dropped;
        }
        self.seek(duration).await
    }

    pub fn set_volume(&self, volume: u8) {
        let volume = volume.min(100);
        self.state.reduce(StateDelta::VolumeSet(volume));
        self.state.reduce(StateDelta::MutedSet(volume == 0));
        self.apply_levels();
    }

    /// Step the volume. Stepping up also unmutes.
    pub fn nudge_volume(&self, step: i8) {
        let current = i16::from(self.state.transport().volume);
        let volume = (current + i16::from(step)).clamp(0, 100) as u8;
        self.state.reduce(StateDelta::VolumeSet(volume));
        if step > 0 {
            self.state.reduce(StateDelta::MutedSet(false));
        }
        self.apply_levels();
    }

    pub fn toggle_mute(&self) {
        let muted = !self.state.read(|s| s.transport().is_muted);
        self.state.reduce(StateDelta::MutedSet(muted));
        self.media.apply_muted(muted);
    }

    /// Pick up the video duration once metadata is available.
    pub fn refresh_duration(&self) -> Seconds {
        let known = self.state.read(|s| s.transport().duration);
        match self.media.video().duration() {
            Some(duration) if duration.is_finite() && duration > 0.0 && duration != known => {
                info!(duration, "video duration known");
                self.state.reduce(StateDelta::DurationKnown(duration));
                duration
            }
            _ => known,
        }
    }

    /// Mirror the video playhead into session state. Playback that ran off
    /// the end of the video settles as paused.
    pub fn sync_time(&self) -> Seconds {
        self.refresh_duration();
        let video = self.media.video();
        self.state.reduce(StateDelta::TimeUpdated(video.current_time()));

        if self.state.is_playing() && video.has_ended() {
            info!("video reached the end");
            self.media.pause_all();
            self.state.reduce(StateDelta::Paused);
        }
        self.state.read(|s| s.transport().current_time)
    }

    async fn seek_locked(&self, target: Seconds) -> OpOutcome {
        let duration = self.refresh_duration();
        let target = clamp_time(target, duration);
        let was_playing = self.state.is_playing();

        if was_playing {
            self.media.pause_all();
            self.state.reduce(StateDelta::Paused);
        }
        self.media.video().set_current_time(target);
        if let Some(track) = self.media.track() {
            track.set_current_time(target);
        }
        self.state.reduce(StateDelta::TimeUpdated(target));
        self.state.reduce(StateDelta::SegmentCleared);
        debug!(target, was_playing, "seek applied");

        if was_playing {
            self.resume_video().await
        } else {
            OpOutcome::Completed
        }
    }

    /// Start the video. Session state turns to playing only once the video
    /// has actually started; a request that never settles gives up at the
    /// lock ceiling and leaves the session paused.
    async fn resume_video(&self) -> OpOutcome {
        let video = self.media.video();
        let started = match timeout(self.config.lock_ceiling(), video.play()).await {
            Ok(result) => result,
            Err(_) => {
                video.pause();
                Err(MediaError::PlayRejected("play request never settled".into()))
            }
        };

        match started {
            Ok(()) => {
                self.state.reduce(StateDelta::Played);
                OpOutcome::Completed
            }
            Err(e) => {
                warn!("video play request failed, staying paused: {}", e);
                self.telemetry.record(TelemetryEvent::MediaRejected);
                self.state.reduce(StateDelta::Paused);
                OpOutcome::Degraded
            }
        }
    }

    fn apply_levels(&self) {
        let transport = self.state.transport();
        self.media.apply_levels(
            transport.volume,
            transport.is_muted,
            self.config.video_attenuation,
        );
    }

    fn begin(&self, kind: OperationKind) -> Option<OpGuard<'_>> {
        let acquired = self
            .lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_acquire(Instant::now());

        match acquired {
            Acquire::Granted(ticket) => Some(OpGuard {
                lock: &self.lock,
                ticket,
            }),
            Acquire::Reclaimed { ticket, held_for } => {
                let held_for_ms = millis(held_for);
                warn!(?kind, held_for_ms, "transport lock held past its ceiling, force-releasing");
                self.telemetry.record(TelemetryEvent::LockReclaimed { held_for_ms });
                Some(OpGuard {
                    lock: &self.lock,
                    ticket,
                })
            }
            Acquire::Busy => {
                debug!(?kind, "transport busy, operation dropped");
                self.telemetry.record(TelemetryEvent::Operation {
                    kind,
                    outcome: OpOutcome::Dropped,
                });
                None
            }
        }
    }

    fn finish(&self, kind: OperationKind, outcome: OpOutcome) -> OpOutcome {
        self.telemetry.record(TelemetryEvent::Operation { kind, outcome });
        outcome
    }
}
