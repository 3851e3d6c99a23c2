//! Keeps commentary audio aligned to the video.
//!
//! The video is the master clock. A long-form track is nudged back onto it
//! when it drifts; discrete clips are started and stopped as the playhead
//! crosses segment boundaries. Each tick is one reconciliation pass.

use std::future::Future;
use std::sync::Arc;

use tokio::time::timeout;
use tracing::{debug, warn};

use super::state::{SessionState, StateDelta};
use super::telemetry::{Telemetry, TelemetryEvent};
use super::time::{drift, Seconds};
use crate::commentary::lookup::active_segment_at;
use crate::commentary::types::AudioSegment;
use crate::config::SyncConfig;
use crate::media::set::audio_level;
use crate::media::{MediaElement, MediaError, MediaSet, SyncMode};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriftOutcome {
    /// Not in track mode, or the transport is paused.
    Idle,
    InSync { drift: Seconds },
    Corrected { drift: Seconds },
    /// The track had stopped and was restarted (after any correction).
    Resumed { drift: Seconds },
    /// The track has played out; left alone.
    Ended,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipOutcome {
    Idle,
    Unchanged,
    Activated(usize),
    Resumed(usize),
    /// The playhead left every segment interval.
    Cleared,
    Failed(usize),
}

pub struct SyncEngine<M> {
    media: Arc<MediaSet<M>>,
    state: SessionState,
    segments: Vec<AudioSegment>,
    config: SyncConfig,
    telemetry: Telemetry,
    // Not retried until the active segment changes
    failed_clip: Option<usize>,
}

impl<M: MediaElement> SyncEngine<M> {
    pub fn new(
        media: Arc<MediaSet<M>>,
        state: SessionState,
        segments: Vec<AudioSegment>,
        config: SyncConfig,
        telemetry: Telemetry,
    ) -> Self {
        Self {
            media,
            state,
            segments,
            config,
            telemetry,
            failed_clip: None,
        }
    }

    pub fn mode(&self) -> SyncMode {
        self.media.mode()
    }

    pub async fn on_drift_tick(&mut self) -> DriftOutcome {
        if !self.state.is_playing() {
            return DriftOutcome::Idle;
        }
        let Some(track) = self.media.track().cloned() else {
            return DriftOutcome::Idle;
        };
        if track.has_ended() {
            return DriftOutcome::Ended;
        }

        let video_time = self.media.video().current_time();
        let measured = drift(video_time, track.current_time());
        let corrected = measured > self.config.drift_threshold;
        if corrected {
            debug!(drift = measured, video_time, "track drifted, snapping to video");
            track.set_current_time(video_time);
            self.telemetry.record(TelemetryEvent::DriftCorrected {
                drift_ms: (measured * 1_000.0).round() as u64,
            });
        }

        if track.is_paused() && !track.has_ended() {
            return match self.settle(track.play()).await {
                Ok(()) if !self.still_playing(&track) => DriftOutcome::Idle,
                Ok(()) => {
                    debug!("commentary track resumed");
                    self.telemetry.record(TelemetryEvent::TrackResumed);
                    DriftOutcome::Resumed { drift: measured }
                }
                Err(e) => {
                    warn!("commentary track failed to resume: {}", e);
                    DriftOutcome::Failed
                }
            };
        }

        if corrected {
            DriftOutcome::Corrected { drift: measured }
        } else {
            DriftOutcome::InSync { drift: measured }
        }
    }

    pub async fn on_clip_tick(&mut self) -> ClipOutcome {
        if self.media.mode() != SyncMode::Clips || !self.state.is_playing() {
            return ClipOutcome::Idle;
        }

        let time = self.media.video().current_time();
        let target = active_segment_at(&self.segments, time);
        let pointer = self.state.active_segment();

        if target == pointer {
            return match target {
                Some(index) if self.failed_clip != Some(index) => self.resume_clip(index).await,
                _ => ClipOutcome::Unchanged,
            };
        }

        self.stop_clips_except(target);
        self.failed_clip = None;
        match target {
            Some(index) => self.activate(index).await,
            None => {
                self.state.reduce(StateDelta::SegmentCleared);
                ClipOutcome::Cleared
            }
        }
    }

    async fn activate(&mut self, index: usize) -> ClipOutcome {
        // Pointer first, so a tick racing this play sees the segment as taken.
        self.state.reduce(StateDelta::SegmentActivated(index));

        let Some(clip) = self.media.clip(index).cloned() else {
            warn!(index, "no clip loaded for segment, continuing silently");
            return self.clip_failed(index);
        };

        let transport = self.state.transport();
        clip.set_current_time(0.0);
        clip.set_volume(audio_level(transport.volume));
        clip.set_muted(transport.is_muted);

        match self.settle(clip.play()).await {
            Ok(()) if !self.still_playing(&clip) => ClipOutcome::Unchanged,
            Ok(()) => {
                debug!(index, "clip activated");
                self.telemetry.record(TelemetryEvent::ClipActivated { index });
                ClipOutcome::Activated(index)
            }
            Err(MediaError::Aborted) => {
                debug!(index, "clip start interrupted by the transport");
                ClipOutcome::Unchanged
            }
            Err(e) => {
                warn!(index, "clip failed to start: {}", e);
                self.clip_failed(index)
            }
        }
    }

    /// The active clip was paused by the transport mid-utterance.
    async fn resume_clip(&mut self, index: usize) -> ClipOutcome {
        let Some(clip) = self.media.clip(index).cloned() else {
            return ClipOutcome::Unchanged;
        };
        if !clip.is_paused() || clip.has_ended() {
            return ClipOutcome::Unchanged;
        }

        match self.settle(clip.play()).await {
            Ok(()) if !self.still_playing(&clip) => ClipOutcome::Unchanged,
            Ok(()) => ClipOutcome::Resumed(index),
            Err(MediaError::Aborted) => ClipOutcome::Unchanged,
            Err(e) => {
                warn!(index, "clip failed to resume: {}", e);
                self.clip_failed(index)
            }
        }
    }

    fn stop_clips_except(&self, keep: Option<usize>) {
        for (index, clip) in self.media.clips().iter().enumerate() {
            if Some(index) == keep {
                continue;
            }
            if let Some(clip) = clip {
                clip.pause();
                clip.set_current_time(0.0);
            }
        }
    }

    fn clip_failed(&mut self, index: usize) -> ClipOutcome {
        self.failed_clip = Some(index);
        self.telemetry.record(TelemetryEvent::ClipFailed { index });
        ClipOutcome::Failed(index)
    }

    /// The transport may have paused while a play request was settling; an
    /// element that started anyway is silenced again.
    fn still_playing(&self, element: &M) -> bool {
        if self.state.is_playing() {
            return true;
        }
        debug!("transport paused while audio was starting");
        element.pause();
        false
    }

    /// Bound a play request by the lock ceiling so a promise that never
    /// settles cannot wedge the reconciliation loop.
    async fn settle(
        &self,
        play: impl Future<Output = Result<(), MediaError>>,
    ) -> Result<(), MediaError> {
        match timeout(self.config.lock_ceiling(), play).await {
            Ok(result) => result,
            Err(_) => Err(MediaError::PlayRejected("play request never settled".into())),
        }
    }
}
