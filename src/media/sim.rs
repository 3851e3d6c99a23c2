//! Clock-driven stand-in for a browser media element.
//!
//! Runs on the tokio clock, so a paused test runtime advances it
//! deterministically. Used by the CLI's headless viewer and by the tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use super::element::{MediaElement, MediaError, MediaLoader};
use crate::kernel::time::Seconds;

#[derive(Debug)]
struct SimInner {
    // Position at `anchor`; the live position while paused
    position: Seconds,
    anchor: Option<Instant>,
    duration: Option<Seconds>,
    volume: f64,
    muted: bool,
    // Bumped by pause(); a play request that sees it move is aborted
    generation: u64,
    rejection: Option<String>,
    stall: bool,
    play_calls: u32,
}

#[derive(Debug)]
pub struct SimulatedElement {
    label: String,
    play_latency: Duration,
    inner: Mutex<SimInner>,
}

impl SimulatedElement {
    pub fn new(label: impl Into<String>, duration: Option<Seconds>) -> Self {
        Self {
            label: label.into(),
            play_latency: Duration::ZERO,
            inner: Mutex::new(SimInner {
                position: 0.0,
                anchor: None,
                duration,
                volume: 1.0,
                muted: false,
                generation: 0,
                rejection: None,
                stall: false,
                play_calls: 0,
            }),
        }
    }

    /// Time a play request takes to settle.
    pub fn with_play_latency(mut self, latency: Duration) -> Self {
        self.play_latency = latency;
        self
    }

    /// Reject every play request until cleared.
    pub fn reject_play(&self, reason: impl Into<String>) {
        self.lock().rejection = Some(reason.into());
    }

    pub fn clear_rejection(&self) {
        self.lock().rejection = None;
    }

    /// Make play requests hang forever, like a promise that never settles.
    pub fn stall_play(&self, stall: bool) {
        self.lock().stall = stall;
    }

    pub fn set_duration(&self, duration: Option<Seconds>) {
        self.lock().duration = duration;
    }

    pub fn play_calls(&self) -> u32 {
        self.lock().play_calls
    }

    pub fn is_playing(&self) -> bool {
        !self.is_paused()
    }

    fn lock(&self) -> MutexGuard<'_, SimInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SimInner {
    fn live_position(&self, now: Instant) -> Seconds {
        let position = match self.anchor {
            Some(anchor) => self.position + now.saturating_duration_since(anchor).as_secs_f64(),
            None => self.position,
        };
        match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    fn ended(&self, now: Instant) -> bool {
        matches!(self.duration, Some(d) if self.live_position(now) >= d)
    }
}

impl MediaElement for SimulatedElement {
    async fn play(&self) -> Result<(), MediaError> {
        let (generation, stall) = {
            let mut inner = self.lock();
            inner.play_calls += 1;
            if let Some(reason) = inner.rejection.clone() {
                return Err(MediaError::PlayRejected(format!("{}: {}", self.label, reason)));
            }
            (inner.generation, inner.stall)
        };

        if stall {
            std::future::pending::<()>().await;
        }
        if !self.play_latency.is_zero() {
            tokio::time::sleep(self.play_latency).await;
        }

        let now = Instant::now();
        let mut inner = self.lock();
        if inner.generation != generation {
            return Err(MediaError::Aborted);
        }
        if inner.ended(now) {
            inner.position = 0.0;
            inner.anchor = None;
        }
        if inner.anchor.is_none() {
            inner.anchor = Some(now);
        }
        Ok(())
    }

    fn pause(&self) {
        let now = Instant::now();
        let mut inner = self.lock();
        inner.position = inner.live_position(now);
        inner.anchor = None;
        inner.generation += 1;
    }

    fn is_paused(&self) -> bool {
        let inner = self.lock();
        inner.anchor.is_none() || inner.ended(Instant::now())
    }

    fn has_ended(&self) -> bool {
        self.lock().ended(Instant::now())
    }

    fn current_time(&self) -> Seconds {
        self.lock().live_position(Instant::now())
    }

    fn set_current_time(&self, seconds: Seconds) {
        let now = Instant::now();
        let mut inner = self.lock();
        let mut target = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        if let Some(duration) = inner.duration {
            target = target.min(duration);
        }
        inner.position = target;
        if inner.anchor.is_some() {
            inner.anchor = Some(now);
        }
    }

    fn duration(&self) -> Option<Seconds> {
        self.lock().duration
    }

    fn volume(&self) -> f64 {
        self.lock().volume
    }

    fn set_volume(&self, volume: f64) {
        self.lock().volume = volume.clamp(0.0, 1.0);
    }

    fn is_muted(&self) -> bool {
        self.lock().muted
    }

    fn set_muted(&self, muted: bool) {
        self.lock().muted = muted;
    }
}

/// Loads every locator as a simulated clip of a fixed length.
#[derive(Debug, Clone)]
pub struct SimulatedLoader {
    clip_duration: Seconds,
    play_latency: Duration,
    missing: HashSet<String>,
}

impl SimulatedLoader {
    pub fn new(clip_duration: Seconds) -> Self {
        Self {
            clip_duration,
            play_latency: Duration::ZERO,
            missing: HashSet::new(),
        }
    }

    /// Time every loaded clip takes to start.
    pub fn with_play_latency(mut self, latency: Duration) -> Self {
        self.play_latency = latency;
        self
    }

    /// Make `locator` fail to load.
    pub fn with_missing(mut self, locator: impl Into<String>) -> Self {
        self.missing.insert(locator.into());
        self
    }
}

impl MediaLoader for SimulatedLoader {
    type Element = SimulatedElement;

    fn load(&self, locator: &str) -> Result<Arc<SimulatedElement>, MediaError> {
        if self.missing.contains(locator) {
            return Err(MediaError::LoadFailed(locator.to_string()));
        }
        Ok(Arc::new(
            SimulatedElement::new(locator, Some(self.clip_duration)).with_play_latency(self.play_latency),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn playhead_follows_the_clock() {
        let video = SimulatedElement::new("video", Some(10.0));
        video.play().await.unwrap();
        tokio::time::advance(Duration::from_millis(2_500)).await;
        assert!((video.current_time() - 2.5).abs() < 1e-9);

        video.pause();
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!((video.current_time() - 2.5).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn reaching_the_end_stops_playback() {
        let clip = SimulatedElement::new("clip", Some(1.0));
        clip.play().await.unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(clip.has_ended());
        assert!(clip.is_paused());
        assert_eq!(clip.current_time(), 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_aborts_a_pending_play() {
        let video = Arc::new(
            SimulatedElement::new("video", Some(10.0)).with_play_latency(Duration::from_millis(50)),
        );
        let pending = {
            let video = video.clone();
            tokio::spawn(async move { video.play().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        video.pause();

        assert_eq!(pending.await.unwrap(), Err(MediaError::Aborted));
        assert!(video.is_paused());
    }

    #[tokio::test]
    async fn rejection_is_reported() {
        let video = SimulatedElement::new("video", None);
        video.reject_play("autoplay blocked");
        assert_eq!(
            video.play().await,
            Err(MediaError::PlayRejected("video: autoplay blocked".into()))
        );
        video.clear_rejection();
        assert!(video.play().await.is_ok());
        assert_eq!(video.play_calls(), 2);
    }
}
