use std::sync::Arc;

use tracing::{info, warn};

use super::element::{MediaElement, MediaLoader};
use crate::commentary::types::CommentaryPayload;

/// Which audio, if any, accompanies the video for a session.
///
/// A session has a long-form track or discrete clips, never both.
#[derive(Debug)]
pub enum AudioSource<M> {
    None,
    Track(Arc<M>),
    /// One slot per audio segment; `None` where the clip failed to load.
    Clips(Vec<Option<Arc<M>>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    Captions,
    Track,
    Clips,
}

/// Video element plus the session's audio: the shared media resources.
#[derive(Debug)]
pub struct MediaSet<M> {
    video: Arc<M>,
    audio: AudioSource<M>,
}

/// Video sits beneath the commentary by this factor of the user volume.
pub const DEFAULT_VIDEO_ATTENUATION: f64 = 0.2;

pub fn video_level(volume: u8, attenuation: f64) -> f64 {
    audio_level(volume) * attenuation
}

pub fn audio_level(volume: u8) -> f64 {
    f64::from(volume.min(100)) / 100.0
}

impl<M: MediaElement> MediaSet<M> {
    pub fn new(video: Arc<M>, audio: AudioSource<M>) -> Self {
        Self { video, audio }
    }

    /// Preload the payload's audio. Clips win over a track; load failures
    /// degrade to silence for that clip (or the whole track).
    pub fn from_payload<L>(
        video: Arc<M>,
        payload: &CommentaryPayload,
        loader: &L,
        resolve: impl Fn(&str) -> String,
    ) -> Self
    where
        L: MediaLoader<Element = M>,
    {
        let audio = match (payload.clip_segments(), payload.audio_url.as_deref()) {
            (Some(segments), _) => {
                let clips: Vec<Option<Arc<M>>> = segments
                    .iter()
                    .enumerate()
                    .map(|(index, segment)| {
                        let locator = resolve(&segment.audio_ref);
                        match loader.load(&locator) {
                            Ok(clip) => Some(clip),
                            Err(e) => {
                                warn!(index, %locator, "clip failed to preload: {}", e);
                                None
                            }
                        }
                    })
                    .collect();
                info!(clips = clips.len(), "session audio: discrete clips");
                AudioSource::Clips(clips)
            }
            (None, Some(url)) => {
                let locator = resolve(url);
                match loader.load(&locator) {
                    Ok(track) => {
                        info!(%locator, "session audio: long-form track");
                        AudioSource::Track(track)
                    }
                    Err(e) => {
                        warn!(%locator, "commentary track failed to load, captions only: {}", e);
                        AudioSource::None
                    }
                }
            }
            (None, None) => AudioSource::None,
        };
        Self::new(video, audio)
    }

    pub fn video(&self) -> &Arc<M> {
        &self.video
    }

    pub fn track(&self) -> Option<&Arc<M>> {
        match &self.audio {
            AudioSource::Track(track) => Some(track),
            _ => None,
        }
    }

    pub fn clips(&self) -> &[Option<Arc<M>>] {
        match &self.audio {
            AudioSource::Clips(clips) => clips,
            _ => &[],
        }
    }

    pub fn clip(&self, index: usize) -> Option<&Arc<M>> {
        self.clips().get(index).and_then(Option::as_ref)
    }

    pub fn mode(&self) -> SyncMode {
        match self.audio {
            AudioSource::None => SyncMode::Captions,
            AudioSource::Track(_) => SyncMode::Track,
            AudioSource::Clips(_) => SyncMode::Clips,
        }
    }

    /// The track or every loaded clip.
    pub fn audio_elements(&self) -> impl Iterator<Item = &Arc<M>> {
        self.track()
            .into_iter()
            .chain(self.clips().iter().flatten())
    }

    pub fn pause_all(&self) {
        self.video.pause();
        for audio in self.audio_elements() {
            audio.pause();
        }
    }

    pub fn apply_levels(&self, volume: u8, muted: bool, attenuation: f64) {
        self.video.set_volume(video_level(volume, attenuation));
        self.video.set_muted(muted);
        let level = audio_level(volume);
        for audio in self.audio_elements() {
            audio.set_volume(level);
            audio.set_muted(muted);
        }
    }

    pub fn apply_muted(&self, muted: bool) {
        self.video.set_muted(muted);
        for audio in self.audio_elements() {
            audio.set_muted(muted);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commentary::types::AudioSegment;
    use crate::media::sim::{SimulatedElement, SimulatedLoader};

    fn video() -> Arc<SimulatedElement> {
        Arc::new(SimulatedElement::new("video", Some(30.0)))
    }

    #[test]
    fn levels_attenuate_video_only() {
        assert!((video_level(50, DEFAULT_VIDEO_ATTENUATION) - 0.1).abs() < 1e-12);
        assert!((audio_level(50) - 0.5).abs() < 1e-12);
        assert_eq!(audio_level(250), 1.0);
    }

    #[test]
    fn clips_take_precedence_over_a_track() {
        let payload = CommentaryPayload {
            audio_segments: Some(vec![
                AudioSegment::new(0.0, "a", "/api/audio/a.mp3"),
                AudioSegment::new(5.0, "b", "/api/audio/b.mp3"),
            ]),
            audio_url: Some("/api/audio/full.mp3".into()),
            ..Default::default()
        };
        let media = MediaSet::from_payload(video(), &payload, &SimulatedLoader::new(3.0), str::to_string);
        assert_eq!(media.mode(), SyncMode::Clips);
        assert_eq!(media.clips().len(), 2);
        assert!(media.track().is_none());
    }

    #[test]
    fn failed_clip_leaves_an_empty_slot() {
        let payload = CommentaryPayload {
            audio_segments: Some(vec![
                AudioSegment::new(0.0, "a", "a.mp3"),
                AudioSegment::new(5.0, "b", "b.mp3"),
            ]),
            ..Default::default()
        };
        let loader = SimulatedLoader::new(3.0).with_missing("b.mp3");
        let media = MediaSet::from_payload(video(), &payload, &loader, str::to_string);
        assert!(media.clip(0).is_some());
        assert!(media.clip(1).is_none());
        assert_eq!(media.audio_elements().count(), 1);
    }

    #[test]
    fn text_only_payload_is_captions_mode() {
        let payload = CommentaryPayload {
            commentary_text: Some("0:01 - Serve".into()),
            ..Default::default()
        };
        let media = MediaSet::from_payload(video(), &payload, &SimulatedLoader::new(3.0), str::to_string);
        assert_eq!(media.mode(), SyncMode::Captions);
    }
}
