use serde::{Deserialize, Serialize};

use crate::kernel::time::Seconds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Play,
    Analysis,
    Excitement,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Play => "play",
            Category::Analysis => "analysis",
            Category::Excitement => "excitement",
        }
    }
}

/// One caption on the commentary timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentarySegment {
    pub timestamp: Seconds,
    pub text: String,
    #[serde(rename = "type")]
    pub category: Category,
}

impl CommentarySegment {
    pub fn new(timestamp: Seconds, text: impl Into<String>, category: Category) -> Self {
        Self {
            timestamp: timestamp.max(0.0),
            text: text.into(),
            category,
        }
    }
}

/// One spoken utterance, aligned to a point in the video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSegment {
    pub timestamp: Seconds,
    pub text: String,
    /// Server-relative locator of the pre-rendered clip.
    #[serde(rename = "audio_url")]
    pub audio_ref: String,
}

impl AudioSegment {
    pub fn new(timestamp: Seconds, text: impl Into<String>, audio_ref: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.max(0.0),
            text: text.into(),
            audio_ref: audio_ref.into(),
        }
    }
}

/// Commentary result as the generation backend returns it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentaryPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commentary_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_segments: Option<Vec<AudioSegment>>,
    /// Single long-form commentary track.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_audio: Option<bool>,
}

impl CommentaryPayload {
    /// Discrete audio segments, when there is at least one.
    pub fn clip_segments(&self) -> Option<&[AudioSegment]> {
        self.audio_segments
            .as_deref()
            .filter(|segments| !segments.is_empty())
    }
}
