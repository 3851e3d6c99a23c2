use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::services::backend::VideoFile;

/// Well-known session keys.
pub mod keys {
    pub const VIDEO_SOURCE: &str = "videoSource";
    pub const VIDEO_FILENAME: &str = "videoFilename";
    pub const UPLOAD_METHOD: &str = "uploadMethod";
    pub const STYLE: &str = "commentaryStyle";
    pub const ENERGY: &str = "energy";
    pub const VOICE: &str = "voice";
    pub const DURATION: &str = "duration";
    pub const COMMENTARY_RESULT: &str = "commentaryResult";
}

#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    entries: HashMap<String, String>,
}

impl SessionStore {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.entries.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn set_json<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), serde_json::Error> {
        let raw = serde_json::to_string(value)?;
        self.set(key, raw);
        Ok(())
    }

    /// `None` when the key is absent.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<Result<T, serde_json::Error>> {
        self.get(key).map(serde_json::from_str)
    }
}

/// Holds at most one uploaded video until the upload step consumes it.
#[derive(Debug, Default)]
pub struct VideoFileSlot {
    file: Option<VideoFile>,
}

impl VideoFileSlot {
    pub fn set(&mut self, file: VideoFile) {
        self.file = Some(file);
    }

    pub fn get(&self) -> Option<&VideoFile> {
        self.file.as_ref()
    }

    /// Empties the slot.
    pub fn take(&mut self) -> Option<VideoFile> {
        self.file.take()
    }

    pub fn clear(&mut self) {
        self.file = None;
    }
}

#[derive(Debug)]
pub struct SessionContext {
    id: Uuid,
    store: SessionStore,
    video_file: VideoFileSlot,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            store: SessionStore::default(),
            video_file: VideoFileSlot::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SessionStore {
        &mut self.store
    }

    pub fn set_video_file(&mut self, file: VideoFile) {
        self.video_file.set(file);
    }

    pub fn video_file(&self) -> Option<&VideoFile> {
        self.video_file.get()
    }

    pub fn take_video_file(&mut self) -> Option<VideoFile> {
        self.video_file.take()
    }

    pub fn clear_video_file(&mut self) {
        self.video_file.clear();
    }
}
