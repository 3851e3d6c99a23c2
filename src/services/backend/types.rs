use std::path::Path;

use serde::{Deserialize, Serialize};

/// Form fields sent alongside the video. Defaults match the backend's own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadPreferences {
    pub style: String,
    pub energy: String,
    pub voice: String,
    /// Target commentary length in seconds, as the form sends it.
    pub duration: String,
}

impl Default for UploadPreferences {
    fn default() -> Self {
        Self {
            style: "professional".to_string(),
            energy: "medium".to_string(),
            voice: "Adam".to_string(),
            duration: "60".to_string(),
        }
    }
}

/// Raw bytes of a user-selected video.
#[derive(Clone, PartialEq, Eq)]
pub struct VideoFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for VideoFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoFile")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl VideoFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());
        let mime = mime_for(path);
        Ok(Self::new(name, mime, bytes))
    }
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

/// What the generation request carries as its video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    File(VideoFile),
    /// A video the backend already holds, e.g. after a remote fetch.
    Stored { filename: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FetchResponse {
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct FetchRequest<'a> {
    pub url: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_follows_extension() {
        assert_eq!(mime_for(Path::new("rally.MP4")), "video/mp4");
        assert_eq!(mime_for(Path::new("clip.mov")), "video/quicktime");
        assert_eq!(mime_for(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn debug_hides_bytes() {
        let file = VideoFile::new("a.mp4", "video/mp4", vec![0; 4096]);
        let shown = format!("{:?}", file);
        assert!(shown.contains("len: 4096"));
        assert!(!shown.contains("0, 0"));
    }
}
