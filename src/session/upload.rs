use tracing::{debug, info};

use super::store::{keys, SessionContext, SessionStore};
use super::ViewerError;
use crate::commentary::types::CommentaryPayload;
use crate::services::backend::{BackendClient, UploadPreferences, VideoFile, VideoSource};

const METHOD_FILE: &str = "file";
const METHOD_URL: &str = "url";

/// What the user handed to the upload form.
#[derive(Debug, Clone)]
pub enum UploadSource {
    /// A local video; `locator` is where the viewer will play it from.
    File { file: VideoFile, locator: String },
    Url(String),
}

/// Record the upload form into the session. Clears any previous result.
pub fn stage_upload(session: &mut SessionContext, source: UploadSource, prefs: &UploadPreferences) {
    let store = session.store_mut();
    store.set(keys::STYLE, prefs.style.as_str());
    store.set(keys::ENERGY, prefs.energy.as_str());
    store.set(keys::VOICE, prefs.voice.as_str());
    store.set(keys::DURATION, prefs.duration.as_str());
    store.remove(keys::COMMENTARY_RESULT);
    store.remove(keys::VIDEO_FILENAME);

    match source {
        UploadSource::File { file, locator } => {
            store.set(keys::UPLOAD_METHOD, METHOD_FILE);
            store.set(keys::VIDEO_SOURCE, locator);
            session.set_video_file(file);
        }
        UploadSource::Url(url) => {
            store.set(keys::UPLOAD_METHOD, METHOD_URL);
            store.set(keys::VIDEO_SOURCE, url);
            session.clear_video_file();
        }
    }
}

pub fn preferences(store: &SessionStore) -> UploadPreferences {
    let defaults = UploadPreferences::default();
    let field = |key: &str, fallback: String| store.get(key).map(str::to_string).unwrap_or(fallback);
    UploadPreferences {
        style: field(keys::STYLE, defaults.style),
        energy: field(keys::ENERGY, defaults.energy),
        voice: field(keys::VOICE, defaults.voice),
        duration: field(keys::DURATION, defaults.duration),
    }
}

/// The loading step: send the staged video to the backend and store the
/// result for the viewer. Consumes the staged file.
pub async fn run_upload_step(
    client: &BackendClient,
    session: &mut SessionContext,
) -> Result<CommentaryPayload, ViewerError> {
    let prefs = preferences(session.store());
    let method = session.store().get(keys::UPLOAD_METHOD).unwrap_or(METHOD_FILE);

    let source = if method == METHOD_URL {
        let url = session
            .store()
            .get(keys::VIDEO_SOURCE)
            .ok_or(ViewerError::InputMissing(keys::VIDEO_SOURCE))?
            .to_string();
        let fetched = client.fetch_remote(&url).await?;
        debug!(filename = %fetched.filename, "remote video stored by backend");
        session.store_mut().set(keys::VIDEO_FILENAME, fetched.filename.as_str());
        VideoSource::Stored {
            filename: fetched.filename,
        }
    } else {
        let file = session
            .take_video_file()
            .ok_or(ViewerError::InputMissing("video file"))?;
        VideoSource::File(file)
    };

    let payload = client.generate_commentary(source, &prefs).await?;
    let store = session.store_mut();
    if let Some(filename) = payload.video_filename.as_deref() {
        store.set(keys::VIDEO_FILENAME, filename);
    }
    store.set_json(keys::COMMENTARY_RESULT, &payload)?;
    info!(session = %session.id(), "commentary result stored");
    Ok(payload)
}

/// Everything the viewer needs, read back from the session.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerInputs {
    pub video_source: String,
    pub payload: CommentaryPayload,
}

impl ViewerInputs {
    pub fn from_session(session: &SessionContext) -> Result<Self, ViewerError> {
        let store = session.store();
        let video_source = store
            .get(keys::VIDEO_SOURCE)
            .ok_or(ViewerError::InputMissing(keys::VIDEO_SOURCE))?
            .to_string();
        let payload = store
            .get_json(keys::COMMENTARY_RESULT)
            .ok_or(ViewerError::InputMissing(keys::COMMENTARY_RESULT))??;
        Ok(Self {
            video_source,
            payload,
        })
    }
}
