use std::future::Future;
use std::sync::Arc;

use crate::kernel::time::Seconds;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    /// The runtime refused to start playback (autoplay policy and the like).
    #[error("play request rejected: {0}")]
    PlayRejected(String),
    /// A pause or seek landed while the play request was still settling.
    #[error("play request aborted by a newer media action")]
    Aborted,
    #[error("media source could not be loaded: {0}")]
    LoadFailed(String),
}

/// A playable media element: the video itself, the long-form commentary
/// track, or one preloaded clip.
///
/// Mirrors the browser media element surface: property access is immediate,
/// only `play` settles asynchronously.
pub trait MediaElement: Send + Sync {
    /// Resolves once playback has actually started, or with the reason it did not.
    fn play(&self) -> impl Future<Output = Result<(), MediaError>> + Send;
    fn pause(&self);
    fn is_paused(&self) -> bool;
    fn has_ended(&self) -> bool;

    fn current_time(&self) -> Seconds;
    fn set_current_time(&self, seconds: Seconds);
    /// `None` until metadata has loaded.
    fn duration(&self) -> Option<Seconds>;

    /// 0.0..=1.0
    fn volume(&self) -> f64;
    fn set_volume(&self, volume: f64);
    fn is_muted(&self) -> bool;
    fn set_muted(&self, muted: bool);
}

/// Resolves an audio locator into a preloaded element.
pub trait MediaLoader {
    type Element: MediaElement;

    fn load(&self, locator: &str) -> Result<Arc<Self::Element>, MediaError>;
}
