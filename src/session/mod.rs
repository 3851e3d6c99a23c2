//! Hand-off between the upload step and the viewer.
//!
//! A [`SessionContext`] is owned by the caller and passed along explicitly.
//! Form fields and results live in a string store; raw video bytes sit in a
//! separate single-use slot.

pub mod store;
pub mod upload;

pub use store::{keys, SessionContext, SessionStore, VideoFileSlot};
pub use upload::{run_upload_step, stage_upload, UploadSource, ViewerInputs};

use crate::services::backend::BackendError;

#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("missing session input: {0}")]
    InputMissing(&'static str),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("stored commentary result is malformed: {0}")]
    Payload(#[from] serde_json::Error),
}
