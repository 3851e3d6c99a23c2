//! Client for the commentary generation backend.

pub mod client;
pub mod types;

pub use client::{BackendClient, BackendError};
pub use types::{FetchResponse, HealthStatus, UploadPreferences, VideoFile, VideoSource};
