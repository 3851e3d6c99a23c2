pub mod commentary;
pub mod config;
pub mod kernel;
pub mod media;
pub mod services;
pub mod session;

pub use config::ViewerConfig;
pub use kernel::viewer::{Viewer, ViewerSnapshot};
