pub mod element;
pub mod set;
pub mod sim;

pub use element::{MediaElement, MediaError, MediaLoader};
pub use set::{AudioSource, MediaSet, SyncMode};
