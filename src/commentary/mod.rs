//! Commentary timeline: payload types, text parsing and time lookups.

pub mod lookup;
pub mod resolver;
pub mod types;

pub use lookup::{active_segment_at, caption_at};
pub use resolver::resolve;
pub use types::{AudioSegment, Category, CommentaryPayload, CommentarySegment};
