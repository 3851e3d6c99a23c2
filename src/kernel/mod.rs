//! Playback kernel: transport state, the operation lock, the sync engine
//! and the viewer loop that drives them.

pub mod event;
pub mod lock;
pub mod state;
pub mod sync;
pub mod telemetry;
pub mod time;
pub mod transport;
pub mod viewer;
