use serde::{Deserialize, Serialize};

use super::time::Seconds;

pub const SHORT_SKIP: Seconds = 5.0;
pub const LONG_SKIP: Seconds = 10.0;
pub const VOLUME_STEP: i8 = 5;

/// User gesture aimed at the transport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Command {
    TogglePlay,
    Seek(Seconds),
    Skip(Seconds),
    /// Jump to n tenths of the duration (number keys).
    SeekFraction(u8),
    SeekStart,
    SeekEnd,
    SetVolume(u8),
    NudgeVolume(i8),
    ToggleMute,
}

/// How a serialized transport operation ended. Never an error: a dropped
/// gesture is expected under rapid input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpOutcome {
    Completed,
    /// Finished, but a media step was rejected along the way.
    Degraded,
    /// Another operation held the lock.
    Dropped,
}

/// Keyboard shortcuts of the viewer, keyed by `KeyboardEvent.key` names.
pub fn command_for_key(key: &str) -> Option<Command> {
    let key = key.to_lowercase();
    let command = match key.as_str() {
        " " | "space" | "k" => Command::TogglePlay,
        "arrowleft" => Command::Skip(-SHORT_SKIP),
        "arrowright" => Command::Skip(SHORT_SKIP),
        "j" => Command::Skip(-LONG_SKIP),
        "l" => Command::Skip(LONG_SKIP),
        "arrowup" => Command::NudgeVolume(VOLUME_STEP),
        "arrowdown" => Command::NudgeVolume(-VOLUME_STEP),
        "m" => Command::ToggleMute,
        "home" => Command::SeekStart,
        "end" => Command::SeekEnd,
        digit if digit.len() == 1 && digit.as_bytes()[0].is_ascii_digit() => {
            Command::SeekFraction(digit.as_bytes()[0] - b'0')
        }
        _ => return None,
    };
    Some(command)
}
