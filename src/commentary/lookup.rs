use super::types::{AudioSegment, CommentarySegment};
use crate::kernel::time::Seconds;

/// Anything placed on the video timeline.
pub trait Timed {
    fn timestamp(&self) -> Seconds;
}

impl Timed for CommentarySegment {
    fn timestamp(&self) -> Seconds {
        self.timestamp
    }
}

impl Timed for AudioSegment {
    fn timestamp(&self) -> Seconds {
        self.timestamp
    }
}

/// Index of the segment with the greatest timestamp not exceeding `time`.
/// On equal timestamps the earliest in list order wins.
pub fn caption_index_at<T: Timed>(segments: &[T], time: Seconds) -> Option<usize> {
    let mut best: Option<(usize, Seconds)> = None;
    for (index, segment) in segments.iter().enumerate() {
        let ts = segment.timestamp();
        if ts > time {
            continue;
        }
        match best {
            Some((_, best_ts)) if best_ts >= ts => {}
            _ => best = Some((index, ts)),
        }
    }
    best.map(|(index, _)| index)
}

/// The caption on screen at `time`. Pure; recomputed on every time update.
pub fn caption_at(segments: &[CommentarySegment], time: Seconds) -> Option<&CommentarySegment> {
    caption_index_at(segments, time).map(|index| &segments[index])
}

/// The segment whose effective interval `[ts_i, ts_{i+1})` contains `time`.
/// Times before zero count as zero; the last interval is open-ended.
pub fn active_segment_at<T: Timed>(segments: &[T], time: Seconds) -> Option<usize> {
    let time = if time.is_finite() { time.max(0.0) } else { 0.0 };
    segments.iter().enumerate().position(|(index, segment)| {
        segment.timestamp() <= time
            && segments
                .get(index + 1)
                .map_or(true, |next| time < next.timestamp())
    })
}
