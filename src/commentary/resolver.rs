//! Commentary payload -> ordered caption timeline.
//!
//! Timestamp extraction is strict. Category inference is a keyword
//! heuristic and only ever a best guess.

use std::sync::LazyLock;

use regex::Regex;

use super::types::{AudioSegment, Category, CommentaryPayload, CommentarySegment};

// "1:05 - text", "[0:12] text"
static CLOCK_STAMP_RE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^\[?(\d+):(\d+)\]?[-:\s]+(.+)$"));

// "At 3 seconds text", "[4.5s] - text"
static SECONDS_STAMP_RE: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:At\s+)?\[?(\d+(?:\.\d+)?)\s*(?:seconds?|s)\]?[-:\s]+(.+)$")
});

const EXCITEMENT_WORDS: &[&str] = &[
    "incredible",
    "amazing",
    "wow",
    "unbelievable",
    "stunning",
    "spectacular",
    "what a",
];

const ANALYSIS_WORDS: &[&str] = &[
    "notice",
    "technique",
    "strategy",
    "positioning",
    "footwork",
    "tactic",
];

/// Payloads with audio clips project 1:1; otherwise the text is parsed.
pub fn resolve(payload: &CommentaryPayload) -> Vec<CommentarySegment> {
    match payload.clip_segments() {
        Some(segments) => project_audio_segments(segments),
        None => payload
            .commentary_text
            .as_deref()
            .map(parse_commentary_text)
            .unwrap_or_default(),
    }
}

pub fn project_audio_segments(segments: &[AudioSegment]) -> Vec<CommentarySegment> {
    segments
        .iter()
        .map(|segment| CommentarySegment::new(segment.timestamp, segment.text.clone(), Category::Play))
        .collect()
}

/// Keeps line order; lines are assumed chronological.
pub fn parse_commentary_text(text: &str) -> Vec<CommentarySegment> {
    text.lines().filter_map(parse_line).collect()
}

pub fn parse_line(line: &str) -> Option<CommentarySegment> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (timestamp, text) = extract_timestamp(line).unwrap_or((0.0, line));
    let text = strip_decoration(text);
    if text.is_empty() {
        return None;
    }

    let category = categorize(&text);
    Some(CommentarySegment::new(timestamp, text, category))
}

/// Leading `MM:SS` or `<n> seconds` stamp, and the text after it.
pub fn extract_timestamp(line: &str) -> Option<(f64, &str)> {
    if let Ok(re) = CLOCK_STAMP_RE.as_ref() {
        if let Some(caps) = re.captures(line) {
            let minutes: f64 = caps[1].parse().ok()?;
            let seconds: f64 = caps[2].parse().ok()?;
            let rest = caps.get(3)?.as_str();
            return Some((minutes * 60.0 + seconds, rest));
        }
    }
    if let Ok(re) = SECONDS_STAMP_RE.as_ref() {
        if let Some(caps) = re.captures(line) {
            let seconds: f64 = caps[1].parse().ok()?;
            let rest = caps.get(2)?.as_str();
            return Some((seconds, rest));
        }
    }
    None
}

/// Best-effort mood of a caption.
pub fn categorize(text: &str) -> Category {
    let lower = text.to_lowercase();
    if lower.contains('!') || EXCITEMENT_WORDS.iter().any(|w| lower.contains(w)) {
        Category::Excitement
    } else if ANALYSIS_WORDS.iter().any(|w| lower.contains(w)) {
        Category::Analysis
    } else {
        Category::Play
    }
}

fn strip_decoration(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '*' | '_' | '~' | '`' | '#'))
        .collect::<String>()
        .trim()
        .to_string()
}
