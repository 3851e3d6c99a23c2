use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::kernel::time::{DRIFT_TICK_MS, LOCK_CEILING_MS, SEGMENT_TICK_MS};
use crate::media::set::DEFAULT_VIDEO_ATTENUATION;

pub const ENV_BACKEND_URL: &str = "BALL_KNOWLEDGE_BACKEND_URL";
pub const ENV_DRIFT_THRESHOLD: &str = "BALL_KNOWLEDGE_DRIFT_THRESHOLD";
pub const ENV_LOCK_CEILING_MS: &str = "BALL_KNOWLEDGE_LOCK_CEILING_MS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Reconciliation cadences and thresholds. Explicit so tests can tighten them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub drift_tick_ms: u64,
    pub segment_tick_ms: u64,
    /// Seconds of track/video drift tolerated between corrections.
    pub drift_threshold: f64,
    pub lock_ceiling_ms: u64,
    pub video_attenuation: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            drift_tick_ms: DRIFT_TICK_MS,
            segment_tick_ms: SEGMENT_TICK_MS,
            drift_threshold: 0.3,
            lock_ceiling_ms: LOCK_CEILING_MS,
            video_attenuation: DEFAULT_VIDEO_ATTENUATION,
        }
    }
}

impl SyncConfig {
    pub fn drift_tick(&self) -> Duration {
        Duration::from_millis(self.drift_tick_ms.max(1))
    }

    pub fn segment_tick(&self) -> Duration {
        Duration::from_millis(self.segment_tick_ms.max(1))
    }

    pub fn lock_ceiling(&self) -> Duration {
        Duration::from_millis(self.lock_ceiling_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Origin that server-relative media locators resolve against.
    pub origin: String,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:5000".to_string(),
            // Generation runs vision + TTS server side; it is slow.
            timeout_secs: 300,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Join a server-relative locator onto the origin. Absolute URLs pass through.
    pub fn resolve_media(&self, locator: &str) -> String {
        if locator.starts_with("http://") || locator.starts_with("https://") {
            return locator.to_string();
        }
        format!(
            "{}/{}",
            self.origin.trim_end_matches('/'),
            locator.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub sync: SyncConfig,
    pub backend: BackendConfig,
}

impl ViewerConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay environment-style overrides. Unparseable values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(origin) = lookup(ENV_BACKEND_URL) {
            self.backend.origin = origin;
        }
        if let Some(raw) = lookup(ENV_DRIFT_THRESHOLD) {
            match raw.parse::<f64>() {
                Ok(threshold) if threshold.is_finite() && threshold >= 0.0 => {
                    self.sync.drift_threshold = threshold;
                }
                _ => warn!(value = %raw, "ignoring invalid {}", ENV_DRIFT_THRESHOLD),
            }
        }
        if let Some(raw) = lookup(ENV_LOCK_CEILING_MS) {
            match raw.parse::<u64>() {
                Ok(ceiling) => self.sync.lock_ceiling_ms = ceiling,
                Err(_) => warn!(value = %raw, "ignoring invalid {}", ENV_LOCK_CEILING_MS),
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let config = ViewerConfig::default();
        assert_eq!(config.sync.drift_threshold, 0.3);
        assert_eq!(config.sync.lock_ceiling(), Duration::from_secs(2));
        assert_eq!(config.sync.video_attenuation, 0.2);
    }

    #[test]
    fn overrides_apply_and_bad_values_are_ignored() {
        let env: HashMap<&str, &str> = [
            (ENV_BACKEND_URL, "https://api.example.test"),
            (ENV_DRIFT_THRESHOLD, "0.15"),
            (ENV_LOCK_CEILING_MS, "soon"),
        ]
        .into_iter()
        .collect();

        let config = ViewerConfig::default().with_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.backend.origin, "https://api.example.test");
        assert_eq!(config.sync.drift_threshold, 0.15);
        assert_eq!(config.sync.lock_ceiling_ms, LOCK_CEILING_MS);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: ViewerConfig =
            serde_json::from_str(r#"{"sync": {"drift_threshold": 0.5}}"#).unwrap();
        assert_eq!(config.sync.drift_threshold, 0.5);
        assert_eq!(config.sync.segment_tick_ms, SEGMENT_TICK_MS);
        assert_eq!(config.backend, BackendConfig::default());
    }

    #[test]
    fn media_locators_resolve_against_origin() {
        let backend = BackendConfig {
            origin: "http://localhost:5000/".into(),
            ..Default::default()
        };
        assert_eq!(
            backend.resolve_media("/api/audio/1_segment_0.mp3"),
            "http://localhost:5000/api/audio/1_segment_0.mp3"
        );
        assert_eq!(
            backend.resolve_media("https://cdn.example.test/a.mp3"),
            "https://cdn.example.test/a.mp3"
        );
    }
}
