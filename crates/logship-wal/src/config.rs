//! Watcher Configuration
//!
//! Controls where the watcher reads from and how often its periodic triggers
//! fire:
//!
//! - **wal_dir**: directory holding the numbered segment files (required)
//! - **name**: instance label used in logs and metrics (required)
//! - **max_segment**: stop the current run after this segment; test hook,
//!   `None` in production
//! - **read_period**: how often available records are drained while tailing
//!   (default: 10ms)
//! - **segment_check_period**: how often the directory is checked for a
//!   newer segment (default: 100ms)
//! - **checkpoint_period**: reserved trigger for reconciling with writer
//!   checkpoints (default: 5s)
//! - **backoff**: sleep between failed runs (default: 5s)
//!
//! Durations are serialized as integer milliseconds.
//!
//! ## Usage
//!
//! ```ignore
//! use logship_wal::WatcherConfig;
//!
//! let config = WatcherConfig::new("/var/lib/logship/wal", "shipper-0");
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Directory holding the segment files.
    pub wal_dir: PathBuf,

    /// Instance name; labels logs and metrics.
    pub name: String,

    /// Stop the current run after this segment. Test hook.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_segment: Option<u64>,

    /// Period of the read trigger while tailing.
    #[serde(default = "default_read_period", with = "duration_ms")]
    pub read_period: Duration,

    /// Period of the new-segment check while tailing.
    #[serde(default = "default_segment_check_period", with = "duration_ms")]
    pub segment_check_period: Duration,

    /// Period of the reserved checkpoint trigger.
    #[serde(default = "default_checkpoint_period", with = "duration_ms")]
    pub checkpoint_period: Duration,

    /// Sleep between failed runs.
    #[serde(default = "default_backoff", with = "duration_ms")]
    pub backoff: Duration,
}

impl WatcherConfig {
    /// Configuration with default periods.
    pub fn new(wal_dir: impl AsRef<Path>, name: impl Into<String>) -> Self {
        Self {
            wal_dir: wal_dir.as_ref().to_path_buf(),
            name: name.into(),
            max_segment: None,
            read_period: default_read_period(),
            segment_check_period: default_segment_check_period(),
            checkpoint_period: default_checkpoint_period(),
            backoff: default_backoff(),
        }
    }
}

fn default_read_period() -> Duration {
    Duration::from_millis(10)
}

fn default_segment_check_period() -> Duration {
    Duration::from_millis(100)
}

fn default_checkpoint_period() -> Duration {
    Duration::from_secs(5)
}

fn default_backoff() -> Duration {
    Duration::from_secs(5)
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_default_periods() {
        let config = WatcherConfig::new("/wal", "watcher-1");
        assert_eq!(config.wal_dir, PathBuf::from("/wal"));
        assert_eq!(config.name, "watcher-1");
        assert_eq!(config.max_segment, None);
        assert_eq!(config.read_period, Duration::from_millis(10));
        assert_eq!(config.segment_check_period, Duration::from_millis(100));
        assert_eq!(config.checkpoint_period, Duration::from_secs(5));
        assert_eq!(config.backoff, Duration::from_secs(5));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: WatcherConfig =
            serde_json::from_str(r#"{"wal_dir": "/wal", "name": "w"}"#).unwrap();
        assert_eq!(config.read_period, Duration::from_millis(10));
        assert_eq!(config.backoff, Duration::from_secs(5));
    }

    #[test]
    fn test_durations_serialize_as_milliseconds() {
        let mut config = WatcherConfig::new("/wal", "w");
        config.read_period = Duration::from_millis(25);

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["read_period"], 25);
        assert_eq!(json["backoff"], 5000);
        assert!(json.get("max_segment").is_none());
    }
}
