// ambari-state/src/config/interval.rs

use anyhow::Context;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// Delay between the end of one poll cycle and the start of the next.
///
/// Must be positive. Deserializes from either:
/// - A number of seconds: `interval: 15`
/// - A humantime string: `interval: "1m 30s"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PollInterval {
    duration: Duration,
}

impl PollInterval {
    pub fn new(duration: Duration) -> anyhow::Result<Self> {
        if duration.is_zero() {
            anyhow::bail!("Poll interval must be > 0, but got {:?}", duration);
        }
        Ok(Self { duration })
    }

    pub fn from_seconds(seconds: f64) -> anyhow::Result<Self> {
        if !seconds.is_finite() || seconds <= 0.0 {
            anyhow::bail!("Poll interval must be > 0, but got f64: {}", seconds);
        }
        Self::new(Duration::from_millis((seconds * 1000.0) as u64))
    }

    /// Examples: "15s", "1m", "2m 30s"
    pub fn from_humantime_str(s: &str) -> anyhow::Result<Self> {
        let duration = humantime::parse_duration(s)
            .context(format!("Error parsing duration from string: {:?}", s))?;
        Self::new(duration)
    }

    pub fn as_duration(&self) -> Duration {
        self.duration
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.duration.as_secs_f64()
    }
}

impl fmt::Display for PollInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", humantime::format_duration(self.duration))
    }
}

impl<'de> Deserialize<'de> for PollInterval {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum IntervalValue {
            Float(f64),
            String(String),
        }

        match IntervalValue::deserialize(deserializer)? {
            IntervalValue::Float(seconds) => {
                PollInterval::from_seconds(seconds).map_err(D::Error::custom)
            }
            IntervalValue::String(s) => {
                PollInterval::from_humantime_str(&s).map_err(D::Error::custom)
            }
        }
    }
}

// Always written back as a humantime string.
impl Serialize for PollInterval {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
