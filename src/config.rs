//! Client configuration.
//!
//! Values can be set through [`JobsClientBuilder`](crate::JobsClientBuilder)
//! or loaded from JSON:
//!
//! ```
//! use iot_jobs_client::JobsConfig;
//!
//! let config = JobsConfig::from_json(r#"{"thing_name":"sensor-1","default_timeout_ms":2500}"#).unwrap();
//! assert_eq!(config.thing_name, "sensor-1");
//! assert_eq!(config.default_timeout.as_millis(), 2500);
//! assert_eq!(config.max_in_flight, iot_jobs_client::config::DEFAULT_MAX_IN_FLIGHT);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{JobsError, Result};
use crate::topic::MAX_THING_NAME_LEN;

/// Default wait timeout for the convenience calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default maximum number of pending operations.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 256;

/// Configuration for a [`JobsClient`](crate::JobsClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Thing name used in every topic.
    pub thing_name: String,
    /// Timeout used by `get_pending`, `start_next`, `describe` and `update`.
    #[serde(rename = "default_timeout_ms", with = "duration_ms")]
    pub default_timeout: Duration,
    /// Maximum number of pending operations.
    pub max_in_flight: usize,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            thing_name: String::new(),
            default_timeout: DEFAULT_TIMEOUT,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

impl JobsConfig {
    /// Configuration for `thing_name` with default values.
    pub fn new(thing_name: impl Into<String>) -> Self {
        Self {
            thing_name: thing_name.into(),
            ..Self::default()
        }
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: JobsConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can be used to build a client.
    pub fn validate(&self) -> Result<()> {
        let name = &self.thing_name;
        if name.is_empty() || name.len() > MAX_THING_NAME_LEN {
            return Err(JobsError::Config(format!(
                "thing name length must be 1..={}, got {}",
                MAX_THING_NAME_LEN,
                name.len()
            )));
        }

        if name.contains(['/', '+', '#']) {
            return Err(JobsError::Config(format!(
                "thing name {:?} contains topic separators or wildcards",
                name
            )));
        }

        if self.default_timeout.is_zero() {
            return Err(JobsError::Config("default timeout must be non-zero".into()));
        }

        if self.max_in_flight == 0 {
            return Err(JobsError::Config("max_in_flight must be at least 1".into()));
        }

        Ok(())
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
