//! Configuration management for the bridge
//!
//! Settings live in a YAML file under a `home_assistant` key, with an
//! environment overlay (prefix `PISENSIRION`, `__` as the nesting separator,
//! e.g. `PISENSIRION_HOME_ASSISTANT__TOKEN`).

use crate::error::{BridgeError, Result};
use crate::publish::PublishTarget;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Home Assistant host
    pub host: String,

    /// Home Assistant port
    pub port: u16,

    /// Long-lived access token
    pub token: String,

    /// Location label used as the entity key prefix and friendly-name prefix
    pub location: String,

    /// Configured sensors, polled and published in this order
    pub sensors: Vec<SensorEntry>,

    /// Delay between consecutive state updates (soft rate limit)
    #[serde(default = "default_publish_interval", with = "humantime_serde")]
    pub publish_interval: Duration,

    /// HTTP request timeout
    #[serde(default = "default_http_timeout", with = "humantime_serde")]
    pub http_timeout: Duration,
}

/// One configured sensor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorEntry {
    /// Driver name (`scd41` or `sen55`)
    pub name: String,

    /// Bus device path, e.g. `/dev/i2c-1`
    pub device: String,

    /// Collect cycles per run
    #[serde(default = "default_cycles")]
    pub cycles: u32,

    /// Decimal places kept when cleaning raw values
    #[serde(default = "default_precision")]
    pub precision: i32,

    /// Interval between ready-flag checks (streaming drivers)
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Ready-flag checks before a collect cycle times out
    #[serde(default = "default_poll_attempts")]
    pub poll_attempts: u32,
}

fn default_publish_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_http_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_cycles() -> u32 {
    1
}

fn default_precision() -> i32 {
    1
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_poll_attempts() -> u32 {
    30
}

impl BridgeConfig {
    /// Load configuration from a settings file with environment overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix("PISENSIRION").separator("__"))
            .build()
            .map_err(|e| BridgeError::config(format!("Failed to load settings: {e}")))?;

        let config: BridgeConfig = settings
            .get("home_assistant")
            .map_err(|e| BridgeError::config(format!("Invalid settings: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(BridgeError::config("Host cannot be empty"));
        }

        if self.port == 0 {
            return Err(BridgeError::config("Port cannot be zero"));
        }

        if self.token.is_empty() {
            return Err(BridgeError::config("Token cannot be empty"));
        }

        if self.location.is_empty() {
            return Err(BridgeError::config("Location cannot be empty"));
        }

        if self.sensors.is_empty() {
            return Err(BridgeError::config("No sensors configured"));
        }

        for sensor in &self.sensors {
            if sensor.device.is_empty() {
                return Err(BridgeError::config(format!(
                    "Sensor {} has no device path",
                    sensor.name
                )));
            }

            if sensor.cycles == 0 {
                return Err(BridgeError::config(format!(
                    "Sensor {} must run at least one collect cycle",
                    sensor.name
                )));
            }

            if sensor.poll_attempts == 0 {
                return Err(BridgeError::config(format!(
                    "Sensor {} must allow at least one ready-flag check",
                    sensor.name
                )));
            }
        }

        Ok(())
    }

    /// Derive the immutable publish target from this configuration
    pub fn publish_target(&self) -> Result<PublishTarget> {
        PublishTarget::new(&self.location, &self.host, self.port, &self.token)
    }
}
