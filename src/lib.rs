//! Sensirion-to-Home-Assistant bridge
//!
//! This crate polls Sensirion I2C environmental sensors (SCD41, SEN55) over
//! `/dev/i2c-*`, normalizes their heterogeneous raw outputs into canonical
//! `{name, value, unit}` readings and publishes each reading as a named
//! state entity to a Home Assistant instance over its REST API.
//!
//! # Example
//!
//! ```rust,no_run
//! use pisensirion::{Bridge, BridgeConfig};
//! use pisensirion::sensor::bus::LinuxI2cFactory;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BridgeConfig::from_file("settings.yaml")?;
//!     let bridge = Bridge::new(config, Box::new(LinuxI2cFactory::new()))?;
//!     bridge.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod publish;
pub mod sensor;
pub mod text;

// Re-export main types
pub use crate::{
    config::{BridgeConfig, SensorEntry},
    error::{BridgeError, Result},
    orchestrator::Bridge,
    publish::{HassPublisher, PublishTarget},
    sensor::{Reading, ReadingSet, SensorDriver, SensorKind},
};
