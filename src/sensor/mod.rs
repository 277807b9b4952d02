//! Sensor drivers and the normalized reading model
//!
//! Each supported sensor family implements the same capability set
//! (`reset`, `start`, `stop`, `collect`, `normalize`) behind the
//! [`SensorDriver`] trait. The set of families is closed: [`SensorKind`]
//! enumerates them and [`build_driver`] dispatches on the tag at
//! construction time. Raw data is threaded explicitly through the
//! lifecycle (`collect` returns a [`RawBatch`], `normalize` consumes one)
//! rather than accumulating in hidden driver state.

pub mod bus;
pub mod scd41;
pub mod sen55;

pub use scd41::Scd41Driver;
pub use sen55::Sen55Driver;

use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use bus::DeviceFactory;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single named, unit-tagged numeric measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Cleaned measurement value, always finite
    pub value: f64,

    /// Unit of measurement; drivers substitute a default when the sensor
    /// reports none
    pub unit: String,
}

impl Reading {
    pub fn new<S: Into<String>>(value: f64, unit: S) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }
}

/// Insertion-ordered mapping from reading name to [`Reading`]
///
/// Publish iteration must follow the order the driver produced the raw
/// tokens, so this is a small Vec-backed map rather than a hash map.
/// Re-inserting an existing name replaces the value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadingSet {
    entries: Vec<(String, Reading)>,
}

impl ReadingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a reading, replacing any existing reading with the same name
    /// while keeping its original position
    pub fn insert<S: Into<String>>(&mut self, name: S, reading: Reading) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = reading,
            None => self.entries.push((name, reading)),
        }
    }

    /// Merge another set into this one, preserving insertion order
    pub fn extend(&mut self, other: ReadingSet) {
        for (name, reading) in other.entries {
            self.insert(name, reading);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Reading> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate readings in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Reading)> {
        self.entries.iter().map(|(n, r)| (n.as_str(), r))
    }
}

/// One collect cycle's worth of raw device output
#[derive(Debug, Clone, PartialEq)]
pub enum RawBatch {
    /// Fixed-schema single-shot read: CO2, temperature, humidity
    SingleShot {
        co2: f64,
        temperature: f64,
        humidity: f64,
    },

    /// Self-describing comma-delimited report of `name:value unit` entries
    Report(String),
}

/// Driver lifecycle state
///
/// `Idle -(reset)-> Idle -(start)-> Active -(collect)*-> Active -(stop)-> Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Active,
}

/// The closed set of supported sensor families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    /// Sensirion SCD41 CO2 sensor (single-shot, fixed schema)
    Scd41,
    /// Sensirion SEN55 environmental node (streaming, self-describing schema)
    Sen55,
}

impl SensorKind {
    /// Resolve a configured sensor name to a driver variant
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "scd41" => Some(Self::Scd41),
            "sen55" => Some(Self::Sen55),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scd41 => "scd41",
            Self::Sen55 => "sen55",
        }
    }

    /// Unit substituted when the sensor reports a value without one
    pub fn default_unit(&self) -> &'static str {
        match self {
            Self::Scd41 => "Unknown",
            Self::Sen55 => "Index",
        }
    }
}

/// Bounded ready-flag polling parameters for streaming drivers
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    /// Sleep between ready-flag checks
    pub interval: Duration,

    /// Checks before the collect cycle fails with a timeout
    pub max_attempts: u32,
}

impl PollSettings {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }
}

/// Capability set shared by all sensor drivers
#[async_trait]
pub trait SensorDriver: Send {
    /// The variant tag this driver was constructed for
    fn kind(&self) -> SensorKind;

    /// Current lifecycle state
    fn state(&self) -> DriverState;

    /// Halt any background activity; valid from any state, lands in `Idle`
    async fn reset(&mut self) -> Result<()>;

    /// Begin a measurement session (`Idle` -> `Active`)
    async fn start(&mut self) -> Result<()>;

    /// End the measurement session (`Active` -> `Idle`); a no-op when idle
    async fn stop(&mut self) -> Result<()>;

    /// Perform one hardware read cycle; only valid while `Active`
    async fn collect(&mut self) -> Result<RawBatch>;

    /// Turn one raw batch into normalized readings
    fn normalize(&self, raw: &RawBatch, precision: i32, default_unit: &str) -> Result<ReadingSet>;
}

/// Construct the driver for `kind`, binding it to `device` via the factory
///
/// Dispatch happens here, once, on the variant tag; unrecognized names never
/// reach this point (see [`SensorKind::from_name`]).
pub fn build_driver(
    kind: SensorKind,
    device: &str,
    poll: PollSettings,
    factory: &dyn DeviceFactory,
) -> Result<Box<dyn SensorDriver>> {
    Ok(match kind {
        SensorKind::Scd41 => Box::new(Scd41Driver::new(factory.open_scd4x(device)?)),
        SensorKind::Sen55 => Box::new(Sen55Driver::new(factory.open_sen5x(device)?, poll)),
    })
}

/// Guard for operations that require an active measurement session
pub(crate) fn require_active(state: DriverState, kind: SensorKind, op: &str) -> Result<()> {
    if state != DriverState::Active {
        return Err(BridgeError::invalid_state(format!(
            "{op} on {} requires an active measurement session",
            kind.as_str()
        )));
    }
    Ok(())
}
