//! SCD41 driver: single-shot CO2 / temperature / humidity readings
//!
//! The SCD41 reports a fixed triple per measurement, so normalization maps
//! the raw values positionally onto a constant schema; units are properties
//! of the variant, not parsed from device output.

use super::bus::Scd4xLink;
use super::{require_active, DriverState, RawBatch, Reading, ReadingSet, SensorDriver, SensorKind};
use crate::error::{BridgeError, Result};
use crate::text::round_value;
use async_trait::async_trait;
use tracing::debug;

const MEASURE_NAMES: [&str; 3] = ["CO2", "Temperature", "Humidity"];
const MEASURE_UNITS: [&str; 3] = ["ppm", "°C", "%RS"];

/// Single-shot driver for the Sensirion SCD41
pub struct Scd41Driver {
    link: Box<dyn Scd4xLink>,
    state: DriverState,
}

impl Scd41Driver {
    pub fn new(link: Box<dyn Scd4xLink>) -> Self {
        Self {
            link,
            state: DriverState::Idle,
        }
    }
}

#[async_trait]
impl SensorDriver for Scd41Driver {
    fn kind(&self) -> SensorKind {
        SensorKind::Scd41
    }

    fn state(&self) -> DriverState {
        self.state
    }

    async fn reset(&mut self) -> Result<()> {
        self.link.stop_periodic_measurement()?;
        self.state = DriverState::Idle;
        Ok(())
    }

    async fn start(&mut self) -> Result<()> {
        if self.state == DriverState::Active {
            return Err(BridgeError::invalid_state(
                "start on scd41 while a measurement session is active",
            ));
        }
        self.link.wake_up()?;
        self.state = DriverState::Active;
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if self.state == DriverState::Idle {
            debug!("stop on idle scd41 ignored");
            return Ok(());
        }
        self.state = DriverState::Idle;
        Ok(())
    }

    async fn collect(&mut self) -> Result<RawBatch> {
        require_active(self.state, self.kind(), "collect")?;

        self.link.measure_single_shot()?;
        let (co2, temperature, humidity) = self.link.read_measurement()?;
        debug!(co2, temperature, humidity, "scd41 single-shot read");

        Ok(RawBatch::SingleShot {
            co2,
            temperature,
            humidity,
        })
    }

    fn normalize(&self, raw: &RawBatch, precision: i32, _default_unit: &str) -> Result<ReadingSet> {
        let (co2, temperature, humidity) = match raw {
            RawBatch::SingleShot {
                co2,
                temperature,
                humidity,
            } => (*co2, *temperature, *humidity),
            RawBatch::Report(_) => {
                return Err(BridgeError::invalid_state(
                    "scd41 cannot normalize a self-describing report",
                ))
            }
        };

        let mut readings = ReadingSet::new();
        for (idx, value) in [co2, temperature, humidity].into_iter().enumerate() {
            readings.insert(
                MEASURE_NAMES[idx],
                Reading::new(round_value(value, precision), MEASURE_UNITS[idx]),
            );
        }
        Ok(readings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Scripted link returning a fixed raw triple
    struct FakeScd4x {
        triple: (f64, f64, f64),
    }

    impl FakeScd4x {
        fn new(triple: (f64, f64, f64)) -> Self {
            Self { triple }
        }
    }

    impl Scd4xLink for FakeScd4x {
        fn stop_periodic_measurement(&mut self) -> Result<()> {
            Ok(())
        }

        fn wake_up(&mut self) -> Result<()> {
            Ok(())
        }

        fn measure_single_shot(&mut self) -> Result<()> {
            Ok(())
        }

        fn read_measurement(&mut self) -> Result<(f64, f64, f64)> {
            Ok(self.triple)
        }
    }

    #[tokio::test]
    async fn test_collection_yields_fixed_schema() {
        let mut driver = Scd41Driver::new(Box::new(FakeScd4x::new((612.0, 21.337, 40.56))));

        driver.reset().await.unwrap();
        driver.start().await.unwrap();
        let raw = driver.collect().await.unwrap();
        driver.stop().await.unwrap();

        let readings = driver.normalize(&raw, 1, "Unknown").unwrap();
        assert_eq!(readings.len(), 3);

        let entries: Vec<(&str, &Reading)> = readings.iter().collect();
        assert_eq!(entries[0], ("CO2", &Reading::new(612.0, "ppm")));
        assert_eq!(entries[1], ("Temperature", &Reading::new(21.3, "°C")));
        assert_eq!(entries[2], ("Humidity", &Reading::new(40.6, "%RS")));
    }

    #[tokio::test]
    async fn test_units_are_constant_regardless_of_values() {
        let driver = Scd41Driver::new(Box::new(FakeScd4x::new((0.0, 0.0, 0.0))));
        let raw = RawBatch::SingleShot {
            co2: -3.0,
            temperature: 9999.0,
            humidity: 0.0,
        };

        let readings = driver.normalize(&raw, 1, "Unknown").unwrap();
        let units: Vec<&str> = readings.iter().map(|(_, r)| r.unit.as_str()).collect();
        assert_eq!(units, vec!["ppm", "°C", "%RS"]);
    }

    #[tokio::test]
    async fn test_collect_requires_active_session() {
        let mut driver = Scd41Driver::new(Box::new(FakeScd4x::new((0.0, 0.0, 0.0))));

        let err = driver.collect().await.unwrap_err();
        assert!(matches!(err, BridgeError::InvalidState(_)));

        driver.start().await.unwrap();
        assert!(driver.collect().await.is_ok());
    }

    #[tokio::test]
    async fn test_double_start_rejected() {
        let mut driver = Scd41Driver::new(Box::new(FakeScd4x::new((0.0, 0.0, 0.0))));
        driver.start().await.unwrap();
        assert!(driver.start().await.is_err());
    }

    #[tokio::test]
    async fn test_wrong_batch_kind_rejected() {
        let driver = Scd41Driver::new(Box::new(FakeScd4x::new((0.0, 0.0, 0.0))));
        let raw = RawBatch::Report("CO2:400 ppm".to_string());
        assert!(driver.normalize(&raw, 1, "Unknown").is_err());
    }
}
