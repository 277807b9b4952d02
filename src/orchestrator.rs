//! Run orchestration: drive drivers through their lifecycle and publish
//!
//! One run is strictly sequential: every configured driver is reset,
//! started, collected from and stopped in configuration order, then all
//! resulting readings are published in driver-then-insertion order with a
//! configured delay between state updates. Sensor names are resolved
//! against the closed variant set before any bus or network interaction,
//! so a misconfigured sensor aborts the run with zero side effects.

use crate::config::{BridgeConfig, SensorEntry};
use crate::error::{BridgeError, Result};
use crate::publish::HassPublisher;
use crate::sensor::{
    build_driver, bus::DeviceFactory, PollSettings, ReadingSet, SensorDriver, SensorKind,
};
use tracing::{debug, error, info, warn};

/// Owns the configuration, drivers and publisher for one collection run
pub struct Bridge {
    config: BridgeConfig,
    publisher: HassPublisher,
    factory: Box<dyn DeviceFactory>,
}

impl Bridge {
    /// Validate configuration and prepare the publisher
    pub fn new(config: BridgeConfig, factory: Box<dyn DeviceFactory>) -> Result<Self> {
        config.validate()?;
        let target = config.publish_target()?;
        let publisher = HassPublisher::new(target, config.http_timeout)?;

        Ok(Self {
            config,
            publisher,
            factory,
        })
    }

    /// Execute one full collect-and-publish pass
    ///
    /// A driver that fails on the bus is dropped from the run with its
    /// readings; the remaining drivers still collect and publish. Publish
    /// failures are logged and never interrupt the sequence.
    pub async fn run(&self) -> Result<()> {
        let plan = self.resolve_sensors()?;

        let mut collected: Vec<(String, ReadingSet)> = Vec::new();
        for (entry, kind) in plan {
            match self.sample_sensor(entry, kind).await {
                Ok(readings) => {
                    info!(
                        sensor = entry.name.as_str(),
                        readings = readings.len(),
                        "collection complete"
                    );
                    collected.push((entry.name.clone(), readings));
                }
                Err(e) if e.is_config_error() => return Err(e),
                Err(e) => {
                    error!(sensor = entry.name.as_str(), "sensor failed, skipping: {e}");
                }
            }
        }

        for (driver_name, readings) in &collected {
            for (reading_name, reading) in readings.iter() {
                match self
                    .publisher
                    .publish(driver_name, reading_name, reading)
                    .await
                {
                    Ok(body) => debug!(
                        sensor = driver_name.as_str(),
                        reading = reading_name,
                        response = body.as_str(),
                        "published"
                    ),
                    Err(e) => warn!(
                        sensor = driver_name.as_str(),
                        reading = reading_name,
                        "publish failed: {e}"
                    ),
                }
                tokio::time::sleep(self.config.publish_interval).await;
            }
        }

        Ok(())
    }

    /// Resolve every configured sensor name before touching any hardware
    fn resolve_sensors(&self) -> Result<Vec<(&SensorEntry, SensorKind)>> {
        self.config
            .sensors
            .iter()
            .map(|entry| match SensorKind::from_name(&entry.name) {
                Some(kind) => Ok((entry, kind)),
                None => Err(BridgeError::config(format!(
                    "Unrecognized sensor name: {}",
                    entry.name
                ))),
            })
            .collect()
    }

    /// Run one driver through its full lifecycle and gather its readings
    async fn sample_sensor(&self, entry: &SensorEntry, kind: SensorKind) -> Result<ReadingSet> {
        let poll = PollSettings::new(entry.poll_interval, entry.poll_attempts);
        let mut driver = build_driver(kind, &entry.device, poll, self.factory.as_ref())?;

        match sample(driver.as_mut(), entry).await {
            Ok(readings) => Ok(readings),
            Err(e) => {
                // Best-effort idle so a failed driver does not keep measuring.
                if let Err(stop_err) = driver.stop().await {
                    debug!(sensor = entry.name.as_str(), "stop after failure: {stop_err}");
                }
                Err(e)
            }
        }
    }
}

async fn sample(driver: &mut dyn SensorDriver, entry: &SensorEntry) -> Result<ReadingSet> {
    driver.reset().await?;
    driver.start().await?;

    let mut readings = ReadingSet::new();
    for _ in 0..entry.cycles {
        let raw = driver.collect().await?;
        let batch = driver.normalize(&raw, entry.precision, driver.kind().default_unit())?;
        readings.extend(batch);
    }

    driver.stop().await?;
    Ok(readings)
}
