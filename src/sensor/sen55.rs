//! SEN55 driver: continuous measurement with a self-describing schema
//!
//! The SEN55 streams batches once continuous measurement is running. Each
//! collect cycle polls the device's ready flag at a configured interval,
//! bounded by a configured attempt count, then reads one comma-delimited
//! batch of `name:value unit` entries. Normalization parses each entry
//! through the raw token splitter, so the reading names come from the device
//! itself; values without a unit get the variant default (`Index`).

use super::bus::Sen5xLink;
use super::{
    require_active, DriverState, PollSettings, RawBatch, Reading, ReadingSet, SensorDriver,
    SensorKind,
};
use crate::error::{BridgeError, Result};
use crate::text::{clean_value, split_fields};
use async_trait::async_trait;
use tracing::{debug, trace};

/// Streaming driver for the Sensirion SEN55
pub struct Sen55Driver {
    link: Box<dyn Sen5xLink>,
    state: DriverState,
    poll: PollSettings,
}

impl Sen55Driver {
    pub fn new(link: Box<dyn Sen5xLink>, poll: PollSettings) -> Self {
        Self {
            link,
            state: DriverState::Idle,
            poll,
        }
    }

    /// Wait for the ready flag, bounded by the configured attempt count
    async fn await_data_ready(&mut self) -> Result<()> {
        for attempt in 1..=self.poll.max_attempts {
            if self.link.read_data_ready()? {
                trace!(attempt, "sen55 data ready");
                return Ok(());
            }
            tokio::time::sleep(self.poll.interval).await;
        }

        Err(BridgeError::timeout(format!(
            "sen55 ready flag not observed after {} checks at {:?} intervals",
            self.poll.max_attempts, self.poll.interval
        )))
    }
}

#[async_trait]
impl SensorDriver for Sen55Driver {
    fn kind(&self) -> SensorKind {
        SensorKind::Sen55
    }

    fn state(&self) -> DriverState {
        self.state
    }

    async fn reset(&mut self) -> Result<()> {
        self.link.device_reset()?;
        self.state = DriverState::Idle;
        Ok(())
    }

    async fn start(&mut self) -> Result<()> {
        if self.state == DriverState::Active {
            return Err(BridgeError::invalid_state(
                "start on sen55 while a measurement session is active",
            ));
        }
        self.link.start_measurement()?;
        self.state = DriverState::Active;
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if self.state == DriverState::Idle {
            debug!("stop on idle sen55 ignored");
            return Ok(());
        }
        self.link.stop_measurement()?;
        self.state = DriverState::Idle;
        Ok(())
    }

    async fn collect(&mut self) -> Result<RawBatch> {
        require_active(self.state, self.kind(), "collect")?;

        self.await_data_ready().await?;
        let report = self.link.read_measured_values()?;
        debug!(%report, "sen55 batch read");
        Ok(RawBatch::Report(report))
    }

    fn normalize(&self, raw: &RawBatch, precision: i32, default_unit: &str) -> Result<ReadingSet> {
        let report = match raw {
            RawBatch::Report(report) => report,
            RawBatch::SingleShot { .. } => {
                return Err(BridgeError::invalid_state(
                    "sen55 cannot normalize a fixed-schema triple",
                ))
            }
        };

        let mut readings = ReadingSet::new();
        if report.trim().is_empty() {
            return Ok(readings);
        }

        for entry in report.split(',') {
            let fields = split_fields(entry, ':', "", 2);
            let (name, value_side) = (&fields[0], &fields[1]);

            let value_fields = split_fields(value_side, ' ', default_unit, 2);
            let (value, unit) = (&value_fields[0], &value_fields[1]);

            readings.insert(
                name.clone(),
                Reading::new(clean_value(value, 0.0, precision), unit.clone()),
            );
        }
        Ok(readings)
    }
}
