//! Bus transport boundary for the Sensirion vendor devices
//!
//! The pipeline never touches bus framing directly: drivers see only the
//! [`Scd4xLink`] and [`Sen5xLink`] traits, and the orchestrator binds device
//! paths through a [`DeviceFactory`]. The Linux implementations below carry
//! the minimal Sensirion command layer (big-endian 16-bit commands, 2-byte
//! data words followed by a CRC-8) over `/dev/i2c-*`.

use crate::error::Result;

/// Vendor link for the SCD4x CO2 sensor family
pub trait Scd4xLink: Send {
    /// Halt periodic background measurement
    fn stop_periodic_measurement(&mut self) -> Result<()>;

    /// Wake the device from sleep
    fn wake_up(&mut self) -> Result<()>;

    /// Issue one single-shot measurement command
    fn measure_single_shot(&mut self) -> Result<()>;

    /// Read back the raw triple: CO2 (ppm), temperature (°C), humidity (%RS)
    fn read_measurement(&mut self) -> Result<(f64, f64, f64)>;
}

/// Vendor link for the SEN5x environmental node family
pub trait Sen5xLink: Send {
    /// Full device reset
    fn device_reset(&mut self) -> Result<()>;

    /// Begin continuous measurement
    fn start_measurement(&mut self) -> Result<()>;

    /// End continuous measurement
    fn stop_measurement(&mut self) -> Result<()>;

    /// Whether a new measurement batch is available
    fn read_data_ready(&mut self) -> Result<bool>;

    /// Read one batch as comma-delimited `name:value unit` entries
    fn read_measured_values(&mut self) -> Result<String>;
}

/// Binds configured device paths to vendor links
pub trait DeviceFactory: Send + Sync {
    fn open_scd4x(&self, device: &str) -> Result<Box<dyn Scd4xLink>>;
    fn open_sen5x(&self, device: &str) -> Result<Box<dyn Sen5xLink>>;
}

#[cfg(target_os = "linux")]
pub use linux::LinuxI2cFactory;

#[cfg(target_os = "linux")]
mod linux {
    use super::{DeviceFactory, Scd4xLink, Sen5xLink};
    use crate::error::{BridgeError, Result};
    use i2cdev::core::I2CDevice;
    use i2cdev::linux::LinuxI2CDevice;
    use std::thread;
    use std::time::Duration;

    const SCD4X_ADDRESS: u16 = 0x62;
    const SEN5X_ADDRESS: u16 = 0x69;

    const SCD4X_CMD_WAKE_UP: u16 = 0x36F6;
    const SCD4X_CMD_STOP_PERIODIC: u16 = 0x3F86;
    const SCD4X_CMD_MEASURE_SINGLE_SHOT: u16 = 0x219D;
    const SCD4X_CMD_READ_MEASUREMENT: u16 = 0xEC05;

    const SEN5X_CMD_RESET: u16 = 0xD304;
    const SEN5X_CMD_START_MEASUREMENT: u16 = 0x0021;
    const SEN5X_CMD_STOP_MEASUREMENT: u16 = 0x0104;
    const SEN5X_CMD_READ_DATA_READY: u16 = 0x0202;
    const SEN5X_CMD_READ_MEASURED_VALUES: u16 = 0x03C4;

    /// Sensirion CRC-8: polynomial 0x31, init 0xFF, over each data word
    fn crc8(data: &[u8]) -> u8 {
        let mut crc: u8 = 0xFF;
        for &byte in data {
            crc ^= byte;
            for _ in 0..8 {
                crc = if crc & 0x80 != 0 {
                    (crc << 1) ^ 0x31
                } else {
                    crc << 1
                };
            }
        }
        crc
    }

    /// Word-oriented command transport shared by both links
    struct SensirionBus {
        device: LinuxI2CDevice,
        path: String,
    }

    impl SensirionBus {
        fn open(path: &str, address: u16) -> Result<Self> {
            let device = LinuxI2CDevice::new(path, address).map_err(|e| {
                BridgeError::transport(format!("Failed to open {path} at 0x{address:02x}: {e}"))
            })?;
            Ok(Self {
                device,
                path: path.to_string(),
            })
        }

        fn command(&mut self, command: u16) -> Result<()> {
            self.device.write(&command.to_be_bytes()).map_err(|e| {
                BridgeError::transport(format!(
                    "Command 0x{command:04x} failed on {}: {e}",
                    self.path
                ))
            })
        }

        fn command_wait(&mut self, command: u16, delay: Duration) -> Result<()> {
            self.command(command)?;
            thread::sleep(delay);
            Ok(())
        }

        fn read_words(&mut self, count: usize) -> Result<Vec<u16>> {
            let mut buffer = vec![0u8; count * 3];
            self.device.read(&mut buffer).map_err(|e| {
                BridgeError::transport(format!("Read failed on {}: {e}", self.path))
            })?;

            let mut words = Vec::with_capacity(count);
            for chunk in buffer.chunks_exact(3) {
                if crc8(&chunk[..2]) != chunk[2] {
                    return Err(BridgeError::transport(format!(
                        "CRC mismatch in response from {}",
                        self.path
                    )));
                }
                words.push(u16::from_be_bytes([chunk[0], chunk[1]]));
            }
            Ok(words)
        }
    }

    /// SCD41 over Linux userland I2C
    pub struct LinuxScd4x {
        bus: SensirionBus,
    }

    impl LinuxScd4x {
        pub fn open(path: &str) -> Result<Self> {
            Ok(Self {
                bus: SensirionBus::open(path, SCD4X_ADDRESS)?,
            })
        }
    }

    impl Scd4xLink for LinuxScd4x {
        fn stop_periodic_measurement(&mut self) -> Result<()> {
            self.bus
                .command_wait(SCD4X_CMD_STOP_PERIODIC, Duration::from_millis(500))
        }

        fn wake_up(&mut self) -> Result<()> {
            // The SCD4x does not acknowledge the wake-up command, so a NAK
            // here is expected and ignored.
            let _ = self.bus.command(SCD4X_CMD_WAKE_UP);
            thread::sleep(Duration::from_millis(20));
            Ok(())
        }

        fn measure_single_shot(&mut self) -> Result<()> {
            self.bus
                .command_wait(SCD4X_CMD_MEASURE_SINGLE_SHOT, Duration::from_millis(5000))
        }

        fn read_measurement(&mut self) -> Result<(f64, f64, f64)> {
            self.bus
                .command_wait(SCD4X_CMD_READ_MEASUREMENT, Duration::from_millis(1))?;
            let words = self.bus.read_words(3)?;

            let co2 = f64::from(words[0]);
            let temperature = -45.0 + 175.0 * f64::from(words[1]) / 65535.0;
            let humidity = 100.0 * f64::from(words[2]) / 65535.0;
            Ok((co2, temperature, humidity))
        }
    }

    /// SEN55 over Linux userland I2C
    pub struct LinuxSen5x {
        bus: SensirionBus,
    }

    impl LinuxSen5x {
        pub fn open(path: &str) -> Result<Self> {
            Ok(Self {
                bus: SensirionBus::open(path, SEN5X_ADDRESS)?,
            })
        }
    }

    /// Format a scaled unsigned word, `0xFFFF` meaning "no value yet"
    fn unsigned_value(raw: u16, scale: f64) -> String {
        if raw == 0xFFFF {
            "n/a".to_string()
        } else {
            format!("{:.2}", f64::from(raw) / scale)
        }
    }

    /// Format a scaled signed word, `0x7FFF` meaning "no value yet"
    fn signed_value(raw: u16, scale: f64) -> String {
        let value = raw as i16;
        if value == i16::MAX {
            "n/a".to_string()
        } else {
            format!("{:.2}", f64::from(value) / scale)
        }
    }

    impl Sen5xLink for LinuxSen5x {
        fn device_reset(&mut self) -> Result<()> {
            self.bus
                .command_wait(SEN5X_CMD_RESET, Duration::from_millis(100))
        }

        fn start_measurement(&mut self) -> Result<()> {
            self.bus
                .command_wait(SEN5X_CMD_START_MEASUREMENT, Duration::from_millis(50))
        }

        fn stop_measurement(&mut self) -> Result<()> {
            self.bus
                .command_wait(SEN5X_CMD_STOP_MEASUREMENT, Duration::from_millis(200))
        }

        fn read_data_ready(&mut self) -> Result<bool> {
            self.bus
                .command_wait(SEN5X_CMD_READ_DATA_READY, Duration::from_millis(20))?;
            let words = self.bus.read_words(1)?;
            Ok(words[0] & 0x00FF != 0)
        }

        fn read_measured_values(&mut self) -> Result<String> {
            self.bus
                .command_wait(SEN5X_CMD_READ_MEASURED_VALUES, Duration::from_millis(20))?;
            let words = self.bus.read_words(8)?;

            Ok(format!(
                "PM1.0:{} µg/m³,PM2.5:{} µg/m³,PM4.0:{} µg/m³,PM10.0:{} µg/m³,\
                 Humidity:{} %RS,Temperature:{} °C,VOC Index:{},NOx Index:{}",
                unsigned_value(words[0], 10.0),
                unsigned_value(words[1], 10.0),
                unsigned_value(words[2], 10.0),
                unsigned_value(words[3], 10.0),
                signed_value(words[4], 100.0),
                signed_value(words[5], 200.0),
                signed_value(words[6], 10.0),
                signed_value(words[7], 10.0),
            ))
        }
    }

    /// Binds device paths to the Linux I2C links
    #[derive(Debug, Default)]
    pub struct LinuxI2cFactory;

    impl LinuxI2cFactory {
        pub fn new() -> Self {
            Self
        }
    }

    impl DeviceFactory for LinuxI2cFactory {
        fn open_scd4x(&self, device: &str) -> Result<Box<dyn Scd4xLink>> {
            Ok(Box::new(LinuxScd4x::open(device)?))
        }

        fn open_sen5x(&self, device: &str) -> Result<Box<dyn Sen5xLink>> {
            Ok(Box::new(LinuxSen5x::open(device)?))
        }
    }

}
