//! Bridge binary entry point
//!
//! Loads the settings file, initializes logging and executes one
//! collect-and-publish pass. Configuration errors terminate the process
//! with a non-zero exit code before any bus or network interaction.

use clap::Parser;
use pisensirion::sensor::bus::DeviceFactory;
use pisensirion::{Bridge, BridgeConfig, Result};
use std::path::PathBuf;
use tracing::{error, info};

/// Command line arguments
#[derive(Parser)]
#[command(name = "pisensirion")]
#[command(about = "Publish Sensirion sensor readings to Home Assistant")]
#[command(version)]
struct Cli {
    /// Path to the settings file
    #[arg(short, long, default_value = "settings.yaml", env = "PISENSIRION_CONFIG")]
    config: PathBuf,
}

#[cfg(target_os = "linux")]
fn device_factory() -> Result<Box<dyn DeviceFactory>> {
    Ok(Box::new(pisensirion::sensor::bus::LinuxI2cFactory::new()))
}

#[cfg(not(target_os = "linux"))]
fn device_factory() -> Result<Box<dyn DeviceFactory>> {
    Err(pisensirion::BridgeError::config(
        "I2C bus access requires Linux",
    ))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_config = pisensirion::logging::LogConfig::from_env();
    if let Err(e) = pisensirion::logging::init_logging(log_config) {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(1);
    }

    let config = match BridgeConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let factory = match device_factory() {
        Ok(factory) => factory,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let bridge = match Bridge::new(config, factory) {
        Ok(bridge) => bridge,
        Err(e) => {
            error!("Failed to initialize bridge: {e}");
            std::process::exit(1);
        }
    };

    info!("Starting sensor collection run");
    if let Err(e) = bridge.run().await {
        error!("Run failed: {e}");
        std::process::exit(1);
    }
    info!("Run complete");
}
