//! End-to-end pipeline tests
//!
//! Runs the full bridge against scripted device links and a mock Home
//! Assistant server, verifying entity addressing, payload shape, publish
//! ordering and the failure policies.

use pisensirion::config::{BridgeConfig, SensorEntry};
use pisensirion::error::Result;
use pisensirion::sensor::bus::{DeviceFactory, Scd4xLink, Sen5xLink};
use pisensirion::{Bridge, BridgeError};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Scripted SCD41 link
struct FakeScd4x {
    triple: (f64, f64, f64),
    fail_collect: bool,
}

impl Scd4xLink for FakeScd4x {
    fn stop_periodic_measurement(&mut self) -> Result<()> {
        Ok(())
    }

    fn wake_up(&mut self) -> Result<()> {
        Ok(())
    }

    fn measure_single_shot(&mut self) -> Result<()> {
        if self.fail_collect {
            return Err(BridgeError::transport("scd41 not responding"));
        }
        Ok(())
    }

    fn read_measurement(&mut self) -> Result<(f64, f64, f64)> {
        Ok(self.triple)
    }
}

/// Scripted SEN55 link that is ready on the first check
struct FakeSen5x {
    report: String,
}

impl Sen5xLink for FakeSen5x {
    fn device_reset(&mut self) -> Result<()> {
        Ok(())
    }

    fn start_measurement(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop_measurement(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_data_ready(&mut self) -> Result<bool> {
        Ok(true)
    }

    fn read_measured_values(&mut self) -> Result<String> {
        Ok(self.report.clone())
    }
}

struct TestFactory {
    scd41_triple: (f64, f64, f64),
    scd41_fail_collect: bool,
    sen55_report: String,
}

impl Default for TestFactory {
    fn default() -> Self {
        Self {
            scd41_triple: (612.0, 21.3, 40.0),
            scd41_fail_collect: false,
            sen55_report: "Temperature:21.3 °C,Humidity:40 %RS".to_string(),
        }
    }
}

impl DeviceFactory for TestFactory {
    fn open_scd4x(&self, _device: &str) -> Result<Box<dyn Scd4xLink>> {
        Ok(Box::new(FakeScd4x {
            triple: self.scd41_triple,
            fail_collect: self.scd41_fail_collect,
        }))
    }

    fn open_sen5x(&self, _device: &str) -> Result<Box<dyn Sen5xLink>> {
        Ok(Box::new(FakeSen5x {
            report: self.sen55_report.clone(),
        }))
    }
}

fn sensor_entry(name: &str) -> SensorEntry {
    SensorEntry {
        name: name.to_string(),
        device: "/dev/i2c-1".to_string(),
        cycles: 1,
        precision: 1,
        poll_interval: Duration::from_millis(1),
        poll_attempts: 5,
    }
}

async fn test_config(server: &MockServer, sensors: &[&str]) -> BridgeConfig {
    let uri = url::Url::parse(&server.uri()).expect("mock server uri");
    BridgeConfig {
        host: uri.host_str().expect("host").to_string(),
        port: uri.port().expect("port"),
        token: "secret-token".to_string(),
        location: "Lab".to_string(),
        sensors: sensors.iter().map(|name| sensor_entry(name)).collect(),
        publish_interval: Duration::from_millis(1),
        http_timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn test_sen55_end_to_end() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/states/sensor.lab_sen55_temperature"))
        .and(header("authorization", "Bearer secret-token"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "state": 21.3,
            "attributes": {
                "unit_of_measurement": "°C",
                "friendly_name": "Lab - sen55 - Temperature",
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("created"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/states/sensor.lab_sen55_humidity"))
        .and(body_json(json!({
            "state": 40.0,
            "attributes": {
                "unit_of_measurement": "%RS",
                "friendly_name": "Lab - sen55 - Humidity",
            }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server, &["sen55"]).await;
    let bridge = Bridge::new(config, Box::new(TestFactory::default())).unwrap();
    bridge.run().await.unwrap();

    server.verify().await;
}

#[tokio::test]
async fn test_publish_order_follows_driver_then_insertion_order() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let config = test_config(&server, &["scd41", "sen55"]).await;
    let bridge = Bridge::new(config, Box::new(TestFactory::default())).unwrap();
    bridge.run().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let paths: Vec<String> = requests.iter().map(|r| r.url.path().to_string()).collect();
    assert_eq!(
        paths,
        vec![
            "/api/states/sensor.lab_scd41_co2",
            "/api/states/sensor.lab_scd41_temperature",
            "/api/states/sensor.lab_scd41_humidity",
            "/api/states/sensor.lab_sen55_temperature",
            "/api/states/sensor.lab_sen55_humidity",
        ]
    );
}

#[tokio::test]
async fn test_unrecognized_sensor_aborts_with_zero_requests() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let config = test_config(&server, &["sen55", "dht22"]).await;
    let bridge = Bridge::new(config, Box::new(TestFactory::default())).unwrap();

    let err = bridge.run().await.unwrap_err();
    assert!(matches!(err, BridgeError::Config(_)));

    let requests = server.received_requests().await.unwrap();
    assert!(requests.is_empty(), "expected zero outbound requests");
}

#[tokio::test]
async fn test_rejected_state_update_does_not_abort_sequence() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/states/sensor.lab_sen55_temperature"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/states/sensor.lab_sen55_humidity"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server, &["sen55"]).await;
    let bridge = Bridge::new(config, Box::new(TestFactory::default())).unwrap();
    bridge.run().await.unwrap();

    server.verify().await;
}

#[tokio::test]
async fn test_failed_driver_is_skipped_but_run_continues() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let factory = TestFactory {
        scd41_fail_collect: true,
        ..TestFactory::default()
    };
    let config = test_config(&server, &["scd41", "sen55"]).await;
    let bridge = Bridge::new(config, Box::new(factory)).unwrap();
    bridge.run().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let paths: Vec<String> = requests.iter().map(|r| r.url.path().to_string()).collect();
    assert_eq!(
        paths,
        vec![
            "/api/states/sensor.lab_sen55_temperature",
            "/api/states/sensor.lab_sen55_humidity",
        ]
    );
}
