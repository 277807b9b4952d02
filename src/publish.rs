//! State publishing to the Home Assistant REST API
//!
//! Each reading becomes one `POST /api/states/sensor.{entity_key}` where the
//! entity key is the snake-case normalization of
//! `"{location} - {driver} - {reading}"`. The same three inputs always
//! address the same remote entity. Failures are surfaced for logging but
//! never retried here; pacing between calls is the orchestrator's job.

use crate::error::{BridgeError, Result};
use crate::sensor::Reading;
use crate::text::snake_case;
use reqwest::{Client, ClientBuilder};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Immutable publish destination, derived once from configuration
#[derive(Debug, Clone)]
pub struct PublishTarget {
    /// Location label prefixed to every entity key and friendly name
    pub location: String,

    /// Home Assistant base URL
    pub base_url: Url,

    /// Long-lived access token
    pub token: String,
}

impl PublishTarget {
    pub fn new(location: &str, host: &str, port: u16, token: &str) -> Result<Self> {
        let base_url = Url::parse(&format!("http://{host}:{port}/"))
            .map_err(|e| BridgeError::config(format!("Invalid host/port: {e}")))?;

        Ok(Self {
            location: location.to_string(),
            base_url,
            token: token.to_string(),
        })
    }
}

/// State-update request body
#[derive(Debug, Serialize)]
struct StateUpdate<'a> {
    state: f64,
    attributes: StateAttributes<'a>,
}

#[derive(Debug, Serialize)]
struct StateAttributes<'a> {
    unit_of_measurement: &'a str,
    friendly_name: &'a str,
}

/// HTTP publisher for normalized readings
pub struct HassPublisher {
    client: Client,
    target: PublishTarget,
}

impl HassPublisher {
    /// Create a publisher with the bearer token installed as a default header
    pub fn new(target: PublishTarget, timeout: Duration) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        let auth_value = reqwest::header::HeaderValue::from_str(&format!(
            "Bearer {token}",
            token = target.token
        ))
        .map_err(|e| BridgeError::config(format!("Invalid authorization header: {e}")))?;
        headers.insert(reqwest::header::AUTHORIZATION, auth_value);

        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(format!("pisensirion/{}", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| BridgeError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, target })
    }

    /// The human-readable label a reading is published under
    pub fn friendly_name(&self, driver: &str, reading_name: &str) -> String {
        format!(
            "{location} - {driver} - {reading_name}",
            location = self.target.location
        )
    }

    /// The normalized key segment addressing a reading's remote entity
    pub fn entity_key(&self, driver: &str, reading_name: &str) -> String {
        snake_case(&self.friendly_name(driver, reading_name))
    }

    /// The full state-update URL for a reading
    pub fn state_url(&self, driver: &str, reading_name: &str) -> Result<Url> {
        let path = format!(
            "api/states/sensor.{key}",
            key = self.entity_key(driver, reading_name)
        );
        self.target
            .base_url
            .join(&path)
            .map_err(|e| BridgeError::config(format!("Invalid state URL: {e}")))
    }

    /// Publish one reading; returns the raw response body for logging
    ///
    /// Exactly one outbound request per call. Non-2xx responses are logged
    /// and returned like any other body; only transport-level failures map
    /// to an error.
    pub async fn publish(&self, driver: &str, reading_name: &str, reading: &Reading) -> Result<String> {
        let url = self.state_url(driver, reading_name)?;
        let friendly_name = self.friendly_name(driver, reading_name);
        let payload = StateUpdate {
            state: reading.value,
            attributes: StateAttributes {
                unit_of_measurement: &reading.unit,
                friendly_name: &friendly_name,
            },
        };

        let response = self.client.post(url.clone()).json(&payload).send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.is_success() {
            debug!(%url, %status, "state update accepted");
        } else {
            warn!(%url, %status, %body, "state update rejected");
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn test_publisher() -> HassPublisher {
        let target = PublishTarget::new("Living Room", "homeassistant.local", 8123, "tok").unwrap();
        HassPublisher::new(target, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_entity_key_normalization() {
        let publisher = test_publisher();
        assert_eq!(
            publisher.entity_key("sen55", "Temperature"),
            "living_room_sen55_temperature"
        );
        assert_eq!(publisher.entity_key("scd41", "CO2"), "living_room_scd41_co2");
    }

    #[test]
    fn test_state_url_is_deterministic() {
        let publisher = test_publisher();
        let first = publisher.state_url("sen55", "Temperature").unwrap();
        let second = publisher.state_url("sen55", "Temperature").unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first.as_str(),
            "http://homeassistant.local:8123/api/states/sensor.living_room_sen55_temperature"
        );
    }

    #[test]
    fn test_payload_shape() {
        let reading = Reading::new(21.3, "°C");
        let payload = StateUpdate {
            state: reading.value,
            attributes: StateAttributes {
                unit_of_measurement: &reading.unit,
                friendly_name: "Living Room - sen55 - Temperature",
            },
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "state": 21.3,
                "attributes": {
                    "unit_of_measurement": "°C",
                    "friendly_name": "Living Room - sen55 - Temperature",
                }
            })
        );
    }
}
