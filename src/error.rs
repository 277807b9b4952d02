//! Error types for the Sensirion-to-Home-Assistant bridge

use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Error types for sensor polling and publishing operations
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Configuration errors (bad settings file, unrecognized sensor name)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Bus transport errors (device unreachable, vendor protocol failure)
    #[error("Bus transport error: {0}")]
    Transport(String),

    /// Timeout errors (ready flag never observed)
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Driver lifecycle misuse (e.g. collect before start)
    #[error("Invalid driver state: {0}")]
    InvalidState(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors
    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl BridgeError {
    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a bus transport error
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a driver lifecycle error
    pub fn invalid_state<S: Into<String>>(msg: S) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Check if the error is fatal for the whole run rather than one driver
    pub fn is_config_error(&self) -> bool {
        matches!(self, BridgeError::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = BridgeError::transport("device not responding");
        let rendered = format!("{error}");
        assert!(rendered.contains("Bus transport error"));
        assert!(rendered.contains("device not responding"));
    }

    #[test]
    fn test_config_error_classification() {
        assert!(BridgeError::config("unrecognized sensor").is_config_error());
        assert!(!BridgeError::timeout("ready flag").is_config_error());
    }
}
