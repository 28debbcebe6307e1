//! # Error Types
//!
//! Custom error types for vrpad-bridge using `thiserror`.

use thiserror::Error;

/// Main error type for vrpad-bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Calibration record could not be encoded or decoded
    #[error("Calibration record error: {0}")]
    Calibration(#[from] serde_json::Error),

    /// No head-mounted sensor is available at startup
    #[error("No head-mounted display detected")]
    HeadsetNotFound,

    /// Virtual gamepad could not be created or written
    #[error("Output device error: {0}")]
    OutputDevice(String),

    /// Tracking runtime errors (haptics, replay input)
    #[error("Tracking error: {0}")]
    Tracking(String),
}

/// Result type alias for vrpad-bridge
pub type Result<T> = std::result::Result<T, BridgeError>;
