// src/error.rs
use thiserror::Error;

/// Errors surfaced by the swipe listener.
///
/// Out-of-range echo readings are not errors; they are dropped by the
/// validity filter in `EchoCapture`.
#[derive(Debug, Error)]
pub enum SwipeError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read config file: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("failed to initialise GPIO line {pin}: {reason}")]
    LineInit { pin: u8, reason: String },

    #[error("failed to write GPIO line {pin}: {reason}")]
    LineWrite { pin: u8, reason: String },

    #[error("echo line {pin} reported a fault: {reason}")]
    EdgeFault { pin: u8, reason: String },

    #[error("listener has not been configured")]
    NotConfigured,

    #[error("detection worker panicked")]
    WorkerPanicked,

    #[error("failed to read scene: {0}")]
    Scene(String),

    #[cfg(feature = "rpi")]
    #[error("gpio driver error: {0}")]
    Gpio(#[from] rppal::gpio::Error),
}

impl From<csv::Error> for SwipeError {
    fn from(e: csv::Error) -> Self {
        SwipeError::Scene(e.to_string())
    }
}
