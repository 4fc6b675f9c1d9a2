// src/config/mod.rs
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::SwipeError;
use crate::processing::{Side, SAMPLE_SIZE};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct SwipeConfig {
    pub pins: PinsConfig,
    pub distances: DistancesConfig,
    pub timing: TimingConfig,
    pub session: SessionConfig,
}

/// BCM pin numbers. The trigger pin drives both sensors.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PinsConfig {
    pub trigger: u8,
    pub echo_left: u8,
    pub echo_right: u8,
}

/// Distances in centimeters.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DistancesConfig {
    // proximity thresholds, per side
    pub left: u32,
    pub right: u32,
    // anything beyond this is a sensor timeout
    pub max: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    pub sample_interval_ms: u64,
    pub switch_duration_ms: u64,
    pub latency_us: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub calibrate: bool,
    pub verbose: bool,
    pub auto_start: bool,
    pub enable_debug_logging: bool,
}

impl Default for PinsConfig {
    fn default() -> Self {
        Self {
            trigger: 23,
            echo_left: 24,
            echo_right: 26,
        }
    }
}

impl Default for DistancesConfig {
    fn default() -> Self {
        Self {
            left: 50,
            right: 50,
            max: 200,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 300,
            switch_duration_ms: 1000,
            latency_us: 1000,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            calibrate: false,
            verbose: false,
            auto_start: true,
            enable_debug_logging: false,
        }
    }
}

impl SwipeConfig {
    pub fn validate(&self) -> Result<(), SwipeError> {
        let pins = &self.pins;
        if pins.trigger == pins.echo_left
            || pins.trigger == pins.echo_right
            || pins.echo_left == pins.echo_right
        {
            return Err(SwipeError::Config(format!(
                "trigger ({}), echo_left ({}) and echo_right ({}) must be distinct pins",
                pins.trigger, pins.echo_left, pins.echo_right
            )));
        }
        if self.distances.max == 0 {
            return Err(SwipeError::Config("distances.max must be > 0".to_string()));
        }
        if self.timing.sample_interval_ms == 0 {
            return Err(SwipeError::Config(
                "timing.sample_interval_ms must be > 0".to_string(),
            ));
        }
        if self.timing.switch_duration_ms < SAMPLE_SIZE as u64 {
            return Err(SwipeError::Config(format!(
                "timing.switch_duration_ms must be at least {} ms",
                SAMPLE_SIZE
            )));
        }
        Ok(())
    }

    /// Proximity threshold for one side.
    pub fn threshold(&self, side: Side) -> u32 {
        match side {
            Side::Left => self.distances.left,
            Side::Right => self.distances.right,
        }
    }

    pub fn echo_pin(&self, side: Side) -> u8 {
        match side {
            Side::Left => self.pins.echo_left,
            Side::Right => self.pins.echo_right,
        }
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.timing.sample_interval_ms)
    }

    /// Trigger cadence while a gesture window is open.
    pub fn countdown_interval(&self) -> Duration {
        Duration::from_millis(self.timing.switch_duration_ms / SAMPLE_SIZE as u64)
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SwipeConfig, SwipeError> {
    let config_str = fs::read_to_string(path)?;
    let config: SwipeConfig = serde_yaml::from_str(&config_str)?;
    config.validate()?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(config: &SwipeConfig, path: P) -> Result<(), SwipeError> {
    let yaml = serde_yaml::to_string(config)?;
    fs::write(path, yaml)?;
    Ok(())
}
