// src/hardware/mod.rs
#[cfg(feature = "rpi")]
pub mod rpi;
pub mod sim;

use std::thread;
use std::time::Duration;

use crate::error::SwipeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
}

/// One transition on an echo line. `timestamp` is monotonic; only
/// differences between timestamps on the same line are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeEvent {
    pub edge: Edge,
    pub timestamp: Duration,
}

impl EdgeEvent {
    pub fn rising(timestamp: Duration) -> Self {
        Self {
            edge: Edge::Rising,
            timestamp,
        }
    }

    pub fn falling(timestamp: Duration) -> Self {
        Self {
            edge: Edge::Falling,
            timestamp,
        }
    }
}

pub type EdgeCallback = Box<dyn FnMut(Result<EdgeEvent, SwipeError>) + Send + 'static>;

// LINE CAPABILITIES -----------------------------------------------------------

pub trait OutputLine: Send {
    fn pin(&self) -> u8;
    fn write(&mut self, level: Level) -> Result<(), SwipeError>;
}

pub trait EchoLine: Send {
    fn pin(&self) -> u8;

    /// Registers `callback` for every transition on the line, replacing any
    /// previous registration.
    fn watch(&mut self, callback: EdgeCallback) -> Result<(), SwipeError>;

    /// Removes the registered callback. No-op if nothing is registered.
    fn unwatch(&mut self) -> Result<(), SwipeError>;
}

pub trait GpioBackend {
    fn output(&mut self, pin: u8) -> Result<Box<dyn OutputLine>, SwipeError>;
    fn input(&mut self, pin: u8) -> Result<Box<dyn EchoLine>, SwipeError>;
}

// SLEEP -----------------------------------------------------------------------

pub trait Sleeper: Send + Sync {
    fn sleep_us(&self, micros: u64);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep_us(&self, micros: u64) {
        if micros > 0 {
            thread::sleep(Duration::from_micros(micros));
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Sleeper;
    use std::sync::Mutex;

    /// Records requested sleeps instead of blocking.
    #[derive(Default)]
    pub struct RecordingSleeper {
        pub sleeps: Mutex<Vec<u64>>,
    }

    impl RecordingSleeper {
        pub fn recorded(&self) -> Vec<u64> {
            self.sleeps.lock().unwrap().clone()
        }
    }

    impl Sleeper for RecordingSleeper {
        fn sleep_us(&self, micros: u64) {
            self.sleeps.lock().unwrap().push(micros);
        }
    }
}
