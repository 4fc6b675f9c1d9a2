// src/hardware/sim.rs
//
// In-process stand-in for the GPIO header. Every trigger pulse makes each
// watched echo line report the next scripted distance as a rising/falling
// edge pair whose spacing is the ultrasonic round trip.

use rand::Rng;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::{EchoLine, EdgeCallback, EdgeEvent, GpioBackend, Level, OutputLine};
use crate::error::SwipeError;
use crate::processing::MICROSECONDS_PER_CM;

const MAX_BCM_PIN: u8 = 27;

// -----------------------------------------------------------------------------
// SHARED STATE
// -----------------------------------------------------------------------------

#[derive(Default)]
struct EchoScript {
    readings: VecDeque<Option<u32>>,
    idle: Option<u32>,
    callback: Option<EdgeCallback>,
    fault: Option<String>,
}

struct SimState {
    origin: Instant,
    claimed: HashSet<u8>,
    echoes: HashMap<u8, EchoScript>,
    failing_outputs: HashSet<u8>,
    jitter_us: u64,
    pulses: usize,
}

impl SimState {
    fn claim(&mut self, pin: u8) -> Result<(), SwipeError> {
        if pin > MAX_BCM_PIN {
            return Err(SwipeError::LineInit {
                pin,
                reason: format!("no such BCM pin (max {})", MAX_BCM_PIN),
            });
        }
        if !self.claimed.insert(pin) {
            return Err(SwipeError::LineInit {
                pin,
                reason: "line busy".to_string(),
            });
        }
        Ok(())
    }

    fn fire_pulse(&mut self) {
        self.pulses += 1;
        let now = self.origin.elapsed();
        let jitter_us = self.jitter_us;
        let mut rng = rand::thread_rng();

        let mut pins: Vec<u8> = self.echoes.keys().copied().collect();
        pins.sort_unstable();
        for pin in pins {
            let script = match self.echoes.get_mut(&pin) {
                Some(script) => script,
                None => continue,
            };
            let callback = match script.callback.as_mut() {
                Some(callback) => callback,
                None => continue,
            };
            if let Some(reason) = script.fault.take() {
                callback(Err(SwipeError::EdgeFault { pin, reason }));
                continue;
            }
            let reading = script.readings.pop_front().unwrap_or(script.idle);
            // No echo at all: the line never goes high
            let Some(cm) = reading else { continue };

            let mut round_trip_us = cm as f64 * 2.0 * MICROSECONDS_PER_CM;
            if jitter_us > 0 {
                round_trip_us += rng.gen_range(0..=jitter_us) as f64;
            }
            let rising = now;
            let falling = now + Duration::from_secs_f64(round_trip_us / 1e6);
            callback(Ok(EdgeEvent::rising(rising)));
            callback(Ok(EdgeEvent::falling(falling)));
        }
    }
}

// -----------------------------------------------------------------------------
// BACKEND
// -----------------------------------------------------------------------------

/// Cloneable handle; clones share the same simulated header so a test can
/// keep scripting readings after handing the backend to a listener.
#[derive(Clone)]
pub struct SimulatedGpio {
    state: Arc<Mutex<SimState>>,
}

impl Default for SimulatedGpio {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedGpio {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                origin: Instant::now(),
                claimed: HashSet::new(),
                echoes: HashMap::new(),
                failing_outputs: HashSet::new(),
                jitter_us: 0,
                pulses: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        // A panicking callback must not wedge every later test step
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queues distances (cm) reported by `pin`, one per trigger pulse.
    /// `None` means the sensor produced no echo for that pulse.
    pub fn push_readings<I>(&self, pin: u8, readings: I)
    where
        I: IntoIterator<Item = Option<u32>>,
    {
        let mut state = self.lock();
        let script = state.echoes.entry(pin).or_default();
        script.readings.extend(readings);
    }

    /// Distance reported once the queued readings run out.
    pub fn set_idle(&self, pin: u8, idle: Option<u32>) {
        self.lock().echoes.entry(pin).or_default().idle = idle;
    }

    /// Random extra round-trip time added to every echo, in microseconds.
    pub fn set_jitter_us(&self, jitter_us: u64) {
        self.lock().jitter_us = jitter_us;
    }

    /// The next pulse delivers a driver fault on `pin` instead of edges.
    pub fn inject_fault(&self, pin: u8, reason: &str) {
        self.lock().echoes.entry(pin).or_default().fault = Some(reason.to_string());
    }

    pub fn fail_writes(&self, pin: u8) {
        self.lock().failing_outputs.insert(pin);
    }

    pub fn pulses(&self) -> usize {
        self.lock().pulses
    }

    pub fn pending_readings(&self, pin: u8) -> usize {
        self.lock()
            .echoes
            .get(&pin)
            .map_or(0, |script| script.readings.len())
    }

    pub fn is_watched(&self, pin: u8) -> bool {
        self.lock()
            .echoes
            .get(&pin)
            .map_or(false, |script| script.callback.is_some())
    }

    pub fn is_claimed(&self, pin: u8) -> bool {
        self.lock().claimed.contains(&pin)
    }
}

impl GpioBackend for SimulatedGpio {
    fn output(&mut self, pin: u8) -> Result<Box<dyn OutputLine>, SwipeError> {
        self.lock().claim(pin)?;
        Ok(Box::new(SimOutput {
            pin,
            level: Level::Low,
            state: Arc::clone(&self.state),
        }))
    }

    fn input(&mut self, pin: u8) -> Result<Box<dyn EchoLine>, SwipeError> {
        let mut state = self.lock();
        state.claim(pin)?;
        state.echoes.entry(pin).or_default();
        Ok(Box::new(SimEcho {
            pin,
            state: Arc::clone(&self.state),
        }))
    }
}

// -----------------------------------------------------------------------------
// LINES
// -----------------------------------------------------------------------------

struct SimOutput {
    pin: u8,
    level: Level,
    state: Arc<Mutex<SimState>>,
}

impl OutputLine for SimOutput {
    fn pin(&self) -> u8 {
        self.pin
    }

    fn write(&mut self, level: Level) -> Result<(), SwipeError> {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if state.failing_outputs.contains(&self.pin) {
            return Err(SwipeError::LineWrite {
                pin: self.pin,
                reason: "simulated write failure".to_string(),
            });
        }
        // The sensors start ranging on the falling edge of the trigger
        if self.level == Level::High && level == Level::Low {
            state.fire_pulse();
        }
        self.level = level;
        Ok(())
    }
}

impl Drop for SimOutput {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.claimed.remove(&self.pin);
    }
}

struct SimEcho {
    pin: u8,
    state: Arc<Mutex<SimState>>,
}

impl EchoLine for SimEcho {
    fn pin(&self) -> u8 {
        self.pin
    }

    fn watch(&mut self, callback: EdgeCallback) -> Result<(), SwipeError> {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.echoes.entry(self.pin).or_default().callback = Some(callback);
        Ok(())
    }

    fn unwatch(&mut self) -> Result<(), SwipeError> {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(script) = state.echoes.get_mut(&self.pin) {
            script.callback = None;
        }
        Ok(())
    }
}

impl Drop for SimEcho {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(script) = state.echoes.get_mut(&self.pin) {
            script.callback = None;
        }
        state.claimed.remove(&self.pin);
    }
}
