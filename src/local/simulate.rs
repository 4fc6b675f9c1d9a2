use serde::Deserialize;
use std::fs::File;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use super::module::SwipeModule;
use crate::config::SwipeConfig;
use crate::error::SwipeError;
use crate::hardware::sim::SimulatedGpio;
use crate::processing::sink::ResultSink;
use crate::processing::swipe_detector::Mode;
use crate::processing::Side;
use crate::utils::log::console;

// -----------------------------------------------------------------------------
// SETUP FOR REPLAYING A SCENE FROM CSV
// -----------------------------------------------------------------------------

/// What each sensor sees on one trigger pulse. A blank cell is a pulse
/// without echo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SceneFrame {
    pub left: Option<u32>,
    pub right: Option<u32>,
}

impl SceneFrame {
    fn reading(&self, side: Side) -> Option<u32> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

pub fn load_scene<P: AsRef<Path>>(path: P) -> Result<Vec<SceneFrame>, SwipeError> {
    let file = File::open(path.as_ref())
        .map_err(|e| SwipeError::Scene(format!("{}: {}", path.as_ref().display(), e)))?;
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut frames = Vec::new();
    for result in rdr.deserialize() {
        let frame: SceneFrame = result?;
        frames.push(frame);
    }
    Ok(frames)
}

// -----------------------------------------------------------------------------
// RUN CODE
// -----------------------------------------------------------------------------

/// Replays `frames` through a simulated sensor pair, one frame per trigger
/// pulse, and returns once every frame has been consumed.
pub fn run(
    config: SwipeConfig,
    frames: &[SceneFrame],
    sink: Box<dyn ResultSink>,
    jitter_us: u64,
) -> Result<(), SwipeError> {
    let gpio = SimulatedGpio::new();
    gpio.set_jitter_us(jitter_us);
    for side in Side::BOTH {
        let pin = config.echo_pin(side);
        gpio.push_readings(pin, frames.iter().map(|frame| frame.reading(side)));
        gpio.set_idle(pin, None);
    }

    // Every frame costs at most one idle interval
    let budget = config.sample_interval() * (frames.len() as u32 + 2) + Duration::from_secs(1);
    let settle = config.sample_interval() + Duration::from_micros(config.timing.latency_us);
    let pins = [config.echo_pin(Side::Left), config.echo_pin(Side::Right)];

    let mut module = SwipeModule::new(Box::new(gpio.clone()), sink);
    module.configure(config)?;
    module.start()?;
    console(&format!("replaying {} frames", frames.len()));

    let started = Instant::now();
    while pins.iter().any(|&pin| gpio.pending_readings(pin) > 0) {
        if module.mode() == Mode::Off || started.elapsed() > budget {
            break;
        }
        thread::sleep(Duration::from_millis(1));
    }
    thread::sleep(settle);

    module.stop()?;
    console(&format!("{} trigger pulses sent", gpio.pulses()));
    Ok(())
}
