use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::module::{ControlMessage, SwipeModule};
use crate::config::SwipeConfig;
use crate::error::SwipeError;
use crate::hardware::rpi::RpiGpio;
use crate::processing::sink::ConsoleSink;
use crate::processing::swipe_detector::Mode;

// -----------------------------------------------------------------------------
// RUN CODE
// -----------------------------------------------------------------------------

/// Drives the sensors on the Pi header until `running` is cleared or the
/// worker stops on its own.
pub fn run(config: SwipeConfig, running: Arc<AtomicBool>) -> Result<(), SwipeError> {
    let gpio = RpiGpio::new()?;
    let mut module = SwipeModule::new(Box::new(gpio), Box::new(ConsoleSink));

    module.handle(ControlMessage::Configure(config))?;
    module.handle(ControlMessage::Start)?;
    module.handle(ControlMessage::Status(
        "Swipe a hand across the sensors, press Enter to quit".to_string(),
    ))?;

    while running.load(Ordering::SeqCst) && module.mode() != Mode::Off {
        thread::sleep(Duration::from_millis(100));
    }

    module.handle(ControlMessage::Stop)
}
