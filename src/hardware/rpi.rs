// src/hardware/rpi.rs
//
// Raspberry Pi backend. Echo lines use rppal's async interrupts, which run
// the callback on a driver thread with a kernel timestamp per edge.

use rppal::gpio::{Event, Gpio, InputPin, OutputPin, Trigger};

use super::{EchoLine, EdgeCallback, EdgeEvent, GpioBackend, Level, OutputLine};
use crate::error::SwipeError;

pub struct RpiGpio {
    gpio: Gpio,
}

impl RpiGpio {
    pub fn new() -> Result<Self, SwipeError> {
        Ok(Self { gpio: Gpio::new()? })
    }
}

impl GpioBackend for RpiGpio {
    fn output(&mut self, pin: u8) -> Result<Box<dyn OutputLine>, SwipeError> {
        let line = self
            .gpio
            .get(pin)
            .map_err(|e| SwipeError::LineInit {
                pin,
                reason: e.to_string(),
            })?
            .into_output_low();
        Ok(Box::new(RpiOutput { pin, line }))
    }

    fn input(&mut self, pin: u8) -> Result<Box<dyn EchoLine>, SwipeError> {
        let line = self
            .gpio
            .get(pin)
            .map_err(|e| SwipeError::LineInit {
                pin,
                reason: e.to_string(),
            })?
            .into_input();
        Ok(Box::new(RpiEcho { pin, line }))
    }
}

struct RpiOutput {
    pin: u8,
    line: OutputPin,
}

impl OutputLine for RpiOutput {
    fn pin(&self) -> u8 {
        self.pin
    }

    fn write(&mut self, level: Level) -> Result<(), SwipeError> {
        match level {
            Level::High => self.line.set_high(),
            Level::Low => self.line.set_low(),
        }
        Ok(())
    }
}

struct RpiEcho {
    pin: u8,
    line: InputPin,
}

impl EchoLine for RpiEcho {
    fn pin(&self) -> u8 {
        self.pin
    }

    fn watch(&mut self, mut callback: EdgeCallback) -> Result<(), SwipeError> {
        let pin = self.pin;
        self.line
            .set_async_interrupt(Trigger::Both, None, move |event: Event| {
                let edge = match event.trigger {
                    Trigger::RisingEdge => Ok(EdgeEvent::rising(event.timestamp)),
                    Trigger::FallingEdge => Ok(EdgeEvent::falling(event.timestamp)),
                    other => Err(SwipeError::EdgeFault {
                        pin,
                        reason: format!("unexpected trigger {:?}", other),
                    }),
                };
                callback(edge);
            })
            .map_err(|e| SwipeError::LineInit {
                pin,
                reason: e.to_string(),
            })
    }

    fn unwatch(&mut self) -> Result<(), SwipeError> {
        self.line.clear_async_interrupt()?;
        Ok(())
    }
}
