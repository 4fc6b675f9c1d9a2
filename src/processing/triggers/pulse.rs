use crossbeam_channel::{never, tick, Receiver};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::TriggerInstance;
use crate::error::SwipeError;
use crate::hardware::{Level, OutputLine, Sleeper};
use crate::processing::TRIGGER_PULSE_US;

// ULTRASONIC PULSE ------------------------------------------------------------

/// Drives the shared trigger line of both sensors: high for a fixed width,
/// then low. The sensors start ranging on the falling edge.
pub struct UltrasonicPulse {
    line: Box<dyn OutputLine>,
    sleeper: Arc<dyn Sleeper>,
    pulse_width_us: u64,
}

impl UltrasonicPulse {
    pub fn new(line: Box<dyn OutputLine>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            line,
            sleeper,
            pulse_width_us: TRIGGER_PULSE_US,
        }
    }
}

impl TriggerInstance for UltrasonicPulse {
    fn fire(&mut self) -> Result<(), SwipeError> {
        self.line.write(Level::High)?;
        self.sleeper.sleep_us(self.pulse_width_us);
        self.line.write(Level::Low)
    }
}

// PULSE TIMER -----------------------------------------------------------------

/// Repeating schedule for a trigger. The schedule is a tick channel that the
/// owning event loop selects on; `fire` runs the trigger itself.
pub struct PulseTimer {
    trigger: Box<dyn TriggerInstance>,
    period: Option<Duration>,
    ticks: Receiver<Instant>,
}

impl PulseTimer {
    pub fn new(trigger: Box<dyn TriggerInstance>) -> Self {
        Self {
            trigger,
            period: None,
            ticks: never(),
        }
    }

    pub fn start(&mut self, period: Duration) {
        self.ticks = tick(period);
        self.period = Some(period);
    }

    /// Cancels the running schedule and starts a new one at `period`.
    pub fn reschedule(&mut self, period: Duration) {
        self.stop();
        self.start(period);
    }

    pub fn stop(&mut self) {
        self.ticks = never();
        self.period = None;
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.period.is_some()
    }

    /// Tick source for the current schedule. A stopped timer never ticks.
    pub fn ticks(&self) -> Receiver<Instant> {
        self.ticks.clone()
    }

    pub fn fire(&mut self) -> Result<(), SwipeError> {
        self.trigger.fire()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::sim::SimulatedGpio;
    use crate::hardware::testing::RecordingSleeper;
    use crate::hardware::GpioBackend;
    use std::sync::Mutex;

    struct CountingTrigger(Arc<Mutex<usize>>);

    impl TriggerInstance for CountingTrigger {
        fn fire(&mut self) -> Result<(), SwipeError> {
            *self.0.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[test]
    fn pulse_holds_line_high_for_ten_microseconds() {
        let mut gpio = SimulatedGpio::new();
        let line = gpio.output(23).unwrap();
        let sleeper = Arc::new(RecordingSleeper::default());
        let mut pulse = UltrasonicPulse::new(line, sleeper.clone());

        pulse.fire().unwrap();
        pulse.fire().unwrap();
        assert_eq!(sleeper.recorded(), vec![10, 10]);
        assert_eq!(gpio.pulses(), 2);
    }

    #[test]
    fn write_failure_is_propagated() {
        let mut gpio = SimulatedGpio::new();
        let line = gpio.output(23).unwrap();
        gpio.fail_writes(23);
        let mut pulse = UltrasonicPulse::new(line, Arc::new(RecordingSleeper::default()));
        assert!(matches!(pulse.fire(), Err(SwipeError::LineWrite { pin: 23, .. })));
    }

    #[test]
    fn schedule_follows_start_reschedule_stop() {
        let count = Arc::new(Mutex::new(0));
        let mut timer = PulseTimer::new(Box::new(CountingTrigger(count.clone())));
        assert!(!timer.is_running());
        assert!(timer
            .ticks()
            .recv_timeout(Duration::from_millis(20))
            .is_err());

        timer.start(Duration::from_millis(300));
        assert_eq!(timer.period(), Some(Duration::from_millis(300)));

        timer.reschedule(Duration::from_millis(5));
        assert_eq!(timer.period(), Some(Duration::from_millis(5)));
        assert!(timer
            .ticks()
            .recv_timeout(Duration::from_millis(500))
            .is_ok());

        timer.fire().unwrap();
        assert_eq!(*count.lock().unwrap(), 1);

        timer.stop();
        timer.stop();
        assert_eq!(timer.period(), None);
    }
}
