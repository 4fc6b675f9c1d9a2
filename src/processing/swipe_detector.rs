use chrono::Local;
use crossbeam_channel::Receiver;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::detectors::{
    Classification, EchoCapture, GestureOutcome, GestureStateMachine, GestureWindow,
};
use super::sink::ResultSink;
use super::triggers::pulse::{PulseTimer, UltrasonicPulse};
use super::{Distance, Side};
use crate::config::SwipeConfig;
use crate::error::SwipeError;
use crate::hardware::{EdgeEvent, OutputLine, Sleeper};
use crate::utils::log::{console, console_error, log_csv};

// -----------------------------------------------------------------------------
// RUST CORE LOGIC
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Off,
    Waiting,
    Detecting,
}

// SWIPE DETECTOR COMPONENT ----------------------------------------------------

/// One detection session: trigger schedule, echo timing, the gesture state
/// machine and the result sink. All mutation goes through `handle_tick` and
/// `handle_edge`, which the owner must call from a single thread.
pub struct SwipeDetector {
    config: SwipeConfig,
    timer: PulseTimer,
    echo: EchoCapture,
    gesture: GestureStateMachine,
    sink: Box<dyn ResultSink>,
    sleeper: Arc<dyn Sleeper>,
    active: bool,
}

impl SwipeDetector {
    pub fn new(
        config: SwipeConfig,
        trigger: Box<dyn OutputLine>,
        sink: Box<dyn ResultSink>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        let pulse = UltrasonicPulse::new(trigger, Arc::clone(&sleeper));
        Self {
            timer: PulseTimer::new(Box::new(pulse)),
            echo: EchoCapture::new(&config, Arc::clone(&sleeper)),
            gesture: GestureStateMachine::new(&config),
            config,
            sink,
            sleeper,
            active: false,
        }
    }

    pub fn start(&mut self) {
        if self.active {
            return;
        }
        self.gesture.reset();
        self.echo.clear_pending();
        self.timer.start(self.config.sample_interval());
        self.active = true;
    }

    /// Cancels the trigger schedule. An open gesture window is discarded.
    pub fn stop(&mut self) {
        self.timer.stop();
        self.gesture.reset();
        self.echo.clear_pending();
        self.active = false;
    }

    pub fn mode(&self) -> Mode {
        if !self.active {
            Mode::Off
        } else if self.gesture.is_detecting() {
            Mode::Detecting
        } else {
            Mode::Waiting
        }
    }

    /// Current trigger period, `None` while stopped.
    pub fn cadence(&self) -> Option<Duration> {
        self.timer.period()
    }

    pub fn ticks(&self) -> Receiver<Instant> {
        self.timer.ticks()
    }

    pub fn window(&self) -> Option<&GestureWindow> {
        self.gesture.window()
    }

    pub fn handle_tick(&mut self) -> Result<(), SwipeError> {
        if !self.active {
            return Ok(());
        }
        self.timer.fire()
    }

    /// Feeds one transition, or a driver fault, from an echo line.
    pub fn handle_edge(
        &mut self,
        side: Side,
        event: Result<EdgeEvent, SwipeError>,
    ) -> Result<(), SwipeError> {
        let event = event?;
        if !self.active {
            return Ok(());
        }
        if let Some(distance) = self.echo.on_edge(side, event) {
            self.on_distance(distance);
        }
        Ok(())
    }

    fn on_distance(&mut self, distance: Distance) {
        if self.config.session.calibrate {
            let (left, right) = self.echo.latest();
            self.sink.on_calibration(left, right);
            if self.config.session.enable_debug_logging {
                self.log_calibration(left, right);
            }
        }

        match self.gesture.on_distance(distance) {
            GestureOutcome::Started { starter } => {
                // Maybe a swipe starts, so measure more often
                self.timer.reschedule(self.config.countdown_interval());
                if self.config.session.verbose {
                    console(&format!("{} sensor at {} cm, sampling", starter, distance.cm));
                }
            }
            GestureOutcome::Finalized {
                window,
                classification,
            } => {
                self.timer.reschedule(self.config.sample_interval());
                self.report(&window, classification);
                if classification.is_swipe() {
                    self.sink.on_switch(window.starter());
                }
                self.sleeper.sleep_us(self.config.timing.latency_us);
            }
            GestureOutcome::Collected | GestureOutcome::Ignored => {}
        }
    }

    fn report(&self, window: &GestureWindow, classification: Classification) {
        let starter = window.starter();
        let samples = window
            .samples(starter)
            .iter()
            .map(|cm| cm.to_string())
            .collect::<Vec<String>>()
            .join(" ");
        let decision = if classification.is_swipe() {
            "swipe"
        } else {
            "none"
        };

        if self.config.session.verbose {
            console("-------------------------");
            console(&format!("  Starter: {}", starter));
            console(&format!("  Distances: [{}]", samples));
            console(&format!("  Mean: {:.1} -> {}", classification.mean(), decision));
        }

        if self.config.session.enable_debug_logging {
            let row = [
                Local::now().to_rfc3339(),
                starter.to_string(),
                samples,
                format!("{:.1}", classification.mean()),
                decision.to_string(),
            ];
            if let Err(e) = log_csv(
                "gestures.csv",
                &["timestamp", "starter", "samples", "mean", "decision"],
                &row,
            ) {
                console_error(&format!("failed to log gesture: {}", e));
            }
        }
    }

    fn log_calibration(&self, left: u32, right: u32) {
        let row = [Local::now().to_rfc3339(), left.to_string(), right.to_string()];
        if let Err(e) = log_csv("calibration.csv", &["timestamp", "left", "right"], &row) {
            console_error(&format!("failed to log calibration: {}", e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::sim::SimulatedGpio;
    use crate::hardware::testing::RecordingSleeper;
    use crate::hardware::GpioBackend;
    use crate::processing::sink::{ChannelSink, Notification};
    use crate::processing::MICROSECONDS_PER_CM;
    use crossbeam_channel::{unbounded, Receiver};

    struct Harness {
        detector: SwipeDetector,
        notifications: Receiver<Notification>,
        sleeper: Arc<RecordingSleeper>,
        clock_us: u64,
    }

    impl Harness {
        fn new(config: SwipeConfig) -> Self {
            let mut gpio = SimulatedGpio::new();
            let trigger = gpio.output(config.pins.trigger).unwrap();
            let (tx, rx) = unbounded();
            let sleeper = Arc::new(RecordingSleeper::default());
            let detector = SwipeDetector::new(
                config,
                trigger,
                Box::new(ChannelSink::new(tx)),
                sleeper.clone(),
            );
            Self {
                detector,
                notifications: rx,
                sleeper,
                clock_us: 0,
            }
        }

        fn echo(&mut self, side: Side, cm: u32) {
            self.clock_us += 50_000;
            let start = Duration::from_micros(self.clock_us);
            let width = Duration::from_secs_f64(cm as f64 * 2.0 * MICROSECONDS_PER_CM / 1e6);
            self.detector
                .handle_edge(side, Ok(EdgeEvent::rising(start)))
                .unwrap();
            self.detector
                .handle_edge(side, Ok(EdgeEvent::falling(start + width)))
                .unwrap();
        }

        fn drain(&self) -> Vec<Notification> {
            self.notifications.try_iter().collect()
        }
    }

    fn config() -> SwipeConfig {
        let mut config = SwipeConfig::default();
        config.timing.switch_duration_ms = 1000;
        config.timing.sample_interval_ms = 300;
        config.timing.latency_us = 1000;
        config
    }

    #[test]
    fn stopped_detector_is_off_and_ignores_edges() {
        let mut h = Harness::new(config());
        assert_eq!(h.detector.mode(), Mode::Off);
        assert_eq!(h.detector.cadence(), None);
        h.echo(Side::Left, 10);
        assert_eq!(h.detector.mode(), Mode::Off);
        assert!(h.drain().is_empty());
        h.detector.handle_tick().unwrap();
    }

    #[test]
    fn proximity_switches_to_countdown_cadence() {
        let mut h = Harness::new(config());
        h.detector.start();
        assert_eq!(h.detector.mode(), Mode::Waiting);
        assert_eq!(h.detector.cadence(), Some(Duration::from_millis(300)));

        h.echo(Side::Left, 40);
        assert_eq!(h.detector.mode(), Mode::Detecting);
        assert_eq!(h.detector.window().unwrap().starter(), Side::Left);
        assert_eq!(h.detector.cadence(), Some(Duration::from_millis(200)));
    }

    #[test]
    fn completed_pass_emits_one_switch_and_restores_cadence() {
        let mut h = Harness::new(config());
        h.detector.start();

        for cm in [48, 52, 55, 58, 62] {
            h.echo(Side::Right, cm);
            // the opposite sensor sees nothing in range
            h.echo(Side::Left, 320);
        }

        assert_eq!(h.drain(), vec![Notification::Switch(Side::Right)]);
        assert_eq!(h.detector.mode(), Mode::Waiting);
        assert_eq!(h.detector.cadence(), Some(Duration::from_millis(300)));
        // settle delays for every accepted echo, then the quiet period
        let sleeps = h.sleeper.recorded();
        assert_eq!(sleeps.last(), Some(&1000));
        assert_eq!(sleeps.iter().filter(|&&us| us == 1000).count(), 1);
    }

    #[test]
    fn lingering_hand_emits_nothing() {
        let mut h = Harness::new(config());
        h.detector.start();
        for cm in [30, 32, 28, 31, 29] {
            h.echo(Side::Left, cm);
        }
        assert!(h.drain().is_empty());
        assert_eq!(h.detector.mode(), Mode::Waiting);
    }

    #[test]
    fn calibration_reports_latest_pair_for_every_reading() {
        let mut cfg = config();
        cfg.session.calibrate = true;
        let mut h = Harness::new(cfg);
        h.detector.start();

        h.echo(Side::Left, 120);
        h.echo(Side::Right, 90);
        h.echo(Side::Right, 95);
        // timeout: no calibration either
        h.echo(Side::Left, 400);

        assert_eq!(
            h.drain(),
            vec![
                Notification::Calibration { left: 120, right: 0 },
                Notification::Calibration { left: 120, right: 90 },
                Notification::Calibration { left: 120, right: 95 },
            ]
        );
    }

    #[test]
    fn stop_discards_open_window() {
        let mut h = Harness::new(config());
        h.detector.start();
        h.echo(Side::Left, 20);
        h.echo(Side::Left, 60);
        assert_eq!(h.detector.mode(), Mode::Detecting);

        h.detector.stop();
        h.detector.stop();
        assert_eq!(h.detector.mode(), Mode::Off);
        assert!(h.detector.window().is_none());
        assert_eq!(h.detector.cadence(), None);

        h.detector.start();
        assert_eq!(h.detector.mode(), Mode::Waiting);
        assert!(h.drain().is_empty());
    }

    #[test]
    fn driver_fault_is_propagated() {
        let mut h = Harness::new(config());
        h.detector.start();
        let result = h.detector.handle_edge(
            Side::Right,
            Err(SwipeError::EdgeFault {
                pin: 26,
                reason: "desync".to_string(),
            }),
        );
        assert!(matches!(result, Err(SwipeError::EdgeFault { pin: 26, .. })));
    }

    #[test]
    fn tick_fires_trigger_pulse() {
        let mut h = Harness::new(config());
        h.detector.start();
        h.detector.handle_tick().unwrap();
        assert_eq!(h.sleeper.recorded(), vec![10]);
    }
}
