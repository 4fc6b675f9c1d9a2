use std::sync::Arc;
use std::time::Duration;

use crate::config::SwipeConfig;
use crate::hardware::{Edge, EdgeEvent, Sleeper};
use crate::processing::{distance_from_echo, Distance, Side, ECHO_SETTLE_US};

/// Per-side pulse start times and the most recent accepted distances.
pub struct EchoCapture {
    thresholds: [u32; 2],
    max_distance: u32,
    pulse_start: [Option<Duration>; 2],
    last_distance: [u32; 2],
    sleeper: Arc<dyn Sleeper>,
}

impl EchoCapture {
    pub fn new(config: &SwipeConfig, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            thresholds: [config.threshold(Side::Left), config.threshold(Side::Right)],
            max_distance: config.distances.max,
            pulse_start: [None, None],
            last_distance: [0, 0],
            sleeper,
        }
    }

    /// Feeds one transition. Returns a distance only for a falling edge that
    /// closes a pulse and passes the validity filter.
    pub fn on_edge(&mut self, side: Side, event: EdgeEvent) -> Option<Distance> {
        let i = side.index();
        match event.edge {
            Edge::Rising => {
                self.pulse_start[i] = Some(event.timestamp);
                None
            }
            Edge::Falling => {
                // A falling edge without a rising one is a half-seen pulse
                let start = self.pulse_start[i].take()?;
                let elapsed = event.timestamp.checked_sub(start)?;
                self.sleeper.sleep_us(ECHO_SETTLE_US);

                let cm = distance_from_echo(elapsed);
                if !self.is_valid(side, cm) {
                    return None;
                }
                self.last_distance[i] = cm;
                Some(Distance { side, cm })
            }
        }
    }

    /// Readings are dropped only when they are beyond both the side's
    /// proximity threshold and the max distance.
    pub fn is_valid(&self, side: Side, cm: u32) -> bool {
        !(cm > self.thresholds[side.index()] && cm > self.max_distance)
    }

    /// Latest accepted (left, right) distances; 0 until a side reports.
    pub fn latest(&self) -> (u32, u32) {
        (self.last_distance[0], self.last_distance[1])
    }

    /// Forgets half-seen pulses. Latest distances are kept.
    pub fn clear_pending(&mut self) {
        self.pulse_start = [None, None];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::testing::RecordingSleeper;
    use crate::processing::MICROSECONDS_PER_CM;

    fn capture(sleeper: Arc<RecordingSleeper>) -> EchoCapture {
        EchoCapture::new(&SwipeConfig::default(), sleeper)
    }

    fn echo_for(capture: &mut EchoCapture, side: Side, at_us: u64, cm: f64) -> Option<Distance> {
        let start = Duration::from_micros(at_us);
        let width = Duration::from_secs_f64(cm * 2.0 * MICROSECONDS_PER_CM / 1e6);
        assert!(capture.on_edge(side, EdgeEvent::rising(start)).is_none());
        capture.on_edge(side, EdgeEvent::falling(start + width))
    }

    #[test]
    fn rising_then_falling_yields_distance() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let mut capture = capture(sleeper.clone());

        let d = capture.on_edge(Side::Left, EdgeEvent::rising(Duration::from_micros(5_000)));
        assert!(d.is_none());
        let d = capture.on_edge(Side::Left, EdgeEvent::falling(Duration::from_micros(6_165)));
        assert_eq!(d, Some(Distance { side: Side::Left, cm: 20 }));
        assert_eq!(sleeper.recorded(), vec![ECHO_SETTLE_US]);
    }

    #[test]
    fn sides_are_timed_independently() {
        let mut capture = capture(Arc::new(RecordingSleeper::default()));
        capture.on_edge(Side::Left, EdgeEvent::rising(Duration::from_micros(0)));
        capture.on_edge(Side::Right, EdgeEvent::rising(Duration::from_micros(100)));
        let right = capture.on_edge(Side::Right, EdgeEvent::falling(Duration::from_micros(2_014)));
        let left = capture.on_edge(Side::Left, EdgeEvent::falling(Duration::from_micros(5_828)));
        assert_eq!(right.map(|d| d.cm), Some(33));
        assert_eq!(left.map(|d| d.cm), Some(100));
        assert_eq!(capture.latest(), (100, 33));
    }

    #[test]
    fn falling_without_rising_is_ignored() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let mut capture = capture(sleeper.clone());
        let d = capture.on_edge(Side::Right, EdgeEvent::falling(Duration::from_micros(900)));
        assert!(d.is_none());
        assert!(sleeper.recorded().is_empty());
    }

    #[test]
    fn timeouts_beyond_max_are_discarded() {
        let mut capture = capture(Arc::new(RecordingSleeper::default()));
        assert!(echo_for(&mut capture, Side::Left, 0, 201.0).is_none());
        assert!(echo_for(&mut capture, Side::Right, 50_000, 350.0).is_none());
        assert_eq!(capture.latest(), (0, 0));
        assert_eq!(echo_for(&mut capture, Side::Left, 90_000, 200.0).map(|d| d.cm), Some(200));
    }

    #[test]
    fn filter_keeps_anything_within_threshold() {
        let mut config = SwipeConfig::default();
        config.distances.left = 80;
        config.distances.max = 60;
        let capture = EchoCapture::new(&config, Arc::new(RecordingSleeper::default()));
        // beyond max but inside the proximity threshold
        assert!(capture.is_valid(Side::Left, 75));
        assert!(!capture.is_valid(Side::Left, 81));
        // right threshold 50 < max 60
        assert!(capture.is_valid(Side::Right, 60));
        assert!(!capture.is_valid(Side::Right, 61));
    }

    #[test]
    fn clear_pending_drops_open_pulses() {
        let mut capture = capture(Arc::new(RecordingSleeper::default()));
        capture.on_edge(Side::Left, EdgeEvent::rising(Duration::from_micros(10)));
        capture.clear_pending();
        assert!(capture
            .on_edge(Side::Left, EdgeEvent::falling(Duration::from_micros(1_175)))
            .is_none());
    }
}
