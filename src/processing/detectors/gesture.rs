use std::mem;

use super::swipe::{classify, Classification};
use crate::config::SwipeConfig;
use crate::processing::{Distance, Side, SAMPLE_SIZE};

// GESTURE WINDOW --------------------------------------------------------------

/// Samples collected since a candidate swipe started, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureWindow {
    starter: Side,
    samples: [Vec<u32>; 2],
}

impl GestureWindow {
    fn open(first: Distance) -> Self {
        let mut window = Self {
            starter: first.side,
            samples: [
                Vec::with_capacity(SAMPLE_SIZE),
                Vec::with_capacity(SAMPLE_SIZE),
            ],
        };
        window.samples[first.side.index()].push(first.cm);
        window
    }

    pub fn starter(&self) -> Side {
        self.starter
    }

    pub fn samples(&self, side: Side) -> &[u32] {
        &self.samples[side.index()]
    }

    pub fn count(&self, side: Side) -> usize {
        self.samples[side.index()].len()
    }

    fn is_complete(&self) -> bool {
        Side::BOTH.iter().any(|&side| self.count(side) >= SAMPLE_SIZE)
    }
}

// STATE MACHINE ---------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub enum GestureState {
    #[default]
    Waiting,
    Detecting(GestureWindow),
}

#[derive(Debug, Clone, PartialEq)]
pub enum GestureOutcome {
    /// Nothing changed.
    Ignored,
    /// A window opened; sampling should switch to the countdown cadence.
    Started { starter: Side },
    /// A sample was added to the open window.
    Collected,
    /// The window filled up and was classified. The machine is waiting again.
    Finalized {
        window: GestureWindow,
        classification: Classification,
    },
}

pub struct GestureStateMachine {
    thresholds: [u32; 2],
    max_distance: u32,
    state: GestureState,
}

impl GestureStateMachine {
    pub fn new(config: &SwipeConfig) -> Self {
        Self {
            thresholds: [config.threshold(Side::Left), config.threshold(Side::Right)],
            max_distance: config.distances.max,
            state: GestureState::Waiting,
        }
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn window(&self) -> Option<&GestureWindow> {
        match &self.state {
            GestureState::Detecting(window) => Some(window),
            GestureState::Waiting => None,
        }
    }

    pub fn is_detecting(&self) -> bool {
        matches!(self.state, GestureState::Detecting(_))
    }

    pub fn on_distance(&mut self, distance: Distance) -> GestureOutcome {
        match &mut self.state {
            GestureState::Waiting => self.monitor(distance),
            GestureState::Detecting(window) => {
                let count = window.count(distance.side);
                let collected = count < SAMPLE_SIZE && distance.cm <= self.max_distance;
                if collected {
                    window.samples[distance.side.index()].push(distance.cm);
                }

                if window.is_complete() {
                    self.finalize()
                } else if collected {
                    GestureOutcome::Collected
                } else {
                    GestureOutcome::Ignored
                }
            }
        }
    }

    /// Drops any open window without classifying it.
    pub fn reset(&mut self) {
        self.state = GestureState::Waiting;
    }

    fn monitor(&mut self, distance: Distance) -> GestureOutcome {
        if distance.cm > self.thresholds[distance.side.index()] {
            return GestureOutcome::Ignored;
        }
        self.state = GestureState::Detecting(GestureWindow::open(distance));
        GestureOutcome::Started {
            starter: distance.side,
        }
    }

    fn finalize(&mut self) -> GestureOutcome {
        match mem::take(&mut self.state) {
            GestureState::Detecting(window) => {
                let starter = window.starter();
                let classification =
                    classify(window.samples(starter), self.thresholds[starter.index()]);
                GestureOutcome::Finalized {
                    window,
                    classification,
                }
            }
            GestureState::Waiting => GestureOutcome::Ignored,
        }
    }
}
