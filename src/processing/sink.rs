use colored::Colorize;
use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};

use super::Side;

/// Outbound message for the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    Switch(Side),
    Calibration { left: u32, right: u32 },
}

/// Page navigation the display performs for a switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageCommand {
    Increment,
    Decrement,
}

impl From<Side> for PageCommand {
    fn from(side: Side) -> Self {
        match side {
            Side::Right => PageCommand::Increment,
            Side::Left => PageCommand::Decrement,
        }
    }
}

// RESULT SINK -----------------------------------------------------------------

/// Fire-and-forget receiver for classified gestures and calibration readings.
pub trait ResultSink: Send {
    fn on_switch(&mut self, side: Side);
    fn on_calibration(&mut self, left: u32, right: u32);
}

/// Forwards notifications to the host over a channel. A disconnected host
/// is not an error for the detector.
pub struct ChannelSink {
    tx: Sender<Notification>,
}

impl ChannelSink {
    pub fn new(tx: Sender<Notification>) -> Self {
        Self { tx }
    }
}

impl ResultSink for ChannelSink {
    fn on_switch(&mut self, side: Side) {
        let _ = self.tx.send(Notification::Switch(side));
    }

    fn on_calibration(&mut self, left: u32, right: u32) {
        let _ = self.tx.send(Notification::Calibration { left, right });
    }
}

/// Prints notifications to the terminal.
pub struct ConsoleSink;

impl ResultSink for ConsoleSink {
    fn on_switch(&mut self, side: Side) {
        let page = match PageCommand::from(side) {
            PageCommand::Increment => "page +1",
            PageCommand::Decrement => "page -1",
        };
        println!("{} {} ({})", "Switch:".green().bold(), side, page);
    }

    fn on_calibration(&mut self, left: u32, right: u32) {
        println!(
            "{} | {}",
            format!("{:>6}", "Left").dimmed(),
            format!("{:<6}", "Right").dimmed()
        );
        println!("{:>6} | {:<6}", left, right);
    }
}
