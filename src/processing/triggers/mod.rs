pub mod pulse;

use crate::error::SwipeError;

/// Something that can be fired on every tick of a `PulseTimer`.
pub trait TriggerInstance: Send {
    fn fire(&mut self) -> Result<(), SwipeError>;
}
