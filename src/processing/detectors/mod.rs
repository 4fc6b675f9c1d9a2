pub mod echo;
pub mod gesture;
pub mod swipe;

pub use echo::EchoCapture;
pub use gesture::{GestureOutcome, GestureState, GestureStateMachine, GestureWindow};
pub use swipe::{classify, Classification};
