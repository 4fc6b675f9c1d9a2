pub mod config;
pub mod error;
pub mod hardware;
pub mod local;
pub mod processing;
pub mod utils;

pub use config::SwipeConfig;
pub use error::SwipeError;
pub use local::module::{ControlMessage, SwipeModule};
pub use processing::sink::{Notification, PageCommand, ResultSink};
pub use processing::Side;
