pub mod config;
pub mod emulator;
pub mod error;
pub mod messages;
pub mod motor;
pub mod runtime;
pub mod transport;

pub use error::{EmulatorError, MotionError, TransportError};
