// Error types shared by the codec, planner, controller and transports

/// Errors returned by the client-side motion stack
#[derive(Debug, thiserror::Error)]
pub enum MotionError {
    #[error("Expected {expected} registers, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Velocity {velocity} outside allowed range [{min}, {max:.3}]")]
    VelocityOutOfRange { velocity: f64, min: f64, max: f64 },

    #[error("Controller not connected")]
    NotConnected,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Invalid tuning: {0}")]
    InvalidTuning(&'static str),
}

pub type Result<T> = std::result::Result<T, MotionError>;

/// Failures reported by a register transport
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Device exception: {0}")]
    Exception(String),

    #[error("Link failure: {0}")]
    Link(String),

    #[error("No reply for register {address}")]
    NoReply { address: u16 },

    #[error("Malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Errors raised by the emulated register image
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EmulatorError {
    #[error("Illegal data address {address} (+{count} words)")]
    IllegalAddress { address: u16, count: usize },

    #[error("Register {address} is read-only")]
    ReadOnly { address: u16 },

    #[error("Unit {unit} not present")]
    UnknownUnit { unit: u8 },
}

impl From<EmulatorError> for TransportError {
    fn from(err: EmulatorError) -> Self {
        TransportError::Exception(err.to_string())
    }
}
