// SMCD14 axis emulator
//
// Serves the same register map as the real controller and moves each
// emulated axis over time:
// - axis: register image and per-tick state machine for one unit
// - bank: several units behind independent locks
// - ticker: periodic task advancing the bank

mod axis;
mod bank;
mod ticker;

pub use axis::{AxisEmulator, AxisState, ERROR_INVALID_PARAMETER, IN_POSITION_TOLERANCE};
pub use bank::{EmulatorBank, SharedAxis};
pub use ticker::{spawn_ticker, TickerHandle};
