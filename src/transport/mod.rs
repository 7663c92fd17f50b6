// Register transports
//
// The controller only needs to read and write runs of 16-bit words.
// Framing and delivery are left to the implementation:
// - LocalTransport: in-process emulator bank (tests, demos)
// - ZenohTransport: remote emulator served by `runtime::run`

mod local;
mod remote;

pub use local::LocalTransport;
pub use remote::ZenohTransport;

use crate::error::TransportError;

/// Word-level access to a register device
pub trait RegisterTransport: Send {
    /// Open the underlying link
    fn connect(&mut self) -> Result<(), TransportError>;

    /// Close the underlying link; must be safe to call when not connected
    fn close(&mut self);

    /// Read `count` consecutive holding registers from `unit`
    fn read_registers(&mut self, unit: u8, address: u16, count: u16)
    -> Result<Vec<u16>, TransportError>;

    /// Write consecutive holding registers on `unit`
    fn write_registers(&mut self, unit: u8, address: u16, values: &[u16])
    -> Result<(), TransportError>;
}
