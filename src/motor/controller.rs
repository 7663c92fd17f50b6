// SMCD14 single-axis command protocol
//
// Every logical command is a fixed sequence of register accesses.
// A move, for example, writes move type, target position and target
// velocity, then raises start-request; the device latches the target
// registers on that last write. The whole sequence runs under one lock
// so concurrent commands on the same controller never interleave.

use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use super::registers::{decode_f32, encode_f32, MoveType, Register, STATUS_IN_POSITION};
use crate::config::{CLEAR_ERROR_HOLD, POLL_INTERVAL};
use crate::error::{MotionError, Result};
use crate::transport::RegisterTransport;

/// Default Modbus unit id of a stand-alone controller
pub const DEFAULT_UNIT_ID: u8 = 1;

/// A single move request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveCommand {
    Absolute { position: f32, velocity: f32 },
    Relative { distance: f32, velocity: f32 },
}

impl MoveCommand {
    pub fn move_type(&self) -> MoveType {
        match self {
            MoveCommand::Absolute { .. } => MoveType::Absolute,
            MoveCommand::Relative { .. } => MoveType::Relative,
        }
    }

    /// Value written to the target-position register
    pub fn target(&self) -> f32 {
        match *self {
            MoveCommand::Absolute { position, .. } => position,
            MoveCommand::Relative { distance, .. } => distance,
        }
    }

    pub fn velocity(&self) -> f32 {
        match *self {
            MoveCommand::Absolute { velocity, .. } | MoveCommand::Relative { velocity, .. } => {
                velocity
            }
        }
    }
}

/// Transport plus connection flag, only ever touched under the controller lock
struct Link<T> {
    transport: T,
    connected: bool,
    unit: u8,
}

impl<T: RegisterTransport> Link<T> {
    fn write(&mut self, register: Register, values: &[u16]) -> Result<()> {
        debug!(
            "Write to unit {}: reg={:?}, values={:?}",
            self.unit, register, values
        );
        self.transport
            .write_registers(self.unit, register.address(), values)?;
        Ok(())
    }

    fn write_word(&mut self, register: Register, value: u16) -> Result<()> {
        self.write(register, &[value])
    }

    fn write_float(&mut self, register: Register, value: f32) -> Result<()> {
        self.write(register, &encode_f32(value))
    }

    fn read(&mut self, register: Register) -> Result<Vec<u16>> {
        let words = self.transport.read_registers(
            self.unit,
            register.address(),
            register.width() as u16,
        )?;
        Ok(words)
    }

    fn read_word(&mut self, register: Register) -> Result<u16> {
        match self.read(register)?.as_slice() {
            [word] => Ok(*word),
            other => Err(MotionError::InvalidLength {
                expected: 1,
                actual: other.len(),
            }),
        }
    }

    fn read_float(&mut self, register: Register) -> Result<f32> {
        decode_f32(&self.read(register)?)
    }

    /// In position with no start-request still waiting to be latched
    ///
    /// The device drops start-request back to 0 once it is idle again, so a
    /// raised start means the last move has not been taken up or finished.
    fn settled(&mut self) -> Result<bool> {
        if self.read_word(Register::Status)? & STATUS_IN_POSITION == 0 {
            return Ok(false);
        }
        Ok(self.read_word(Register::StartRequest)? == 0)
    }
}

/// Client for one SMCD14 axis
///
/// All methods take `&self`; share the controller between threads with
/// an `Arc`. Transport failures are returned as-is and never retried,
/// since a half-written multi-register command cannot be safely resumed.
/// Re-issue the whole command instead.
pub struct AxisController<T: RegisterTransport> {
    link: Mutex<Link<T>>,
    unit_id: u8,
    poll_interval: Duration,
    clear_error_hold: Duration,
}

impl<T: RegisterTransport> AxisController<T> {
    /// Create a controller for unit 1
    pub fn new(transport: T) -> Self {
        Self::with_unit_id(transport, DEFAULT_UNIT_ID)
    }

    /// Create a controller for a specific Modbus unit id
    pub fn with_unit_id(transport: T, unit_id: u8) -> Self {
        Self {
            link: Mutex::new(Link {
                transport,
                connected: false,
                unit: unit_id,
            }),
            unit_id,
            poll_interval: POLL_INTERVAL,
            clear_error_hold: CLEAR_ERROR_HOLD,
        }
    }

    /// Interval between status reads in `wait_until_in_position`
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// How long clear-error-request is held high; must be non-zero
    pub fn with_clear_error_hold(mut self, hold: Duration) -> Result<Self> {
        if hold.is_zero() {
            return Err(MotionError::InvalidTuning(
                "clear-error hold must be longer than zero",
            ));
        }
        self.clear_error_hold = hold;
        Ok(self)
    }

    pub fn unit_id(&self) -> u8 {
        self.unit_id
    }

    pub fn is_connected(&self) -> bool {
        self.link.lock().connected
    }

    /// Open the transport; does nothing if already connected
    pub fn connect(&self) -> Result<()> {
        let mut link = self.link.lock();
        if link.connected {
            return Ok(());
        }
        info!("Connecting to axis unit {}", self.unit_id);
        link.transport.connect()?;
        link.connected = true;
        Ok(())
    }

    /// Close the transport; does nothing if not connected
    pub fn disconnect(&self) {
        let mut link = self.link.lock();
        if !link.connected {
            return;
        }
        info!("Disconnecting from axis unit {}", self.unit_id);
        link.transport.close();
        link.connected = false;
    }

    /// Lock the link for one logical command
    fn session(&self) -> Result<MutexGuard<'_, Link<T>>> {
        let link = self.link.lock();
        if !link.connected {
            return Err(MotionError::NotConnected);
        }
        Ok(link)
    }

    pub fn motor_on(&self) -> Result<()> {
        self.session()?.write_word(Register::MotorEnable, 1)
    }

    pub fn motor_off(&self) -> Result<()> {
        self.session()?.write_word(Register::MotorEnable, 0)
    }

    /// Move to `position` at `velocity`
    pub fn move_absolute(&self, position: f32, velocity: f32) -> Result<()> {
        self.execute(MoveCommand::Absolute { position, velocity })
    }

    /// Move by `distance` from the current position at `velocity`
    pub fn move_relative(&self, distance: f32, velocity: f32) -> Result<()> {
        self.execute(MoveCommand::Relative { distance, velocity })
    }

    /// Issue a move; the four writes form one critical section
    pub fn execute(&self, command: MoveCommand) -> Result<()> {
        let mut link = self.session()?;
        link.write_word(Register::MoveType, command.move_type() as u16)?;
        link.write_float(Register::TargetPosition, command.target())?;
        link.write_float(Register::TargetVelocity, command.velocity())?;
        link.write_word(Register::StartRequest, 1)?;
        info!("Unit {}: {:?}", self.unit_id, command);
        Ok(())
    }

    pub fn emergency_stop(&self) -> Result<()> {
        self.session()?.write_word(Register::StopRequest, 1)?;
        warn!("Unit {}: emergency stop", self.unit_id);
        Ok(())
    }

    /// Pulse clear-error-request high for the configured hold time
    ///
    /// The lock is released during the hold.
    pub fn clear_error(&self) -> Result<()> {
        self.session()?.write_word(Register::ClearErrorRequest, 1)?;
        thread::sleep(self.clear_error_hold);
        self.session()?.write_word(Register::ClearErrorRequest, 0)
    }

    pub fn read_position(&self) -> Result<f32> {
        self.session()?.read_float(Register::ActualPosition)
    }

    /// Target register as last written (a distance for relative moves)
    pub fn read_target_position(&self) -> Result<f32> {
        self.session()?.read_float(Register::TargetPosition)
    }

    pub fn read_error_code(&self) -> Result<u16> {
        self.session()?.read_word(Register::ErrorCode)
    }

    /// Raw status word
    pub fn read_status(&self) -> Result<u16> {
        self.session()?.read_word(Register::Status)
    }

    pub fn get_backlash(&self) -> Result<f32> {
        self.session()?.read_float(Register::Backlash)
    }

    pub fn set_backlash(&self, value: f32) -> Result<()> {
        self.session()?.write_float(Register::Backlash, value)
    }

    pub fn in_position(&self) -> Result<bool> {
        Ok(self.read_status()? & STATUS_IN_POSITION != 0)
    }

    /// Poll until the axis is in position or `timeout` elapses
    ///
    /// A move issued just before the call counts as arrived only after
    /// the device has latched it, so a stale in-position bit from the
    /// previous idle state is never reported. Returns `Ok(false)` on
    /// timeout. The lock is held only for each poll, never while sleeping.
    pub fn wait_until_in_position(&self, timeout: Duration) -> Result<bool> {
        self.wait_until(Instant::now() + timeout)
    }

    pub(crate) fn wait_until(&self, deadline: Instant) -> Result<bool> {
        loop {
            if self.session()?.settled()? {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                debug!("Unit {}: in-position wait timed out", self.unit_id);
                return Ok(false);
            }
            thread::sleep(self.poll_interval.min(deadline - now));
        }
    }
}

impl<T: RegisterTransport> Drop for AxisController<T> {
    fn drop(&mut self) {
        self.disconnect();
    }
}
