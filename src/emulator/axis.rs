// Emulated SMCD14 axis: register image plus the per-tick motion model

use tracing::{debug, info, warn};

use crate::error::EmulatorError;
use crate::messages::AxisTelemetry;
use crate::motor::registers::{
    encode_f32, join_f32, MoveType, Register, REGISTER_SPACE, STATUS_IN_POSITION,
};

/// Error code raised when a move is latched with a non-finite target or velocity
pub const ERROR_INVALID_PARAMETER: u16 = 1;

/// Distance under which the axis counts as sitting on its target
pub const IN_POSITION_TOLERANCE: f64 = 1e-6;

/// Authoritative motion state of one emulated axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisState {
    pub actual_position: f64,
    pub target_position: f64,
    pub target_velocity: f64,
    pub move_type: MoveType,
    pub motor_enabled: bool,
    pub moving: bool,
    pub status: u16,
    pub error_code: u16,
}

impl Default for AxisState {
    fn default() -> Self {
        Self {
            actual_position: 0.0,
            target_position: 0.0,
            target_velocity: 0.0,
            move_type: MoveType::Absolute,
            motor_enabled: false,
            moving: false,
            status: 0,
            error_code: 0,
        }
    }
}

impl AxisState {
    pub fn in_position(&self) -> bool {
        (self.target_position - self.actual_position).abs() <= IN_POSITION_TOLERANCE
    }
}

/// One emulated axis controller
///
/// Clients only touch the register image. The motion model reads the
/// request registers once per `tick` and writes status registers back.
pub struct AxisEmulator {
    unit: u8,
    registers: Vec<u16>,
    state: AxisState,
    // Start-request as it stood at the end of the previous tick
    start_sample: bool,
    // A clear-error pulse that may have come and gone between ticks
    clear_pending: bool,
    ticks: u64,
}

impl AxisEmulator {
    pub fn new(unit: u8) -> Self {
        let mut axis = Self {
            unit,
            registers: vec![0; REGISTER_SPACE],
            state: AxisState::default(),
            start_sample: false,
            clear_pending: false,
            ticks: 0,
        };
        axis.publish();
        axis
    }

    pub fn unit(&self) -> u8 {
        self.unit
    }

    pub fn state(&self) -> &AxisState {
        &self.state
    }

    /// Number of ticks run so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    fn check_range(address: u16, count: usize) -> Result<std::ops::Range<usize>, EmulatorError> {
        let start = address as usize;
        let end = start + count;
        if count == 0 || end > REGISTER_SPACE {
            return Err(EmulatorError::IllegalAddress { address, count });
        }
        Ok(start..end)
    }

    /// Serve a holding-register read
    pub fn read_registers(&self, address: u16, count: usize) -> Result<Vec<u16>, EmulatorError> {
        let range = Self::check_range(address, count)?;
        Ok(self.registers[range].to_vec())
    }

    /// Serve a holding-register write
    ///
    /// Writes are stored verbatim; the motion model only reacts on the next tick.
    pub fn write_registers(&mut self, address: u16, values: &[u16]) -> Result<(), EmulatorError> {
        let range = Self::check_range(address, values.len())?;

        for reg in Register::READ_ONLY {
            let start = reg.address() as usize;
            if start < range.end && range.start < start + reg.width() {
                return Err(EmulatorError::ReadOnly {
                    address: reg.address(),
                });
            }
        }

        debug!(
            "Unit {}: write {} words at {}: {:?}",
            self.unit,
            values.len(),
            address,
            values
        );
        self.registers[range.clone()].copy_from_slice(values);

        let clear = Register::ClearErrorRequest.address() as usize;
        if range.contains(&clear) && self.registers[clear] != 0 {
            self.clear_pending = true;
        }
        Ok(())
    }

    fn word(&self, reg: Register) -> u16 {
        self.registers[reg.address() as usize]
    }

    fn set_word(&mut self, reg: Register, value: u16) {
        self.registers[reg.address() as usize] = value;
    }

    fn float(&self, reg: Register) -> f32 {
        let at = reg.address() as usize;
        join_f32([self.registers[at], self.registers[at + 1]])
    }

    fn set_float(&mut self, reg: Register, value: f32) {
        let at = reg.address() as usize;
        self.registers[at..at + 2].copy_from_slice(&encode_f32(value));
    }

    /// Fault the axis: motion stops and new moves are refused until cleared
    pub fn raise_error(&mut self, code: u16) {
        warn!("Unit {}: error {} raised", self.unit, code);
        self.state.error_code = code;
        if self.state.moving {
            self.state.moving = false;
            self.set_word(Register::StartRequest, 0);
            self.start_sample = false;
        }
        self.publish();
    }

    /// Advance the axis by one simulation step of `dt` seconds
    pub fn tick(&mut self, dt: f64) {
        self.ticks += 1;

        if self.clear_pending || self.word(Register::ClearErrorRequest) != 0 {
            if self.state.error_code != 0 {
                info!("Unit {}: error {} cleared", self.unit, self.state.error_code);
            }
            self.state.error_code = 0;
            self.clear_pending = false;
        }

        self.state.motor_enabled = self.word(Register::MotorEnable) != 0;

        let start = self.word(Register::StartRequest) != 0;
        if start && !self.start_sample {
            self.begin_move();
        }

        if self.word(Register::StopRequest) != 0 {
            self.set_word(Register::StopRequest, 0);
            if self.state.moving {
                self.state.moving = false;
                info!(
                    "Unit {}: stop request, halted at {}",
                    self.unit, self.state.actual_position
                );
            }
        }

        if self.state.moving {
            self.advance(dt);
        }

        // The device releases start-request once it is idle again
        if !self.state.moving {
            self.set_word(Register::StartRequest, 0);
        }
        self.start_sample = self.word(Register::StartRequest) != 0;

        self.publish();
    }

    /// Latch the command registers for a new move
    fn begin_move(&mut self) {
        if self.state.error_code != 0 {
            warn!(
                "Unit {}: start refused, error {} active",
                self.unit, self.state.error_code
            );
            return;
        }

        let move_type = MoveType::from_word(self.word(Register::MoveType));
        let target = self.float(Register::TargetPosition) as f64;
        let velocity = self.float(Register::TargetVelocity) as f64;
        if !target.is_finite() || !velocity.is_finite() {
            warn!(
                "Unit {}: invalid move parameters (target={}, velocity={})",
                self.unit, target, velocity
            );
            self.state.error_code = ERROR_INVALID_PARAMETER;
            return;
        }

        self.state.move_type = move_type;
        self.state.target_position = match move_type {
            MoveType::Absolute => target,
            MoveType::Relative => self.state.actual_position + target,
        };
        self.state.target_velocity = velocity;
        self.state.moving = true;
        info!(
            "Unit {}: {:?} move {} -> {} at {}",
            self.unit,
            move_type,
            self.state.actual_position,
            self.state.target_position,
            velocity
        );
    }

    fn advance(&mut self, dt: f64) {
        let step = self.state.target_velocity.abs() * dt;
        let remaining = self.state.target_position - self.state.actual_position;

        // Absorb accumulated rounding so arrival lands on the nominal tick
        if remaining.abs() <= step + IN_POSITION_TOLERANCE {
            self.state.actual_position = self.state.target_position;
            self.state.moving = false;
            info!(
                "Unit {}: target {} reached",
                self.unit, self.state.target_position
            );
        } else {
            self.state.actual_position += step.copysign(remaining);
        }
    }

    /// Write the model's state into the status registers
    fn publish(&mut self) {
        let in_position = self.state.in_position();
        let status = self.word(Register::Status) & !STATUS_IN_POSITION;
        self.state.status = if in_position {
            status | STATUS_IN_POSITION
        } else {
            status
        };

        self.set_word(Register::Status, self.state.status);
        self.set_float(Register::ActualPosition, self.state.actual_position as f32);
        self.set_word(Register::ErrorCode, self.state.error_code);
        self.set_word(Register::RunFlag, self.state.moving as u16);
        self.set_word(Register::InPositionFlag, in_position as u16);
        self.set_word(Register::EnabledFlag, self.state.motor_enabled as u16);
    }

    pub fn telemetry(&self) -> AxisTelemetry {
        AxisTelemetry {
            unit: self.unit,
            actual_position: self.state.actual_position,
            target_position: self.state.target_position,
            target_velocity: self.state.target_velocity,
            moving: self.state.moving,
            in_position: self.state.in_position(),
            motor_enabled: self.state.motor_enabled,
            error_code: self.state.error_code,
        }
    }
}
