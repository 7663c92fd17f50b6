// Three-axis manipulator built from SMCD14 axis controllers
//
// Combines the velocity planner and the per-axis protocol so a straight
// move in XYZ becomes one synchronized absolute move per axis.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::controller::AxisController;
use super::kinematics::{decompose, Point3, VelocityVector};
use crate::config::{UNIT_X, UNIT_Y, UNIT_Z};
use crate::error::Result;
use crate::transport::RegisterTransport;

/// Axis names in controller order
pub const AXIS_NAMES: [&str; 3] = ["X", "Y", "Z"];

/// X/Y/Z stage, one controller per axis
pub struct Manipulator<T: RegisterTransport> {
    axes: [AxisController<T>; 3],
}

impl<T: RegisterTransport> Manipulator<T> {
    pub fn new(axes: [AxisController<T>; 3]) -> Self {
        Self { axes }
    }

    /// Build controllers for units 1, 2 and 3 from one transport factory
    pub fn with_transport(mut make_transport: impl FnMut() -> T) -> Self {
        Self::new([UNIT_X, UNIT_Y, UNIT_Z].map(|unit| {
            AxisController::with_unit_id(make_transport(), unit)
        }))
    }

    pub fn axes(&self) -> &[AxisController<T>; 3] {
        &self.axes
    }

    pub fn connect_all(&self) -> Result<()> {
        for axis in &self.axes {
            axis.connect()?;
        }
        Ok(())
    }

    pub fn disconnect_all(&self) {
        for axis in &self.axes {
            axis.disconnect();
        }
    }

    pub fn motors_on(&self) -> Result<()> {
        for axis in &self.axes {
            axis.motor_on()?;
        }
        Ok(())
    }

    /// Current position [x, y, z]
    pub fn read_all_positions(&self) -> Result<Point3> {
        let mut position = [0.0; 3];
        for (slot, axis) in position.iter_mut().zip(&self.axes) {
            *slot = axis.read_position()? as f64;
        }
        Ok(position)
    }

    /// Move in a straight line from the current position to `target`
    ///
    /// Axes whose planned velocity is zero are not commanded.
    /// Returns the planned per-axis velocities.
    pub fn move_linear(&self, target: Point3, speed: f64) -> Result<VelocityVector> {
        let start = self.read_all_positions()?;
        let velocities = decompose(start, target, speed)?;
        info!(
            "Linear move {:?} -> {:?} at {}: {:?}",
            start, target, speed, velocities
        );

        for ((axis, &position), velocity) in self
            .axes
            .iter()
            .zip(&target)
            .zip(velocities.as_array())
        {
            if velocity == 0.0 {
                debug!("Unit {}: no motion on this axis", axis.unit_id());
                continue;
            }
            axis.move_absolute(position as f32, velocity.abs() as f32)?;
        }
        Ok(velocities)
    }

    /// Stop every axis, reporting the first failure after trying all
    pub fn emergency_stop(&self) -> Result<()> {
        let mut first_error = None;
        for axis in &self.axes {
            if let Err(e) = axis.emergency_stop() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Wait for all axes to report in-position within one shared deadline
    pub fn wait_until_in_position(&self, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        for axis in &self.axes {
            if !axis.wait_until(deadline)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::controller::tests::RecordingTransport;
    use crate::motor::registers::{encode_f32, Register};

    fn manipulator() -> (Manipulator<RecordingTransport>, [RecordingTransport; 3]) {
        let transports = [
            RecordingTransport::default(),
            RecordingTransport::default(),
            RecordingTransport::default(),
        ];
        let mut next = transports.clone().into_iter();
        let manipulator = Manipulator::with_transport(|| next.next().unwrap_or_default());
        manipulator.connect_all().unwrap();
        (manipulator, transports)
    }

    fn set_position(transport: &RecordingTransport, value: f32) {
        let [lo, hi] = encode_f32(value);
        let mut registers = transport.registers.lock();
        registers.insert(Register::ActualPosition.address(), lo);
        registers.insert(Register::ActualPosition.address() + 1, hi);
    }

    #[test]
    fn test_unit_ids() {
        let (manipulator, _) = manipulator();
        let units: Vec<u8> = manipulator.axes().iter().map(|a| a.unit_id()).collect();
        assert_eq!(units, vec![1, 2, 3]);
    }

    #[test]
    fn test_read_all_positions() {
        let (manipulator, transports) = manipulator();
        set_position(&transports[0], 1.5);
        set_position(&transports[1], -2.0);
        set_position(&transports[2], 0.25);
        assert_eq!(manipulator.read_all_positions().unwrap(), [1.5, -2.0, 0.25]);
    }

    #[test]
    fn test_move_linear_skips_idle_axes() {
        let (manipulator, transports) = manipulator();
        set_position(&transports[0], 1.0);

        let v = manipulator.move_linear([1.0, 4.0, 0.0], 0.5).unwrap();
        assert_eq!(v.x, 0.0);
        assert!((v.y - 0.5).abs() < 1e-12);

        assert!(transports[0].writes().is_empty());
        assert!(transports[2].writes().is_empty());
        let writes = transports[1].writes();
        assert_eq!(writes[1], (2, encode_f32(4.0).to_vec()));
        assert_eq!(writes[2], (8, encode_f32(0.5).to_vec()));
    }

    #[test]
    fn test_move_linear_sends_speed_magnitudes() {
        let (manipulator, transports) = manipulator();
        manipulator.move_linear([-3.0, 0.0, 4.0], 1.0).unwrap();

        let x = transports[0].writes();
        assert_eq!(x[1], (2, encode_f32(-3.0).to_vec()));
        assert_eq!(x[2], (8, encode_f32(0.6).to_vec()));
        let z = transports[2].writes();
        assert_eq!(z[2], (8, encode_f32(0.8).to_vec()));
    }

    #[test]
    fn test_move_linear_rejects_bad_speed() {
        let (manipulator, transports) = manipulator();
        assert!(manipulator.move_linear([1.0, 1.0, 1.0], 2.0).is_err());
        for transport in &transports {
            assert!(transport.writes().is_empty());
        }
    }

    #[test]
    fn test_wait_all_axes() {
        let (manipulator, transports) = manipulator();
        for transport in &transports[..2] {
            transport
                .registers
                .lock()
                .insert(Register::Status.address(), 1 << 4);
        }
        let started = Instant::now();
        assert!(!manipulator
            .wait_until_in_position(Duration::from_millis(20))
            .unwrap());
        assert!(started.elapsed() < Duration::from_secs(1));

        transports[2]
            .registers
            .lock()
            .insert(Register::Status.address(), 1 << 4);
        assert!(manipulator
            .wait_until_in_position(Duration::from_millis(20))
            .unwrap());
    }

    #[test]
    fn test_emergency_stop_all() {
        let (manipulator, transports) = manipulator();
        manipulator.emergency_stop().unwrap();
        for transport in &transports {
            assert_eq!(transport.writes(), vec![(16, vec![1])]);
        }
    }
}
