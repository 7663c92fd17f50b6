// Cartesian velocity decomposition for the three-axis manipulator
// Splits a straight-line move at a given speed into per-axis velocities
// that each axis controller can actually run.

use crate::error::{MotionError, Result};

/// Slowest speed an axis can run (mm/s)
pub const MIN_AXIS_VELOCITY: f64 = 1e-4;
/// Fastest speed an axis can run (mm/s)
pub const MAX_AXIS_VELOCITY: f64 = 1.0;
/// Components below this are treated as "axis does not move"
pub const VELOCITY_THRESHOLD: f64 = 5e-5;

/// Position in machine coordinates [x, y, z]
pub type Point3 = [f64; 3];

/// Per-axis velocity commands
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VelocityVector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl VelocityVector {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Returns velocities as array [x, y, z]
    pub fn as_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Euclidean norm, i.e. the speed along the path
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self::new(f(self.x), f(self.y), f(self.z))
    }
}

/// Highest path speed reachable: all three axes at full speed
pub fn max_path_velocity() -> f64 {
    3f64.sqrt() * MAX_AXIS_VELOCITY
}

/// Ensure `velocity` is a speed the manipulator can run along some path
pub fn validate_velocity(velocity: f64) -> Result<()> {
    let max = max_path_velocity();
    // NaN fails the range check too
    if !(MIN_AXIS_VELOCITY..=max).contains(&velocity) {
        return Err(MotionError::VelocityOutOfRange {
            velocity,
            min: MIN_AXIS_VELOCITY,
            max,
        });
    }
    Ok(())
}

/// Snap one axis velocity onto what the axis can run, keeping its sign
fn adjust_axis_velocity(v: f64) -> f64 {
    let magnitude = v.abs();
    if magnitude < VELOCITY_THRESHOLD {
        0.0
    } else if magnitude < MIN_AXIS_VELOCITY {
        if v >= 0.0 { MIN_AXIS_VELOCITY } else { -MIN_AXIS_VELOCITY }
    } else if magnitude > MAX_AXIS_VELOCITY {
        if v >= 0.0 { MAX_AXIS_VELOCITY } else { -MAX_AXIS_VELOCITY }
    } else {
        v
    }
}

/// Decompose a straight move from `start` to `end` at `total_velocity`
///
/// Each component is clamped to the axis limits. If clamping lost speed,
/// the vector is scaled back up once and clamped again; the result can
/// still fall short of `total_velocity` for directions near the limits.
///
/// # Errors
/// `VelocityOutOfRange` if `total_velocity` is below the axis minimum or
/// above the body-diagonal maximum.
pub fn decompose(start: Point3, end: Point3, total_velocity: f64) -> Result<VelocityVector> {
    validate_velocity(total_velocity)?;

    let dx = end[0] - start[0];
    let dy = end[1] - start[1];
    let dz = end[2] - start[2];
    let distance = (dx * dx + dy * dy + dz * dz).sqrt();
    if distance == 0.0 {
        return Ok(VelocityVector::zero());
    }

    let ux = dx / distance;
    let uy = dy / distance;
    let uz = dz / distance;

    let mut v = VelocityVector::new(ux * total_velocity, uy * total_velocity, uz * total_velocity)
        .map(adjust_axis_velocity);

    let actual = v.magnitude();
    if 0.0 < actual && actual < total_velocity {
        let scale = total_velocity / actual;
        v = v.map(|c| adjust_axis_velocity(c * scale));
    }

    Ok(v)
}
