// Motion control for the SMCD14 manipulator
//
// Provides:
// - SMCD14 register map and float codec
// - Cartesian velocity decomposition (path speed -> axis velocities)
// - Single-axis command protocol over a register transport
// - Three-axis manipulator API

pub mod controller;
mod driver;
pub mod kinematics;
pub mod registers;

pub use controller::{AxisController, MoveCommand};
pub use driver::{Manipulator, AXIS_NAMES};
pub use kinematics::{decompose, Point3, VelocityVector};
