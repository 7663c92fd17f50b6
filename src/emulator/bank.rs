// A set of emulated axes addressed by unit id

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use super::axis::AxisEmulator;
use crate::error::EmulatorError;
use crate::messages::{AxisTelemetry, RegisterReply, RegisterRequest};

/// One emulated axis behind its own lock
pub type SharedAxis = Arc<Mutex<AxisEmulator>>;

/// Emulated axes keyed by unit id; cheap to clone, clones share the axes
#[derive(Clone, Default)]
pub struct EmulatorBank {
    axes: Arc<BTreeMap<u8, SharedAxis>>,
}

impl EmulatorBank {
    pub fn new(units: &[u8]) -> Self {
        let axes = units
            .iter()
            .map(|&unit| (unit, Arc::new(Mutex::new(AxisEmulator::new(unit)))))
            .collect();
        Self {
            axes: Arc::new(axes),
        }
    }

    pub fn units(&self) -> Vec<u8> {
        self.axes.keys().copied().collect()
    }

    pub fn axis(&self, unit: u8) -> Result<SharedAxis, EmulatorError> {
        self.axes
            .get(&unit)
            .cloned()
            .ok_or(EmulatorError::UnknownUnit { unit })
    }

    /// Run one simulation step on every axis
    ///
    /// Each axis is locked only for its own step.
    pub fn tick_all(&self, dt: f64) {
        for axis in self.axes.values() {
            axis.lock().tick(dt);
        }
    }

    /// Serve one register request
    pub fn handle(&self, request: &RegisterRequest) -> RegisterReply {
        let result = match request {
            RegisterRequest::Read {
                unit,
                address,
                count,
            } => self
                .axis(*unit)
                .and_then(|axis| {
                    let axis = axis.lock();
                    axis.read_registers(*address, *count as usize)
                }),
            RegisterRequest::Write {
                unit,
                address,
                values,
            } => self
                .axis(*unit)
                .and_then(|axis| {
                    let mut axis = axis.lock();
                    axis.write_registers(*address, values)
                })
                .map(|()| Vec::new()),
        };

        match result {
            Ok(values) => RegisterReply::Ok { values },
            Err(e) => {
                warn!("Register request at {} failed: {}", request.address(), e);
                RegisterReply::Exception {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn telemetry(&self) -> Vec<AxisTelemetry> {
        self.axes.values().map(|axis| axis.lock().telemetry()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::registers::{encode_f32, Register};

    #[test]
    fn test_units_are_independent() {
        let bank = EmulatorBank::new(&[1, 2, 3]);
        assert_eq!(bank.units(), vec![1, 2, 3]);

        let target = encode_f32(1.0);
        let velocity = encode_f32(1.0);
        let writes = [
            (Register::TargetPosition, &target[..]),
            (Register::TargetVelocity, &velocity[..]),
            (Register::StartRequest, &[1][..]),
        ];
        for (reg, values) in writes {
            let reply = bank.handle(&RegisterRequest::Write {
                unit: 2,
                address: reg.address(),
                values: values.to_vec(),
            });
            assert_eq!(reply, RegisterReply::Ok { values: vec![] });
        }

        bank.tick_all(0.1);
        let telemetry = bank.telemetry();
        assert!(!telemetry[0].moving);
        assert!(telemetry[1].moving);
        assert!(!telemetry[2].moving);
        assert_eq!(telemetry[1].unit, 2);
        assert_eq!(bank.axis(1).unwrap().lock().ticks(), 1);
    }

    #[test]
    fn test_read_request() {
        let bank = EmulatorBank::new(&[1]);
        let reply = bank.handle(&RegisterRequest::Read {
            unit: 1,
            address: Register::Status.address(),
            count: 1,
        });
        assert_eq!(reply, RegisterReply::Ok { values: vec![1 << 4] });
    }

    #[test]
    fn test_unknown_unit_is_exception() {
        let bank = EmulatorBank::new(&[1]);
        let reply = bank.handle(&RegisterRequest::Read {
            unit: 9,
            address: 0,
            count: 1,
        });
        assert_eq!(
            reply,
            RegisterReply::Exception {
                reason: "Unit 9 not present".to_string()
            }
        );
        assert!(matches!(
            bank.axis(9),
            Err(EmulatorError::UnknownUnit { unit: 9 })
        ));
    }

    #[test]
    fn test_emulator_faults_become_exceptions() {
        let bank = EmulatorBank::new(&[1]);
        let reply = bank.handle(&RegisterRequest::Write {
            unit: 1,
            address: Register::ActualPosition.address(),
            values: vec![0, 0],
        });
        assert!(matches!(reply, RegisterReply::Exception { .. }));
    }
}
