//! End-to-end tests: axis controllers talking to the emulator through
//! the in-process transport, with the simulation ticking on its own thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use smcd14_motion::emulator::EmulatorBank;
use smcd14_motion::motor::{AxisController, Manipulator};
use smcd14_motion::transport::LocalTransport;
use smcd14_motion::{MotionError, TransportError};

/// Ticks the bank with a fixed 0.1 s step as fast as every millisecond
struct FastTicker {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FastTicker {
    fn start(bank: EmulatorBank) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let handle = thread::spawn(move || {
            while flag.load(Ordering::Relaxed) {
                bank.tick_all(0.1);
                thread::sleep(Duration::from_millis(1));
            }
        });
        Self {
            running,
            handle: Some(handle),
        }
    }
}

impl Drop for FastTicker {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn axis(bank: &EmulatorBank, unit: u8) -> AxisController<LocalTransport> {
    let axis = AxisController::with_unit_id(LocalTransport::new(bank.clone()), unit)
        .with_poll_interval(Duration::from_millis(2));
    axis.connect().expect("connect");
    axis
}

#[test]
fn test_single_axis_move_and_wait() {
    let bank = EmulatorBank::new(&[1]);
    let _ticker = FastTicker::start(bank.clone());
    let axis = axis(&bank, 1);

    axis.motor_on().unwrap();
    axis.move_absolute(2.5, 1.0).unwrap();
    assert!(axis.wait_until_in_position(Duration::from_secs(10)).unwrap());
    assert_eq!(axis.read_position().unwrap(), 2.5);
    assert_eq!(axis.read_target_position().unwrap(), 2.5);

    axis.move_relative(-1.0, 1.0).unwrap();
    assert!(axis.wait_until_in_position(Duration::from_secs(10)).unwrap());
    assert_eq!(axis.read_position().unwrap(), 1.5);
}

#[test]
fn test_wait_does_not_report_unlatched_move() {
    let bank = EmulatorBank::new(&[1]);
    let axis = axis(&bank, 1);

    axis.move_absolute(10.0, 1.0).unwrap();
    assert!(!axis.wait_until_in_position(Duration::from_millis(50)).unwrap());
    assert_eq!(axis.read_position().unwrap(), 0.0);

    for _ in 0..100 {
        bank.tick_all(0.1);
    }
    assert!(axis.wait_until_in_position(Duration::from_millis(50)).unwrap());
    assert_eq!(axis.read_position().unwrap(), 10.0);
}

#[test]
fn test_emergency_stop_halts_axis() {
    let bank = EmulatorBank::new(&[1]);
    let axis = axis(&bank, 1);

    axis.move_absolute(100.0, 1.0).unwrap();
    for _ in 0..5 {
        bank.tick_all(0.1);
    }
    axis.emergency_stop().unwrap();
    bank.tick_all(0.1);
    let stopped = axis.read_position().unwrap();
    for _ in 0..20 {
        bank.tick_all(0.1);
    }
    assert_eq!(axis.read_position().unwrap(), stopped);
    assert!(!axis.in_position().unwrap());
    assert!(!axis.wait_until_in_position(Duration::from_millis(10)).unwrap());
}

#[test]
fn test_clear_error_resets_fault() {
    let bank = EmulatorBank::new(&[1]);
    let axis = axis(&bank, 1)
        .with_clear_error_hold(Duration::from_millis(5))
        .unwrap();

    let shared = bank.axis(1).unwrap();
    assert_eq!(shared.lock().unit(), 1);
    shared.lock().raise_error(9);
    assert_eq!(axis.read_error_code().unwrap(), 9);

    axis.clear_error().unwrap();
    bank.tick_all(0.1);
    assert_eq!(axis.read_error_code().unwrap(), 0);
}

#[test]
fn test_device_exceptions_surface_as_transport_errors() {
    let bank = EmulatorBank::new(&[1]);
    let ghost = axis(&bank, 7);
    assert!(matches!(
        ghost.read_position(),
        Err(MotionError::Transport(TransportError::Exception(_)))
    ));
}

#[test]
fn test_manipulator_linear_move() {
    let bank = EmulatorBank::new(&[1, 2, 3]);
    let _ticker = FastTicker::start(bank.clone());
    let manipulator = Manipulator::new([1, 2, 3].map(|unit| axis(&bank, unit)));

    let v = manipulator.move_linear([1.0, 0.5, 0.0], 1.0).unwrap();
    assert!((v.magnitude() - 1.0).abs() < 1e-9);
    assert_eq!(v.z, 0.0);

    assert!(manipulator
        .wait_until_in_position(Duration::from_secs(10))
        .unwrap());
    assert_eq!(manipulator.read_all_positions().unwrap(), [1.0, 0.5, 0.0]);
}
