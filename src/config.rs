// Timing, key expressions and axis defaults
use std::time::Duration;

// Emulator simulation tick (10 Hz)
pub const TICK_PERIOD: Duration = Duration::from_millis(100);

// Emulator telemetry publish rate
pub const TELEMETRY_PERIOD: Duration = Duration::from_millis(500);

// Shortest tick or telemetry period; shorter requests are raised to this
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

// Zenoh key expressions, relative to the configured prefix
pub const DEFAULT_KEY_PREFIX: &str = "smcd14";
pub const KEY_REGISTERS: &str = "registers"; // register requests (queryable)
pub const KEY_STATE: &str = "state"; // per-unit telemetry, `<prefix>/state/<unit>`

// How long a client waits for a register reply
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

// Modbus unit ids of the manipulator axes
pub const UNIT_X: u8 = 1;
pub const UNIT_Y: u8 = 2;
pub const UNIT_Z: u8 = 3;
pub const DEFAULT_UNITS: [u8; 3] = [UNIT_X, UNIT_Y, UNIT_Z];

// Controller tunables
pub const POLL_INTERVAL: Duration = Duration::from_millis(500); // in-position polling
pub const CLEAR_ERROR_HOLD: Duration = Duration::from_millis(100); // clear-error pulse width
pub const IN_POSITION_TIMEOUT: Duration = Duration::from_secs(15);

pub fn registers_key(prefix: &str) -> String {
    format!("{}/{}", prefix, KEY_REGISTERS)
}

pub fn state_key(prefix: &str, unit: u8) -> String {
    format!("{}/{}/{}", prefix, KEY_STATE, unit)
}
