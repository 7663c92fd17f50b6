// Axis diagnostic: READ-ONLY check of every SMCD14 axis
//
// This tool does NOT write anything to the controllers - it's completely safe.
// Start the emulator first (`cargo run`) or point it at a zenoh router that
// bridges to real hardware.
//
// Usage: cargo run --example axis_diagnostic -- [zenoh endpoint]
// Example: cargo run --example axis_diagnostic -- tcp/127.0.0.1:7447

use smcd14_motion::motor::{AxisController, AXIS_NAMES};
use smcd14_motion::transport::ZenohTransport;

const UNITS: [u8; 3] = [1, 2, 3];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let endpoint = std::env::args().nth(1);

    println!("SMCD14 axis diagnostic (read-only)");
    println!("Endpoint: {}", endpoint.as_deref().unwrap_or("<scouting>"));
    println!();

    for (name, unit) in AXIS_NAMES.iter().zip(UNITS) {
        let mut transport = ZenohTransport::new();
        if let Some(endpoint) = &endpoint {
            transport = transport.with_endpoint(endpoint);
        }
        let axis = AxisController::with_unit_id(transport, unit);

        print!("  Axis {} (unit {}): ", name, unit);
        if let Err(e) = axis.connect() {
            println!("✗ CONNECT FAILED: {}", e);
            continue;
        }

        let report = || -> Result<(), Box<dyn std::error::Error>> {
            let position = axis.read_position()?;
            let status = axis.read_status()?;
            let error = axis.read_error_code()?;
            let backlash = axis.get_backlash()?;
            println!(
                "position={:.4} status=0x{:04X} in_position={} error={} backlash={}",
                position,
                status,
                axis.in_position()?,
                error,
                backlash
            );
            Ok(())
        };
        if let Err(e) = report() {
            println!("✗ ERROR: {}", e);
        }
        axis.disconnect();
    }

    Ok(())
}
