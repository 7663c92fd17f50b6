// Linear move: drives all three axes to a target point at a path speed
//
// Usage: cargo run --example axis_move -- --x 1 --y 2 --z 0.5 --speed 0.8
// Run the emulator (`cargo run`) in another terminal first.

use std::time::Duration;

use clap::Parser;
use smcd14_motion::config::{DEFAULT_KEY_PREFIX, IN_POSITION_TIMEOUT};
use smcd14_motion::motor::{Manipulator, AXIS_NAMES};
use smcd14_motion::transport::ZenohTransport;

#[derive(Debug, Parser)]
#[command(about = "Move the SMCD14 manipulator in a straight line")]
struct Args {
    #[arg(long, default_value_t = 0.0)]
    x: f64,
    #[arg(long, default_value_t = 0.0)]
    y: f64,
    #[arg(long, default_value_t = 0.0)]
    z: f64,

    /// Path speed in mm/s
    #[arg(long, default_value_t = 0.5)]
    speed: f64,

    /// Seconds to wait for the move to finish
    #[arg(long, default_value_t = IN_POSITION_TIMEOUT.as_secs())]
    timeout: u64,

    #[arg(long, default_value = DEFAULT_KEY_PREFIX)]
    key_prefix: String,

    /// Zenoh endpoint of the emulator, e.g. tcp/127.0.0.1:7447
    #[arg(long)]
    connect: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let manipulator = Manipulator::with_transport(|| {
        let transport = ZenohTransport::with_prefix(&args.key_prefix);
        match &args.connect {
            Some(endpoint) => transport.with_endpoint(endpoint),
            None => transport,
        }
    });
    manipulator.connect_all()?;
    manipulator.motors_on()?;

    let start = manipulator.read_all_positions()?;
    println!("Start position: {:?}", start);

    let target = [args.x, args.y, args.z];
    let velocities = manipulator.move_linear(target, args.speed)?;
    for (name, v) in AXIS_NAMES.iter().zip(velocities.as_array()) {
        println!("  {} velocity: {:+.5} mm/s", name, v);
    }
    println!("  path speed: {:.5} mm/s", velocities.magnitude());

    if manipulator.wait_until_in_position(Duration::from_secs(args.timeout))? {
        println!("✓ In position: {:?}", manipulator.read_all_positions()?);
    } else {
        println!("✗ Timed out, stopping");
        manipulator.emergency_stop()?;
    }

    manipulator.disconnect_all();
    Ok(())
}
