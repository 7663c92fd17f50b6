use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use smcd14_motion::config::{DEFAULT_KEY_PREFIX, TELEMETRY_PERIOD, TICK_PERIOD};
use smcd14_motion::runtime::{self, RuntimeSettings};

/// SMCD14 axis emulator served over zenoh
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Unit ids to emulate (one axis each)
    #[arg(long, value_delimiter = ',', default_value = "1,2,3")]
    units: Vec<u8>,

    /// Simulation tick period in milliseconds
    #[arg(long, default_value_t = TICK_PERIOD.as_millis() as u64)]
    tick_ms: u64,

    /// Telemetry publish period in milliseconds
    #[arg(long, default_value_t = TELEMETRY_PERIOD.as_millis() as u64)]
    telemetry_ms: u64,

    /// Key expression prefix
    #[arg(long, default_value = DEFAULT_KEY_PREFIX)]
    key_prefix: String,

    /// Zenoh endpoint to listen on, e.g. tcp/0.0.0.0:7447
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let settings = RuntimeSettings {
        units: args.units,
        tick_period: Duration::from_millis(args.tick_ms),
        telemetry_period: Duration::from_millis(args.telemetry_ms),
        key_prefix: args.key_prefix,
        listen: args.listen,
    };

    if let Err(e) = runtime::run(settings).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
