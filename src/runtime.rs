// Emulator runtime: serves an emulator bank over zenoh
// - register requests arrive as queries on `<prefix>/registers`
// - the simulation ticks on its own task, independent of requests
// - per-unit telemetry is published on `<prefix>/state/<unit>`

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::signal;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::config::{
    registers_key, state_key, DEFAULT_KEY_PREFIX, DEFAULT_UNITS, MIN_PERIOD, TELEMETRY_PERIOD,
    TICK_PERIOD,
};
use crate::emulator::{spawn_ticker, EmulatorBank};
use crate::messages::{RegisterReply, RegisterRequest};

/// Runtime options, filled from the command line by `main`
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub units: Vec<u8>,
    pub tick_period: Duration,
    pub telemetry_period: Duration,
    pub key_prefix: String,
    pub listen: Option<String>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            units: DEFAULT_UNITS.to_vec(),
            tick_period: TICK_PERIOD,
            telemetry_period: TELEMETRY_PERIOD,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            listen: None,
        }
    }
}

/// Decode a query payload and run it against the bank
pub fn serve_request(bank: &EmulatorBank, payload: &[u8]) -> RegisterReply {
    match serde_json::from_slice::<RegisterRequest>(payload) {
        Ok(request) => bank.handle(&request),
        Err(e) => {
            warn!("Failed to parse register request: {}", e);
            RegisterReply::Exception {
                reason: format!("malformed request: {}", e),
            }
        }
    }
}

/// Current telemetry of every axis, paired with the key it is published on
pub fn telemetry_frames(
    bank: &EmulatorBank,
    prefix: &str,
) -> Result<Vec<(String, String)>, serde_json::Error> {
    bank.telemetry()
        .into_iter()
        .map(|state| Ok((state_key(prefix, state.unit), serde_json::to_string(&state)?)))
        .collect()
}

pub async fn run(settings: RuntimeSettings) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut config = zenoh::Config::default();
    if let Some(endpoint) = &settings.listen {
        config.insert_json5("listen/endpoints", &format!(r#"["{}"]"#, endpoint))?;
    }

    info!("Opening Zenoh session...");
    let session = zenoh::open(config).await?;

    let bank = EmulatorBank::new(&settings.units);
    let ticker = spawn_ticker(bank.clone(), settings.tick_period);

    info!("Setting up queryable and publishers...");
    let key = registers_key(&settings.key_prefix);
    let queryable = session.declare_queryable(key.as_str()).await?;
    // One publisher per emulated unit, keyed by its state key
    let mut publishers = BTreeMap::new();
    for unit in bank.units() {
        let state = state_key(&settings.key_prefix, unit);
        let publisher = session.declare_publisher(state.clone()).await?;
        publishers.insert(state, publisher);
    }

    let mut telemetry = interval(settings.telemetry_period.max(MIN_PERIOD));
    info!(
        "Emulator started: units {:?}, {}ms tick, {}ms telemetry",
        bank.units(),
        settings.tick_period.as_millis(),
        settings.telemetry_period.as_millis()
    );
    info!("Serving registers on: {}", key);

    let result: Result<(), Box<dyn std::error::Error + Send + Sync>> = loop {
        tokio::select! {
            query = queryable.recv_async() => {
                let query = match query {
                    Ok(query) => query,
                    Err(e) => break Err(e),
                };
                let payload = query
                    .payload()
                    .map(|p| p.to_bytes().into_owned())
                    .unwrap_or_default();
                let reply = serve_request(&bank, &payload);
                let reply_json = serde_json::to_string(&reply)?;
                if let Err(e) = query.reply(query.key_expr().clone(), reply_json).await {
                    warn!("Failed to answer register request: {}", e);
                }
            }
            _ = telemetry.tick() => {
                for (key, state_json) in telemetry_frames(&bank, &settings.key_prefix)? {
                    if let Some(publisher) = publishers.get(&key) {
                        publisher.put(state_json).await?;
                    }
                }
            }
            _ = signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C)");
                break Ok(());
            }
        }
    };

    ticker.shutdown().await;
    if let Err(e) = session.close().await {
        error!("Error closing zenoh session: {}", e);
    }
    result
}
