// Register access over zenoh queries
//
// Each read or write is one `get` on `<prefix>/registers` carrying a JSON
// `RegisterRequest`; the emulator runtime answers with a `RegisterReply`.
// Zenoh owns framing and delivery, so this only maps payloads.

use std::time::Duration;

use tracing::{debug, info};
use zenoh::{Config, Session, Wait};

use super::RegisterTransport;
use crate::config::{registers_key, DEFAULT_KEY_PREFIX, REQUEST_TIMEOUT};
use crate::error::TransportError;
use crate::messages::{RegisterReply, RegisterRequest};

/// Blocking register transport backed by a zenoh session
pub struct ZenohTransport {
    key: String,
    endpoint: Option<String>,
    timeout: Duration,
    session: Option<Session>,
}

impl ZenohTransport {
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_KEY_PREFIX)
    }

    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            key: registers_key(prefix),
            endpoint: None,
            timeout: REQUEST_TIMEOUT,
            session: None,
        }
    }

    /// Connect to a specific zenoh endpoint (e.g. `tcp/192.168.1.20:7447`)
    /// instead of relying on scouting
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = Some(endpoint.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn link_err(e: impl std::fmt::Display) -> TransportError {
        TransportError::Link(e.to_string())
    }

    fn request(&mut self, request: &RegisterRequest) -> Result<Vec<u16>, TransportError> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| TransportError::Link("session closed".to_string()))?;

        let body = serde_json::to_vec(request)?;
        let replies = session
            .get(self.key.as_str())
            .payload(body)
            .timeout(self.timeout)
            .wait()
            .map_err(Self::link_err)?;

        let reply = replies.recv().map_err(|_| TransportError::NoReply {
            address: request.address(),
        })?;
        let sample = reply
            .result()
            .map_err(|e| TransportError::Exception(format!("{:?}", e)))?;
        decode_reply(&sample.payload().to_bytes())
    }
}

/// Map a JSON reply body onto register values or a device exception
fn decode_reply(bytes: &[u8]) -> Result<Vec<u16>, TransportError> {
    match serde_json::from_slice::<RegisterReply>(bytes)? {
        RegisterReply::Ok { values } => Ok(values),
        RegisterReply::Exception { reason } => Err(TransportError::Exception(reason)),
    }
}

fn expect_count(values: Vec<u16>, count: u16) -> Result<Vec<u16>, TransportError> {
    if values.len() != count as usize {
        return Err(TransportError::Exception(format!(
            "expected {} registers, got {}",
            count,
            values.len()
        )));
    }
    Ok(values)
}

impl Default for ZenohTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterTransport for ZenohTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        let mut config = Config::default();
        if let Some(endpoint) = &self.endpoint {
            config
                .insert_json5("connect/endpoints", &format!(r#"["{}"]"#, endpoint))
                .map_err(Self::link_err)?;
        }
        info!("Opening zenoh session for {}", self.key);
        let session = zenoh::open(config).wait().map_err(Self::link_err)?;
        self.session = Some(session);
        Ok(())
    }

    fn close(&mut self) {
        if let Some(session) = self.session.take() {
            if let Err(e) = session.close().wait() {
                debug!("Error closing zenoh session: {}", e);
            }
        }
    }

    fn read_registers(
        &mut self,
        unit: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        let values = self.request(&RegisterRequest::Read {
            unit,
            address,
            count,
        })?;
        expect_count(values, count)
    }

    fn write_registers(
        &mut self,
        unit: u8,
        address: u16,
        values: &[u16],
    ) -> Result<(), TransportError> {
        self.request(&RegisterRequest::Write {
            unit,
            address,
            values: values.to_vec(),
        })?;
        Ok(())
    }
}
