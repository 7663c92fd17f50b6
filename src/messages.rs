// Message types exchanged with the emulator runtime

use serde::{Deserialize, Serialize};

// Register access request from a client -> emulator
// One request maps onto one read or one multi-word write on a single unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RegisterRequest {
    Read { unit: u8, address: u16, count: u16 },
    Write { unit: u8, address: u16, values: Vec<u16> },
}

impl RegisterRequest {
    pub fn address(&self) -> u16 {
        match self {
            RegisterRequest::Read { address, .. } | RegisterRequest::Write { address, .. } => {
                *address
            }
        }
    }
}

// Reply from emulator -> client
// Writes answer with an empty `values`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RegisterReply {
    Ok { values: Vec<u16> },
    Exception { reason: String },
}

/// Per-axis state published by the emulator runtime every telemetry period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisTelemetry {
    pub unit: u8,
    pub actual_position: f64,
    pub target_position: f64,
    pub target_velocity: f64,
    pub moving: bool,
    pub in_position: bool,
    pub motor_enabled: bool,
    pub error_code: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let req = RegisterRequest::Write {
            unit: 2,
            address: 15,
            values: vec![1],
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"op":"write","unit":2,"address":15,"values":[1]}"#);

        let parsed: RegisterRequest =
            serde_json::from_str(r#"{"op":"read","unit":1,"address":18,"count":2}"#).unwrap();
        assert_eq!(
            parsed,
            RegisterRequest::Read {
                unit: 1,
                address: 18,
                count: 2
            }
        );
        assert_eq!(parsed.address(), 18);
    }

    #[test]
    fn test_reply_wire_format() {
        let reply = RegisterReply::Exception {
            reason: "Unit 9 not present".to_string(),
        };
        let json = serde_json::to_string(&reply).unwrap();
        assert_eq!(json, r#"{"status":"exception","reason":"Unit 9 not present"}"#);
    }
}
