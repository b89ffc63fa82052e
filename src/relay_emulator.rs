//! Stand-in relay actuator for benches without the hardware.
//!
//! Listens on the relay command topic, tracks the commanded state and
//! reports it on the relay status topic whenever it changes.  The relay
//! starts off.  Command payloads are forgiving: a JSON object with a
//! `state` (or `value`) field, a bare JSON scalar, or plain text.

use log::{debug, info, warn};
use serde_json::{Value, json};

use crate::actuation::RelayState;
use crate::app::inbound::InboundMessage;
use crate::app::ports::{BusPort, ClockPort};
use crate::config::TopicConfig;
use crate::error::BusError;

/// Interpret a commanded state.
///
/// - booleans map directly
/// - numbers: `> 0` is on
/// - strings `on|1|true` / `off|0|false`, case-insensitive and trimmed
pub fn normalize_state(value: &Value) -> Option<RelayState> {
    match value {
        Value::Bool(true) => Some(RelayState::On),
        Value::Bool(false) => Some(RelayState::Off),
        Value::Number(n) => n
            .as_f64()
            .map(|v| if v > 0.0 { RelayState::On } else { RelayState::Off }),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "on" | "1" | "true" => Some(RelayState::On),
            "off" | "0" | "false" => Some(RelayState::Off),
            _ => None,
        },
        _ => None,
    }
}

/// Pull the commanded value out of a raw payload.
fn commanded(payload: &[u8]) -> Option<Value> {
    match serde_json::from_slice::<Value>(payload) {
        Ok(Value::Object(map)) => map.get("state").or_else(|| map.get("value")).cloned(),
        Ok(scalar) => Some(scalar),
        Err(_) => std::str::from_utf8(payload)
            .ok()
            .map(|s| Value::String(s.to_string())),
    }
}

pub struct RelayEmulator {
    command_topic: String,
    status_topic: String,
    qos: u8,
    state: RelayState,
}

impl RelayEmulator {
    pub fn new(topics: &TopicConfig, qos: u8) -> Self {
        Self {
            command_topic: topics.relay_command.clone(),
            status_topic: topics.relay_status.clone(),
            qos,
            state: RelayState::Off,
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn subscribe(&self, bus: &mut impl BusPort) -> Result<(), BusError> {
        bus.subscribe(&self.command_topic)
    }

    /// Apply one command.  Returns the new state if it changed.
    pub fn handle_message(
        &mut self,
        msg: &InboundMessage,
        bus: &mut impl BusPort,
        clock: &impl ClockPort,
    ) -> Option<RelayState> {
        if msg.topic != self.command_topic {
            return None;
        }
        let Some(next) = commanded(&msg.payload).as_ref().and_then(normalize_state) else {
            debug!("Relay emulator: unrecognised command ignored");
            return None;
        };
        if next == self.state {
            return None;
        }
        self.state = next;
        info!("Relay emulator: {}", next);

        let status = json!({ "type": "relay", "state": next, "ts": clock.now_ms() });
        if let Err(e) = bus.publish(&self.status_topic, status.to_string().as_bytes(), self.qos, false) {
            warn!("Relay status publish failed: {e}");
        }
        Some(next)
    }
}
