//! Command side of the scheduler boundary.
//!
//! Collaborators outside the process speak [`InboundMessage`]
//! (`{"type": ..., "payload": {...}}`); the facade sends [`Command`]s directly.
//! Decoding never fails: unknown or malformed messages become commands that
//! the scheduler answers with an `error` event.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::timer::TimerConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl InboundMessage {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: None,
        }
    }

    pub fn with_payload(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload: Some(payload),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Begin a run. `None` is rejected by the scheduler without a state change.
    Start { config: Option<TimerConfig> },
    Pause,
    Resume,
    Stop,
    /// Stop and optionally replace the configuration.
    Reset { config: Option<TimerConfig> },
    Status,
    Unknown { kind: String },
    Malformed { kind: String, reason: String },
}

impl Command {
    /// Name used in logs and in the `command` field of error events.
    pub fn name(&self) -> &str {
        match self {
            Command::Start { .. } => "start",
            Command::Pause => "pause",
            Command::Resume => "resume",
            Command::Stop => "stop",
            Command::Reset { .. } => "reset",
            Command::Status => "status",
            Command::Unknown { kind } | Command::Malformed { kind, .. } => kind,
        }
    }

    pub fn decode(message: InboundMessage) -> Self {
        let InboundMessage { kind, payload } = message;
        match kind.as_str() {
            "start" => match parse_config(payload) {
                Ok(config) => Command::Start { config },
                Err(reason) => Command::Malformed { kind, reason },
            },
            "reset" => match parse_config(payload) {
                Ok(config) => Command::Reset { config },
                Err(reason) => Command::Malformed { kind, reason },
            },
            "pause" => Command::Pause,
            "resume" => Command::Resume,
            "stop" => Command::Stop,
            "status" => Command::Status,
            _ => Command::Unknown { kind },
        }
    }

    /// Parse a raw JSON text message.
    pub fn from_json(text: &str) -> Self {
        match serde_json::from_str::<InboundMessage>(text) {
            Ok(message) => Self::decode(message),
            Err(e) => Command::Malformed {
                kind: "unparseable".to_string(),
                reason: e.to_string(),
            },
        }
    }
}

/// Accepts either the config itself or `{ "config": { ... } }` as payload.
fn parse_config(payload: Option<Value>) -> Result<Option<TimerConfig>, String> {
    let Some(mut payload) = payload else {
        return Ok(None);
    };
    if payload.is_null() {
        return Ok(None);
    }
    if let Some(inner) = payload.get_mut("config") {
        payload = inner.take();
    }
    serde_json::from_value(payload)
        .map(Some)
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_simple_commands() {
        assert_eq!(Command::decode(InboundMessage::new("pause")), Command::Pause);
        assert_eq!(Command::decode(InboundMessage::new("resume")), Command::Resume);
        assert_eq!(Command::decode(InboundMessage::new("stop")), Command::Stop);
        assert_eq!(Command::decode(InboundMessage::new("status")), Command::Status);
    }

    #[test]
    fn start_carries_config() {
        let cmd = Command::from_json(
            r#"{"type":"start","payload":{"totalRounds":3,"workDuration":120,"restDuration":60}}"#,
        );
        match cmd {
            Command::Start { config: Some(config) } => {
                assert_eq!(config.total_rounds, 3);
                assert_eq!(config.work_duration, 120);
            }
            other => panic!("unexpected {other:?}"),
        }

        let nested = Command::decode(InboundMessage::with_payload(
            "start",
            json!({"config": {"totalRounds": 1, "workDuration": 10, "restDuration": 10}}),
        ));
        assert!(matches!(nested, Command::Start { config: Some(_) }));
    }

    #[test]
    fn start_without_payload_has_no_config() {
        assert_eq!(
            Command::decode(InboundMessage::new("start")),
            Command::Start { config: None }
        );
    }

    #[test]
    fn unknown_and_malformed() {
        assert_eq!(
            Command::from_json(r#"{"type":"bogus"}"#),
            Command::Unknown {
                kind: "bogus".into()
            }
        );
        let bad = Command::decode(InboundMessage::with_payload("start", json!({"workDuration": "x"})));
        assert!(matches!(bad, Command::Malformed { ref kind, .. } if kind == "start"));
        assert_eq!(bad.name(), "start");
        assert!(matches!(
            Command::from_json("not json"),
            Command::Malformed { .. }
        ));
    }
}
