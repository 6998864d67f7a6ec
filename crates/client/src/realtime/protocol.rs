//! socket.io v4 framing over Engine.IO v4 text frames.
//!
//! Only the subset the backend uses is handled: the default namespace,
//! JSON events, and the Engine.IO heartbeat.
//!
//! | Frame        | Meaning                          |
//! |--------------|----------------------------------|
//! | `0{..}`      | Engine.IO open (handshake)       |
//! | `1`          | Engine.IO close                  |
//! | `2` / `3`    | ping / pong                      |
//! | `40{..}`     | socket.io connect (ack)          |
//! | `41`         | socket.io disconnect             |
//! | `42[..]`     | socket.io event `[name, args..]` |
//! | `44{..}`     | socket.io connect error          |

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Client frame requesting a connection to the default namespace.
pub const CONNECT: &str = "40";

/// Heartbeat reply.
pub const PONG: &str = "3";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("empty frame")]
    Empty,
    #[error("unknown packet type: {0}")]
    UnknownType(char),
    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Engine.IO handshake data.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    /// Milliseconds between server pings.
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong.
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
}

const fn default_ping_interval() -> u64 {
    25_000
}

const fn default_ping_timeout() -> u64 {
    20_000
}

impl Handshake {
    /// Silence after which the connection is considered dead.
    #[must_use]
    pub const fn liveness_window(&self) -> Duration {
        Duration::from_millis(self.ping_interval + self.ping_timeout)
    }
}

/// A decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Connected,
    Disconnected,
    ConnectError(String),
    Event { name: String, args: Vec<Value> },
    /// Frames the client does not act on (acks, binary, noop, upgrade).
    Ignored,
}

/// Decode one text frame.
///
/// # Errors
///
/// Returns a [`ProtocolError`] for empty frames, unknown packet types, and
/// events whose payload is not a JSON array headed by a string.
pub fn decode(frame: &str) -> Result<Packet, ProtocolError> {
    let mut chars = frame.chars();
    let kind = chars.next().ok_or(ProtocolError::Empty)?;
    let rest = chars.as_str();

    match kind {
        '0' => serde_json::from_str(rest)
            .map(Packet::Open)
            .map_err(|e| ProtocolError::Malformed(e.to_string())),
        '1' => Ok(Packet::Close),
        '2' => Ok(Packet::Ping),
        '3' => Ok(Packet::Pong),
        '4' => decode_message(rest),
        '5' | '6' => Ok(Packet::Ignored),
        other => Err(ProtocolError::UnknownType(other)),
    }
}

fn decode_message(body: &str) -> Result<Packet, ProtocolError> {
    let mut chars = body.chars();
    let kind = chars.next().ok_or(ProtocolError::Empty)?;
    let rest = strip_namespace(chars.as_str());

    match kind {
        '0' => Ok(Packet::Connected),
        '1' => Ok(Packet::Disconnected),
        '2' => decode_event(rest),
        '4' => {
            let message = serde_json::from_str::<Value>(rest)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| rest.to_string());
            Ok(Packet::ConnectError(message))
        }
        '3' | '5' | '6' => Ok(Packet::Ignored),
        other => Err(ProtocolError::UnknownType(other)),
    }
}

/// Drop a leading `/namespace,` segment.
fn strip_namespace(rest: &str) -> &str {
    if rest.starts_with('/') {
        rest.split_once(',').map_or("", |(_, tail)| tail)
    } else {
        rest
    }
}

fn decode_event(rest: &str) -> Result<Packet, ProtocolError> {
    // An ack id may precede the array.
    let json = rest.trim_start_matches(|c: char| c.is_ascii_digit());
    let value: Value =
        serde_json::from_str(json).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
    let Value::Array(mut items) = value else {
        return Err(ProtocolError::Malformed("event payload is not an array".to_string()));
    };
    if items.is_empty() {
        return Err(ProtocolError::Malformed("event without name".to_string()));
    }
    let Value::String(name) = items.remove(0) else {
        return Err(ProtocolError::Malformed("event name is not a string".to_string()));
    };
    Ok(Packet::Event { name, args: items })
}

/// Encode an event frame `42["name",arg]`.
#[must_use]
pub fn encode_event(name: &str, arg: &Value) -> String {
    let frame = Value::Array(vec![Value::String(name.to_string()), arg.clone()]);
    format!("42{frame}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_handshake() {
        let packet =
            decode(r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":5000}"#)
                .unwrap();
        let Packet::Open(handshake) = packet else {
            panic!("expected open packet");
        };
        assert_eq!(handshake.sid, "abc");
        assert_eq!(handshake.liveness_window(), Duration::from_secs(30));
    }

    #[test]
    fn test_decode_heartbeat_and_connect() {
        assert_eq!(decode("2").unwrap(), Packet::Ping);
        assert_eq!(decode("3").unwrap(), Packet::Pong);
        assert_eq!(decode(r#"40{"sid":"xyz"}"#).unwrap(), Packet::Connected);
        assert_eq!(decode("41").unwrap(), Packet::Disconnected);
        assert_eq!(
            decode(r#"44{"message":"not authorized"}"#).unwrap(),
            Packet::ConnectError("not authorized".to_string())
        );
    }

    #[test]
    fn test_decode_event_with_namespace_and_ack() {
        let packet = decode(r#"42/orders,7["orderDeleted",{"id":3}]"#).unwrap();
        assert_eq!(
            packet,
            Packet::Event {
                name: "orderDeleted".to_string(),
                args: vec![json!({"id": 3})],
            }
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(decode(""), Err(ProtocolError::Empty));
        assert_eq!(decode("9"), Err(ProtocolError::UnknownType('9')));
        assert!(decode("42{}").is_err());
        assert!(decode("42[]").is_err());
        assert!(decode("42[1,2]").is_err());
    }

    #[test]
    fn test_encode_event() {
        assert_eq!(encode_event("join_company_room", &json!(5)), r#"42["join_company_room",5]"#);
        let frame = encode_event("leave_pedido_room", &json!(12));
        assert_eq!(
            decode(&frame).unwrap(),
            Packet::Event {
                name: "leave_pedido_room".to_string(),
                args: vec![json!(12)],
            }
        );
    }
}
