//! Engine.IO v4 / Socket.IO v5 text framing.
//!
//! Over a WebSocket transport every frame carries exactly one Engine.IO
//! packet, so no payload batching is handled here.

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::constants::{DEFAULT_NAMESPACE, EnginePacketType, SocketPacketType};
use super::error::{SocketError, SocketResult};

use crate::domain::ports::{SocketCommand, SocketEvent};

/// Handshake parameters sent by the server in the open packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPayload {
    /// Engine.IO session id.
    pub sid: String,
    /// Transports the server could upgrade to.
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between server pings.
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong.
    pub ping_timeout: u64,
    /// Largest accepted payload in bytes.
    #[serde(default)]
    pub max_payload: Option<u64>,
}

impl OpenPayload {
    /// Longest silence tolerated before the server is considered gone.
    #[must_use]
    pub const fn heartbeat_deadline_ms(&self) -> u64 {
        self.ping_interval.saturating_add(self.ping_timeout)
    }
}

/// Decoded Engine.IO packet.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum EnginePacket {
    Open(OpenPayload),
    Close,
    Ping(String),
    Pong(String),
    Message(SocketPacket),
    Upgrade,
    Noop,
}

/// Decoded Socket.IO packet carried by an Engine.IO message.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum SocketPacket {
    Connect {
        namespace: String,
        data: Option<Value>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        name: String,
        args: Vec<Value>,
        ack_id: Option<u64>,
    },
    Ack {
        namespace: String,
        ack_id: Option<u64>,
        args: Vec<Value>,
    },
    ConnectError {
        namespace: String,
        message: String,
    },
}

impl SocketPacket {
    /// Namespace the packet belongs to.
    #[must_use]
    pub fn namespace(&self) -> &str {
        match self {
            Self::Connect { namespace, .. }
            | Self::Disconnect { namespace }
            | Self::Event { namespace, .. }
            | Self::Ack { namespace, .. }
            | Self::ConnectError { namespace, .. } => namespace,
        }
    }
}

/// Text frame encoder and decoder.
pub struct SocketCodec;

impl SocketCodec {
    /// Decodes one text frame.
    ///
    /// # Errors
    ///
    /// Returns an error for empty frames, unknown packet types or malformed JSON.
    pub fn decode(frame: &str) -> SocketResult<EnginePacket> {
        let mut chars = frame.chars();
        let kind = chars
            .next()
            .and_then(EnginePacketType::from_char)
            .ok_or_else(|| SocketError::protocol(format!("unknown engine packet: {frame:.16}")))?;
        let body = chars.as_str();

        match kind {
            EnginePacketType::Open => Ok(EnginePacket::Open(serde_json::from_str(body)?)),
            EnginePacketType::Close => Ok(EnginePacket::Close),
            EnginePacketType::Ping => Ok(EnginePacket::Ping(body.to_string())),
            EnginePacketType::Pong => Ok(EnginePacket::Pong(body.to_string())),
            EnginePacketType::Message => Ok(EnginePacket::Message(Self::decode_socket(body)?)),
            EnginePacketType::Upgrade => Ok(EnginePacket::Upgrade),
            EnginePacketType::Noop => Ok(EnginePacket::Noop),
        }
    }

    fn decode_socket(body: &str) -> SocketResult<SocketPacket> {
        let mut chars = body.chars();
        let kind = chars
            .next()
            .and_then(SocketPacketType::from_char)
            .ok_or_else(|| SocketError::protocol(format!("unknown socket packet: {body:.16}")))?;
        let rest = chars.as_str();

        if matches!(
            kind,
            SocketPacketType::BinaryEvent | SocketPacketType::BinaryAck
        ) {
            return Err(SocketError::protocol("binary packets are not supported"));
        }

        let (namespace, rest) = match rest.strip_prefix('/') {
            Some(_) => match rest.find(',') {
                Some(idx) => (&rest[..idx], &rest[idx + 1..]),
                None => (rest, ""),
            },
            None => (DEFAULT_NAMESPACE, rest),
        };
        let namespace = namespace.to_string();

        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let ack_id = rest[..digits].parse::<u64>().ok();
        let payload = &rest[digits..];
        let data = if payload.is_empty() {
            None
        } else {
            Some(serde_json::from_str::<Value>(payload)?)
        };

        match kind {
            SocketPacketType::Connect => Ok(SocketPacket::Connect { namespace, data }),
            SocketPacketType::Disconnect => Ok(SocketPacket::Disconnect { namespace }),
            SocketPacketType::ConnectError => {
                let message = match &data {
                    Some(Value::Object(map)) => map
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("connection refused")
                        .to_string(),
                    Some(Value::String(s)) => s.clone(),
                    _ => "connection refused".to_string(),
                };
                Ok(SocketPacket::ConnectError { namespace, message })
            }
            SocketPacketType::Event => {
                let Some(Value::Array(mut items)) = data else {
                    return Err(SocketError::protocol("event payload is not an array"));
                };
                if items.is_empty() {
                    return Err(SocketError::protocol("event without a name"));
                }
                let Value::String(name) = items.remove(0) else {
                    return Err(SocketError::protocol("event name is not a string"));
                };
                Ok(SocketPacket::Event {
                    namespace,
                    name,
                    args: items,
                    ack_id,
                })
            }
            SocketPacketType::Ack => {
                let args = match data {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                };
                Ok(SocketPacket::Ack {
                    namespace,
                    ack_id,
                    args,
                })
            }
            SocketPacketType::BinaryEvent | SocketPacketType::BinaryAck => {
                Err(SocketError::protocol("binary packets are not supported"))
            }
        }
    }

    /// Answer to a server ping, echoing its data.
    #[must_use]
    pub fn encode_pong(data: &str) -> String {
        format!("{}{data}", EnginePacketType::Pong.as_u8())
    }

    /// Namespace connect carrying the auth payload.
    #[must_use]
    pub fn encode_connect(token: &str) -> String {
        format!(
            "{}{}{}",
            EnginePacketType::Message.as_u8(),
            SocketPacketType::Connect.as_u8(),
            json!({ "token": token })
        )
    }

    /// Namespace disconnect.
    #[must_use]
    pub fn encode_disconnect() -> String {
        format!(
            "{}{}",
            EnginePacketType::Message.as_u8(),
            SocketPacketType::Disconnect.as_u8()
        )
    }

    /// Event with a single JSON argument.
    #[must_use]
    pub fn encode_event(name: &str, payload: &Value) -> String {
        format!(
            "{}{}{}",
            EnginePacketType::Message.as_u8(),
            SocketPacketType::Event.as_u8(),
            json!([name, payload])
        )
    }

    /// Event for a room membership command.
    #[must_use]
    pub fn encode_command(command: &SocketCommand) -> String {
        Self::encode_event(command.event_name(), &command.payload())
    }

    /// Maps a named server event to a domain event.
    ///
    /// Unknown names and payloads that do not match the expected shape yield
    /// `None` and are logged.
    #[must_use]
    pub fn parse_event(name: &str, args: Vec<Value>) -> Option<SocketEvent> {
        let payload = args.into_iter().next().unwrap_or(Value::Null);

        let parsed = match name {
            SocketEvent::NEW_MESSAGE => serde_json::from_value(payload)
                .map(|message| SocketEvent::NewMessage { message }),
            SocketEvent::NEW_CONVERSATION => serde_json::from_value(payload)
                .map(|conversation| SocketEvent::NewConversation { conversation }),
            SocketEvent::CONVERSATION_UPDATE => serde_json::from_value(payload)
                .map(|update| SocketEvent::ConversationUpdate { update }),
            _ => {
                debug!(event = name, "Ignoring unhandled socket event");
                return None;
            }
        };

        match parsed {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(event = name, error = %e, "Dropping malformed socket event");
                None
            }
        }
    }
}
