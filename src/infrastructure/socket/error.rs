use std::io;
use thiserror::Error;

/// Result alias for transport operations.
pub type SocketResult<T> = Result<T, SocketError>;

/// Transport and protocol failures of the live socket.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum SocketError {
    #[error("connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("connection closed with code {code}: {reason}")]
    ConnectionClosed { code: u16, reason: String },

    #[error("websocket error: {message}")]
    WebSocket { message: String },

    #[error("connection refused by server: {message}")]
    ConnectRejected { message: String },

    #[error("server closed the session")]
    ServerDisconnect,

    #[error("no ping from server within {timeout_ms}ms")]
    PingTimeout { timeout_ms: u64 },

    #[error("reconnection limit exceeded after {attempts} attempts")]
    ReconnectionLimitExceeded { attempts: u32 },

    #[error("serialization error: {message}")]
    SerializationError { message: String },

    #[error("protocol error: {message}")]
    ProtocolError { message: String },

    #[error("timeout waiting for {operation}")]
    Timeout { operation: String },

    #[error("invalid socket url: {url}")]
    InvalidUrl { url: String },

    #[error("not connected")]
    NotConnected,

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl SocketError {
    /// Connection could not be established.
    #[must_use]
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
        }
    }

    /// Error raised by the WebSocket layer.
    #[must_use]
    pub fn websocket(message: impl Into<String>) -> Self {
        Self::WebSocket {
            message: message.into(),
        }
    }

    /// Handshake refused by the server.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::ConnectRejected {
            message: message.into(),
        }
    }

    /// Payload could not be (de)serialized.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    /// Frame violates the Engine.IO or Socket.IO protocol.
    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::ProtocolError {
            message: message.into(),
        }
    }

    /// Operation did not finish in time.
    #[must_use]
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Whether the connection loop should try again after this error.
    ///
    /// A rejected handshake or an explicit server disconnect are final.
    #[must_use]
    pub const fn should_reconnect(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. }
                | Self::ConnectionClosed { .. }
                | Self::WebSocket { .. }
                | Self::PingTimeout { .. }
                | Self::Timeout { .. }
                | Self::ProtocolError { .. }
                | Self::SerializationError { .. }
                | Self::Io(_)
        )
    }

    /// A single frame could not be decoded; the transport itself is fine.
    #[must_use]
    pub const fn is_malformed_frame(&self) -> bool {
        matches!(
            self,
            Self::SerializationError { .. } | Self::ProtocolError { .. }
        )
    }
}

impl From<serde_json::Error> for SocketError {
    fn from(error: serde_json::Error) -> Self {
        Self::serialization(error.to_string())
    }
}
