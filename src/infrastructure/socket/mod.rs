//! Socket.IO transport for live conversation updates.

mod client;
mod codec;
mod connection;
mod constants;
mod error;

pub use client::{SocketClient, SocketClientConfig, socket_url};
pub use codec::{EnginePacket, OpenPayload, SocketCodec, SocketPacket};
pub use connection::{SocketConnection, WebSocketConnection};
pub use error::{SocketError, SocketResult};
