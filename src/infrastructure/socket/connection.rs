use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until, timeout};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};

use super::codec::{EnginePacket, SocketCodec, SocketPacket};
use super::constants::{CONNECTION_TIMEOUT, DEFAULT_NAMESPACE, HANDSHAKE_TIMEOUT};
use super::error::{SocketError, SocketResult};

use crate::domain::ConnectionStatus;
use crate::domain::entities::{AuthToken, ConversationId};
use crate::domain::ports::{ListenerRegistry, SocketCommand, SocketEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, WsMessage>;
type WsReader = SplitStream<WsStream>;

/// Raw frame transport underneath the Socket.IO session.
#[async_trait]
pub trait SocketConnection: Send + Sync {
    /// Opens the transport to `url`.
    async fn connect(&mut self, url: &str) -> SocketResult<()>;
    /// Closes the transport.
    async fn disconnect(&mut self) -> SocketResult<()>;
    /// Writes one text frame.
    async fn send(&mut self, frame: String) -> SocketResult<()>;
    /// Reads and decodes the next packet.
    async fn receive(&mut self) -> SocketResult<EnginePacket>;
    /// Whether the transport is open.
    fn is_connected(&self) -> bool;
}

/// [`SocketConnection`] over tokio-tungstenite.
pub struct WebSocketConnection {
    writer: Option<WsWriter>,
    reader: Option<WsReader>,
    connected: bool,
}

impl WebSocketConnection {
    /// Unconnected transport.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            writer: None,
            reader: None,
            connected: false,
        }
    }
}

impl Default for WebSocketConnection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SocketConnection for WebSocketConnection {
    async fn connect(&mut self, url: &str) -> SocketResult<()> {
        let (ws_stream, _) = timeout(CONNECTION_TIMEOUT, connect_async(url))
            .await
            .map_err(|_| SocketError::timeout("connection"))?
            .map_err(|e| SocketError::connection_failed(e.to_string()))?;

        let (writer, reader) = ws_stream.split();
        self.writer = Some(writer);
        self.reader = Some(reader);
        self.connected = true;

        Ok(())
    }

    async fn disconnect(&mut self) -> SocketResult<()> {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.close().await;
        }
        self.reader = None;
        self.connected = false;
        debug!("WebSocket connection closed");
        Ok(())
    }

    async fn send(&mut self, frame: String) -> SocketResult<()> {
        let writer = self.writer.as_mut().ok_or(SocketError::NotConnected)?;

        writer
            .send(WsMessage::Text(frame.into()))
            .await
            .map_err(|e| SocketError::websocket(e.to_string()))
    }

    async fn receive(&mut self) -> SocketResult<EnginePacket> {
        let reader = self.reader.as_mut().ok_or(SocketError::NotConnected)?;

        loop {
            match reader.next().await {
                Some(Ok(WsMessage::Text(text))) => return SocketCodec::decode(&text),
                Some(Ok(WsMessage::Close(frame))) => {
                    self.connected = false;
                    let (code, reason) = frame.map_or_else(
                        || (1000, "Normal closure".to_string()),
                        |f| (f.code.into(), f.reason.to_string()),
                    );

                    return Err(SocketError::ConnectionClosed { code, reason });
                }
                Some(Ok(WsMessage::Ping(data))) => {
                    if let Some(writer) = self.writer.as_mut() {
                        let _ = writer.send(WsMessage::Pong(data)).await;
                    }
                }
                Some(Ok(WsMessage::Binary(_))) => {
                    trace!("Ignoring binary frame");
                }
                Some(Ok(WsMessage::Pong(_) | WsMessage::Frame(_))) => {}
                Some(Err(e)) => {
                    self.connected = false;
                    return Err(SocketError::websocket(e.to_string()));
                }
                None => {
                    self.connected = false;
                    return Err(SocketError::ConnectionClosed {
                        code: 1000,
                        reason: "Stream ended".to_string(),
                    });
                }
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// State shared between a socket client and the task driving its connection.
///
/// Once `running` is cleared the task stops publishing, so a stale loop can
/// never overwrite the status of a newer one.
pub struct LoopContext {
    pub running: Arc<AtomicBool>,
    pub status: Arc<Mutex<ConnectionStatus>>,
    pub registry: Arc<ListenerRegistry>,
}

impl LoopContext {
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn set_status(&self, status: ConnectionStatus) {
        let mut current = self.status.lock();
        if self.is_running() {
            *current = status;
        }
    }

    pub fn publish(&self, event: &SocketEvent) {
        if self.is_running() {
            self.registry.dispatch(event);
        }
    }

    /// Marks the loop as finished.
    ///
    /// When the loop gave up on its own, every listener is removed so waiting
    /// subscribers observe the end. A loop stopped by its client leaves the
    /// registry alone, since a newer loop may already share it.
    pub fn finish(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            self.registry.clear();
        }
    }
}

/// Conversations the client asked to join. Replayed after every handshake.
#[derive(Debug, Default)]
pub struct RoomMembership(BTreeSet<ConversationId>);

impl RoomMembership {
    pub fn track(&mut self, command: &SocketCommand) {
        match command {
            SocketCommand::JoinConversation(id) => {
                self.0.insert(*id);
            }
            SocketCommand::LeaveConversation(id) => {
                self.0.remove(id);
            }
        }
    }

    pub fn rejoin_commands(&self) -> impl Iterator<Item = SocketCommand> + '_ {
        self.0.iter().copied().map(SocketCommand::JoinConversation)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// How a connected session ended.
#[derive(Debug)]
pub enum SessionEnd {
    /// The client closed its command channel.
    Closed,
    Lost(SocketError),
}

/// Drives one Socket.IO session over a [`SocketConnection`].
pub struct SocketConnectionHandler {
    connection: Box<dyn SocketConnection>,
    token: AuthToken,
    heartbeat_deadline: Duration,
    last_packet_at: Instant,
}

impl SocketConnectionHandler {
    pub fn new(connection: Box<dyn SocketConnection>, token: AuthToken) -> Self {
        Self {
            connection,
            token,
            heartbeat_deadline: HANDSHAKE_TIMEOUT,
            last_packet_at: Instant::now(),
        }
    }

    #[must_use]
    pub const fn heartbeat_deadline(&self) -> Duration {
        self.heartbeat_deadline
    }

    /// Opens the transport and completes the Engine.IO and namespace handshakes.
    ///
    /// # Errors
    ///
    /// Fails on transport errors, timeouts, or when the server refuses the token.
    pub async fn connect(&mut self, url: &str) -> SocketResult<()> {
        self.connection.connect(url).await?;

        let open = match self.receive_within(HANDSHAKE_TIMEOUT, "open").await? {
            EnginePacket::Open(open) => open,
            other => {
                return Err(SocketError::protocol(format!(
                    "expected open packet, got {other:?}"
                )));
            }
        };
        self.heartbeat_deadline = Duration::from_millis(open.heartbeat_deadline_ms());
        debug!(
            sid = %open.sid,
            ping_interval_ms = open.ping_interval,
            ping_timeout_ms = open.ping_timeout,
            "Engine.IO session opened"
        );

        self.connection
            .send(SocketCodec::encode_connect(self.token.as_str()))
            .await?;

        loop {
            match self.receive_within(HANDSHAKE_TIMEOUT, "namespace connect").await? {
                EnginePacket::Message(SocketPacket::Connect { namespace, .. })
                    if namespace == DEFAULT_NAMESPACE =>
                {
                    self.last_packet_at = Instant::now();
                    return Ok(());
                }
                EnginePacket::Message(SocketPacket::ConnectError { message, .. }) => {
                    return Err(SocketError::rejected(message));
                }
                EnginePacket::Ping(data) => {
                    self.connection
                        .send(SocketCodec::encode_pong(&data))
                        .await?;
                }
                EnginePacket::Close => {
                    return Err(SocketError::ConnectionClosed {
                        code: 1000,
                        reason: "closed during handshake".to_string(),
                    });
                }
                other => trace!(packet = ?other, "Ignoring packet during handshake"),
            }
        }
    }

    async fn receive_within(
        &mut self,
        limit: Duration,
        operation: &str,
    ) -> SocketResult<EnginePacket> {
        timeout(limit, self.connection.receive())
            .await
            .map_err(|_| SocketError::timeout(operation))?
    }

    /// Sends a command frame and records the room change.
    ///
    /// # Errors
    ///
    /// Fails when the transport rejects the frame.
    pub async fn send_command(
        &mut self,
        command: SocketCommand,
        rooms: &mut RoomMembership,
    ) -> SocketResult<()> {
        rooms.track(&command);
        self.connection
            .send(SocketCodec::encode_command(&command))
            .await
    }

    /// Re-joins every tracked room after a fresh handshake.
    ///
    /// # Errors
    ///
    /// Fails when the transport rejects a frame.
    pub async fn rejoin(&mut self, rooms: &RoomMembership) -> SocketResult<()> {
        for command in rooms.rejoin_commands() {
            self.connection
                .send(SocketCodec::encode_command(&command))
                .await?;
        }
        if !rooms.is_empty() {
            debug!(rooms = rooms.len(), "Rejoined conversation rooms");
        }
        Ok(())
    }

    /// Pumps packets and commands until the session ends.
    pub async fn run(
        &mut self,
        commands: &mut mpsc::UnboundedReceiver<SocketCommand>,
        rooms: &mut RoomMembership,
        context: &LoopContext,
    ) -> SessionEnd {
        loop {
            let deadline = self.last_packet_at + self.heartbeat_deadline;

            tokio::select! {
                result = self.connection.receive() => {
                    let handled = match result {
                        Ok(packet) => {
                            self.last_packet_at = Instant::now();
                            self.handle_packet(packet, context).await
                        }
                        Err(e) if e.is_malformed_frame() => {
                            self.last_packet_at = Instant::now();
                            warn!(error = %e, "Dropping malformed socket frame");
                            Ok(())
                        }
                        Err(e) => Err(e),
                    };
                    if let Err(e) = handled {
                        let _ = self.connection.disconnect().await;
                        return SessionEnd::Lost(e);
                    }
                }

                command = commands.recv() => {
                    let Some(command) = command else {
                        self.close().await;
                        return SessionEnd::Closed;
                    };
                    if let Err(e) = self.send_command(command, rooms).await {
                        warn!(error = %e, event = command.event_name(), "Failed to send command");
                    }
                }

                () = sleep_until(deadline) => {
                    let _ = self.connection.disconnect().await;
                    return SessionEnd::Lost(SocketError::PingTimeout {
                        timeout_ms: u64::try_from(self.heartbeat_deadline.as_millis())
                            .unwrap_or(u64::MAX),
                    });
                }
            }
        }
    }

    async fn handle_packet(
        &mut self,
        packet: EnginePacket,
        context: &LoopContext,
    ) -> SocketResult<()> {
        match packet {
            EnginePacket::Ping(data) => {
                self.connection
                    .send(SocketCodec::encode_pong(&data))
                    .await
            }
            EnginePacket::Close => Err(SocketError::ConnectionClosed {
                code: 1000,
                reason: "server closed the transport".to_string(),
            }),
            EnginePacket::Message(packet) if packet.namespace() != DEFAULT_NAMESPACE => {
                trace!(namespace = packet.namespace(), "Ignoring foreign namespace");
                Ok(())
            }
            EnginePacket::Message(SocketPacket::Event { name, args, .. }) => {
                if let Some(event) = SocketCodec::parse_event(&name, args) {
                    trace!(event = %name, "Socket event received");
                    context.publish(&event);
                }
                Ok(())
            }
            EnginePacket::Message(SocketPacket::Disconnect { .. }) => {
                info!("Server closed the socket session");
                Err(SocketError::ServerDisconnect)
            }
            EnginePacket::Message(SocketPacket::ConnectError { message, .. }) => {
                Err(SocketError::rejected(message))
            }
            other => {
                trace!(packet = ?other, "Ignoring packet");
                Ok(())
            }
        }
    }

    async fn close(&mut self) {
        if self.connection.is_connected() {
            let _ = self
                .connection
                .send(SocketCodec::encode_disconnect())
                .await;
        }
        let _ = self.connection.disconnect().await;
    }
}
