use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::FutureExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, warn};

use super::connection::{
    LoopContext, RoomMembership, SessionEnd, SocketConnectionHandler, WebSocketConnection,
};
use super::constants::{
    ENGINE_IO_VERSION, MAX_RECONNECT_ATTEMPTS, RECONNECT_DELAY_BASE, RECONNECT_DELAY_MAX,
    RECONNECT_JITTER_MAX, SOCKET_IO_PATH,
};
use super::error::{SocketError, SocketResult};

use crate::domain::ConnectionStatus;
use crate::domain::entities::AuthToken;
use crate::domain::errors::ApiError;
use crate::domain::ports::{
    ListenerRegistry, SocketCommand, SocketEvent, SocketEventKind, SocketPort, Subscription,
    SubscriptionId,
};

/// Connection settings for [`SocketClient`].
#[derive(Debug, Clone)]
pub struct SocketClientConfig {
    /// Backend base url, `http(s)` or `ws(s)`.
    pub url: String,
    /// Retry after a recoverable failure.
    pub auto_reconnect: bool,
    /// Attempts before giving up.
    pub max_reconnect_attempts: u32,
}

impl SocketClientConfig {
    /// Settings with reconnection enabled.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auto_reconnect: true,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
        }
    }

    /// Enables or disables reconnection.
    #[must_use]
    pub const fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Caps reconnect attempts.
    #[must_use]
    pub const fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }
}

/// Builds the WebSocket endpoint for a backend base url.
///
/// `http`/`https` bases map to `ws`/`wss`.
///
/// # Errors
///
/// Returns `SocketError::InvalidUrl` for a missing host or an unknown scheme.
pub fn socket_url(base: &str) -> SocketResult<String> {
    let base = base.trim().trim_end_matches('/');
    let invalid = || SocketError::InvalidUrl {
        url: base.to_string(),
    };

    let (scheme, rest) = base.split_once("://").ok_or_else(invalid)?;
    let scheme = match scheme.to_ascii_lowercase().as_str() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        _ => return Err(invalid()),
    };
    if rest.is_empty() {
        return Err(invalid());
    }

    Ok(format!(
        "{scheme}://{rest}{SOCKET_IO_PATH}?EIO={ENGINE_IO_VERSION}&transport=websocket"
    ))
}

struct LoopHandle {
    running: Arc<AtomicBool>,
    commands: mpsc::UnboundedSender<SocketCommand>,
}

/// Socket.IO client backing [`SocketPort`].
///
/// A background task owns the connection and reconnects with exponential
/// backoff. Listeners live in a shared [`ListenerRegistry`] and survive
/// reconnects; only [`SocketPort::disconnect`] removes them.
pub struct SocketClient {
    config: SocketClientConfig,
    registry: Arc<ListenerRegistry>,
    status: Arc<Mutex<ConnectionStatus>>,
    active: Mutex<Option<LoopHandle>>,
}

impl SocketClient {
    /// Creates a disconnected client.
    #[must_use]
    pub fn new(config: SocketClientConfig) -> Self {
        Self {
            config,
            registry: Arc::new(ListenerRegistry::new()),
            status: Arc::new(Mutex::new(ConnectionStatus::Disconnected)),
            active: Mutex::new(None),
        }
    }

    /// Whether a connection loop is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.active
            .lock()
            .as_ref()
            .is_some_and(|h| h.running.load(Ordering::SeqCst))
    }

    fn stop(&self) {
        let handle = self.active.lock().take();
        let mut status = self.status.lock();
        if let Some(handle) = handle {
            handle.running.store(false, Ordering::SeqCst);
        }
        *status = ConnectionStatus::Disconnected;
    }
}

impl SocketPort for SocketClient {
    fn connect(&self, token: &AuthToken) -> Result<(), ApiError> {
        let mut active = self.active.lock();
        if let Some(handle) = active.as_ref()
            && handle.running.load(Ordering::SeqCst)
        {
            debug!("Socket already running");
            return Ok(());
        }

        let url = socket_url(&self.config.url).map_err(|e| ApiError::unexpected(e.to_string()))?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ApiError::unexpected(format!("no async runtime for socket: {e}")))?;

        let running = Arc::new(AtomicBool::new(true));
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let context = LoopContext {
            running: running.clone(),
            status: self.status.clone(),
            registry: self.registry.clone(),
        };
        context.set_status(ConnectionStatus::Connecting);

        let loop_config = SocketLoopConfig {
            url,
            token: token.clone(),
            auto_reconnect: self.config.auto_reconnect,
            max_attempts: self.config.max_reconnect_attempts,
        };

        runtime.spawn(async move {
            let result = std::panic::AssertUnwindSafe(run_socket_loop(
                loop_config,
                commands_rx,
                &context,
            ));

            if let Err(panic_info) = result.catch_unwind().await {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    (*s).to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };

                error!(panic = %panic_msg, "Socket task panicked");
                context.publish(&SocketEvent::Error {
                    message: format!("Socket task panicked: {panic_msg}"),
                    recoverable: false,
                });
                context.set_status(ConnectionStatus::Error);
                context.finish();
            }
        });

        info!(url = %self.config.url, "Socket connection started");
        *active = Some(LoopHandle {
            running,
            commands: commands_tx,
        });
        Ok(())
    }

    fn disconnect(&self) {
        self.stop();
        self.registry.clear();
        info!("Socket disconnected");
    }

    fn on(&self, kinds: &[SocketEventKind]) -> Subscription {
        self.registry.register(kinds)
    }

    fn off(&self, id: SubscriptionId) {
        if self.registry.remove(id) {
            debug!(subscription = %id, "Socket listener removed");
        }
    }

    fn emit(&self, command: SocketCommand) {
        let active = self.active.lock();
        let Some(handle) = active
            .as_ref()
            .filter(|h| h.running.load(Ordering::SeqCst))
        else {
            warn!(event = command.event_name(), "Socket not running, dropping command");
            return;
        };

        if handle.commands.send(command).is_err() {
            warn!(event = command.event_name(), "Socket task gone, dropping command");
        } else if !self.status().is_connected() {
            debug!(event = command.event_name(), "Command queued until reconnect");
        }
    }

    fn status(&self) -> ConnectionStatus {
        *self.status.lock()
    }
}

impl Drop for SocketClient {
    fn drop(&mut self) {
        if let Some(handle) = self.active.get_mut().take() {
            handle.running.store(false, Ordering::SeqCst);
        }
    }
}

struct SocketLoopConfig {
    url: String,
    token: AuthToken,
    auto_reconnect: bool,
    max_attempts: u32,
}

async fn run_socket_loop(
    config: SocketLoopConfig,
    mut commands: mpsc::UnboundedReceiver<SocketCommand>,
    context: &LoopContext,
) {
    let mut reconnect_attempts: u32 = 0;
    let mut rooms = RoomMembership::default();

    while context.is_running() {
        let connection = Box::new(WebSocketConnection::new());
        let mut handler = SocketConnectionHandler::new(connection, config.token.clone());

        match handler.connect(&config.url).await {
            Ok(()) => {
                info!("Socket connected");
                reconnect_attempts = 0;
                context.set_status(ConnectionStatus::Connected);
                context.publish(&SocketEvent::Connected);

                if let Err(e) = handler.rejoin(&rooms).await {
                    warn!(error = %e, "Failed to rejoin conversation rooms");
                }

                match handler.run(&mut commands, &mut rooms, context).await {
                    SessionEnd::Closed => break,
                    SessionEnd::Lost(e) => {
                        warn!(error = %e, "Socket connection lost");
                        context.publish(&SocketEvent::Disconnected {
                            reason: e.to_string(),
                        });

                        if !e.should_reconnect() {
                            context.set_status(ConnectionStatus::Disconnected);
                            break;
                        }
                        reconnect_attempts += 1;
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to connect socket");
                context.publish(&SocketEvent::Error {
                    message: e.to_string(),
                    recoverable: e.should_reconnect(),
                });

                if !e.should_reconnect() {
                    context.set_status(ConnectionStatus::Error);
                    break;
                }
                reconnect_attempts += 1;
            }
        }

        if !context.is_running() {
            break;
        }

        if !config.auto_reconnect {
            context.set_status(ConnectionStatus::Disconnected);
            break;
        }

        if reconnect_attempts >= config.max_attempts {
            let err = SocketError::ReconnectionLimitExceeded {
                attempts: reconnect_attempts,
            };
            error!(attempts = reconnect_attempts, "Max reconnection attempts exceeded");
            context.publish(&SocketEvent::Error {
                message: err.to_string(),
                recoverable: false,
            });
            context.set_status(ConnectionStatus::Error);
            break;
        }

        let delay = calculate_backoff_delay(reconnect_attempts.saturating_sub(1));
        info!(
            attempt = reconnect_attempts,
            delay_ms = delay.as_millis(),
            "Reconnecting socket"
        );
        context.set_status(ConnectionStatus::Reconnecting);
        context.publish(&SocketEvent::Reconnecting {
            attempt: reconnect_attempts,
        });

        if !wait_for_retry(delay, &mut commands, &mut rooms).await {
            break;
        }
    }

    context.finish();
    info!("Socket loop terminated");
}

/// Sleeps until the next attempt, still recording room changes.
///
/// Returns `false` when the client closed the command channel.
async fn wait_for_retry(
    delay: Duration,
    commands: &mut mpsc::UnboundedReceiver<SocketCommand>,
    rooms: &mut RoomMembership,
) -> bool {
    let wake_at = Instant::now() + delay;

    loop {
        tokio::select! {
            () = sleep_until(wake_at) => return true,
            command = commands.recv() => match command {
                Some(command) => rooms.track(&command),
                None => return false,
            },
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn calculate_backoff_delay(attempt: u32) -> Duration {
    let base_delay = RECONNECT_DELAY_BASE.as_millis() as u64;
    let max_delay = RECONNECT_DELAY_MAX.as_millis() as u64;
    let jitter_max = RECONNECT_JITTER_MAX.as_millis() as u64;

    let exponential_delay = base_delay.saturating_mul(2_u64.saturating_pow(attempt.min(6)));
    let capped_delay = exponential_delay.min(max_delay);

    Duration::from_millis(capped_delay.saturating_add(rand_jitter(jitter_max)))
}

fn rand_jitter(max: u64) -> u64 {
    use std::time::SystemTime;

    if max == 0 {
        return 0;
    }

    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| u64::from(d.subsec_nanos()))
        .unwrap_or(0);

    nanos % max
}
