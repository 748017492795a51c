//! Transport session: one WebSocket connection per open/close cycle.
//!
//! A [`Session`] owns a background task that multiplexes the connection with
//! `tokio::select!`. Inbound frames are decoded into [`ServerMessage`]s and
//! delivered through a [`Subscription`]; outbound messages are only accepted
//! while the connection is [`ConnectionState::Open`].

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use schafkopf::{ClientMessage, ServerMessage};
use std::{
    fmt,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use thiserror::Error;
use tokio::{
    net::TcpStream,
    sync::{mpsc, oneshot, watch},
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message};
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect: {0}")]
    Connect(String),
    #[error("failed to send frame: {0}")]
    Send(String),
    #[error("failed to receive frame: {0}")]
    Receive(String),
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ConnectionState {
    #[default]
    Connecting,
    Open,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        };
        write!(f, "{repr}")
    }
}

/// One established, text-framed connection.
#[async_trait]
pub trait Connection: Send {
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Next text frame. `None` once the peer closed the connection.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;

    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Factory for connections; swapped for a scripted fake in tests.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, TransportError>;
}

/// Production connector backed by `tokio-tungstenite`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, TransportError> {
        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        Ok(Box::new(WsConnection { stream }))
    }
}

pub struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Connection for WsConnection {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Close(_)) => return None,
                // Pings are answered by tungstenite itself
                Ok(_) => continue,
                Err(e) => return Some(Err(TransportError::Receive(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.stream
            .close(None)
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}

/// Cancellable stream of decoded inbound messages for one [`Session`].
pub struct Subscription {
    inbound: mpsc::UnboundedReceiver<ServerMessage>,
    cancelled: Arc<AtomicBool>,
}

impl Subscription {
    /// Next inbound message, or `None` once the session is closed.
    ///
    /// Frames already buffered when [`Session::close`] ran are discarded.
    pub async fn next(&mut self) -> Option<ServerMessage> {
        if self.cancelled.load(Ordering::Acquire) {
            return None;
        }
        let msg = self.inbound.recv().await?;
        if self.cancelled.load(Ordering::Acquire) {
            return None;
        }
        Some(msg)
    }
}

/// A live connection to one room.
pub struct Session {
    room_id: String,
    user_id: Option<String>,
    outbound: mpsc::UnboundedSender<ClientMessage>,
    state: Arc<watch::Sender<ConnectionState>>,
    cancelled: Arc<AtomicBool>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
}

impl Session {
    /// Spawns the connection task and returns the session handle together
    /// with its inbound subscription.
    ///
    /// Connect failures are logged and leave the session `Closed`; they are
    /// never returned to the caller.
    pub fn open(
        connector: Arc<dyn Connector>,
        url: String,
        room_id: impl Into<String>,
        user_id: Option<String>,
        initial_state_delay: Duration,
    ) -> (Self, Subscription) {
        let room_id = room_id.into();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let state = Arc::new(watch::Sender::new(ConnectionState::Connecting));
        let cancelled = Arc::new(AtomicBool::new(false));

        info!(room = %room_id, user = ?user_id, "Opening session");

        tokio::spawn(connection_task(
            connector,
            url,
            outbound_rx,
            inbound_tx,
            Arc::clone(&state),
            shutdown_rx,
            initial_state_delay,
        ));

        let session = Self {
            room_id,
            user_id,
            outbound,
            state,
            cancelled: Arc::clone(&cancelled),
            shutdown: Mutex::new(Some(shutdown_tx)),
        };
        let subscription = Subscription { inbound, cancelled };
        (session, subscription)
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch the connection state.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Queues `msg` for sending. Dropped silently unless the connection is open.
    pub fn send(&self, msg: ClientMessage) {
        if self.is_closed() || self.connection_state() != ConnectionState::Open {
            debug!(message = %msg, "Dropping message, connection not open");
            return;
        }
        let _ = self.outbound.send(msg);
    }

    /// Closes the connection. No inbound message is delivered afterwards.
    pub fn close(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        self.state.send_replace(ConnectionState::Closed);
        let shutdown = self.shutdown.lock().ok().and_then(|mut tx| tx.take());
        if let Some(tx) = shutdown {
            let _ = tx.send(());
        }
        info!(room = %self.room_id, "Session closed");
    }

    pub fn is_closed(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

async fn connection_task(
    connector: Arc<dyn Connector>,
    url: String,
    mut outbound: mpsc::UnboundedReceiver<ClientMessage>,
    inbound: mpsc::UnboundedSender<ServerMessage>,
    state: Arc<watch::Sender<ConnectionState>>,
    mut shutdown: oneshot::Receiver<()>,
    initial_state_delay: Duration,
) {
    let mut conn = tokio::select! {
        result = connector.connect(&url) => match result {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Session connect failed: {e}");
                state.send_replace(ConnectionState::Closed);
                return;
            }
        },
        _ = &mut shutdown => {
            debug!("Session closed while connecting");
            return;
        }
    };

    // close() may have run between connect finishing and this point
    let opened = state.send_if_modified(|current| {
        if *current == ConnectionState::Connecting {
            *current = ConnectionState::Open;
            true
        } else {
            false
        }
    });
    if !opened {
        let _ = conn.close().await;
        return;
    }
    debug!("Session open");

    let initial_request = tokio::time::sleep(initial_state_delay);
    tokio::pin!(initial_request);
    let mut requested = false;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                let _ = conn.close().await;
                break;
            }

            () = &mut initial_request, if !requested => {
                requested = true;
                if let Err(e) = send_message(conn.as_mut(), &ClientMessage::GetState).await {
                    warn!("{e}");
                    break;
                }
            }

            Some(msg) = outbound.recv() => {
                if let Err(e) = send_message(conn.as_mut(), &msg).await {
                    warn!("{e}");
                    break;
                }
            }

            frame = conn.recv() => match frame {
                Some(Ok(text)) => match ServerMessage::decode(&text) {
                    Ok(msg) => {
                        debug!(kind = msg.kind(), "Received message");
                        let _ = inbound.send(msg);
                    }
                    Err(e) => warn!("Dropping undecodable frame: {e}"),
                },
                Some(Err(e)) => {
                    warn!("{e}");
                    break;
                }
                None => {
                    info!("Server closed the connection");
                    break;
                }
            },
        }
    }

    state.send_replace(ConnectionState::Closed);
}

async fn send_message(conn: &mut dyn Connection, msg: &ClientMessage) -> Result<(), TransportError> {
    let text = match msg.encode() {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to encode outbound message: {e}");
            return Ok(());
        }
    };
    debug!(message = %msg, "Sending message");
    conn.send(text).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use tokio::{sync::Semaphore, time};

    /// Hands out frames queued up front, then stays silent.
    struct QueuedConnection {
        frames: VecDeque<String>,
        sent: mpsc::UnboundedSender<String>,
    }

    #[async_trait]
    impl Connection for QueuedConnection {
        async fn send(&mut self, text: String) -> Result<(), TransportError> {
            self.sent
                .send(text)
                .map_err(|e| TransportError::Send(e.to_string()))
        }

        async fn recv(&mut self) -> Option<Result<String, TransportError>> {
            match self.frames.pop_front() {
                Some(frame) => Some(Ok(frame)),
                None => std::future::pending().await,
            }
        }

        async fn close(&mut self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    struct QueuedConnector {
        connection: Mutex<Option<QueuedConnection>>,
        gate: Arc<Semaphore>,
    }

    #[async_trait]
    impl Connector for QueuedConnector {
        async fn connect(&self, _url: &str) -> Result<Box<dyn Connection>, TransportError> {
            self.gate
                .acquire()
                .await
                .map_err(|e| TransportError::Connect(e.to_string()))?
                .forget();
            let connection = self.connection.lock().unwrap().take();
            match connection {
                Some(connection) => Ok(Box::new(connection)),
                None => Err(TransportError::Connect("already connected".to_string())),
            }
        }
    }

    fn open_session(
        frames: &[&str],
        gate: Arc<Semaphore>,
    ) -> (Session, Subscription, mpsc::UnboundedReceiver<String>) {
        let (sent, wire) = mpsc::unbounded_channel();
        let connector = QueuedConnector {
            connection: Mutex::new(Some(QueuedConnection {
                frames: frames.iter().map(|f| f.to_string()).collect(),
                sent,
            })),
            gate,
        };
        let (session, subscription) = Session::open(
            Arc::new(connector),
            "ws://localhost/ws/room-1".to_string(),
            "room-1",
            Some("anna".to_string()),
            Duration::from_millis(100),
        );
        (session, subscription, wire)
    }

    async fn wait_until_open(session: &Session) {
        session
            .state()
            .wait_for(|state| *state == ConnectionState::Open)
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_are_decoded_in_order() {
        let (session, mut subscription, _wire) = open_session(
            &[
                r#"{"type":"trick_complete"}"#,
                "not json",
                r#"{"type":"play_error","message":"Cannot play this card"}"#,
            ],
            Arc::new(Semaphore::new(1)),
        );
        wait_until_open(&session).await;

        assert_eq!(subscription.next().await, Some(ServerMessage::TrickComplete));
        assert_eq!(
            subscription.next().await,
            Some(ServerMessage::PlayError {
                message: Some("Cannot play this card".to_string())
            })
        );
        assert_eq!(session.room_id(), "room-1");
        assert_eq!(session.user_id(), Some("anna"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_discards_frames_already_queued() {
        let (session, mut subscription, _wire) = open_session(
            &[
                r#"{"type":"bid_made"}"#,
                r#"{"type":"error","message":"Room closed"}"#,
                r#"{"type":"trick_complete"}"#,
            ],
            Arc::new(Semaphore::new(1)),
        );
        wait_until_open(&session).await;
        assert_eq!(subscription.next().await, Some(ServerMessage::BidMade));

        // let the connection task drain the socket into the inbound queue
        time::sleep(Duration::from_millis(10)).await;
        assert_eq!(subscription.inbound.len(), 2);

        session.close();
        assert!(session.is_closed());
        assert_eq!(session.connection_state(), ConnectionState::Closed);
        assert_eq!(subscription.next().await, None);
        assert_eq!(subscription.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_only_while_open() {
        let gate = Arc::new(Semaphore::new(0));
        let (session, _subscription, mut wire) = open_session(&[], Arc::clone(&gate));

        assert_eq!(session.connection_state(), ConnectionState::Connecting);
        session.send(ClientMessage::Pass);

        gate.add_permits(1);
        wait_until_open(&session).await;
        session.send(ClientMessage::Pass);

        assert_eq!(wire.recv().await, ClientMessage::Pass.encode().ok());
        assert_eq!(wire.recv().await, ClientMessage::GetState.encode().ok());
        assert!(wire.try_recv().is_err());

        session.close();
        session.send(ClientMessage::Pass);
        time::sleep(Duration::from_millis(200)).await;
        assert!(wire.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_while_connecting() {
        let gate = Arc::new(Semaphore::new(0));
        let (session, mut subscription, _wire) =
            open_session(&[r#"{"type":"bid_made"}"#], Arc::clone(&gate));

        session.close();
        gate.add_permits(1);
        time::sleep(Duration::from_millis(200)).await;

        assert_eq!(session.connection_state(), ConnectionState::Closed);
        assert_eq!(subscription.next().await, None);
    }
}
