//! Connection transport: opens a message-oriented connection to the backend and
//! reports its lifecycle as [`TransportEvent`]s.
//!
//! Every connection runs in its own task. Events from all connections share one
//! channel into the bridge, tagged with a [`ConnectionId`], so a single
//! connection's events always arrive in order.

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use crate::error::TransportError;

pub type ConnectionId = u64;

/// Lifecycle of one connection as seen by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEventKind {
    Opened,
    /// One inbound text frame.
    Message(String),
    /// Reported once per failure. A `Closed` usually follows, but not always.
    Error(String),
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    pub id: ConnectionId,
    pub kind: TransportEventKind,
}

/// Work for a connection's transport task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Close,
}

/// Sending side of a connection. Sends are queued, never awaited.
#[derive(Debug)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, tx: mpsc::UnboundedSender<Outbound>) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn send_text(&self, frame: String) -> Result<(), TransportError> {
        self.tx
            .send(Outbound::Text(frame))
            .map_err(|_| TransportError::Closed)
    }

    pub fn close(&self) -> Result<(), TransportError> {
        self.tx
            .send(Outbound::Close)
            .map_err(|_| TransportError::Closed)
    }
}

/// Opens connections to the backend.
pub trait Connector: Send {
    /// Start connecting to `endpoint`. Lifecycle events for the new connection
    /// are delivered on `events` tagged with `id`.
    fn connect(
        &self,
        id: ConnectionId,
        endpoint: &str,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> ConnectionHandle;
}

/// WebSocket connector backed by tokio-tungstenite.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn connect(
        &self,
        id: ConnectionId,
        endpoint: &str,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> ConnectionHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_ws_connection(id, endpoint.to_string(), rx, events));
        ConnectionHandle::new(id, tx)
    }
}

async fn run_ws_connection(
    id: ConnectionId,
    endpoint: String,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let emit = |kind: TransportEventKind| {
        // The bridge is gone during teardown; nobody is left to tell.
        let _ = events.send(TransportEvent { id, kind });
    };

    // 1. Connect, unless closed first
    let connect = tokio_tungstenite::connect_async(endpoint.as_str());
    tokio::pin!(connect);
    let ws_stream = loop {
        tokio::select! {
            res = &mut connect => match res {
                Ok((stream, _)) => break stream,
                Err(e) => {
                    warn!(conn = id, endpoint = %endpoint, error = %e, "failed to connect");
                    emit(TransportEventKind::Error(e.to_string()));
                    emit(TransportEventKind::Closed);
                    return;
                }
            },
            cmd = outbound.recv() => match cmd {
                Some(Outbound::Text(frame)) => {
                    warn!(conn = id, frame = %frame, "dropping frame sent before open");
                }
                Some(Outbound::Close) | None => {
                    debug!(conn = id, "closed while connecting");
                    emit(TransportEventKind::Closed);
                    return;
                }
            },
        }
    };

    debug!(conn = id, endpoint = %endpoint, "connected");
    emit(TransportEventKind::Opened);

    // 2. Pump frames both ways until either side closes
    let (mut ws_write, mut ws_read) = ws_stream.split();
    loop {
        tokio::select! {
            cmd = outbound.recv() => match cmd {
                Some(Outbound::Text(frame)) => {
                    if let Err(e) = ws_write.send(Message::Text(frame.clone().into())).await {
                        warn!(conn = id, frame = %frame, error = %e, "failed to send frame");
                    }
                }
                Some(Outbound::Close) | None => {
                    debug!(conn = id, "closing connection");
                    if let Err(e) = ws_write.send(Message::Close(None)).await {
                        debug!(conn = id, error = %e, "close frame not delivered");
                    }
                    break;
                }
            },
            msg = ws_read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    emit(TransportEventKind::Message(text.as_str().to_owned()));
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(conn = id, ?frame, "remote closed connection");
                    // Flushes the queued close reply
                    if let Err(e) = ws_write.close().await {
                        debug!(conn = id, error = %e, "close reply not delivered");
                    }
                    break;
                }
                // Binary, ping and pong frames carry nothing for us
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(conn = id, error = %e, "connection error");
                    emit(TransportEventKind::Error(e.to_string()));
                    break;
                }
                None => break,
            },
        }
    }

    emit(TransportEventKind::Closed);
}
