//! Bridge orchestrator
//!
//! The [`Bridge`] owns the session registry and every connection. It is driven
//! by one event loop ([`Bridge::run`]) that multiplexes chat commands and
//! transport events, so all state changes happen on a single task and no locks
//! are needed. Hosts talk to the running loop through a [`BridgeHandle`].

use std::collections::HashMap;
use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vtuber_protocol::ImageRef;

use crate::chat::{ChatSession, SessionKey};
use crate::config::BridgeConfig;
use crate::connection::{Connection, ConnectionState};
use crate::error::BridgeError;
use crate::registry::{ConnectionEntry, SessionRegistry};
use crate::transport::{ConnectionId, Connector, TransportEvent, TransportEventKind};

/// Result of an `up` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpOutcome {
    /// A new connection is being established.
    Connecting,
    /// The channel was already connected; replies now go to the new session.
    Rebound,
    /// A `down` is still in flight for this channel. Nothing was connected.
    StillClosing,
}

impl fmt::Display for UpOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "Connecting to the VTuber backend..."),
            Self::Rebound => write!(f, "Already connected to the VTuber backend."),
            Self::StillClosing => write!(
                f,
                "Still disconnecting from the VTuber backend, try again shortly."
            ),
        }
    }
}

/// Result of a `down` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownOutcome {
    Closing,
    NotConnected,
}

impl fmt::Display for DownOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closing => write!(f, "Disconnecting from the VTuber backend..."),
            Self::NotConnected => write!(f, "Not connected to the VTuber backend."),
        }
    }
}

pub struct Bridge<C: Connector> {
    config: BridgeConfig,
    connector: C,
    registry: SessionRegistry,
    /// Live connection ids. Events for ids not listed here are stale.
    routes: HashMap<ConnectionId, SessionKey>,
    next_id: ConnectionId,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
}

impl<C: Connector> Bridge<C> {
    /// Create a bridge and the receiver its connections report events on.
    pub fn new(
        config: BridgeConfig,
        connector: C,
    ) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let bridge = Self {
            config,
            connector,
            registry: SessionRegistry::new(),
            routes: HashMap::new(),
            next_id: 1,
            events_tx,
        };
        (bridge, events_rx)
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Connect the session's channel, or rebind it if already connected.
    pub fn up(&mut self, session: Arc<dyn ChatSession>, history_uid: Option<String>) -> UpOutcome {
        let key = SessionKey::from_session(session.as_ref());

        if let Some(entry) = self.registry.get_mut(&key) {
            entry.rebind(session);
            if entry.connection.is_closing() {
                debug!(key = %key, "up while closing, waiting for close event");
                return UpOutcome::StillClosing;
            }
            debug!(key = %key, "already connected, rebinding session");
            return UpOutcome::Rebound;
        }

        let id = self.next_id;
        self.next_id += 1;

        info!(key = %key, conn = id, endpoint = %self.config.endpoint, "connecting");
        let handle = self
            .connector
            .connect(id, &self.config.endpoint, self.events_tx.clone());
        let connection = Connection::new(handle, self.config.pipeline);

        self.routes.insert(id, key.clone());
        self.registry
            .put(key, ConnectionEntry::new(session, connection, history_uid));
        UpOutcome::Connecting
    }

    /// Close the session's channel connection. Removal happens when the close
    /// event arrives.
    pub fn down(&mut self, session: &dyn ChatSession) -> DownOutcome {
        let key = SessionKey::from_session(session);
        match self.registry.get_mut(&key) {
            Some(entry) => {
                info!(key = %key, conn = entry.connection.id(), "disconnecting");
                entry.connection.close();
                DownOutcome::Closing
            }
            None => DownOutcome::NotConnected,
        }
    }

    /// Forward a user's chat message. Returns true if it was handed to an open
    /// connection.
    pub fn on_chat_message(
        &mut self,
        session: Arc<dyn ChatSession>,
        text: &str,
        images: Vec<ImageRef>,
    ) -> bool {
        let key = SessionKey::from_session(session.as_ref());
        let Some(entry) = self.registry.get_mut(&key) else {
            return false;
        };
        entry.rebind(session);
        entry.connection.send_user_text(text, images)
    }

    pub fn status(&self, key: &SessionKey) -> Option<ConnectionState> {
        self.registry.get(key).map(|e| e.connection.state())
    }

    /// Route one transport event to its connection.
    pub fn handle_event(&mut self, event: TransportEvent) {
        let Some(key) = self.routes.get(&event.id).cloned() else {
            debug!(conn = event.id, kind = ?event.kind, "event for unknown connection");
            return;
        };
        let Some(entry) = self.registry.get_mut(&key) else {
            warn!(conn = event.id, key = %key, "route without registry entry");
            self.routes.remove(&event.id);
            return;
        };

        let state = entry.connection.on_event(
            event.kind,
            entry.session.as_ref(),
            entry.history_uid.as_deref(),
        );

        if state == ConnectionState::Closed {
            self.routes.remove(&event.id);
            self.registry.remove(&key);
            debug!(key = %key, conn = event.id, "connection removed");
        }
    }

    /// Ask every live connection to close.
    pub fn shutdown(&mut self) {
        info!(connections = self.registry.len(), "shutting down bridge");
        for (_, entry) in self.registry.iter_mut() {
            entry.connection.close();
        }
    }

    /// Run the event loop until a shutdown command arrives or every handle is
    /// dropped.
    pub async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<TransportEvent>,
        mut commands: mpsc::Receiver<BridgeCommand>,
    ) {
        loop {
            tokio::select! {
                Some(event) = events.recv() => self.handle_event(event),
                cmd = commands.recv() => {
                    let respond_to = match cmd {
                        Some(cmd) => match self.handle_command(cmd) {
                            ControlFlow::Continue(()) => continue,
                            ControlFlow::Break(respond_to) => Some(respond_to),
                        },
                        None => None,
                    };
                    self.teardown(&mut events).await;
                    if let Some(respond_to) = respond_to {
                        let _ = respond_to.send(());
                    }
                    return;
                }
            }
        }
    }

    /// Apply one command. Breaks with the responder when the command asks the
    /// bridge to stop.
    fn handle_command(&mut self, cmd: BridgeCommand) -> ControlFlow<oneshot::Sender<()>> {
        match cmd {
            BridgeCommand::Up {
                session,
                history_uid,
                respond_to,
            } => {
                let _ = respond_to.send(self.up(session, history_uid));
            }
            BridgeCommand::Down {
                session,
                respond_to,
            } => {
                let _ = respond_to.send(self.down(session.as_ref()));
            }
            BridgeCommand::Message {
                session,
                text,
                images,
            } => {
                self.on_chat_message(session, &text, images);
            }
            BridgeCommand::Status { key, respond_to } => {
                let _ = respond_to.send(self.status(&key));
            }
            BridgeCommand::Shutdown { respond_to } => return ControlFlow::Break(respond_to),
        }
        ControlFlow::Continue(())
    }

    /// Close everything and process close events until the registry is empty.
    async fn teardown(&mut self, events: &mut mpsc::UnboundedReceiver<TransportEvent>) {
        self.shutdown();
        while !self.registry.is_empty() {
            // The bridge holds a sender, so this only yields None if the
            // runtime is going away.
            match events.recv().await {
                Some(event) => {
                    if event.kind == TransportEventKind::Opened {
                        debug!(conn = event.id, "connection opened during teardown");
                    }
                    self.handle_event(event);
                }
                None => break,
            }
        }
        self.registry.clear();
        self.routes.clear();
        info!("bridge stopped");
    }
}

/// Commands accepted by a running bridge.
pub enum BridgeCommand {
    Up {
        session: Arc<dyn ChatSession>,
        history_uid: Option<String>,
        respond_to: oneshot::Sender<UpOutcome>,
    },
    Down {
        session: Arc<dyn ChatSession>,
        respond_to: oneshot::Sender<DownOutcome>,
    },
    Message {
        session: Arc<dyn ChatSession>,
        text: String,
        images: Vec<ImageRef>,
    },
    Status {
        key: SessionKey,
        respond_to: oneshot::Sender<Option<ConnectionState>>,
    },
    Shutdown {
        respond_to: oneshot::Sender<()>,
    },
}

/// Handle to a running bridge.
#[derive(Clone)]
pub struct BridgeHandle {
    sender: mpsc::Sender<BridgeCommand>,
}

impl BridgeHandle {
    pub async fn up(
        &self,
        session: Arc<dyn ChatSession>,
        history_uid: Option<String>,
    ) -> Result<UpOutcome, BridgeError> {
        let (tx, rx) = oneshot::channel();
        self.send(BridgeCommand::Up {
            session,
            history_uid,
            respond_to: tx,
        })
        .await?;
        rx.await.map_err(|_| BridgeError::Gone)
    }

    pub async fn down(&self, session: Arc<dyn ChatSession>) -> Result<DownOutcome, BridgeError> {
        let (tx, rx) = oneshot::channel();
        self.send(BridgeCommand::Down {
            session,
            respond_to: tx,
        })
        .await?;
        rx.await.map_err(|_| BridgeError::Gone)
    }

    pub async fn message(
        &self,
        session: Arc<dyn ChatSession>,
        text: String,
        images: Vec<ImageRef>,
    ) -> Result<(), BridgeError> {
        self.send(BridgeCommand::Message {
            session,
            text,
            images,
        })
        .await
    }

    pub async fn status(&self, key: SessionKey) -> Result<Option<ConnectionState>, BridgeError> {
        let (tx, rx) = oneshot::channel();
        self.send(BridgeCommand::Status {
            key,
            respond_to: tx,
        })
        .await?;
        rx.await.map_err(|_| BridgeError::Gone)
    }

    /// Close every connection and stop the bridge. Resolves once all close
    /// events have been processed.
    pub async fn shutdown(&self) -> Result<(), BridgeError> {
        let (tx, rx) = oneshot::channel();
        self.send(BridgeCommand::Shutdown { respond_to: tx }).await?;
        rx.await.map_err(|_| BridgeError::Gone)
    }

    async fn send(&self, cmd: BridgeCommand) -> Result<(), BridgeError> {
        self.sender.send(cmd).await.map_err(|_| BridgeError::Gone)
    }
}

/// Spawn a bridge event loop on the current runtime.
pub fn spawn_bridge<C>(config: BridgeConfig, connector: C) -> (BridgeHandle, JoinHandle<()>)
where
    C: Connector + 'static,
{
    let (bridge, events) = Bridge::new(config, connector);
    let (sender, commands) = mpsc::channel(64);
    let task = tokio::spawn(bridge.run(events, commands));
    (BridgeHandle { sender }, task)
}
