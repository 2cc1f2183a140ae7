//! Per-connection lifecycle state machine.
//!
//! ```text
//! Connecting ──opened──▶ Open ──closed──▶ Closed
//!      │                                    ▲
//!      └───────────────closed───────────────┘
//! ```
//!
//! Errors are reported to the chat session but never change state on their
//! own; the transport's close event does that.

use tracing::{debug, info, warn};
use vtuber_protocol::text::PipelineOptions;
use vtuber_protocol::{ImageRef, VtuberMessage};

use crate::chat::ChatSession;
use crate::error::BridgeError;
use crate::transport::{ConnectionHandle, ConnectionId, TransportEventKind};
use crate::translator::{Action, ProtocolTranslator, encode_text_input};

pub const READY_NOTICE: &str = "VTuber bridge is ready.";
pub const CLOSED_NOTICE: &str = "VTuber bridge disconnected.";
pub const FAILURE_NOTICE: &str = "VTuber bridge connection failed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

pub struct Connection {
    handle: ConnectionHandle,
    state: ConnectionState,
    /// Set once a close was requested, until the transport confirms it.
    closing: bool,
    translator: ProtocolTranslator,
}

impl Connection {
    pub fn new(handle: ConnectionHandle, options: PipelineOptions) -> Self {
        Self {
            handle,
            state: ConnectionState::Connecting,
            closing: false,
            translator: ProtocolTranslator::new(options),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.handle.id()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_closing(&self) -> bool {
        self.closing
    }

    pub fn translator(&self) -> &ProtocolTranslator {
        &self.translator
    }

    /// Apply one transport event and return the resulting state.
    pub fn on_event(
        &mut self,
        kind: TransportEventKind,
        session: &dyn ChatSession,
        history_uid: Option<&str>,
    ) -> ConnectionState {
        match kind {
            TransportEventKind::Opened => self.on_open(session, history_uid),
            TransportEventKind::Message(raw) => self.on_message(&raw, session),
            TransportEventKind::Error(error) => self.on_error(&error, session),
            TransportEventKind::Closed => self.on_close(session),
        }
        self.state
    }

    fn on_open(&mut self, session: &dyn ChatSession, history_uid: Option<&str>) {
        if self.state != ConnectionState::Connecting {
            warn!(conn = self.id(), state = %self.state, "ignoring duplicate open");
            return;
        }
        self.state = ConnectionState::Open;
        info!(conn = self.id(), history = ?history_uid, "connection open");

        // The backend must know which history to use before any user text.
        self.send(&VtuberMessage::history_selection(history_uid));
        session.send(READY_NOTICE);
    }

    fn on_message(&mut self, raw: &str, session: &dyn ChatSession) {
        if self.state != ConnectionState::Open {
            debug!(conn = self.id(), state = %self.state, raw = %raw, "frame outside open state");
            return;
        }
        for action in self.translator.handle_frame(raw) {
            match action {
                Action::Reply(text) => session.send(&text),
                Action::ReplyQueued(text) => session.send_queued(&text),
                Action::Send(msg) => self.send(&msg),
            }
        }
    }

    fn on_error(&mut self, error: &str, session: &dyn ChatSession) {
        warn!(conn = self.id(), state = %self.state, error = %error, "connection error");
        session.send(FAILURE_NOTICE);
    }

    fn on_close(&mut self, session: &dyn ChatSession) {
        if self.state == ConnectionState::Closed {
            return;
        }
        self.state = ConnectionState::Closed;
        info!(conn = self.id(), "connection closed");
        session.send(CLOSED_NOTICE);
    }

    /// Forward user text. Returns false if the connection is not open.
    pub fn send_user_text(&self, text: &str, images: Vec<ImageRef>) -> bool {
        if self.state != ConnectionState::Open {
            warn!(conn = self.id(), state = %self.state, "dropping user text, connection not open");
            return false;
        }
        match encode_text_input(text, images) {
            Ok(frame) => {
                if let Err(e) = self.handle.send_text(frame) {
                    warn!(conn = self.id(), kind = "text-input", error = %e, "send failed");
                }
                true
            }
            Err(e) => {
                warn!(conn = self.id(), error = %e, "failed to encode user text");
                false
            }
        }
    }

    /// Ask the transport to close. The close event arrives later.
    pub fn close(&mut self) {
        self.closing = true;
        if let Err(e) = self.handle.close() {
            debug!(conn = self.id(), error = %e, "close on finished transport");
        }
    }

    fn send(&self, msg: &VtuberMessage) {
        if let Err(e) = self.try_send(msg) {
            warn!(conn = self.id(), kind = msg.kind(), error = %e, "send failed");
        }
    }

    fn try_send(&self, msg: &VtuberMessage) -> Result<(), BridgeError> {
        let frame = msg.encode()?;
        self.handle.send_text(frame)?;
        Ok(())
    }
}
