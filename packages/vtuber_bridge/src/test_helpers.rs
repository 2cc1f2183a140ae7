use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::chat::ChatSession;
use crate::transport::{ConnectionHandle, ConnectionId, Connector, Outbound, TransportEvent};

/// A reply captured by [`RecordingSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Single(String),
    Queued(String),
}

/// Chat session that records every reply.
pub struct RecordingSession {
    platform: String,
    channel_id: String,
    channel_type: String,
    sent: Mutex<Vec<Sent>>,
}

impl RecordingSession {
    pub fn new(platform: &str, channel_id: &str, channel_type: &str) -> Self {
        Self {
            platform: platform.into(),
            channel_id: channel_id.into(),
            channel_type: channel_type.into(),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn shared(platform: &str, channel_id: &str, channel_type: &str) -> Arc<Self> {
        Arc::new(Self::new(platform, channel_id, channel_type))
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .map(|s| match s {
                Sent::Single(t) | Sent::Queued(t) => t,
            })
            .collect()
    }
}

impl ChatSession for RecordingSession {
    fn platform(&self) -> &str {
        &self.platform
    }

    fn channel_id(&self) -> &str {
        &self.channel_id
    }

    fn channel_type(&self) -> &str {
        &self.channel_type
    }

    fn send(&self, text: &str) {
        self.sent.lock().unwrap().push(Sent::Single(text.to_string()));
    }

    fn send_queued(&self, text: &str) {
        self.sent.lock().unwrap().push(Sent::Queued(text.to_string()));
    }
}

/// Connector that hands out in-memory handles and keeps their outbound receivers.
#[derive(Clone, Default)]
pub struct FakeConnector {
    connections: Arc<Mutex<Vec<FakeConnection>>>,
}

pub struct FakeConnection {
    pub id: ConnectionId,
    pub endpoint: String,
    pub outbound: mpsc::UnboundedReceiver<Outbound>,
}

impl FakeConnector {
    pub fn count(&self) -> usize {
        self.connections.lock().unwrap().len()
    }

    /// Take the most recent connection.
    pub fn take_last(&self) -> FakeConnection {
        self.connections
            .lock()
            .unwrap()
            .pop()
            .expect("no connection was made")
    }
}

impl Connector for FakeConnector {
    fn connect(
        &self,
        id: ConnectionId,
        endpoint: &str,
        _events: mpsc::UnboundedSender<TransportEvent>,
    ) -> ConnectionHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.lock().unwrap().push(FakeConnection {
            id,
            endpoint: endpoint.to_string(),
            outbound: rx,
        });
        ConnectionHandle::new(id, tx)
    }
}

/// Drain every frame queued on a fake connection.
pub fn drain_frames(outbound: &mut mpsc::UnboundedReceiver<Outbound>) -> Vec<Outbound> {
    let mut frames = Vec::new();
    while let Ok(frame) = outbound.try_recv() {
        frames.push(frame);
    }
    frames
}
