//! VTuber Bridge - connects chat channels to a stateful VTuber backend
//!
//! Each chat channel (identified by a [`SessionKey`]) gets at most one
//! WebSocket connection to the backend. User text goes out as `text-input`
//! frames; backend turns come back as chat replies once the backend signals
//! the end of a conversation chain.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vtuber_bridge::{BridgeConfig, ConsoleSession, FileConfig, WsConnector, spawn_bridge};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = BridgeConfig::from_file(&FileConfig::default());
//!     let (bridge, task) = spawn_bridge(config, WsConnector);
//!
//!     let session = Arc::new(ConsoleSession::new(
//!         "console".into(),
//!         "stdin".into(),
//!         "private".into(),
//!     ));
//!     bridge.up(session.clone(), None).await.unwrap();
//!     bridge.message(session, "Hello!".into(), Vec::new()).await.unwrap();
//!
//!     bridge.shutdown().await.unwrap();
//!     task.await.unwrap();
//! }
//! ```

pub mod bridge;
pub mod chat;
pub mod command;
pub mod config;
pub mod connection;
pub mod console;
mod error;
pub mod registry;
pub mod translator;
pub mod transport;

#[cfg(test)]
mod test_helpers;

pub use bridge::{Bridge, BridgeCommand, BridgeHandle, DownOutcome, UpOutcome, spawn_bridge};
pub use chat::{ChatSession, SessionKey};
pub use command::{ControlAction, parse_command};
pub use config::{BridgeConfig, BridgePaths, FileConfig};
pub use connection::{Connection, ConnectionState};
pub use console::ConsoleSession;
pub use error::{BridgeError, TransportError};
pub use registry::{ConnectionEntry, SessionRegistry};
pub use translator::{Action, ProtocolTranslator};
pub use transport::{
    ConnectionHandle, ConnectionId, Connector, Outbound, TransportEvent, TransportEventKind,
    WsConnector,
};
