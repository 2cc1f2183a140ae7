//! # VTuber protocol
//!
//! Wire types and text post-processing for talking to a stateful VTuber
//! backend over a message-oriented connection.
//!
//! This crate has no async runtime and performs no I/O. It provides:
//! - [`VtuberMessage`], the tagged JSON union exchanged with the backend
//! - [`text`], pure helpers for splitting a model's reasoning from its answer,
//!   stripping inline emoji tokens and assembling end-of-turn replies
//!
//! ## Quick Start
//!
//! ```rust
//! use vtuber_protocol::VtuberMessage;
//! use vtuber_protocol::text::split_reasoning_text;
//!
//! let msg = VtuberMessage::decode(r#"{"type":"full-text","text":"hi"}"#).unwrap();
//! assert_eq!(msg, VtuberMessage::FullText { text: "hi".into() });
//!
//! let (reasoning, answer) = split_reasoning_text("(I think so)Hello");
//! assert_eq!(reasoning, "(I think so)");
//! assert_eq!(answer, "Hello");
//! ```

mod error;
pub mod message;
pub mod text;

pub use error::ProtocolError;
pub use message::{ControlSignal, DisplayText, ImageRef, VtuberMessage};
pub use text::{PipelineOptions, TurnReply};
