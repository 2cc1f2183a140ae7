//! VTuber wire messages
//!
//! Every frame is a JSON object whose `type` field selects the variant. Field
//! names are snake_case, tag values are kebab-case. Frames with a well-formed
//! but unrecognized `type` decode to [`VtuberMessage::Unknown`].

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Control text marking the start of one backend conversational turn.
pub const CHAIN_START: &str = "conversation-chain-start";
/// Control text marking the end of one backend conversational turn.
pub const CHAIN_END: &str = "conversation-chain-end";

/// Text shown alongside a synthesized audio segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayText {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl DisplayText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            name: None,
            avatar: None,
        }
    }
}

/// An image attached to a user message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Where the image came from (e.g. "url", "upload").
    pub source: String,
    /// URL or base64 data URI.
    pub data: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum VtuberMessage {
    // === Outbound ===
    /// User text, plus any attached images.
    TextInput {
        text: String,
        #[serde(default)]
        images: Vec<ImageRef>,
    },
    /// Acknowledges an `audio` segment back to the backend.
    AudioPlayStart {
        display_text: DisplayText,
        forwarded: bool,
    },
    FrontendPlaybackComplete,
    /// Resume an existing backend history. Sent once, on open.
    FetchAndSetHistory { history_uid: String },
    /// Start a fresh backend history. Sent once, on open.
    CreateNewHistory,

    // === Inbound ===
    /// A synthesized audio segment. Only the display text matters here; the
    /// audio payload, volumes and actions are ignored.
    Audio { display_text: DisplayText },
    Control { text: String },
    BackendSynthComplete,
    NewHistoryCreated { history_uid: String },
    /// A complete reply, forwarded as-is.
    FullText { text: String },

    /// Any other well-formed `type`.
    #[serde(other)]
    Unknown,
}

impl VtuberMessage {
    /// Decode one text frame.
    pub fn decode(raw: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(raw).map_err(ProtocolError::Decode)
    }

    /// Encode to a single-line JSON text frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|source| ProtocolError::Encode {
            kind: self.kind(),
            source,
        })
    }

    /// The wire tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TextInput { .. } => "text-input",
            Self::AudioPlayStart { .. } => "audio-play-start",
            Self::FrontendPlaybackComplete => "frontend-playback-complete",
            Self::FetchAndSetHistory { .. } => "fetch-and-set-history",
            Self::CreateNewHistory => "create-new-history",
            Self::Audio { .. } => "audio",
            Self::Control { .. } => "control",
            Self::BackendSynthComplete => "backend-synth-complete",
            Self::NewHistoryCreated { .. } => "new-history-created",
            Self::FullText { .. } => "full-text",
            Self::Unknown => "unknown",
        }
    }

    /// The history selection sent when a connection opens.
    pub fn history_selection(history_uid: Option<&str>) -> Self {
        match history_uid {
            Some(uid) => Self::FetchAndSetHistory {
                history_uid: uid.to_string(),
            },
            None => Self::CreateNewHistory,
        }
    }
}

/// Recognized values of a `control` frame's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    ChainStart,
    ChainEnd,
}

impl ControlSignal {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            CHAIN_START => Some(Self::ChainStart),
            CHAIN_END => Some(Self::ChainEnd),
            _ => None,
        }
    }
}
