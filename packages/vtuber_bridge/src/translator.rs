//! Protocol translator: turns inbound backend frames into chat replies and
//! outbound frames, and owns the text accumulated over one backend turn.

use tracing::{debug, warn};
use vtuber_protocol::text::{self, PipelineOptions, TurnReply};
use vtuber_protocol::{ControlSignal, ImageRef, ProtocolError, VtuberMessage};

/// Something the connection must do after a frame was translated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Fire-and-forget chat reply.
    Reply(String),
    /// Chat reply that must keep its order relative to other queued replies.
    ReplyQueued(String),
    /// Frame to send back to the backend.
    Send(VtuberMessage),
}

impl From<TurnReply> for Action {
    fn from(reply: TurnReply) -> Self {
        match reply {
            TurnReply::Single(text) => Action::Reply(text),
            TurnReply::Queued(text) => Action::ReplyQueued(text),
        }
    }
}

pub struct ProtocolTranslator {
    buffer: String,
    options: PipelineOptions,
}

impl ProtocolTranslator {
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            buffer: String::new(),
            options,
        }
    }

    /// Text accumulated since the last chain start.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Decode one raw frame and dispatch it. Malformed frames are logged and
    /// produce no actions.
    pub fn handle_frame(&mut self, raw: &str) -> Vec<Action> {
        match VtuberMessage::decode(raw) {
            Ok(msg) => self.handle_message(msg),
            Err(e) => {
                warn!(error = %e, raw = %raw, "dropping malformed frame");
                Vec::new()
            }
        }
    }

    pub fn handle_message(&mut self, msg: VtuberMessage) -> Vec<Action> {
        match msg {
            VtuberMessage::FullText { text } => vec![Action::Reply(text)],
            VtuberMessage::Audio { display_text } => {
                self.buffer.push_str(&display_text.text);
                vec![Action::Send(VtuberMessage::AudioPlayStart {
                    display_text,
                    forwarded: true,
                })]
            }
            VtuberMessage::Control { text } => match ControlSignal::parse(&text) {
                Some(ControlSignal::ChainStart) => {
                    self.buffer.clear();
                    Vec::new()
                }
                Some(ControlSignal::ChainEnd) => {
                    let turn = std::mem::take(&mut self.buffer);
                    text::finish_turn(&turn, self.options)
                        .into_iter()
                        .map(Action::from)
                        .collect()
                }
                None => {
                    debug!(control = %text, "ignoring control signal");
                    Vec::new()
                }
            },
            VtuberMessage::BackendSynthComplete => {
                if self.buffer.is_empty() {
                    Vec::new()
                } else {
                    vec![Action::Send(VtuberMessage::FrontendPlaybackComplete)]
                }
            }
            VtuberMessage::NewHistoryCreated { history_uid } => {
                vec![Action::Reply(format!("New history created: {history_uid}"))]
            }
            other => {
                debug!(kind = other.kind(), "ignoring frame");
                Vec::new()
            }
        }
    }
}

/// Encode user text as a `text-input` frame.
pub fn encode_text_input(text: &str, images: Vec<ImageRef>) -> Result<String, ProtocolError> {
    VtuberMessage::TextInput {
        text: text.to_string(),
        images,
    }
    .encode()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vtuber_protocol::DisplayText;

    fn translator() -> ProtocolTranslator {
        ProtocolTranslator::new(PipelineOptions::default())
    }

    fn audio(text: &str) -> String {
        serde_json::json!({
            "type": "audio",
            "audio": "",
            "display_text": {"text": text, "name": "Mao", "avatar": "mao.png"},
        })
        .to_string()
    }

    const CHAIN_START: &str = r#"{"type":"control","text":"conversation-chain-start"}"#;
    const CHAIN_END: &str = r#"{"type":"control","text":"conversation-chain-end"}"#;
    const SYNTH_COMPLETE: &str = r#"{"type":"backend-synth-complete"}"#;

    #[test]
    fn full_text_is_forwarded() {
        let mut t = translator();
        let actions = t.handle_frame(r#"{"type":"full-text","text":"Thinking..."}"#);
        assert_eq!(actions, vec![Action::Reply("Thinking...".into())]);
        assert!(t.buffer().is_empty());
    }

    #[test]
    fn audio_is_acknowledged_and_buffered() {
        let mut t = translator();
        let actions = t.handle_frame(&audio("Hello"));
        assert_eq!(t.buffer(), "Hello");
        assert_eq!(
            actions,
            vec![Action::Send(VtuberMessage::AudioPlayStart {
                display_text: DisplayText {
                    text: "Hello".into(),
                    name: Some("Mao".into()),
                    avatar: Some("mao.png".into()),
                },
                forwarded: true,
            })]
        );
    }

    #[test]
    fn chain_start_resets_buffer() {
        let mut t = translator();
        t.handle_frame(&audio("stale"));
        assert!(t.handle_frame(CHAIN_START).is_empty());
        assert_eq!(t.buffer(), "");
    }

    #[test]
    fn chain_end_emits_turn_and_resets() {
        let mut t = translator();
        t.handle_frame(CHAIN_START);
        t.handle_frame(&audio("Hello, "));
        t.handle_frame(&audio("world"));
        let actions = t.handle_frame(CHAIN_END);
        assert_eq!(actions, vec![Action::Reply("Hello, world".into())]);
        assert_eq!(t.buffer(), "");
    }

    #[test]
    fn chain_end_with_reasoning() {
        let mut t = ProtocolTranslator::new(PipelineOptions {
            reasoning: true,
            display_reasoning: true,
            strip_emoji: true,
        });
        t.handle_frame(CHAIN_START);
        t.handle_frame(&audio("(let me see)"));
        t.handle_frame(&audio("Sure [joy]"));
        let actions = t.handle_frame(CHAIN_END);
        assert_eq!(
            actions,
            vec![
                Action::ReplyQueued("(let me see)".into()),
                Action::ReplyQueued("Sure ".into()),
            ]
        );
    }

    #[test]
    fn chain_end_on_empty_buffer_is_silent() {
        let mut t = translator();
        assert!(t.handle_frame(CHAIN_END).is_empty());
    }

    #[test]
    fn synth_complete_with_pending_text() {
        let mut t = translator();
        t.handle_frame(&audio("Hi"));
        assert_eq!(
            t.handle_frame(SYNTH_COMPLETE),
            vec![Action::Send(VtuberMessage::FrontendPlaybackComplete)]
        );
        // does not consume the buffer
        assert_eq!(t.buffer(), "Hi");
    }

    #[test]
    fn synth_complete_with_empty_buffer() {
        let mut t = translator();
        assert!(t.handle_frame(SYNTH_COMPLETE).is_empty());
    }

    #[test]
    fn control_does_not_fall_through_to_synth_complete() {
        let mut t = translator();
        t.handle_frame(&audio("Hi"));
        let actions = t.handle_frame(r#"{"type":"control","text":"start-mic"}"#);
        assert!(actions.is_empty());
        assert_eq!(t.buffer(), "Hi");
    }

    #[test]
    fn new_history_is_reported() {
        let mut t = translator();
        let actions = t.handle_frame(r#"{"type":"new-history-created","history_uid":"h-42"}"#);
        assert_eq!(actions, vec![Action::Reply("New history created: h-42".into())]);
    }

    #[test]
    fn unknown_frames_are_ignored() {
        let mut t = translator();
        t.handle_frame(&audio("kept"));
        assert!(
            t.handle_frame(r#"{"type":"set-model-and-conf","model_info":{}}"#)
                .is_empty()
        );
        assert_eq!(t.buffer(), "kept");
    }

    #[test]
    fn malformed_frames_leave_buffer_untouched() {
        let mut t = translator();
        t.handle_frame(&audio("kept"));
        for raw in [
            "not json",
            "",
            r#"{"text":"no type"}"#,
            r#"{"type":"audio"}"#,
            r#"{"type":42}"#,
        ] {
            assert!(t.handle_frame(raw).is_empty(), "frame {raw:?}");
            assert_eq!(t.buffer(), "kept");
        }
    }

    #[test]
    fn outbound_frames_from_translator_are_not_dispatched() {
        let mut t = translator();
        assert!(
            t.handle_frame(r#"{"type":"create-new-history"}"#)
                .is_empty()
        );
    }

    #[test]
    fn text_input_encoding() {
        let frame = encode_text_input("hello", Vec::new()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(json["type"], "text-input");
        assert_eq!(json["text"], "hello");
        assert_eq!(json["images"], serde_json::json!([]));
    }
}
