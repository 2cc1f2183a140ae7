//! Text post-processing for backend replies.
//!
//! Reasoning-capable backends either wrap their chain-of-thought in a
//! parenthesized group or separate it from the final answer with a blank
//! line. Anything else is treated as unparseable.

use std::sync::LazyLock;

use regex::Regex;

static REASONING_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^()]*\)").expect("reasoning pattern is valid"));

static EMOJI_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[A-Za-z0-9]+\]").expect("emoji pattern is valid"));

/// Split `text` into `(reasoning, answer)`.
///
/// If the text contains a non-nested parenthesized group, the first such group
/// (parentheses included) is the reasoning and the answer is the text with that
/// one occurrence removed. Otherwise the text must split on `"\n\n"` into exactly
/// two segments; any other shape yields two empty strings.
pub fn split_reasoning_text(text: &str) -> (String, String) {
    if let Some(m) = REASONING_GROUP.find(text) {
        let mut answer = String::with_capacity(text.len() - m.len());
        answer.push_str(&text[..m.start()]);
        answer.push_str(&text[m.end()..]);
        return (m.as_str().to_string(), answer);
    }

    let segments: Vec<&str> = text.split("\n\n").collect();
    match segments.as_slice() {
        [reasoning, answer] => (reasoning.to_string(), answer.to_string()),
        _ => (String::new(), String::new()),
    }
}

/// Remove every bracketed alphanumeric token such as `[smile]`.
///
/// Removal repeats until no token is left, so `[a[b]c]` is fully removed.
pub fn strip_emoji_tokens(text: &str) -> String {
    let mut out = EMOJI_TOKEN.replace_all(text, "").into_owned();
    while EMOJI_TOKEN.is_match(&out) {
        out = EMOJI_TOKEN.replace_all(&out, "").into_owned();
    }
    out
}

/// End-of-turn options. `display_reasoning` and `strip_emoji` only apply when
/// `reasoning` is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    pub reasoning: bool,
    pub display_reasoning: bool,
    pub strip_emoji: bool,
}

/// A chat reply produced at the end of a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnReply {
    /// Fire-and-forget single reply.
    Single(String),
    /// One of several replies that must appear in order.
    Queued(String),
}

impl TurnReply {
    pub fn text(&self) -> &str {
        match self {
            Self::Single(t) | Self::Queued(t) => t,
        }
    }
}

/// Turn the text accumulated over one turn into chat replies.
///
/// Empty replies are never produced.
pub fn finish_turn(buffer: &str, opts: PipelineOptions) -> Vec<TurnReply> {
    if !opts.reasoning {
        if buffer.is_empty() {
            return Vec::new();
        }
        return vec![TurnReply::Single(buffer.to_string())];
    }

    let (reasoning, answer) = split_reasoning_text(buffer);
    let mut replies = Vec::with_capacity(2);

    if opts.display_reasoning && !reasoning.is_empty() {
        replies.push(TurnReply::Queued(reasoning));
    }

    let answer = if opts.strip_emoji {
        strip_emoji_tokens(&answer)
    } else {
        answer
    };
    if !answer.is_empty() {
        replies.push(TurnReply::Queued(answer));
    }

    replies
}
