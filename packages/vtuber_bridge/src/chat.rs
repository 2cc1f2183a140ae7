//! The chat framework seam: where replies go and how channels are keyed.

use std::fmt;

/// One conversation context supplied by the chat framework.
///
/// Replies are fire-and-forget: implementations deliver them however the
/// framework does and never report failure back to the bridge.
pub trait ChatSession: Send + Sync {
    fn platform(&self) -> &str;
    fn channel_id(&self) -> &str;
    fn channel_type(&self) -> &str;

    /// Send a single reply.
    fn send(&self, text: &str);

    /// Send a reply that must appear after any previously queued reply.
    fn send_queued(&self, text: &str);
}

/// Identifies one logical chat channel: `(platform, channel_id, channel_type)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionKey {
    pub platform: String,
    pub channel_id: String,
    pub channel_type: String,
}

impl SessionKey {
    pub fn new(
        platform: impl Into<String>,
        channel_id: impl Into<String>,
        channel_type: impl Into<String>,
    ) -> Self {
        Self {
            platform: platform.into(),
            channel_id: channel_id.into(),
            channel_type: channel_type.into(),
        }
    }

    pub fn from_session(session: &dyn ChatSession) -> Self {
        Self::new(
            session.platform(),
            session.channel_id(),
            session.channel_type(),
        )
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.platform, self.channel_type, self.channel_id
        )
    }
}
