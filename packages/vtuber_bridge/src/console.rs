//! A chat channel on the terminal: stdin lines in, stdout replies out.

use std::io::Write;

use crate::chat::ChatSession;

pub struct ConsoleSession {
    platform: String,
    channel_id: String,
    channel_type: String,
}

impl ConsoleSession {
    pub fn new(platform: String, channel_id: String, channel_type: String) -> Self {
        Self {
            platform,
            channel_id,
            channel_type,
        }
    }

    fn print(&self, text: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "[vtuber] {}", text);
        let _ = stdout.flush();
    }
}

impl ChatSession for ConsoleSession {
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
        self.print(text);
    }

    // stdout is already ordered
    fn send_queued(&self, text: &str) {
        self.print(text);
    }
}
