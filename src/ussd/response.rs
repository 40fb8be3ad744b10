//! A single USSD screen as received from the network

use std::fmt;

/// What the network expects after a screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    /// Final screen, no reply expected
    Complete,
    /// The network is waiting for a reply
    AwaitingReply,
    /// The network ended the session
    Terminated,
}

/// Immutable text of one screen plus its continuation status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuResponse {
    text: String,
    status: SessionStatus,
}

impl MenuResponse {
    pub fn new(text: impl Into<String>, status: SessionStatus) -> Self {
        Self {
            text: text.into(),
            status,
        }
    }

    /// A screen that expects a reply
    pub fn awaiting(text: impl Into<String>) -> Self {
        Self::new(text, SessionStatus::AwaitingReply)
    }

    /// A final screen
    pub fn complete(text: impl Into<String>) -> Self {
        Self::new(text, SessionStatus::Complete)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn awaits_reply(&self) -> bool {
        self.status == SessionStatus::AwaitingReply
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.text.contains(needle)
    }

    /// Lines of the screen, split on the protocol's `\r\n` terminator
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split("\r\n")
    }
}

impl fmt::Display for MenuResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
