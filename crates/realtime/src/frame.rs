//! Transport-level frames and inbound message reassembly.

use std::fmt;

/// A WebSocket frame as seen by the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsFrame {
    /// Text payload. `fin == false` means more fragments of the same message
    /// follow.
    Text { data: String, fin: bool },
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close(Option<CloseReason>),
}

impl WsFrame {
    /// A complete, unfragmented text message.
    pub fn text(data: impl Into<String>) -> Self {
        WsFrame::Text {
            data: data.into(),
            fin: true,
        }
    }
}

/// Close code and reason sent with a close frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    pub code: u16,
    pub reason: String,
}

impl CloseReason {
    pub const NORMAL: u16 = 1000;
    pub const GOING_AWAY: u16 = 1001;
    pub const MESSAGE_TOO_LARGE: u16 = 1009;
    /// Application code: the upgrade carried no valid credentials.
    pub const UNAUTHENTICATED: u16 = 4401;

    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    pub fn normal() -> Self {
        Self::new(Self::NORMAL, "")
    }

    pub fn going_away() -> Self {
        Self::new(Self::GOING_AWAY, "server shutting down")
    }

    pub fn too_large() -> Self {
        Self::new(Self::MESSAGE_TOO_LARGE, "message too large")
    }

    pub fn unauthenticated() -> Self {
        Self::new(Self::UNAUTHENTICATED, "unauthenticated")
    }
}

/// The inbound message exceeded the size limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageTooLarge {
    pub limit: usize,
}

impl fmt::Display for MessageTooLarge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "message exceeds {} bytes", self.limit)
    }
}

impl std::error::Error for MessageTooLarge {}

/// Joins text fragments into whole messages, enforcing a byte limit on the
/// joined message.
#[derive(Debug)]
pub struct MessageAssembler {
    limit: usize,
    buffer: String,
}

impl MessageAssembler {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            buffer: String::new(),
        }
    }

    /// Add a fragment. Returns the whole message once `fin` is seen.
    pub fn push(&mut self, fragment: &str, fin: bool) -> Result<Option<String>, MessageTooLarge> {
        if self.buffer.len() + fragment.len() > self.limit {
            self.buffer.clear();
            return Err(MessageTooLarge { limit: self.limit });
        }
        self.buffer.push_str(fragment);
        if fin {
            Ok(Some(std::mem::take(&mut self.buffer)))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_message_passes_through() {
        let mut assembler = MessageAssembler::new(16);
        assert_eq!(assembler.push("hello", true).unwrap().as_deref(), Some("hello"));
        assert_eq!(assembler.push("again", true).unwrap().as_deref(), Some("again"));
    }

    #[test]
    fn test_fragments_accumulate_until_final() {
        let mut assembler = MessageAssembler::new(16);
        assert_eq!(assembler.push("abc", false).unwrap(), None);
        assert_eq!(assembler.push("def", false).unwrap(), None);
        assert_eq!(assembler.push("g", true).unwrap().as_deref(), Some("abcdefg"));
    }

    #[test]
    fn test_limit_applies_to_the_joined_message() {
        let mut assembler = MessageAssembler::new(8);
        assert_eq!(assembler.push(&"x".repeat(8), true).unwrap().map(|m| m.len()), Some(8));

        assert!(assembler.push("12345", false).unwrap().is_none());
        assert_eq!(
            assembler.push("6789", true),
            Err(MessageTooLarge { limit: 8 })
        );
        // The rejected fragments are discarded.
        assert_eq!(assembler.push("ok", true).unwrap().as_deref(), Some("ok"));
    }
}
