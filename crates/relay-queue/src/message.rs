/// Opaque sender identifier assigned by the remote messaging platform.
///
/// Zero is reserved ("unset") — see spec §3.
pub type SenderId = i64;

/// Opaque chat identifier assigned by the remote messaging platform.
pub type ChatId = i64;

/// Maximum payload length of a queued message, in bytes (spec §3).
pub const MAX_TEXT_BYTES: usize = 1023;

/// A single message absorbed by the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    pub sender_id: SenderId,
    pub chat_id: ChatId,
    pub text: String,
    /// Seconds since the queue's monotonic epoch at the moment of `push`.
    pub ingress_monotonic_seconds: f64,
}

impl QueuedMessage {
    /// Builds a message, truncating `text` to [`MAX_TEXT_BYTES`] bytes on a
    /// UTF-8 boundary (spec §3: "text (≤1023 bytes, truncated on push)").
    pub(crate) fn new(
        sender_id: SenderId,
        chat_id: ChatId,
        text: &str,
        ingress_monotonic_seconds: f64,
    ) -> Self {
        Self {
            sender_id,
            chat_id,
            text: truncate_utf8(text, MAX_TEXT_BYTES),
            ingress_monotonic_seconds,
        }
    }
}

/// Truncates `s` to at most `max_bytes` bytes, backing off to the nearest
/// preceding UTF-8 character boundary so the result is always valid UTF-8.
fn truncate_utf8(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_owned();
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_long_text_to_1023_bytes() {
        let long = "x".repeat(2000);
        let msg = QueuedMessage::new(42, 1, &long, 0.0);
        assert_eq!(msg.text.len(), MAX_TEXT_BYTES);
    }

    #[test]
    fn leaves_short_text_untouched() {
        let msg = QueuedMessage::new(42, 1, "hi", 0.0);
        assert_eq!(msg.text, "hi");
    }

    #[test]
    fn truncation_respects_utf8_boundaries() {
        // Each 'é' is 2 bytes; 1023 is odd, so a naive byte-slice would split one.
        let s: String = std::iter::repeat('é').take(600).collect();
        let msg = QueuedMessage::new(1, 1, &s, 0.0);
        assert!(msg.text.len() <= MAX_TEXT_BYTES);
        assert!(s.is_char_boundary(msg.text.len()) || msg.text.len() == s.len());
    }
}
