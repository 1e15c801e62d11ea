use crate::domain::{ChatId, MessageRef, UserId};

/// Cross-messenger incoming message model.
///
/// Telegram-specific fields live in the Telegram adapter; by the time a message
/// reaches the pipeline it is reduced to this shape.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub message: MessageRef,
    pub author_id: UserId,
    /// Display name printed in front of the message text.
    pub author: String,
    /// Message text or media caption. Empty when absent.
    pub text: String,
    pub attachments: Vec<Attachment>,
}

impl InboundMessage {
    pub fn chat_id(&self) -> ChatId {
        self.message.chat_id
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }

    /// True when there is anything to print at all.
    pub fn has_content(&self) -> bool {
        self.has_text() || self.has_attachments()
    }
}

/// Attachment descriptor as announced by the chat platform.
///
/// `size` and `content_type` are declared by the sender and untrusted; the
/// normalizer re-validates the payload after download.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub content_type: String,
    pub size: u64,
    /// Locator understood by the configured [`AttachmentFetcher`]: a URL, or a
    /// platform file id resolved at fetch time.
    ///
    /// [`AttachmentFetcher`]: crate::ports::AttachmentFetcher
    pub source: String,
}

/// Capabilities / feature flags of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_reactions: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MessageId;

    fn msg(text: &str, attachments: usize) -> InboundMessage {
        InboundMessage {
            message: MessageRef {
                chat_id: ChatId(1),
                message_id: MessageId(1),
            },
            author_id: UserId(7),
            author: "alice".to_string(),
            text: text.to_string(),
            attachments: (0..attachments)
                .map(|i| Attachment {
                    content_type: "image/png".to_string(),
                    size: 10,
                    source: format!("https://example.invalid/{i}.png"),
                })
                .collect(),
        }
    }

    #[test]
    fn whitespace_only_text_is_not_content() {
        assert!(!msg("  \n", 0).has_content());
        assert!(msg("  \n", 1).has_content());
        assert!(msg("hi", 0).has_content());
    }
}
