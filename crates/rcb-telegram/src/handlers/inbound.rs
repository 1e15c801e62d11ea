use teloxide::{prelude::*, types::User};

use rcb_core::{
    domain::{ChatId, MessageId, MessageRef, UserId},
    messaging::types::{Attachment, InboundMessage},
};

/// Telegram always re-encodes photos as JPEG.
const PHOTO_CONTENT_TYPE: &str = "image/jpeg";

/// Display name printed for `user`.
pub fn author_name(user: &User) -> String {
    match &user.username {
        Some(name) if !name.is_empty() => format!("@{name}"),
        _ => user.full_name(),
    }
}

/// Photo (largest size) and/or document attached to `msg`, in that order.
///
/// The source is the Telegram `file_id`; the download link is only looked up
/// if the attachment gets past the pipeline's checks.
pub fn attachments(msg: &Message) -> Vec<Attachment> {
    let mut out = Vec::new();

    if let Some(best) = msg.photo().and_then(|sizes| sizes.last()) {
        out.push(Attachment {
            content_type: PHOTO_CONTENT_TYPE.to_string(),
            size: u64::from(best.file.size),
            source: best.file.id.clone(),
        });
    }

    if let Some(doc) = msg.document() {
        out.push(Attachment {
            content_type: doc
                .mime_type
                .as_ref()
                .map(|m| m.essence_str().to_string())
                .unwrap_or_default(),
            size: u64::from(doc.file.size),
            source: doc.file.id.clone(),
        });
    }

    out
}

/// Build the pipeline message for `msg`, or `None` if it has no author.
pub fn to_inbound(msg: &Message) -> Option<InboundMessage> {
    let user = msg.from()?;
    let text = msg
        .text()
        .or_else(|| msg.caption())
        .unwrap_or_default()
        .to_string();

    Some(InboundMessage {
        message: MessageRef {
            chat_id: ChatId(msg.chat.id.0),
            message_id: MessageId(msg.id.0),
        },
        author_id: UserId(user.id.0 as i64),
        author: author_name(user),
        text,
        attachments: attachments(msg),
    })
}
