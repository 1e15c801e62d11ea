use std::collections::HashSet;

use chrono::NaiveTime;

use crate::{domain::ChatId, errors::Error, messaging::types::InboundMessage, Result};

// ============== Channel Policy ==============

/// How a configured channel is printed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelKind {
    /// Printed during the active window only.
    Normal,
    /// Printed at any time, with inverted styling.
    Inverted,
}

/// Static channel membership: two disjoint sets of chat ids.
#[derive(Clone, Debug, Default)]
pub struct ChannelPolicy {
    normal: HashSet<ChatId>,
    inverted: HashSet<ChatId>,
}

impl ChannelPolicy {
    pub fn new(normal: &[i64], inverted: &[i64]) -> Result<Self> {
        let normal: HashSet<ChatId> = normal.iter().copied().map(ChatId).collect();
        let inverted: HashSet<ChatId> = inverted.iter().copied().map(ChatId).collect();

        if let Some(dup) = normal.intersection(&inverted).next() {
            return Err(Error::Config(format!(
                "channel {} is listed as both normal and inverted",
                dup.0
            )));
        }

        Ok(Self { normal, inverted })
    }

    pub fn kind(&self, chat_id: ChatId) -> Option<ChannelKind> {
        if self.inverted.contains(&chat_id) {
            Some(ChannelKind::Inverted)
        } else if self.normal.contains(&chat_id) {
            Some(ChannelKind::Normal)
        } else {
            None
        }
    }

    pub fn is_inverted(&self, chat_id: ChatId) -> bool {
        self.kind(chat_id) == Some(ChannelKind::Inverted)
    }

    pub fn normal_len(&self) -> usize {
        self.normal.len()
    }

    pub fn inverted_len(&self) -> usize {
        self.inverted.len()
    }
}

// ============== Active Window ==============

/// Daily time-of-day span `[start, end)` during which normal channels print.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActiveWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl ActiveWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self> {
        if start >= end {
            return Err(Error::Config(format!(
                "active window start ({start}) must be before end ({end})"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    pub fn contains(&self, t: NaiveTime) -> bool {
        self.start <= t && t < self.end
    }
}

// ============== Eligibility Gate ==============

/// Decide whether `msg` is a print candidate at time-of-day `now`.
///
/// Inverted channels skip the time-of-day check; every channel requires text or
/// at least one attachment. Unknown channels are never eligible.
pub fn is_eligible(
    msg: &InboundMessage,
    policy: &ChannelPolicy,
    window: &ActiveWindow,
    now: NaiveTime,
) -> bool {
    match policy.kind(msg.chat_id()) {
        Some(ChannelKind::Inverted) => msg.has_content(),
        Some(ChannelKind::Normal) => msg.has_content() && window.contains(now),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MessageId, MessageRef, UserId};
    use crate::messaging::types::Attachment;

    const NORMAL: i64 = 100;
    const INVERTED: i64 = 200;

    fn policy() -> ChannelPolicy {
        ChannelPolicy::new(&[NORMAL], &[INVERTED]).unwrap()
    }

    fn window() -> ActiveWindow {
        ActiveWindow::new(hm(9, 0), hm(17, 0)).unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn msg(chat: i64, text: &str, attachments: usize) -> InboundMessage {
        InboundMessage {
            message: MessageRef {
                chat_id: ChatId(chat),
                message_id: MessageId(1),
            },
            author_id: UserId(1),
            author: "bob".to_string(),
            text: text.to_string(),
            attachments: (0..attachments)
                .map(|_| Attachment {
                    content_type: "image/jpeg".to_string(),
                    size: 1,
                    source: "https://example.invalid/a.jpg".to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn inverted_channel_ignores_time_of_day() {
        let (p, w) = (policy(), window());
        for h in 0..24 {
            assert!(is_eligible(&msg(INVERTED, "hello", 0), &p, &w, hm(h, 30)));
        }
    }

    #[test]
    fn inverted_channel_still_needs_content() {
        assert!(!is_eligible(
            &msg(INVERTED, "", 0),
            &policy(),
            &window(),
            hm(12, 0)
        ));
        assert!(is_eligible(
            &msg(INVERTED, "", 1),
            &policy(),
            &window(),
            hm(3, 0)
        ));
    }

    #[test]
    fn normal_channel_outside_window_is_rejected() {
        let (p, w) = (policy(), window());
        for t in [hm(0, 0), hm(8, 59), hm(17, 0), hm(23, 59)] {
            assert!(!is_eligible(&msg(NORMAL, "hello", 1), &p, &w, t), "{t}");
        }
    }

    #[test]
    fn normal_channel_window_is_half_open() {
        let (p, w) = (policy(), window());
        assert!(is_eligible(&msg(NORMAL, "hello", 0), &p, &w, hm(9, 0)));
        assert!(is_eligible(&msg(NORMAL, "hello", 0), &p, &w, hm(16, 59)));
        assert!(!is_eligible(&msg(NORMAL, "hello", 0), &p, &w, hm(17, 0)));
    }

    #[test]
    fn empty_message_in_normal_channel_is_rejected_during_window() {
        assert!(!is_eligible(
            &msg(NORMAL, "", 0),
            &policy(),
            &window(),
            hm(12, 0)
        ));
    }

    #[test]
    fn unknown_channel_is_never_eligible() {
        assert!(!is_eligible(
            &msg(999, "hello", 2),
            &policy(),
            &window(),
            hm(12, 0)
        ));
    }

    #[test]
    fn overlapping_channel_sets_are_rejected() {
        assert!(matches!(
            ChannelPolicy::new(&[1, 2], &[2]),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn window_requires_start_before_end() {
        assert!(ActiveWindow::new(hm(17, 0), hm(9, 0)).is_err());
        assert!(ActiveWindow::new(hm(9, 0), hm(9, 0)).is_err());
    }
}
