//! Telegram adapter (teloxide).
//!
//! This crate feeds Telegram messages into the `rcb-core` dispatcher and
//! implements its MessagingPort over the Telegram Bot API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use teloxide::prelude::*;

pub mod fetch;
pub mod handlers;
pub mod router;

use rcb_core::{
    domain::MessageRef,
    errors::Error,
    messaging::{port::MessagingPort, types::MessagingCapabilities},
    Result,
};

#[derive(Serialize)]
struct ReactionTypeEmoji<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    emoji: &'a str,
}

#[derive(Serialize)]
struct SetMessageReaction<'a> {
    chat_id: i64,
    message_id: i32,
    reaction: [ReactionTypeEmoji<'a>; 1],
}

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
    http: reqwest::Client,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::External(format!("http client build failed: {e}")))?;
        Ok(Self { bot, http })
    }

    /// Bot API method URL. Contains the token; never log it.
    fn method_url(&self, method: &str) -> Result<reqwest::Url> {
        self.bot
            .api_url()
            .join(&format!("/bot{}/{method}", self.bot.token()))
            .map_err(|e| Error::External(format!("telegram url error: {e}")))
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_reactions: true,
        }
    }

    // teloxide 0.12 predates `setMessageReaction`, so call the Bot API directly.
    async fn set_reaction(&self, msg: MessageRef, emoji: &str) -> Result<()> {
        let body = SetMessageReaction {
            chat_id: msg.chat_id.0,
            message_id: msg.message_id.0,
            reaction: [ReactionTypeEmoji {
                kind: "emoji",
                emoji,
            }],
        };

        let resp = self
            .http
            .post(self.method_url("setMessageReaction")?)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::External(format!("telegram error: {}", e.without_url())))?;

        let v: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::External(format!("telegram json error: {}", e.without_url())))?;

        if v.get("ok").and_then(|ok| ok.as_bool()) != Some(true) {
            let description = v
                .get("description")
                .and_then(|d| d.as_str())
                .unwrap_or("unknown error");
            return Err(Error::External(format!(
                "setMessageReaction failed: {description}"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reaction_payload_shape() {
        let body = SetMessageReaction {
            chat_id: -100,
            message_id: 7,
            reaction: [ReactionTypeEmoji {
                kind: "emoji",
                emoji: "✍",
            }],
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "chat_id": -100,
                "message_id": 7,
                "reaction": [{"type": "emoji", "emoji": "✍"}]
            })
        );
    }

    #[test]
    fn method_url_targets_bot_api() {
        let messenger = TelegramMessenger::new(Bot::new("123:abc")).unwrap();
        let url = messenger.method_url("setMessageReaction").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.telegram.org/bot123:abc/setMessageReaction"
        );
    }
}
