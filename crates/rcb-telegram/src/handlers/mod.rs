use std::sync::Arc;

use teloxide::prelude::*;

use rcb_core::{dispatcher::Outcome, domain::ChatId};

use crate::router::AppState;

pub mod inbound;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(from) = msg.from() else {
        return Ok(());
    };
    if state.bot_id == Some(from.id) || from.is_bot {
        return Ok(());
    }

    // Chats outside both channel sets are not worth a log line.
    if state
        .dispatcher
        .policy()
        .kind(ChatId(msg.chat.id.0))
        .is_none()
    {
        return Ok(());
    }

    let Some(inbound) = inbound::to_inbound(&msg) else {
        return Ok(());
    };

    match state.dispatcher.handle(inbound).await {
        Outcome::Printed { images } => {
            tracing::debug!(chat_id = msg.chat.id.0, images, "message printed")
        }
        Outcome::Rejected(reason) => {
            tracing::debug!(chat_id = msg.chat.id.0, ?reason, "message rejected")
        }
        Outcome::PrintFailed => {
            tracing::debug!(chat_id = msg.chat.id.0, "message dropped")
        }
    }

    Ok(())
}
