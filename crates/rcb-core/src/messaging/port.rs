use async_trait::async_trait;

use crate::{domain::MessageRef, messaging::types::MessagingCapabilities, Result};

/// Cross-messenger port used to acknowledge printed messages.
///
/// Telegram is the first implementation; the shape leaves room for other
/// adapters behind the same interface with capability flags.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    /// Attach a visible marker to `msg`.
    async fn set_reaction(&self, msg: MessageRef, emoji: &str) -> Result<()>;
}
